use mission_schema::{SessionData, SessionId, SessionTable};

/// Tracks the consoles currently attached to the server.
///
/// Fresh sessions join the blue coalition with no selected unit. The caller
/// broadcasts the table after every mutation.
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: SessionTable,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: SessionTable::new(),
        }
    }

    pub fn register(&mut self, id: SessionId) -> &SessionData {
        self.sessions.entry(id).or_default()
    }

    pub fn deregister(&mut self, id: SessionId) -> Option<SessionData> {
        self.sessions.remove(&id)
    }

    /// Replace the data for a known session. Returns false for stale ids so
    /// the caller can log and skip the broadcast.
    pub fn update(&mut self, id: SessionId, data: SessionData) -> bool {
        match self.sessions.get_mut(&id) {
            Some(existing) => {
                *existing = data;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionData> {
        self.sessions.get(&id)
    }

    pub fn table(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_schema::Coalition;

    #[test]
    fn fresh_sessions_join_blue_with_no_selection() {
        let mut manager = SessionManager::new();
        let data = *manager.register(7);
        assert_eq!(data.coalition, Coalition::Blue);
        assert_eq!(data.selected_unit(), None);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn deregister_removes_the_session() {
        let mut manager = SessionManager::new();
        manager.register(7);
        assert!(manager.deregister(7).is_some());
        assert!(manager.deregister(7).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn update_replaces_known_sessions_only() {
        let mut manager = SessionManager::new();
        manager.register(7);

        let mut data = SessionData::default();
        data.coalition = Coalition::Red;
        data.set_selected_unit(Some(1001));

        assert!(manager.update(7, data));
        assert_eq!(manager.get(7).unwrap().coalition, Coalition::Red);
        assert_eq!(manager.get(7).unwrap().selected_unit(), Some(1001));

        assert!(!manager.update(99, data));
    }
}
