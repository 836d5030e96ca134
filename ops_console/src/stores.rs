use thiserror::Error;

use mission_proto::{ClientMessage, ServerMessage, ServerMessageKind};
use mission_schema::{Coalition, Mission, SessionData, SessionId, SessionTable, StaticData};

use crate::gateway::{Gateway, GatewayError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("unexpected reply {got:?} to {request}")]
    UnexpectedReply {
        request: &'static str,
        got: ServerMessageKind,
    },
    #[error("store already initialized")]
    AlreadyInitialized,
}

/// Airframe and weapon catalog. Loaded once; the server never pushes
/// changes to it.
#[derive(Debug, Default)]
pub struct StaticDataStore {
    data: Option<StaticData>,
}

impl StaticDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&StaticData> {
        self.data.as_ref()
    }

    pub async fn initialize(&mut self, gateway: &Gateway) -> Result<(), StoreError> {
        if self.data.is_some() {
            return Err(StoreError::AlreadyInitialized);
        }
        match gateway.request(ClientMessage::RequestStaticData).await? {
            ServerMessage::StaticData { data } => {
                self.data = Some(data);
                Ok(())
            }
            other => Err(StoreError::UnexpectedReply {
                request: "request_static_data",
                got: other.kind(),
            }),
        }
    }
}

/// Local copy of the mission plus the server's revision counter for it.
#[derive(Debug, Default)]
pub struct MissionStore {
    mission: Option<Mission>,
    revision: u64,
}

impl MissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.mission.is_some()
    }

    pub fn mission(&self) -> Option<&Mission> {
        self.mission.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub async fn initialize(&mut self, gateway: &Gateway) -> Result<(), StoreError> {
        if self.mission.is_some() {
            return Err(StoreError::AlreadyInitialized);
        }
        match gateway.request(ClientMessage::RequestMission).await? {
            ServerMessage::MissionUpdated { revision, mission } => {
                self.revision = revision;
                self.mission = Some(mission);
                Ok(())
            }
            other => Err(StoreError::UnexpectedReply {
                request: "request_mission",
                got: other.kind(),
            }),
        }
    }

    /// Fold a server broadcast into the local mission. Updates for ids this
    /// copy does not know are dropped; the next full mission update
    /// reconciles.
    pub fn apply(&mut self, update: ServerMessage) {
        match update {
            ServerMessage::MissionUpdated { revision, mission } => {
                self.revision = revision;
                self.mission = Some(mission);
            }
            ServerMessage::RouteUpdate { group_id, points } => {
                if let Some(group) = self
                    .mission
                    .as_mut()
                    .and_then(|mission| mission.group_mut(group_id))
                {
                    group.waypoints = points;
                }
            }
            ServerMessage::UnitUpdate { unit } => {
                if let Some(mission) = self.mission.as_mut() {
                    for group in &mut mission.groups {
                        if let Some(slot) =
                            group.units.iter_mut().find(|slot| slot.id == unit.id)
                        {
                            *slot = unit;
                            return;
                        }
                    }
                }
            }
            ServerMessage::BullseyeUpdate {
                coalition,
                bullseye,
            } => {
                if let Some(mission) = self.mission.as_mut() {
                    mission.bullseyes.insert(coalition, bullseye);
                }
            }
            _ => {}
        }
    }
}

/// Connected sessions and this console's own session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    own_id: Option<SessionId>,
    sessions: SessionTable,
    initialized: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn own_id(&self) -> Option<SessionId> {
        self.own_id
    }

    pub fn own_data(&self) -> Option<&SessionData> {
        self.sessions.get(&self.own_id?)
    }

    pub fn own_coalition(&self) -> Option<Coalition> {
        self.own_data().map(|data| data.coalition)
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub async fn initialize(&mut self, gateway: &Gateway) -> Result<(), StoreError> {
        if self.initialized {
            return Err(StoreError::AlreadyInitialized);
        }
        match gateway.request(ClientMessage::RequestSessionId).await? {
            ServerMessage::SessionId { session_id } => self.own_id = Some(session_id),
            other => {
                return Err(StoreError::UnexpectedReply {
                    request: "request_session_id",
                    got: other.kind(),
                })
            }
        }
        match gateway.request(ClientMessage::RequestSessions).await? {
            ServerMessage::SessionsUpdated { sessions } => self.sessions = sessions,
            other => {
                return Err(StoreError::UnexpectedReply {
                    request: "request_sessions",
                    got: other.kind(),
                })
            }
        }
        self.initialized = true;
        Ok(())
    }

    pub fn apply_sessions(&mut self, sessions: SessionTable) {
        self.sessions = sessions;
    }
}

/// Everything the console mirrors from the server, one store per concern.
#[derive(Debug, Default)]
pub struct WorldState {
    pub static_data: StaticDataStore,
    pub mission: MissionStore,
    pub session: SessionStore,
}

/// Borrowed view over a fully initialized [`WorldState`].
pub struct ReadyWorld<'a> {
    pub static_data: &'a StaticData,
    pub mission: &'a Mission,
    pub revision: u64,
    pub sessions: &'a SessionTable,
    pub own_session_id: SessionId,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.static_data.is_initialized()
            && self.mission.is_initialized()
            && self.session.is_initialized()
    }

    /// `Some` only once every store has initialized.
    pub fn ready(&self) -> Option<ReadyWorld<'_>> {
        Some(ReadyWorld {
            static_data: self.static_data.data()?,
            mission: self.mission.mission()?,
            revision: self.mission.revision(),
            sessions: self.session.sessions(),
            own_session_id: self.session.own_id()?,
        })
    }

    /// Route a server push to the store that owns it.
    pub fn apply(&mut self, update: ServerMessage) {
        match update {
            ServerMessage::SessionsUpdated { sessions } => self.session.apply_sessions(sessions),
            other => self.mission.apply(other),
        }
    }
}
