use crate::bootstrap::InitializationStatus;

/// Top-level screen of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellView {
    Loading,
    Failed,
    Disconnected,
    Ready,
}

/// Pick the screen for the current status. A failed bootstrap always wins,
/// even when the channel happens to still be open; a lost connection only
/// matters once initialization finished.
pub fn shell_view(status: InitializationStatus, connected: bool) -> ShellView {
    match status {
        InitializationStatus::InitializationFailed => ShellView::Failed,
        InitializationStatus::Uninitialized => ShellView::Loading,
        InitializationStatus::Initialized if !connected => ShellView::Disconnected,
        InitializationStatus::Initialized => ShellView::Ready,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_until_initialization_settles() {
        assert_eq!(
            shell_view(InitializationStatus::Uninitialized, false),
            ShellView::Loading
        );
        assert_eq!(
            shell_view(InitializationStatus::Uninitialized, true),
            ShellView::Loading
        );
    }

    #[test]
    fn failed_wins_over_everything() {
        assert_eq!(
            shell_view(InitializationStatus::InitializationFailed, true),
            ShellView::Failed
        );
        assert_eq!(
            shell_view(InitializationStatus::InitializationFailed, false),
            ShellView::Failed
        );
    }

    #[test]
    fn disconnect_only_matters_once_initialized() {
        assert_eq!(
            shell_view(InitializationStatus::Initialized, false),
            ShellView::Disconnected
        );
        assert_eq!(
            shell_view(InitializationStatus::Initialized, true),
            ShellView::Ready
        );
    }
}
