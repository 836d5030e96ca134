use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::gateway::{Gateway, GatewayError};
use crate::stores::{StoreError, WorldState};

/// Lifecycle phase of the console's one-shot initialization sequence.
///
/// The status only ever moves forward: `Uninitialized` to one of the two
/// terminal states. Losing the connection later does not move it back; that
/// is tracked separately by [`ConnectionFlag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializationStatus {
    Uninitialized,
    Initialized,
    InitializationFailed,
}

/// Steps of the sequence, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    OpenChannel,
    StaticData,
    Mission,
    Session,
}

impl InitStep {
    fn next(self) -> Option<InitStep> {
        match self {
            InitStep::OpenChannel => Some(InitStep::StaticData),
            InitStep::StaticData => Some(InitStep::Mission),
            InitStep::Mission => Some(InitStep::Session),
            InitStep::Session => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InitStep::OpenChannel => "open_channel",
            InitStep::StaticData => "static_data",
            InitStep::Mission => "mission",
            InitStep::Session => "session",
        }
    }
}

/// Shared connection state. Raised when the channel step completes, cleared
/// by the gateway's close callback. Never touches the initialization status.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFlag(Arc<AtomicBool>);

impl ConnectionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn set_closed(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("bootstrap already ran")]
    AlreadyRan,
    #[error("channel open failed: {0}")]
    Connection(#[from] GatewayError),
    #[error("initial data load failed: {0}")]
    Data(#[from] StoreError),
    #[error("{step} step timed out after {timeout_secs}s")]
    TimedOut {
        step: &'static str,
        timeout_secs: u64,
    },
}

/// Tracks the fixed open channel, static data, mission, session sequence.
///
/// The machine runs at most once. `start` yields the first step only from a
/// fresh machine; `advance` marks the in-flight step done and yields the
/// next; `fail` collapses whatever went wrong into the single terminal
/// failed state. There is no retry path, a failed machine stays failed until
/// a new one replaces it.
#[derive(Debug)]
pub struct Bootstrap {
    status: InitializationStatus,
    connected: ConnectionFlag,
    in_flight: Option<InitStep>,
}

impl Bootstrap {
    pub fn new() -> Self {
        Self {
            status: InitializationStatus::Uninitialized,
            connected: ConnectionFlag::new(),
            in_flight: None,
        }
    }

    pub fn status(&self) -> InitializationStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.connected.is_connected()
    }

    /// Handle to the connection flag, for the gateway's close callback.
    pub fn connection_flag(&self) -> ConnectionFlag {
        self.connected.clone()
    }

    /// Begin the sequence. Yields nothing when the machine already started
    /// or already settled, so a repeated call cannot rerun any step.
    pub fn start(&mut self) -> Option<InitStep> {
        if self.status != InitializationStatus::Uninitialized || self.in_flight.is_some() {
            return None;
        }
        self.in_flight = Some(InitStep::OpenChannel);
        self.in_flight
    }

    /// Mark the in-flight step complete and yield the next one. Completing
    /// the channel step raises the connected flag; completing the last step
    /// settles the machine at `Initialized` and yields nothing.
    pub fn advance(&mut self) -> Option<InitStep> {
        let step = self.in_flight?;
        if step == InitStep::OpenChannel {
            self.connected.set_connected();
        }
        match step.next() {
            Some(next) => {
                self.in_flight = Some(next);
                Some(next)
            }
            None => {
                self.in_flight = None;
                self.status = InitializationStatus::Initialized;
                None
            }
        }
    }

    /// Settle at the failed state. Which step failed is not recorded here;
    /// the caller logs it. Terminal states are left untouched.
    pub fn fail(&mut self) {
        if self.status != InitializationStatus::Uninitialized {
            return;
        }
        self.in_flight = None;
        self.status = InitializationStatus::InitializationFailed;
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BootstrapConfig {
    /// Limit applied to each step individually.
    pub step_timeout: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(30),
        }
    }
}

/// Run the initialization sequence end to end: open the channel, then load
/// static data, the mission, and the session over it, in that order. Each
/// step runs under the configured timeout. The first failure settles the
/// machine at `InitializationFailed` and is returned; nothing retries.
pub async fn run_bootstrap(
    host: &str,
    port: u16,
    config: BootstrapConfig,
    machine: &mut Bootstrap,
) -> Result<(Gateway, WorldState), BootstrapError> {
    let Some(step) = machine.start() else {
        return Err(BootstrapError::AlreadyRan);
    };

    let gateway = match with_timeout(config.step_timeout, step, Gateway::open(host, port)).await {
        Ok(gateway) => gateway,
        Err(err) => return Err(fail_step(machine, step, err)),
    };
    machine.advance();
    let flag = machine.connection_flag();
    gateway.on_close(move || flag.set_closed());

    let mut world = WorldState::new();

    let step = InitStep::StaticData;
    if let Err(err) =
        with_timeout(config.step_timeout, step, world.static_data.initialize(&gateway)).await
    {
        return Err(fail_step(machine, step, err));
    }
    machine.advance();

    let step = InitStep::Mission;
    if let Err(err) =
        with_timeout(config.step_timeout, step, world.mission.initialize(&gateway)).await
    {
        return Err(fail_step(machine, step, err));
    }
    machine.advance();

    let step = InitStep::Session;
    if let Err(err) =
        with_timeout(config.step_timeout, step, world.session.initialize(&gateway)).await
    {
        return Err(fail_step(machine, step, err));
    }
    machine.advance();

    info!(target: "tauntaun::client", "bootstrap.initialized");
    Ok((gateway, world))
}

async fn with_timeout<T, E>(
    limit: Duration,
    step: InitStep,
    task: impl Future<Output = Result<T, E>>,
) -> Result<T, BootstrapError>
where
    BootstrapError: From<E>,
{
    info!(target: "tauntaun::client", step = step.as_str(), "bootstrap.step");
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(BootstrapError::from(err)),
        Err(_) => Err(BootstrapError::TimedOut {
            step: step.as_str(),
            timeout_secs: limit.as_secs(),
        }),
    }
}

fn fail_step(machine: &mut Bootstrap, step: InitStep, err: BootstrapError) -> BootstrapError {
    machine.fail();
    warn!(target: "tauntaun::client", step = step.as_str(), error = %err, "bootstrap.failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_walks_the_fixed_order() {
        let mut machine = Bootstrap::new();
        assert_eq!(machine.status(), InitializationStatus::Uninitialized);
        assert!(!machine.is_connected());

        assert_eq!(machine.start(), Some(InitStep::OpenChannel));
        assert!(!machine.is_connected());

        assert_eq!(machine.advance(), Some(InitStep::StaticData));
        assert!(machine.is_connected());

        assert_eq!(machine.advance(), Some(InitStep::Mission));
        assert_eq!(machine.advance(), Some(InitStep::Session));
        assert_eq!(machine.advance(), None);
        assert_eq!(machine.status(), InitializationStatus::Initialized);
    }

    #[test]
    fn start_yields_nothing_after_the_first_call() {
        let mut machine = Bootstrap::new();
        assert!(machine.start().is_some());
        assert!(machine.start().is_none());

        while machine.advance().is_some() {}
        assert_eq!(machine.status(), InitializationStatus::Initialized);
        assert!(machine.start().is_none());
    }

    #[test]
    fn any_failure_collapses_to_the_single_failed_state() {
        let mut machine = Bootstrap::new();
        machine.start();
        machine.advance();
        machine.fail();

        assert_eq!(machine.status(), InitializationStatus::InitializationFailed);
        assert!(machine.advance().is_none());
        assert!(machine.start().is_none());
    }

    #[test]
    fn connected_flag_outlives_a_failed_bootstrap() {
        let mut machine = Bootstrap::new();
        machine.start();
        machine.advance();
        machine.fail();

        assert!(machine.is_connected());
        machine.connection_flag().set_closed();
        assert!(!machine.is_connected());
        assert_eq!(machine.status(), InitializationStatus::InitializationFailed);
    }

    #[test]
    fn close_callback_cannot_reach_the_status() {
        let mut machine = Bootstrap::new();
        machine.start();
        while machine.advance().is_some() {}

        machine.connection_flag().set_closed();
        assert!(!machine.is_connected());
        assert_eq!(machine.status(), InitializationStatus::Initialized);
    }

    #[test]
    fn terminal_states_ignore_late_failures() {
        let mut machine = Bootstrap::new();
        machine.start();
        while machine.advance().is_some() {}

        machine.fail();
        assert_eq!(machine.status(), InitializationStatus::Initialized);
    }

    #[test]
    fn advance_before_start_does_nothing() {
        let mut machine = Bootstrap::new();
        assert!(machine.advance().is_none());
        assert_eq!(machine.status(), InitializationStatus::Uninitialized);
        assert!(!machine.is_connected());
    }
}
