#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;
use std::time::Duration;

use campaign_core::campaign::Campaign;
use campaign_core::config::ServerConfig;
use campaign_core::network::start_mission_server;
use campaign_core::service::MissionService;
use mission_proto::{ServerMessage, ServerMessageKind};
use ops_console::bootstrap::{run_bootstrap, Bootstrap, BootstrapConfig};
use ops_console::gateway::Gateway;
use ops_console::stores::WorldState;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct TestServer {
    pub host: String,
    pub port: u16,
}

/// Spawn a mission server on a loopback port with the builtin mission and
/// autosave disabled. The dispatch thread lives until the test process ends.
pub fn spawn_server() -> TestServer {
    spawn_server_with(ServerConfig {
        autosave: false,
        ..ServerConfig::default()
    })
}

pub fn spawn_server_with(config: ServerConfig) -> TestServer {
    init_tracing();
    let (server, events) = start_mission_server("127.0.0.1:0").expect("bind test server");
    let addr = server.local_addr();
    let mut service = MissionService::new(Campaign::new(), config, server);
    std::thread::spawn(move || {
        while let Ok(event) = events.recv() {
            service.handle_event(event);
        }
    });
    TestServer {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
    }
}

/// Run the full initialization sequence against a test server.
pub async fn bootstrap(server: &TestServer) -> (Gateway, WorldState) {
    let mut machine = Bootstrap::new();
    run_bootstrap(
        &server.host,
        server.port,
        BootstrapConfig::default(),
        &mut machine,
    )
    .await
    .expect("bootstrap against test server")
}

/// Next server push of the given kind, skipping unrelated broadcasts such as
/// the session roster churn of other connecting clients.
pub async fn update_of_kind(gateway: &mut Gateway, kind: ServerMessageKind) -> ServerMessage {
    loop {
        let update = tokio::time::timeout(Duration::from_secs(2), gateway.next_update())
            .await
            .expect("update within deadline")
            .expect("channel still open");
        if update.kind() == kind {
            return update;
        }
    }
}

pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

static TEMP_SEQ: AtomicU32 = AtomicU32::new(0);

/// Scratch directory removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "{prefix}_{}_{}",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
