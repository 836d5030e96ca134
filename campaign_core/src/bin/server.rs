use std::time::Duration;

use crossbeam_channel::{select, tick};
use tracing::info;

use campaign_core::campaign::Campaign;
use campaign_core::config::load_server_config_from_env;
use campaign_core::network::start_mission_server;
use campaign_core::service::MissionService;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_server_config_from_env();
    let default_mission = config.default_mission.clone();
    let autosave_secs = config.autosave_interval_secs.max(1);
    let bind_addr = config.bind_addr();

    let (server, events) = start_mission_server(&bind_addr).expect("mission server bind failed");
    let local_addr = server.local_addr();

    let mut service = MissionService::new(Campaign::new(), config, server);
    if let Some(name) = default_mission.as_deref() {
        service.load_named(name);
    }

    info!(
        target: "tauntaun::server",
        bind = %local_addr,
        mission_revision = service.campaign().revision(),
        "tauntaun mission server ready"
    );

    let autosave = tick(Duration::from_secs(autosave_secs));

    loop {
        select! {
            recv(events) -> event => {
                let Ok(event) = event else { break };
                service.handle_event(event);
            }
            recv(autosave) -> _ => service.autosave(),
        }
    }
}
