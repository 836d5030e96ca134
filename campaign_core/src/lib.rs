pub mod campaign;
pub mod config;
pub mod geo;
pub mod network;
pub mod service;
pub mod sessions;

pub use campaign::{
    list_missions, mission_file_path, Campaign, CampaignError, DEFAULT_FLIGHT_ALTITUDE_M,
    WAYPOINT_MATCH_RADIUS_M,
};
pub use config::{load_server_config_from_env, ConfigError, ServerConfig, DEFAULT_PORT};
pub use geo::haversine_m;
pub use network::{start_mission_server, ClientEvent, MissionServer};
pub use service::MissionService;
pub use sessions::SessionManager;
