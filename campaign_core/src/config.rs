//! Mission server configuration.
//!
//! Loaded from `server_config.json` with support for an environment variable
//! override; falls back to defaults when no file is present.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

/// Default command port. The original deployment served consoles from the
/// game's own web server, so clients connect to 80 unless told otherwise.
pub const DEFAULT_PORT: u16 = 80;

pub const CONFIG_ENV_VAR: &str = "TAUNTAUN_SERVER_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub missions_dir: PathBuf,
    pub default_mission: Option<String>,
    pub autosave: bool,
    pub autosave_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            missions_dir: PathBuf::from("missions"),
            default_mission: None,
            autosave: true,
            autosave_interval_secs: 15,
        }
    }
}

impl ServerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ServerConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse server config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read server config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load server configuration from the environment override or the default
/// path next to the binary.
pub fn load_server_config_from_env() -> ServerConfig {
    let override_path = env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
    let candidate = override_path.or_else(|| {
        let default_path = PathBuf::from("server_config.json");
        default_path.exists().then_some(default_path)
    });

    if let Some(path) = candidate {
        match ServerConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "tauntaun::config",
                    path = %path.display(),
                    "server_config.loaded=file"
                );
                return config;
            }
            Err(err) => {
                tracing::warn!(
                    target: "tauntaun::config",
                    path = %path.display(),
                    error = %err,
                    "server_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "tauntaun::config", "server_config.loaded=defaults");
    ServerConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_the_legacy_port() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 80);
        assert_eq!(config.autosave_interval_secs, 15);
        assert!(config.autosave);
        assert_eq!(config.missions_dir, PathBuf::from("missions"));
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config = ServerConfig::from_json_str(r#"{"port": 8080, "autosave": false}"#).unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.autosave);
        assert_eq!(config.autosave_interval_secs, 15);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn bind_addr_joins_address_and_port() {
        let mut config = ServerConfig::default();
        config.bind_address = "127.0.0.1".to_string();
        config.port = 4000;
        assert_eq!(config.bind_addr(), "127.0.0.1:4000");
    }

    #[test]
    fn garbage_json_is_a_parse_error() {
        let err = ServerConfig::from_json_str("{not json").expect_err("parse");
        let _ = err.to_string();
    }
}
