use std::{
    env, fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::network::ConnectionOptions;

pub const BUILTIN_SERVER_CONFIG: &str = include_str!("data/server_config.json");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// World description to serve; the builtin proving grounds when unset.
    pub world_path: Option<PathBuf>,
    /// Zero keeps idle connections open indefinitely.
    pub idle_timeout_ms: u64,
}

impl ServerConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_SERVER_CONFIG).expect("builtin server config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, ServerConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ServerConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ServerConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        ServerConfig::from_json_str(&contents)
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            idle_timeout: (self.idle_timeout_ms > 0)
                .then(|| Duration::from_millis(self.idle_timeout_ms)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 47950)),
            world_path: None,
            idle_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("failed to parse server config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read server config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load the server config from `NAV_SERVER_CONFIG_PATH`, falling back to the
/// builtin defaults.
pub fn load_server_config_from_env() -> ServerConfig {
    if let Some(path) = env::var_os("NAV_SERVER_CONFIG_PATH").map(PathBuf::from) {
        match ServerConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "pathfinding::config",
                    path = %path.display(),
                    "server_config.loaded=file"
                );
                return config;
            }
            Err(err) => {
                tracing::warn!(
                    target: "pathfinding::config",
                    path = %path.display(),
                    error = %err,
                    "server_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "pathfinding::config", "server_config.loaded=builtin");
    ServerConfig::builtin()
}
