use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_CLIENT_CONFIG: &str = include_str!("data/client_config.json");

/// Connection settings for a [`crate::PathfindingClient`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    endpoint: String,
    connect_timeout_ms: u64,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
    tcp_nodelay: bool,
}

impl ClientConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_CLIENT_CONFIG).expect("builtin client config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ClientConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ClientConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ClientConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    /// `None` disables the timeout and blocks until the peer answers.
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }

    pub fn tcp_nodelay(&self) -> bool {
        self.tcp_nodelay
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:47950".to_string(),
            connect_timeout_ms: 500,
            read_timeout_ms: 2000,
            write_timeout_ms: 2000,
            tcp_nodelay: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("failed to parse client config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read client config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load the client config from `NAV_CLIENT_CONFIG_PATH`, falling back to the
/// builtin defaults when the variable is unset or the file is unusable.
pub fn load_client_config_from_env() -> ClientConfig {
    if let Some(path) = env::var_os("NAV_CLIENT_CONFIG_PATH").map(PathBuf::from) {
        match ClientConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "pathfinding::config",
                    path = %path.display(),
                    "client_config.loaded=file"
                );
                return config;
            }
            Err(err) => {
                tracing::warn!(
                    target: "pathfinding::config",
                    path = %path.display(),
                    error = %err,
                    "client_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "pathfinding::config", "client_config.loaded=builtin");
    ClientConfig::builtin()
}
