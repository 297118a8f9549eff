#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::Context;
use nav_client::{ClientConfig, PathfindingClient};
use nav_server::{NavServer, SpatialQueryEngine, StaticWorldEngine, WorldDescription};

static INIT: Once = Once::new();

/// Route test logs through the fmt subscriber once per binary; `RUST_LOG`
/// controls verbosity.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn fixture_world() -> anyhow::Result<WorldDescription> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_world.json");
    WorldDescription::from_file(&path)
        .with_context(|| format!("loading fixture world {}", path.display()))
}

pub fn fixture_engine() -> anyhow::Result<Arc<dyn SpatialQueryEngine>> {
    Ok(Arc::new(StaticWorldEngine::new(fixture_world()?)?))
}

/// Start a server on an ephemeral loopback port.
pub fn spawn_server() -> anyhow::Result<NavServer> {
    spawn_server_at("127.0.0.1:0".parse()?)
}

pub fn spawn_server_at(addr: SocketAddr) -> anyhow::Result<NavServer> {
    init_tracing();
    let server = NavServer::start(addr, fixture_engine()?)?;
    Ok(server)
}

pub fn client_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::default()
        .with_endpoint(addr.to_string())
        .with_read_timeout(Duration::from_secs(2))
}

pub fn client_for(server: &NavServer) -> PathfindingClient {
    PathfindingClient::tcp(client_config(server.local_addr()))
}
