use std::sync::Arc;

use nav_server::{
    load_server_config_from_env, load_world_from_env, NavServer, SpatialQueryEngine,
    StaticWorldEngine,
};
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_server_config_from_env();
    let world = load_world_from_env(config.world_path.as_deref());
    let engine = match StaticWorldEngine::new(world) {
        Ok(engine) => engine,
        Err(err) => {
            error!(target: "pathfinding::server", error = %err, "world.rejected");
            std::process::exit(1);
        }
    };
    let maps = engine.map_ids();
    let engine: Arc<dyn SpatialQueryEngine> = Arc::new(engine);

    let server = match NavServer::start_with(config.bind, engine, config.connection_options()) {
        Ok(server) => server,
        Err(err) => {
            error!(target: "pathfinding::server", error = %err, "server.start_failed");
            std::process::exit(1);
        }
    };

    info!(
        bind = %server.local_addr(),
        ?maps,
        "Navigation server ready"
    );
    server.wait();
}
