//! Service side of the navigation protocol.
//!
//! [`SpatialQueryEngine`] is the seam to whatever answers spatial queries;
//! [`dispatch`] routes decoded requests to it and [`NavServer`] exposes it over
//! the framed TCP protocol. [`StaticWorldEngine`] is a box-world reference
//! engine used for local runs and tests.

mod config;
mod dispatch;
mod engine;
mod network;
pub mod static_engine;
pub mod world;

pub use config::{load_server_config_from_env, ServerConfig, ServerConfigError};
pub use dispatch::{dispatch, handle_frame};
pub use engine::{EngineError, SpatialQueryEngine};
pub use network::{ConnectionOptions, NavServer, ServerError};
pub use static_engine::{StaticWorldEngine, MAX_SMOOTHED_CORNERS};
pub use world::{load_world_from_env, WorldDescription, WorldLoadError};
