//! Blocking client for the navigation service.
//!
//! Each agent owns a [`PathfindingClient`]: typed spatial queries (paths,
//! line of sight, ground height, liquids, areas, overlaps) that always report
//! failures, and a physics step that keeps the agent moving by dead reckoning
//! while the service is unreachable.

mod client;
mod config;
pub mod dead_reckoning;
pub mod failure;
mod transport;

pub use client::{ClientError, PathfindingClient};
pub use config::{load_client_config_from_env, ClientConfig, ClientConfigError};
pub use dead_reckoning::{dead_reckon, FALLBACK_GRAVITY};
pub use failure::{FailureNotice, FailureState, DEGRADED_MODE_THRESHOLD, INDIVIDUAL_WARNING_LIMIT};
pub use transport::{TcpTransport, Transport, TransportError};
