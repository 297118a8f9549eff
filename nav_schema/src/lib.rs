//! Data contracts shared by the navigation client, the wire runtime and the
//! spatial query server.
//!
//! Everything in here is plain data: positions, movement intent, physics step
//! inputs/outputs and the result records of the spatial queries. Nothing in
//! this crate performs I/O.

mod movement;
mod physics;
mod position;
mod query;

pub use movement::MovementFlags;
pub use physics::{
    CollisionShape, InvalidPhysicsInput, JumpState, PhysicsInput, PhysicsOutput, SpeedProfile,
    TransportLink, DEFAULT_GRAVITY,
};
pub use position::{path_length, Position};
pub use query::{
    AreaInfo, Capsule, GroundHeight, LiquidKind, LiquidLevel, OverlapHit, PathDistance,
};

/// Identifier of a world/map instance understood by the spatial query engine.
pub type MapId = u32;
