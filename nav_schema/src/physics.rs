use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MapId, MovementFlags, Position};

/// Gravitational acceleration in world units per second squared.
pub const DEFAULT_GRAVITY: f32 = 19.2911;

/// Linkage to a moving parent entity (boat, elevator, zeppelin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransportLink {
    pub guid: u64,
    pub offset: Position,
    pub facing: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JumpState {
    pub vertical_speed: f32,
    pub sin_angle: f32,
    pub cos_angle: f32,
    pub xy_speed: f32,
}

/// Per-gait movement speeds in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedProfile {
    pub walk: f32,
    pub run: f32,
    pub run_back: f32,
    pub swim: f32,
    pub swim_back: f32,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self {
            walk: 2.5,
            run: 7.0,
            run_back: 4.5,
            swim: 4.722,
            swim_back: 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionShape {
    pub radius: f32,
    pub height: f32,
}

impl Default for CollisionShape {
    fn default() -> Self {
        Self {
            radius: 0.3064,
            height: 2.0313,
        }
    }
}

/// Everything the engine needs to advance one agent by `delta_time` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsInput {
    pub map_id: MapId,
    pub position: Position,
    pub facing: f32,
    pub velocity: Position,
    pub movement_flags: MovementFlags,
    pub transport: Option<TransportLink>,
    pub swim_pitch: f32,
    pub fall_time: f32,
    pub jump: JumpState,
    pub speeds: SpeedProfile,
    pub turn_rate: f32,
    pub collision: CollisionShape,
    pub gravity: f32,
    pub ground_height_hint: Option<f32>,
    pub liquid_height_hint: Option<f32>,
    pub delta_time: f32,
}

impl PhysicsInput {
    /// Stationary agent at `position` with default gait speeds.
    pub fn new(map_id: MapId, position: Position, delta_time: f32) -> Self {
        Self {
            map_id,
            position,
            facing: 0.0,
            velocity: Position::zero(),
            movement_flags: MovementFlags::empty(),
            transport: None,
            swim_pitch: 0.0,
            fall_time: 0.0,
            jump: JumpState::default(),
            speeds: SpeedProfile::default(),
            turn_rate: std::f32::consts::PI,
            collision: CollisionShape::default(),
            gravity: DEFAULT_GRAVITY,
            ground_height_hint: None,
            liquid_height_hint: None,
            delta_time,
        }
    }

    pub fn with_flags(mut self, flags: MovementFlags) -> Self {
        self.movement_flags = flags;
        self
    }

    pub fn with_facing(mut self, facing: f32) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_velocity(mut self, velocity: Position) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_speeds(mut self, speeds: SpeedProfile) -> Self {
        self.speeds = speeds;
        self
    }

    /// Check the invariants every physics step relies on.
    pub fn validate(&self) -> Result<(), InvalidPhysicsInput> {
        if !self.delta_time.is_finite() || self.delta_time <= 0.0 {
            return Err(InvalidPhysicsInput::NonPositiveDeltaTime(self.delta_time));
        }
        let speeds = [
            ("walk", self.speeds.walk),
            ("run", self.speeds.run),
            ("run_back", self.speeds.run_back),
            ("swim", self.speeds.swim),
            ("swim_back", self.speeds.swim_back),
        ];
        for (field, value) in speeds {
            if value.is_nan() || value < 0.0 {
                return Err(InvalidPhysicsInput::NegativeSpeed { field, value });
            }
        }
        if !self.position.is_finite() {
            return Err(InvalidPhysicsInput::NonFinite { field: "position" });
        }
        if !self.velocity.is_finite() {
            return Err(InvalidPhysicsInput::NonFinite { field: "velocity" });
        }
        if !self.facing.is_finite() {
            return Err(InvalidPhysicsInput::NonFinite { field: "facing" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidPhysicsInput {
    #[error("delta_time must be positive, got {0}")]
    NonPositiveDeltaTime(f32),
    #[error("speed '{field}' must be non-negative, got {value}")]
    NegativeSpeed { field: &'static str, value: f32 },
    #[error("field '{field}' is not finite")]
    NonFinite { field: &'static str },
}

/// State of an agent after one physics step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsOutput {
    pub position: Position,
    pub velocity: Position,
    pub movement_flags: MovementFlags,
    pub orientation: f32,
    pub pitch: f32,
    pub fall_time: f32,
}
