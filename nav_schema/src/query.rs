use serde::{Deserialize, Serialize};

use crate::Position;

/// Result of a ground height probe. `found == false` is an ordinary answer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundHeight {
    pub height: f32,
    pub found: bool,
}

impl GroundHeight {
    pub fn found(height: f32) -> Self {
        Self {
            height,
            found: true,
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn as_option(self) -> Option<f32> {
        self.found.then_some(self.height)
    }
}

/// Engine-side length of the path between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathDistance {
    pub distance: f32,
    pub found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidKind {
    #[default]
    None,
    Water,
    Ocean,
    Magma,
    Slime,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LiquidLevel {
    pub level: f32,
    pub kind: LiquidKind,
    pub found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AreaInfo {
    pub area_id: u32,
    pub zone_id: u32,
    pub flags: u32,
    pub found: bool,
}

/// Vertical-or-slanted capsule described by its two cap centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    pub bottom: Position,
    pub top: Position,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapHit {
    pub obstacle_id: u32,
    pub penetration: f32,
}
