use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
};

use nav_runtime::{LiquidKind, MapId, Position};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_WORLD: &str = include_str!("data/default_world.json");

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Position,
    pub max: Position,
}

impl Aabb {
    pub fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    pub fn contains_xy(&self, point: Position) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Grow horizontally by `amount` on every side.
    pub fn inflate_xy(&self, amount: f32) -> Aabb {
        Aabb {
            min: Position::new(self.min.x - amount, self.min.y - amount, self.min.z),
            max: Position::new(self.max.x + amount, self.max.y + amount, self.max.z),
        }
    }

    pub fn corners_xy(&self) -> [(f32, f32); 4] {
        [
            (self.min.x, self.min.y),
            (self.max.x, self.min.y),
            (self.max.x, self.max.y),
            (self.min.x, self.max.y),
        ]
    }

    /// Euclidean distance from `point` to the box; zero inside.
    pub fn distance_to(&self, point: Position) -> f32 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        let dz = (self.min.z - point.z).max(0.0).max(point.z - self.max.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Does the segment `a → b` pass through the open interior of the box?
    /// With `horizontal_only` the box is treated as infinitely tall.
    /// Segments that only graze a face, edge or corner do not count.
    pub fn segment_crosses(&self, a: Position, b: Position, horizontal_only: bool) -> bool {
        let axes: &[(f32, f32, f32, f32)] = &[
            (a.x, b.x - a.x, self.min.x, self.max.x),
            (a.y, b.y - a.y, self.min.y, self.max.y),
            (a.z, b.z - a.z, self.min.z, self.max.z),
        ];
        let axes = if horizontal_only { &axes[..2] } else { axes };

        let mut t_enter = 0.0f32;
        let mut t_exit = 1.0f32;
        for &(origin, delta, lo, hi) in axes {
            if delta.abs() < f32::EPSILON {
                if origin <= lo || origin >= hi {
                    return false;
                }
                continue;
            }
            let mut t0 = (lo - origin) / delta;
            let mut t1 = (hi - origin) / delta;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter >= t_exit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    #[serde(flatten)]
    pub bounds: Aabb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidVolume {
    #[serde(flatten)]
    pub bounds: Aabb,
    pub level: f32,
    #[serde(default)]
    pub kind: LiquidKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRegion {
    #[serde(flatten)]
    pub bounds: Aabb,
    pub area_id: u32,
    pub zone_id: u32,
    #[serde(default)]
    pub flags: u32,
}

/// Static description of one map. Later `areas` entries take precedence over
/// earlier ones where they overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescription {
    pub id: MapId,
    #[serde(default)]
    pub name: String,
    /// Height of the infinite ground plane; `None` for maps with no floor.
    #[serde(default)]
    pub ground_height: Option<f32>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default)]
    pub liquids: Vec<LiquidVolume>,
    #[serde(default)]
    pub areas: Vec<AreaRegion>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldDescription {
    pub maps: Vec<MapDescription>,
}

#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error("failed to parse world description: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read world description from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("map id {0} is defined more than once")]
    DuplicateMap(MapId),
}

impl WorldDescription {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_WORLD).expect("builtin world description should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, WorldLoadError> {
        let world: WorldDescription = serde_json::from_str(json)?;
        world.index()?;
        Ok(world)
    }

    pub fn from_file(path: &Path) -> Result<Self, WorldLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| WorldLoadError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        WorldDescription::from_json_str(&contents)
    }

    /// Index maps by id, rejecting duplicates.
    pub fn index(&self) -> Result<HashMap<MapId, &MapDescription>, WorldLoadError> {
        let mut maps = HashMap::with_capacity(self.maps.len());
        for map in &self.maps {
            if maps.insert(map.id, map).is_some() {
                return Err(WorldLoadError::DuplicateMap(map.id));
            }
        }
        Ok(maps)
    }
}

/// Resolve the world description: `NAV_WORLD_PATH` wins, then the configured
/// path, then the builtin proving grounds.
pub fn load_world_from_env(configured: Option<&Path>) -> WorldDescription {
    let override_path = env::var_os("NAV_WORLD_PATH").map(PathBuf::from);
    let candidate = override_path.or_else(|| configured.map(Path::to_path_buf));

    if let Some(path) = candidate {
        match WorldDescription::from_file(&path) {
            Ok(world) => {
                tracing::info!(
                    target: "pathfinding::config",
                    path = %path.display(),
                    maps = world.maps.len(),
                    "world.loaded=file"
                );
                return world;
            }
            Err(err) => {
                tracing::warn!(
                    target: "pathfinding::config",
                    path = %path.display(),
                    error = %err,
                    "world.load_failed"
                );
            }
        }
    }

    let world = WorldDescription::builtin();
    tracing::info!(
        target: "pathfinding::config",
        maps = world.maps.len(),
        "world.loaded=builtin"
    );
    world
}
