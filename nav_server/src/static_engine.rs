//! Reference engine over a static world of boxes, liquids and area rectangles.
//!
//! Stands in for a navmesh-backed engine during local runs and tests. Paths
//! are found on the visibility graph of inflated obstacle corners, so they
//! are shortest among paths that bend only at those corners.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, TAU};

use nav_runtime::{
    path_length, AreaInfo, Capsule, GroundHeight, LiquidLevel, MapId, MovementFlags,
    OverlapHit, PhysicsInput, PhysicsOutput, Position, DEFAULT_GRAVITY,
};

use crate::engine::{EngineError, SpatialQueryEngine};
use crate::world::{Aabb, MapDescription, WorldDescription, WorldLoadError};

/// Horizontal margin kept between a path and any obstacle face.
pub const PATH_CLEARANCE: f32 = 0.6;
/// Spacing of the extra corners inserted into smoothed paths.
pub const SMOOTH_STEP: f32 = 4.0;
/// Upper bound on inserted corners; longer paths get a wider spacing so the
/// reply stays well inside one frame.
pub const MAX_SMOOTHED_CORNERS: usize = 4096;
/// Tallest ledge an agent walks onto without jumping.
pub const STEP_HEIGHT: f32 = 0.5;
/// Headroom used to decide whether an obstacle obstructs a walking agent.
const AGENT_HEIGHT: f32 = 2.0;
/// Waypoints sit slightly outside the inflated corner so they do not lie on
/// the boundary they route around.
const CORNER_MARGIN: f32 = 0.1;
/// Search distance used when probing for floor during a physics step.
const PHYSICS_PROBE_DEPTH: f32 = 500.0;
/// Fraction of the collision height that must be submerged to start swimming.
const SWIM_DEPTH_FRACTION: f32 = 0.6;

pub struct StaticWorldEngine {
    maps: HashMap<MapId, MapDescription>,
}

impl StaticWorldEngine {
    pub fn new(world: WorldDescription) -> Result<Self, WorldLoadError> {
        world.index()?;
        let maps = world.maps.into_iter().map(|map| (map.id, map)).collect();
        Ok(Self { maps })
    }

    pub fn builtin() -> Self {
        Self::new(WorldDescription::builtin()).expect("builtin world has unique map ids")
    }

    pub fn map_ids(&self) -> Vec<MapId> {
        let mut ids: Vec<MapId> = self.maps.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn map(&self, map_id: MapId) -> Result<&MapDescription, EngineError> {
        self.maps.get(&map_id).ok_or(EngineError::UnknownMap(map_id))
    }
}

fn obstructs(bounds: &Aabb, feet: f32) -> bool {
    bounds.max.z > feet + STEP_HEIGHT && bounds.min.z < feet + AGENT_HEIGHT
}

fn position_blocked(map: &MapDescription, point: Position, clearance: f32) -> bool {
    map.obstacles.iter().any(|obstacle| {
        obstructs(&obstacle.bounds, point.z)
            && obstacle.bounds.inflate_xy(clearance).contains_xy(point)
    })
}

fn segment_clear(map: &MapDescription, a: Position, b: Position, clearance: f32) -> bool {
    let feet = a.z.min(b.z);
    !map.obstacles.iter().any(|obstacle| {
        obstructs(&obstacle.bounds, feet)
            && obstacle.bounds.inflate_xy(clearance).segment_crosses(a, b, true)
    })
}

/// Highest walkable surface under `point` that is no more than a step above
/// it and no more than `max_search` below it.
fn surface_below(map: &MapDescription, point: Position, max_search: f32) -> Option<f32> {
    let ceiling = point.z + STEP_HEIGHT;
    let within = |height: f32| height <= ceiling && point.z - height <= max_search;

    let plane = map.ground_height.filter(|height| within(*height));
    map.obstacles
        .iter()
        .filter(|obstacle| obstacle.bounds.contains_xy(point))
        .map(|obstacle| obstacle.bounds.max.z)
        .filter(|height| within(*height))
        .chain(plane)
        .reduce(f32::max)
}

fn liquid_at(map: &MapDescription, point: Position) -> LiquidLevel {
    map.liquids
        .iter()
        .find(|liquid| liquid.bounds.contains_xy(point))
        .map(|liquid| LiquidLevel {
            level: liquid.level,
            kind: liquid.kind,
            found: true,
        })
        .unwrap_or_default()
}

fn route(map: &MapDescription, start: Position, end: Position) -> Vec<Position> {
    if !segment_clear(map, start, end, PATH_CLEARANCE) {
        return shortest_detour(map, start, end);
    }
    vec![start, end]
}

/// Dijkstra over start, end and every reachable inflated obstacle corner.
fn shortest_detour(map: &MapDescription, start: Position, end: Position) -> Vec<Position> {
    let waypoint_z = (start.z + end.z) * 0.5;
    let mut nodes = vec![start, end];
    for obstacle in &map.obstacles {
        if !obstructs(&obstacle.bounds, start.z.min(end.z)) {
            continue;
        }
        let around = obstacle.bounds.inflate_xy(PATH_CLEARANCE + CORNER_MARGIN);
        for (x, y) in around.corners_xy() {
            let corner = Position::new(x, y, waypoint_z);
            if !position_blocked(map, corner, PATH_CLEARANCE) {
                nodes.push(corner);
            }
        }
    }

    let count = nodes.len();
    let mut distance = vec![f32::INFINITY; count];
    let mut previous: Vec<Option<usize>> = vec![None; count];
    let mut settled = vec![false; count];
    distance[0] = 0.0;

    loop {
        let current = (0..count)
            .filter(|&index| !settled[index] && distance[index].is_finite())
            .min_by(|&a, &b| distance[a].total_cmp(&distance[b]));
        let Some(current) = current else {
            return Vec::new();
        };
        if current == 1 {
            break;
        }
        settled[current] = true;

        for next in 0..count {
            if settled[next] || !segment_clear(map, nodes[current], nodes[next], PATH_CLEARANCE) {
                continue;
            }
            let candidate = distance[current] + nodes[current].distance(nodes[next]);
            if candidate < distance[next] {
                distance[next] = candidate;
                previous[next] = Some(current);
            }
        }
    }

    let mut corners = vec![end];
    let mut cursor = 1;
    while let Some(prior) = previous[cursor] {
        corners.push(nodes[prior]);
        cursor = prior;
    }
    corners.reverse();
    corners
}

/// Insert a corner every [`SMOOTH_STEP`] units, snapping each to the floor.
/// Paths longer than `SMOOTH_STEP * MAX_SMOOTHED_CORNERS` are spaced evenly
/// so roughly [`MAX_SMOOTHED_CORNERS`] corners are inserted in total.
fn densify(map: &MapDescription, corners: &[Position]) -> Vec<Position> {
    let Some(first) = corners.first() else {
        return Vec::new();
    };
    let spacing = SMOOTH_STEP.max(path_length(corners) / MAX_SMOOTHED_CORNERS as f32);
    let mut smoothed = vec![*first];
    for pair in corners.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let steps = (a.distance(b) / spacing).ceil().max(1.0) as usize;
        for step in 1..steps {
            let mut point = a.lerp(b, step as f32 / steps as f32);
            if let Some(floor) = surface_below(map, point, SMOOTH_STEP) {
                point.z = floor;
            }
            smoothed.push(point);
        }
        smoothed.push(b);
    }
    smoothed
}

/// Distance from the segment `a → b` to `bounds`. The distance
/// is convex along the segment, so a ternary search converges on its minimum.
fn segment_box_distance(bounds: &Aabb, a: Position, b: Position) -> f32 {
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    for _ in 0..48 {
        let left = lo + (hi - lo) / 3.0;
        let right = hi - (hi - lo) / 3.0;
        if bounds.distance_to(a.lerp(b, left)) <= bounds.distance_to(a.lerp(b, right)) {
            hi = right;
        } else {
            lo = left;
        }
    }
    bounds.distance_to(a.lerp(b, (lo + hi) * 0.5))
}

fn wrap_angle(angle: f32) -> f32 {
    angle.rem_euclid(TAU)
}

impl SpatialQueryEngine for StaticWorldEngine {
    fn compute_path(
        &self,
        map_id: MapId,
        start: Position,
        end: Position,
        want_smoothed: bool,
    ) -> Result<Vec<Position>, EngineError> {
        let map = self.map(map_id)?;
        if !start.is_finite() || !end.is_finite() {
            return Err(EngineError::InvalidQuery(
                "path endpoints must be finite".to_string(),
            ));
        }
        if start == end {
            return Ok(vec![start]);
        }
        if position_blocked(map, start, PATH_CLEARANCE) || position_blocked(map, end, PATH_CLEARANCE)
        {
            return Ok(Vec::new());
        }

        let corners = route(map, start, end);
        if want_smoothed {
            return Ok(densify(map, &corners));
        }
        Ok(corners)
    }

    fn line_of_sight(
        &self,
        map_id: MapId,
        from: Position,
        to: Position,
    ) -> Result<bool, EngineError> {
        let map = self.map(map_id)?;
        Ok(!map
            .obstacles
            .iter()
            .any(|obstacle| obstacle.bounds.segment_crosses(from, to, false)))
    }

    fn ground_height(
        &self,
        map_id: MapId,
        position: Position,
        max_search_distance: f32,
    ) -> Result<GroundHeight, EngineError> {
        let map = self.map(map_id)?;
        if max_search_distance.is_nan() || max_search_distance < 0.0 {
            return Err(EngineError::InvalidQuery(format!(
                "max search distance must be non-negative, got {max_search_distance}"
            )));
        }
        Ok(surface_below(map, position, max_search_distance)
            .map(GroundHeight::found)
            .unwrap_or_else(GroundHeight::missing))
    }

    fn physics_step(&self, input: &PhysicsInput) -> Result<PhysicsOutput, EngineError> {
        let map = self.map(input.map_id)?;
        let dt = input.delta_time;
        let mut flags = input.movement_flags;
        let gravity = if input.gravity.is_finite() && input.gravity > 0.0 {
            input.gravity
        } else {
            DEFAULT_GRAVITY
        };

        let mut facing = input.facing;
        if flags.contains(MovementFlags::TURN_LEFT) {
            facing += input.turn_rate * dt;
        }
        if flags.contains(MovementFlags::TURN_RIGHT) {
            facing -= input.turn_rate * dt;
        }
        let facing = wrap_angle(facing);

        let mut pitch = input.swim_pitch;
        if flags.contains(MovementFlags::PITCH_UP) {
            pitch += input.turn_rate * dt;
        }
        if flags.contains(MovementFlags::PITCH_DOWN) {
            pitch -= input.turn_rate * dt;
        }
        let pitch = pitch.clamp(-FRAC_PI_2, FRAC_PI_2);

        let suspended = flags.intersects(MovementFlags::SWIMMING | MovementFlags::FLYING);

        // Intent in the agent's local frame: +forward, +left.
        let mut forward = 0.0f32;
        let mut side = 0.0f32;
        if flags.contains(MovementFlags::FORWARD) {
            forward += 1.0;
        }
        if flags.contains(MovementFlags::BACKWARD) {
            forward -= 1.0;
        }
        if flags.contains(MovementFlags::STRAFE_LEFT) {
            side += 1.0;
        }
        if flags.contains(MovementFlags::STRAFE_RIGHT) {
            side -= 1.0;
        }
        if flags.contains(MovementFlags::ROOT) {
            forward = 0.0;
            side = 0.0;
        }

        let speeds = input.speeds;
        let speed = match (suspended, flags.contains(MovementFlags::WALK_MODE), forward < 0.0) {
            (true, _, false) => speeds.swim,
            (true, _, true) => speeds.swim_back,
            (false, true, _) => speeds.walk,
            (false, false, false) => speeds.run,
            (false, false, true) => speeds.run_back,
        };

        let heading = Position::new(facing.cos(), facing.sin(), 0.0);
        let left = Position::new(-facing.sin(), facing.cos(), 0.0);
        let mut intent = heading * forward + left * side;
        let intent_len = intent.length();
        if intent_len > 0.0 {
            intent = intent * (speed / intent_len);
        }

        let launching = flags.contains(MovementFlags::JUMPING)
            && !flags.contains(MovementFlags::FALLING)
            && input.fall_time == 0.0
            && input.jump.vertical_speed > 0.0;
        let airborne = !suspended && (launching || flags.is_airborne());

        let mut horizontal = if launching && input.jump.xy_speed > 0.0 {
            Position::new(input.jump.cos_angle, input.jump.sin_angle, 0.0) * input.jump.xy_speed
        } else if airborne {
            Position::new(input.velocity.x, input.velocity.y, 0.0)
        } else {
            intent
        };

        let position = input.position;
        let mut fall_time = input.fall_time;
        let (mut z, mut vertical_speed) = if suspended {
            fall_time = 0.0;
            let climb = pitch.sin() * forward * speed;
            (position.z + climb * dt, climb)
        } else if airborne {
            let vz = if launching {
                input.jump.vertical_speed
            } else {
                input.velocity.z
            };
            fall_time += dt;
            (
                position.z + vz * dt - 0.5 * gravity * dt * dt,
                vz - gravity * dt,
            )
        } else {
            (position.z, 0.0)
        };

        let mut target = Position::new(
            position.x + horizontal.x * dt,
            position.y + horizontal.y * dt,
            z,
        );
        let feet = position.z.min(z);
        let blocked = map.obstacles.iter().any(|obstacle| {
            obstructs(&obstacle.bounds, feet)
                && obstacle
                    .bounds
                    .inflate_xy(input.collision.radius)
                    .segment_crosses(position, target, true)
        });
        if blocked {
            target.x = position.x;
            target.y = position.y;
            horizontal = Position::zero();
        }

        if !suspended {
            let probe = Position::new(target.x, target.y, position.z.max(z));
            let floor = surface_below(map, probe, PHYSICS_PROBE_DEPTH);
            match floor {
                Some(floor) if airborne && z <= floor => {
                    z = floor;
                    vertical_speed = 0.0;
                    fall_time = 0.0;
                    flags.remove(MovementFlags::JUMPING | MovementFlags::FALLING);
                }
                Some(floor) if !airborne && position.z - floor <= STEP_HEIGHT => {
                    z = floor;
                }
                _ if !airborne => {
                    // Walked off a ledge.
                    flags.insert(MovementFlags::FALLING);
                    fall_time = dt;
                    z = position.z - 0.5 * gravity * dt * dt;
                    vertical_speed = -gravity * dt;
                }
                _ => {}
            }

            let liquid = liquid_at(map, Position::new(target.x, target.y, z));
            if liquid.found && liquid.level - z >= input.collision.height * SWIM_DEPTH_FRACTION {
                flags.insert(MovementFlags::SWIMMING);
                flags.remove(MovementFlags::JUMPING | MovementFlags::FALLING);
                vertical_speed = 0.0;
                fall_time = 0.0;
            }
        } else if flags.contains(MovementFlags::SWIMMING) {
            let liquid = liquid_at(map, target);
            if !liquid.found {
                flags.remove(MovementFlags::SWIMMING);
            } else if z > liquid.level {
                z = liquid.level;
            }
        }

        Ok(PhysicsOutput {
            position: Position::new(target.x, target.y, z),
            velocity: Position::new(horizontal.x, horizontal.y, vertical_speed),
            movement_flags: flags,
            orientation: facing,
            pitch,
            fall_time,
        })
    }

    fn liquid_level(&self, map_id: MapId, position: Position) -> Result<LiquidLevel, EngineError> {
        let map = self.map(map_id)?;
        Ok(liquid_at(map, position))
    }

    fn area_info(&self, map_id: MapId, position: Position) -> Result<AreaInfo, EngineError> {
        let map = self.map(map_id)?;
        Ok(map
            .areas
            .iter()
            .rev()
            .find(|area| area.bounds.contains_xy(position))
            .map(|area| AreaInfo {
                area_id: area.area_id,
                zone_id: area.zone_id,
                flags: area.flags,
                found: true,
            })
            .unwrap_or_default())
    }

    fn capsule_overlap(
        &self,
        map_id: MapId,
        capsule: Capsule,
    ) -> Result<Vec<OverlapHit>, EngineError> {
        let map = self.map(map_id)?;
        if !capsule.radius.is_finite() || capsule.radius < 0.0 {
            return Err(EngineError::InvalidQuery(format!(
                "capsule radius must be non-negative, got {}",
                capsule.radius
            )));
        }

        let mut hits: Vec<OverlapHit> = map
            .obstacles
            .iter()
            .filter_map(|obstacle| {
                let distance = segment_box_distance(&obstacle.bounds, capsule.bottom, capsule.top);
                (distance < capsule.radius).then_some(OverlapHit {
                    obstacle_id: obstacle.id,
                    penetration: capsule.radius - distance,
                })
            })
            .collect();
        hits.sort_by_key(|hit| hit.obstacle_id);
        Ok(hits)
    }
}
