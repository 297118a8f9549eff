use nav_runtime::{
    path_length, AreaInfo, Capsule, GroundHeight, InvalidPhysicsInput, LiquidLevel, MapId,
    OverlapHit, PathDistance, PhysicsInput, PhysicsOutput, Position,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown map id {0}")]
    UnknownMap(MapId),
    #[error("invalid physics input: {0}")]
    InvalidInput(#[from] InvalidPhysicsInput),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Spatial query backend answered by the service.
///
/// Implementations are shared across connection threads, so every method
/// takes `&self`. A missing path, ground or liquid is an ordinary result; only
/// requests the engine cannot interpret at all return [`EngineError`].
pub trait SpatialQueryEngine: Send + Sync {
    fn compute_path(
        &self,
        map_id: MapId,
        start: Position,
        end: Position,
        want_smoothed: bool,
    ) -> Result<Vec<Position>, EngineError>;

    fn line_of_sight(&self, map_id: MapId, from: Position, to: Position)
        -> Result<bool, EngineError>;

    fn ground_height(
        &self,
        map_id: MapId,
        position: Position,
        max_search_distance: f32,
    ) -> Result<GroundHeight, EngineError>;

    fn physics_step(&self, input: &PhysicsInput) -> Result<PhysicsOutput, EngineError>;

    fn path_distance(
        &self,
        map_id: MapId,
        start: Position,
        end: Position,
    ) -> Result<PathDistance, EngineError> {
        let corners = self.compute_path(map_id, start, end, false)?;
        if corners.is_empty() && start != end {
            return Ok(PathDistance::default());
        }
        Ok(PathDistance {
            distance: path_length(&corners),
            found: true,
        })
    }

    fn liquid_level(&self, map_id: MapId, position: Position) -> Result<LiquidLevel, EngineError>;

    fn area_info(&self, map_id: MapId, position: Position) -> Result<AreaInfo, EngineError>;

    fn capsule_overlap(
        &self,
        map_id: MapId,
        capsule: Capsule,
    ) -> Result<Vec<OverlapHit>, EngineError>;
}
