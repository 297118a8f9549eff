use nav_runtime::{Request, Response};

use crate::engine::{EngineError, SpatialQueryEngine};

/// Route one decoded request to the engine and wrap the answer.
pub fn dispatch(engine: &dyn SpatialQueryEngine, request: &Request) -> Response {
    let result = match request {
        Request::ComputePath {
            map_id,
            start,
            end,
            want_smoothed,
        } => engine
            .compute_path(*map_id, *start, *end, *want_smoothed)
            .map(|corners| Response::ComputePath { corners }),
        Request::LineOfSight { map_id, from, to } => engine
            .line_of_sight(*map_id, *from, *to)
            .map(|in_line_of_sight| Response::LineOfSight { in_line_of_sight }),
        Request::GroundHeight {
            map_id,
            position,
            max_search_distance,
        } => engine
            .ground_height(*map_id, *position, *max_search_distance)
            .map(Response::GroundHeight),
        Request::PhysicsStep(input) => input
            .validate()
            .map_err(EngineError::from)
            .and_then(|()| engine.physics_step(input))
            .map(Response::PhysicsStep),
        Request::PathDistance { map_id, start, end } => engine
            .path_distance(*map_id, *start, *end)
            .map(Response::PathDistance),
        Request::LiquidLevel { map_id, position } => engine
            .liquid_level(*map_id, *position)
            .map(Response::LiquidLevel),
        Request::AreaInfo { map_id, position } => engine
            .area_info(*map_id, *position)
            .map(Response::AreaInfo),
        Request::CapsuleOverlap { map_id, capsule } => engine
            .capsule_overlap(*map_id, *capsule)
            .map(|hits| Response::CapsuleOverlap { hits }),
    };

    match result {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(
                target: "pathfinding::server",
                kind = %request.kind(),
                map_id = request.map_id(),
                error = %err,
                "dispatch.rejected"
            );
            Response::error(err.to_string())
        }
    }
}

/// Decode a raw request frame and answer it. Undecodable frames get an error
/// response rather than closing the connection.
pub fn handle_frame(engine: &dyn SpatialQueryEngine, frame: &[u8]) -> Response {
    match Request::decode(frame) {
        Ok(request) => dispatch(engine, &request),
        Err(err) => {
            tracing::warn!(
                target: "pathfinding::server",
                error = %err,
                bytes = frame.len(),
                "dispatch.malformed_request"
            );
            Response::error(format!("malformed request: {err}"))
        }
    }
}
