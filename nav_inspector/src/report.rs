use nav_client::{ClientError, PathfindingClient, Transport};
use nav_runtime::{path_length, Request};
use serde::Serialize;
use serde_json::{json, Value};

/// One answered query, ready to print.
#[derive(Debug, Serialize)]
pub struct QueryReport {
    pub query: &'static str,
    pub map_id: u32,
    pub result: Value,
    /// True when the result came from the client-side fallback.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Run `request` through the client so the usual failure policy applies.
pub fn run_request<T: Transport>(
    client: &mut PathfindingClient<T>,
    request: &Request,
) -> Result<QueryReport, ClientError> {
    let result = match request {
        Request::ComputePath {
            map_id,
            start,
            end,
            want_smoothed,
        } => {
            let corners = client.get_path(*map_id, *start, *end, *want_smoothed)?;
            json!({ "length": path_length(&corners), "corners": corners })
        }
        Request::LineOfSight { map_id, from, to } => {
            json!({ "in_line_of_sight": client.is_in_line_of_sight(*map_id, *from, *to)? })
        }
        Request::GroundHeight {
            map_id,
            position,
            max_search_distance,
        } => json!(client.get_ground_height(*map_id, *position, *max_search_distance)?),
        Request::PhysicsStep(input) => json!(client.physics_step(input)?),
        Request::PathDistance { map_id, start, end } => {
            json!(client.get_path_distance(*map_id, *start, *end)?)
        }
        Request::LiquidLevel { map_id, position } => {
            json!(client.get_liquid_level(*map_id, *position)?)
        }
        Request::AreaInfo { map_id, position } => {
            json!(client.get_area_info(*map_id, *position)?)
        }
        Request::CapsuleOverlap { map_id, capsule } => {
            json!({ "hits": client.capsule_overlap(*map_id, *capsule)? })
        }
    };

    Ok(QueryReport {
        query: request.kind().as_str(),
        map_id: request.map_id(),
        result,
        degraded: !client.is_available(),
    })
}
