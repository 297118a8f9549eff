use std::sync::Arc;

use nav_runtime::{
    path_length, AreaInfo, Capsule, GroundHeight, InvalidPhysicsInput, LiquidLevel, MapId,
    OverlapHit, PathDistance, PhysicsInput, PhysicsOutput, Position, QueryKind, Request, Response,
};
use thiserror::Error;
use tracing::warn;

use crate::dead_reckoning::dead_reckon;
use crate::failure::{FailureNotice, FailureState};
use crate::transport::{TcpTransport, Transport, TransportError};
use crate::ClientConfig;

const LOG_TARGET: &str = "pathfinding::client";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} request could not reach the navigation service: {source}")]
    Transport {
        kind: QueryKind,
        #[source]
        source: TransportError,
    },
    #[error("{kind} request rejected by the navigation service: {message}")]
    Protocol { kind: QueryKind, message: String },
    #[error("{kind} request answered with a {actual} response")]
    UnexpectedResponse { kind: QueryKind, actual: QueryKind },
    #[error("invalid physics input: {0}")]
    InvalidInput(#[from] InvalidPhysicsInput),
}

impl ClientError {
    pub fn kind(&self) -> Option<QueryKind> {
        match self {
            ClientError::Transport { kind, .. }
            | ClientError::Protocol { kind, .. }
            | ClientError::UnexpectedResponse { kind, .. } => Some(*kind),
            ClientError::InvalidInput(_) => Some(QueryKind::PhysicsStep),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }
}

/// Per-agent handle onto the navigation service.
///
/// Every call is one blocking request/response cycle. Spatial queries surface
/// every failure to the caller; [`PathfindingClient::physics_step`] alone
/// absorbs transport failures by dead reckoning.
#[derive(Debug)]
pub struct PathfindingClient<T = TcpTransport> {
    transport: T,
    failures: Arc<FailureState>,
}

impl PathfindingClient<TcpTransport> {
    /// Client over a TCP connection that is dialled on first use.
    pub fn tcp(config: ClientConfig) -> Self {
        Self::new(TcpTransport::lazy(config))
    }

    /// Client over a TCP connection that must be reachable right now.
    pub fn connect(config: ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::new(TcpTransport::connect(config)?))
    }
}

impl<T: Transport> PathfindingClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_failure_state(transport, Arc::new(FailureState::new()))
    }

    /// Share one failure streak between several clients.
    pub fn with_failure_state(transport: T, failures: Arc<FailureState>) -> Self {
        Self {
            transport,
            failures,
        }
    }

    pub fn is_available(&self) -> bool {
        self.failures.is_available()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.consecutive_failures()
    }

    pub fn failure_state(&self) -> &Arc<FailureState> {
        &self.failures
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Corners of the path from `start` to `end`. An empty list means the
    /// engine found no path.
    pub fn get_path(
        &mut self,
        map_id: MapId,
        start: Position,
        end: Position,
        want_smoothed: bool,
    ) -> Result<Vec<Position>, ClientError> {
        let request = Request::ComputePath {
            map_id,
            start,
            end,
            want_smoothed,
        };
        match self.exchange(request)? {
            Response::ComputePath { corners } => Ok(corners),
            other => Err(unexpected(QueryKind::ComputePath, &other)),
        }
    }

    /// Walking distance along the straight (unsmoothed) path; `0.0` when the
    /// path has fewer than two corners.
    pub fn get_pathing_distance(
        &mut self,
        map_id: MapId,
        start: Position,
        end: Position,
    ) -> Result<f32, ClientError> {
        let corners = self.get_path(map_id, start, end, false)?;
        Ok(path_length(&corners))
    }

    pub fn get_ground_height(
        &mut self,
        map_id: MapId,
        position: Position,
        max_search_distance: f32,
    ) -> Result<GroundHeight, ClientError> {
        let request = Request::GroundHeight {
            map_id,
            position,
            max_search_distance,
        };
        match self.exchange(request)? {
            Response::GroundHeight(result) => Ok(result),
            other => Err(unexpected(QueryKind::GroundHeight, &other)),
        }
    }

    pub fn is_in_line_of_sight(
        &mut self,
        map_id: MapId,
        from: Position,
        to: Position,
    ) -> Result<bool, ClientError> {
        match self.exchange(Request::LineOfSight { map_id, from, to })? {
            Response::LineOfSight { in_line_of_sight } => Ok(in_line_of_sight),
            other => Err(unexpected(QueryKind::LineOfSight, &other)),
        }
    }

    /// Path length as measured by the engine itself.
    pub fn get_path_distance(
        &mut self,
        map_id: MapId,
        start: Position,
        end: Position,
    ) -> Result<PathDistance, ClientError> {
        match self.exchange(Request::PathDistance { map_id, start, end })? {
            Response::PathDistance(result) => Ok(result),
            other => Err(unexpected(QueryKind::PathDistance, &other)),
        }
    }

    pub fn get_liquid_level(
        &mut self,
        map_id: MapId,
        position: Position,
    ) -> Result<LiquidLevel, ClientError> {
        match self.exchange(Request::LiquidLevel { map_id, position })? {
            Response::LiquidLevel(result) => Ok(result),
            other => Err(unexpected(QueryKind::LiquidLevel, &other)),
        }
    }

    pub fn get_area_info(
        &mut self,
        map_id: MapId,
        position: Position,
    ) -> Result<AreaInfo, ClientError> {
        match self.exchange(Request::AreaInfo { map_id, position })? {
            Response::AreaInfo(result) => Ok(result),
            other => Err(unexpected(QueryKind::AreaInfo, &other)),
        }
    }

    pub fn capsule_overlap(
        &mut self,
        map_id: MapId,
        capsule: Capsule,
    ) -> Result<Vec<OverlapHit>, ClientError> {
        match self.exchange(Request::CapsuleOverlap { map_id, capsule })? {
            Response::CapsuleOverlap { hits } => Ok(hits),
            other => Err(unexpected(QueryKind::CapsuleOverlap, &other)),
        }
    }

    /// Advance one agent by `input.delta_time`.
    ///
    /// When the service cannot be reached the result is dead reckoned from
    /// `input` instead; the caller cannot tell the two apart. An explicit
    /// rejection from the service is still returned as an error.
    pub fn physics_step(&mut self, input: &PhysicsInput) -> Result<PhysicsOutput, ClientError> {
        input.validate()?;

        match self.exchange(Request::PhysicsStep(input.clone())) {
            Ok(Response::PhysicsStep(output)) => Ok(output),
            Ok(other) => Err(unexpected(QueryKind::PhysicsStep, &other)),
            Err(ClientError::Transport { source, .. }) => {
                self.report_physics_outage(&source);
                Ok(dead_reckon(input))
            }
            Err(err) => Err(err),
        }
    }

    fn report_physics_outage(&self, source: &TransportError) {
        let consecutive = self.failures.consecutive_failures();
        match self.failures.notice_for(consecutive) {
            FailureNotice::Individual { consecutive } => warn!(
                target: LOG_TARGET,
                consecutive_failures = consecutive,
                error = %source,
                "physics_step.transport_failed -- dead reckoning this step"
            ),
            FailureNotice::EnteringDegradedMode { consecutive } => warn!(
                target: LOG_TARGET,
                consecutive_failures = consecutive,
                "physics_step.degraded -- service unreachable, entering degraded mode"
            ),
            FailureNotice::Suppressed => {}
        }
    }

    /// One request/response cycle plus failure bookkeeping.
    fn exchange(&mut self, request: Request) -> Result<Response, ClientError> {
        let kind = request.kind();
        match self.transport.round_trip(&request) {
            Ok(Response::Error { message }) => {
                self.failures.record_failure();
                Err(ClientError::Protocol { kind, message })
            }
            Ok(response) => match response.kind() {
                Some(actual) if actual == kind => {
                    self.failures.record_success();
                    Ok(response)
                }
                _ => {
                    self.failures.record_failure();
                    Err(unexpected(kind, &response))
                }
            },
            Err(source) if source.is_unreachable() => {
                self.failures.record_failure();
                Err(ClientError::Transport { kind, source })
            }
            Err(source) => {
                self.failures.record_failure();
                Err(ClientError::Protocol {
                    kind,
                    message: source.to_string(),
                })
            }
        }
    }
}

fn unexpected(kind: QueryKind, response: &Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Protocol {
            kind,
            message: message.clone(),
        },
        other => ClientError::UnexpectedResponse {
            kind,
            actual: other.kind().unwrap_or(kind),
        },
    }
}
