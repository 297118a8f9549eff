use std::fmt;

use prost::Message;
use thiserror::Error;

use crate::{
    AreaInfo, Capsule, CollisionShape, GroundHeight, JumpState, LiquidKind, LiquidLevel, MapId,
    MovementFlags, OverlapHit, PathDistance, PhysicsInput, PhysicsOutput, Position, SpeedProfile,
    TransportLink,
};

pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/pathfinding.navigation.rs"));
}

use proto as pb;

/// Wire protocol revision carried by every envelope.
pub const PROTOCOL_VERSION: u32 = 1;

/// Discriminant shared by requests and their successful responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    ComputePath,
    LineOfSight,
    GroundHeight,
    PhysicsStep,
    PathDistance,
    LiquidLevel,
    AreaInfo,
    CapsuleOverlap,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::ComputePath => "compute_path",
            QueryKind::LineOfSight => "line_of_sight",
            QueryKind::GroundHeight => "ground_height",
            QueryKind::PhysicsStep => "physics_step",
            QueryKind::PathDistance => "path_distance",
            QueryKind::LiquidLevel => "liquid_level",
            QueryKind::AreaInfo => "area_info",
            QueryKind::CapsuleOverlap => "capsule_overlap",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single spatial query.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ComputePath {
        map_id: MapId,
        start: Position,
        end: Position,
        want_smoothed: bool,
    },
    LineOfSight {
        map_id: MapId,
        from: Position,
        to: Position,
    },
    GroundHeight {
        map_id: MapId,
        position: Position,
        max_search_distance: f32,
    },
    PhysicsStep(PhysicsInput),
    PathDistance {
        map_id: MapId,
        start: Position,
        end: Position,
    },
    LiquidLevel {
        map_id: MapId,
        position: Position,
    },
    AreaInfo {
        map_id: MapId,
        position: Position,
    },
    CapsuleOverlap {
        map_id: MapId,
        capsule: Capsule,
    },
}

/// Answer to a [`Request`], or an explicit rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    ComputePath { corners: Vec<Position> },
    LineOfSight { in_line_of_sight: bool },
    GroundHeight(GroundHeight),
    PhysicsStep(PhysicsOutput),
    PathDistance(PathDistance),
    LiquidLevel(LiquidLevel),
    AreaInfo(AreaInfo),
    CapsuleOverlap { hits: Vec<OverlapHit> },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum EnvelopeEncodeError {
    #[error("encode failed: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// Error returned when decoding a request or response envelope fails.
#[derive(Debug, Error)]
pub enum EnvelopeDecodeError {
    #[error("decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("envelope missing payload")]
    MissingPayload,
    #[error("envelope missing field {0}")]
    MissingField(&'static str),
    #[error("protocol version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("invalid enum value {value} for {field}")]
    InvalidEnum { field: &'static str, value: i32 },
}

impl Request {
    pub fn kind(&self) -> QueryKind {
        match self {
            Request::ComputePath { .. } => QueryKind::ComputePath,
            Request::LineOfSight { .. } => QueryKind::LineOfSight,
            Request::GroundHeight { .. } => QueryKind::GroundHeight,
            Request::PhysicsStep(_) => QueryKind::PhysicsStep,
            Request::PathDistance { .. } => QueryKind::PathDistance,
            Request::LiquidLevel { .. } => QueryKind::LiquidLevel,
            Request::AreaInfo { .. } => QueryKind::AreaInfo,
            Request::CapsuleOverlap { .. } => QueryKind::CapsuleOverlap,
        }
    }

    pub fn map_id(&self) -> MapId {
        match self {
            Request::ComputePath { map_id, .. }
            | Request::LineOfSight { map_id, .. }
            | Request::GroundHeight { map_id, .. }
            | Request::PathDistance { map_id, .. }
            | Request::LiquidLevel { map_id, .. }
            | Request::AreaInfo { map_id, .. }
            | Request::CapsuleOverlap { map_id, .. } => *map_id,
            Request::PhysicsStep(input) => input.map_id,
        }
    }

    /// Encode the request into a protobuf binary frame.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, EnvelopeEncodeError> {
        let proto = self.to_proto();
        let mut buffer = Vec::with_capacity(proto.encoded_len());
        proto.encode(&mut buffer)?;
        Ok(buffer)
    }

    /// Decode a request from a protobuf binary frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeDecodeError> {
        let proto = pb::RequestEnvelope::decode(bytes)?;
        Self::try_from_proto(proto)
    }

    pub fn to_proto(&self) -> pb::RequestEnvelope {
        use pb::request_envelope::Query;

        let query = match self {
            Request::ComputePath {
                map_id,
                start,
                end,
                want_smoothed,
            } => Query::ComputePath(pb::ComputePathRequest {
                map_id: *map_id,
                start: Some(vec3_to_proto(*start)),
                end: Some(vec3_to_proto(*end)),
                want_smoothed: *want_smoothed,
            }),
            Request::LineOfSight { map_id, from, to } => {
                Query::LineOfSight(pb::LineOfSightRequest {
                    map_id: *map_id,
                    from: Some(vec3_to_proto(*from)),
                    to: Some(vec3_to_proto(*to)),
                })
            }
            Request::GroundHeight {
                map_id,
                position,
                max_search_distance,
            } => Query::GroundHeight(pb::GroundHeightRequest {
                map_id: *map_id,
                position: Some(vec3_to_proto(*position)),
                max_search_distance: *max_search_distance,
            }),
            Request::PhysicsStep(input) => Query::PhysicsStep(physics_input_to_proto(input)),
            Request::PathDistance { map_id, start, end } => {
                Query::PathDistance(pb::PathDistanceRequest {
                    map_id: *map_id,
                    start: Some(vec3_to_proto(*start)),
                    end: Some(vec3_to_proto(*end)),
                })
            }
            Request::LiquidLevel { map_id, position } => {
                Query::LiquidLevel(pb::LiquidLevelRequest {
                    map_id: *map_id,
                    position: Some(vec3_to_proto(*position)),
                })
            }
            Request::AreaInfo { map_id, position } => Query::AreaInfo(pb::AreaInfoRequest {
                map_id: *map_id,
                position: Some(vec3_to_proto(*position)),
            }),
            Request::CapsuleOverlap { map_id, capsule } => {
                Query::CapsuleOverlap(pb::CapsuleOverlapRequest {
                    map_id: *map_id,
                    bottom: Some(vec3_to_proto(capsule.bottom)),
                    top: Some(vec3_to_proto(capsule.top)),
                    radius: capsule.radius,
                })
            }
        };

        pb::RequestEnvelope {
            protocol_version: PROTOCOL_VERSION,
            query: Some(query),
        }
    }

    pub fn try_from_proto(proto: pb::RequestEnvelope) -> Result<Self, EnvelopeDecodeError> {
        use pb::request_envelope::Query;

        check_version(proto.protocol_version)?;
        let request = match proto.query.ok_or(EnvelopeDecodeError::MissingPayload)? {
            Query::ComputePath(req) => Request::ComputePath {
                map_id: req.map_id,
                start: vec3_from_proto(req.start, "ComputePathRequest.start")?,
                end: vec3_from_proto(req.end, "ComputePathRequest.end")?,
                want_smoothed: req.want_smoothed,
            },
            Query::LineOfSight(req) => Request::LineOfSight {
                map_id: req.map_id,
                from: vec3_from_proto(req.from, "LineOfSightRequest.from")?,
                to: vec3_from_proto(req.to, "LineOfSightRequest.to")?,
            },
            Query::GroundHeight(req) => Request::GroundHeight {
                map_id: req.map_id,
                position: vec3_from_proto(req.position, "GroundHeightRequest.position")?,
                max_search_distance: req.max_search_distance,
            },
            Query::PhysicsStep(input) => Request::PhysicsStep(physics_input_from_proto(input)?),
            Query::PathDistance(req) => Request::PathDistance {
                map_id: req.map_id,
                start: vec3_from_proto(req.start, "PathDistanceRequest.start")?,
                end: vec3_from_proto(req.end, "PathDistanceRequest.end")?,
            },
            Query::LiquidLevel(req) => Request::LiquidLevel {
                map_id: req.map_id,
                position: vec3_from_proto(req.position, "LiquidLevelRequest.position")?,
            },
            Query::AreaInfo(req) => Request::AreaInfo {
                map_id: req.map_id,
                position: vec3_from_proto(req.position, "AreaInfoRequest.position")?,
            },
            Query::CapsuleOverlap(req) => Request::CapsuleOverlap {
                map_id: req.map_id,
                capsule: Capsule {
                    bottom: vec3_from_proto(req.bottom, "CapsuleOverlapRequest.bottom")?,
                    top: vec3_from_proto(req.top, "CapsuleOverlapRequest.top")?,
                    radius: req.radius,
                },
            },
        };
        Ok(request)
    }
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    /// Kind of query this response answers; `None` for [`Response::Error`].
    pub fn kind(&self) -> Option<QueryKind> {
        match self {
            Response::ComputePath { .. } => Some(QueryKind::ComputePath),
            Response::LineOfSight { .. } => Some(QueryKind::LineOfSight),
            Response::GroundHeight(_) => Some(QueryKind::GroundHeight),
            Response::PhysicsStep(_) => Some(QueryKind::PhysicsStep),
            Response::PathDistance(_) => Some(QueryKind::PathDistance),
            Response::LiquidLevel(_) => Some(QueryKind::LiquidLevel),
            Response::AreaInfo(_) => Some(QueryKind::AreaInfo),
            Response::CapsuleOverlap { .. } => Some(QueryKind::CapsuleOverlap),
            Response::Error { .. } => None,
        }
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8>, EnvelopeEncodeError> {
        let proto = self.to_proto();
        let mut buffer = Vec::with_capacity(proto.encoded_len());
        proto.encode(&mut buffer)?;
        Ok(buffer)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeDecodeError> {
        let proto = pb::ResponseEnvelope::decode(bytes)?;
        Self::try_from_proto(proto)
    }

    pub fn to_proto(&self) -> pb::ResponseEnvelope {
        use pb::response_envelope::Outcome;

        let outcome = match self {
            Response::ComputePath { corners } => Outcome::ComputePath(pb::ComputePathResponse {
                corners: corners.iter().copied().map(vec3_to_proto).collect(),
            }),
            Response::LineOfSight { in_line_of_sight } => {
                Outcome::LineOfSight(pb::LineOfSightResponse {
                    in_line_of_sight: *in_line_of_sight,
                })
            }
            Response::GroundHeight(result) => Outcome::GroundHeight(pb::GroundHeightResponse {
                height: result.height,
                found: result.found,
            }),
            Response::PhysicsStep(output) => Outcome::PhysicsStep(pb::PhysicsOutput {
                position: Some(vec3_to_proto(output.position)),
                velocity: Some(vec3_to_proto(output.velocity)),
                movement_flags: output.movement_flags.bits(),
                orientation: output.orientation,
                pitch: output.pitch,
                fall_time: output.fall_time,
            }),
            Response::PathDistance(result) => Outcome::PathDistance(pb::PathDistanceResponse {
                distance: result.distance,
                found: result.found,
            }),
            Response::LiquidLevel(result) => Outcome::LiquidLevel(pb::LiquidLevelResponse {
                level: result.level,
                kind: liquid_kind_to_proto(result.kind) as i32,
                found: result.found,
            }),
            Response::AreaInfo(result) => Outcome::AreaInfo(pb::AreaInfoResponse {
                area_id: result.area_id,
                zone_id: result.zone_id,
                flags: result.flags,
                found: result.found,
            }),
            Response::CapsuleOverlap { hits } => {
                Outcome::CapsuleOverlap(pb::CapsuleOverlapResponse {
                    hits: hits
                        .iter()
                        .map(|hit| pb::OverlapHit {
                            obstacle_id: hit.obstacle_id,
                            penetration: hit.penetration,
                        })
                        .collect(),
                })
            }
            Response::Error { message } => Outcome::Error(pb::ErrorResponse {
                message: message.clone(),
            }),
        };

        pb::ResponseEnvelope {
            protocol_version: PROTOCOL_VERSION,
            outcome: Some(outcome),
        }
    }

    pub fn try_from_proto(proto: pb::ResponseEnvelope) -> Result<Self, EnvelopeDecodeError> {
        use pb::response_envelope::Outcome;

        check_version(proto.protocol_version)?;
        let response = match proto.outcome.ok_or(EnvelopeDecodeError::MissingPayload)? {
            Outcome::ComputePath(resp) => {
                let corners = resp
                    .corners
                    .into_iter()
                    .map(|corner| vec3_from_proto(Some(corner), "ComputePathResponse.corners"))
                    .collect::<Result<Vec<_>, _>>()?;
                Response::ComputePath { corners }
            }
            Outcome::LineOfSight(resp) => Response::LineOfSight {
                in_line_of_sight: resp.in_line_of_sight,
            },
            Outcome::GroundHeight(resp) => Response::GroundHeight(GroundHeight {
                height: resp.height,
                found: resp.found,
            }),
            Outcome::PhysicsStep(output) => Response::PhysicsStep(PhysicsOutput {
                position: vec3_from_proto(output.position, "PhysicsOutput.position")?,
                velocity: vec3_from_proto(output.velocity, "PhysicsOutput.velocity")?,
                movement_flags: MovementFlags::from_wire(output.movement_flags),
                orientation: output.orientation,
                pitch: output.pitch,
                fall_time: output.fall_time,
            }),
            Outcome::PathDistance(resp) => Response::PathDistance(PathDistance {
                distance: resp.distance,
                found: resp.found,
            }),
            Outcome::LiquidLevel(resp) => Response::LiquidLevel(LiquidLevel {
                level: resp.level,
                kind: liquid_kind_from_proto(resp.kind)?,
                found: resp.found,
            }),
            Outcome::AreaInfo(resp) => Response::AreaInfo(AreaInfo {
                area_id: resp.area_id,
                zone_id: resp.zone_id,
                flags: resp.flags,
                found: resp.found,
            }),
            Outcome::CapsuleOverlap(resp) => Response::CapsuleOverlap {
                hits: resp
                    .hits
                    .into_iter()
                    .map(|hit| OverlapHit {
                        obstacle_id: hit.obstacle_id,
                        penetration: hit.penetration,
                    })
                    .collect(),
            },
            Outcome::Error(resp) => Response::Error {
                message: resp.message,
            },
        };
        Ok(response)
    }
}

fn check_version(found: u32) -> Result<(), EnvelopeDecodeError> {
    if found != PROTOCOL_VERSION {
        return Err(EnvelopeDecodeError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            found,
        });
    }
    Ok(())
}

fn vec3_to_proto(value: Position) -> pb::Vec3 {
    pb::Vec3 {
        x: value.x,
        y: value.y,
        z: value.z,
    }
}

fn vec3_from_proto(
    value: Option<pb::Vec3>,
    field: &'static str,
) -> Result<Position, EnvelopeDecodeError> {
    let value = value.ok_or(EnvelopeDecodeError::MissingField(field))?;
    Ok(Position::new(value.x, value.y, value.z))
}

fn physics_input_to_proto(input: &PhysicsInput) -> pb::PhysicsInput {
    pb::PhysicsInput {
        map_id: input.map_id,
        position: Some(vec3_to_proto(input.position)),
        facing: input.facing,
        velocity: Some(vec3_to_proto(input.velocity)),
        movement_flags: input.movement_flags.bits(),
        transport: input.transport.map(|link| pb::TransportLink {
            guid: link.guid,
            offset: Some(vec3_to_proto(link.offset)),
            facing: link.facing,
        }),
        swim_pitch: input.swim_pitch,
        fall_time: input.fall_time,
        jump: Some(pb::JumpState {
            vertical_speed: input.jump.vertical_speed,
            sin_angle: input.jump.sin_angle,
            cos_angle: input.jump.cos_angle,
            xy_speed: input.jump.xy_speed,
        }),
        speeds: Some(pb::SpeedProfile {
            walk: input.speeds.walk,
            run: input.speeds.run,
            run_back: input.speeds.run_back,
            swim: input.speeds.swim,
            swim_back: input.speeds.swim_back,
        }),
        turn_rate: input.turn_rate,
        collision_radius: input.collision.radius,
        collision_height: input.collision.height,
        gravity: input.gravity,
        ground_height_hint: input.ground_height_hint,
        liquid_height_hint: input.liquid_height_hint,
        delta_time: input.delta_time,
    }
}

fn physics_input_from_proto(input: pb::PhysicsInput) -> Result<PhysicsInput, EnvelopeDecodeError> {
    let transport = match input.transport {
        Some(link) => Some(TransportLink {
            guid: link.guid,
            offset: vec3_from_proto(link.offset, "TransportLink.offset")?,
            facing: link.facing,
        }),
        None => None,
    };
    let jump = input
        .jump
        .map(|jump| JumpState {
            vertical_speed: jump.vertical_speed,
            sin_angle: jump.sin_angle,
            cos_angle: jump.cos_angle,
            xy_speed: jump.xy_speed,
        })
        .unwrap_or_default();
    let speeds = input
        .speeds
        .map(|speeds| SpeedProfile {
            walk: speeds.walk,
            run: speeds.run,
            run_back: speeds.run_back,
            swim: speeds.swim,
            swim_back: speeds.swim_back,
        })
        .ok_or(EnvelopeDecodeError::MissingField("PhysicsInput.speeds"))?;

    Ok(PhysicsInput {
        map_id: input.map_id,
        position: vec3_from_proto(input.position, "PhysicsInput.position")?,
        facing: input.facing,
        velocity: vec3_from_proto(input.velocity, "PhysicsInput.velocity")?,
        movement_flags: MovementFlags::from_wire(input.movement_flags),
        transport,
        swim_pitch: input.swim_pitch,
        fall_time: input.fall_time,
        jump,
        speeds,
        turn_rate: input.turn_rate,
        collision: CollisionShape {
            radius: input.collision_radius,
            height: input.collision_height,
        },
        gravity: input.gravity,
        ground_height_hint: input.ground_height_hint,
        liquid_height_hint: input.liquid_height_hint,
        delta_time: input.delta_time,
    })
}

fn liquid_kind_to_proto(value: LiquidKind) -> pb::LiquidKind {
    match value {
        LiquidKind::None => pb::LiquidKind::None,
        LiquidKind::Water => pb::LiquidKind::Water,
        LiquidKind::Ocean => pb::LiquidKind::Ocean,
        LiquidKind::Magma => pb::LiquidKind::Magma,
        LiquidKind::Slime => pb::LiquidKind::Slime,
    }
}

fn liquid_kind_from_proto(value: i32) -> Result<LiquidKind, EnvelopeDecodeError> {
    match pb::LiquidKind::try_from(value) {
        Ok(pb::LiquidKind::None) => Ok(LiquidKind::None),
        Ok(pb::LiquidKind::Water) => Ok(LiquidKind::Water),
        Ok(pb::LiquidKind::Ocean) => Ok(LiquidKind::Ocean),
        Ok(pb::LiquidKind::Magma) => Ok(LiquidKind::Magma),
        Ok(pb::LiquidKind::Slime) => Ok(LiquidKind::Slime),
        Err(_) => Err(EnvelopeDecodeError::InvalidEnum {
            field: "LiquidKind",
            value,
        }),
    }
}
