use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::{Capsule, MovementFlags, PhysicsInput, Position, Request};

const DEFAULT_MAX_SEARCH_DISTANCE: &str = "50";

#[derive(Debug, Error)]
pub enum QueryParseError {
    #[error("empty query")]
    Empty,
    #[error("unknown query: {0}")]
    UnknownQuery(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid float '{value}' for {context}: {source}")]
    InvalidFloat {
        value: String,
        context: &'static str,
        source: ParseFloatError,
    },
    #[error("invalid path mode '{0}'")]
    InvalidPathMode(String),
    #[error("invalid movement intent '{0}'")]
    InvalidIntent(String),
}

/// Parse a whitespace separated query line such as
/// `path 0 1 2 3 40 50 3 smooth` into a [`Request`].
pub fn parse_query_line(input: &str) -> Result<Request, QueryParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(QueryParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(QueryParseError::Empty)?;

    match verb.as_str() {
        "path" => {
            let map_id = parse_map(&mut parts)?;
            let start = parse_position(&mut parts, "path start")?;
            let end = parse_position(&mut parts, "path end")?;
            let want_smoothed = match parts.next().map(|m| m.to_ascii_lowercase()) {
                None => false,
                Some(mode) => match mode.as_str() {
                    "smooth" | "smoothed" => true,
                    "straight" | "corners" => false,
                    other => return Err(QueryParseError::InvalidPathMode(other.to_string())),
                },
            };
            Ok(Request::ComputePath {
                map_id,
                start,
                end,
                want_smoothed,
            })
        }
        "distance" | "dist" => {
            let map_id = parse_map(&mut parts)?;
            let start = parse_position(&mut parts, "distance start")?;
            let end = parse_position(&mut parts, "distance end")?;
            Ok(Request::PathDistance { map_id, start, end })
        }
        "los" => {
            let map_id = parse_map(&mut parts)?;
            let from = parse_position(&mut parts, "los from")?;
            let to = parse_position(&mut parts, "los to")?;
            Ok(Request::LineOfSight { map_id, from, to })
        }
        "height" => {
            let map_id = parse_map(&mut parts)?;
            let position = parse_position(&mut parts, "height position")?;
            let max_str = parts.next().unwrap_or(DEFAULT_MAX_SEARCH_DISTANCE);
            let max_search_distance = parse_f32(max_str, "height max search distance")?;
            Ok(Request::GroundHeight {
                map_id,
                position,
                max_search_distance,
            })
        }
        "liquid" => {
            let map_id = parse_map(&mut parts)?;
            let position = parse_position(&mut parts, "liquid position")?;
            Ok(Request::LiquidLevel { map_id, position })
        }
        "area" => {
            let map_id = parse_map(&mut parts)?;
            let position = parse_position(&mut parts, "area position")?;
            Ok(Request::AreaInfo { map_id, position })
        }
        "overlap" => {
            let map_id = parse_map(&mut parts)?;
            let bottom = parse_position(&mut parts, "overlap bottom")?;
            let top = parse_position(&mut parts, "overlap top")?;
            let radius_str = parts
                .next()
                .ok_or(QueryParseError::MissingArgument("radius"))?;
            let radius = parse_f32(radius_str, "overlap radius")?;
            Ok(Request::CapsuleOverlap {
                map_id,
                capsule: Capsule {
                    bottom,
                    top,
                    radius,
                },
            })
        }
        "step" => {
            let map_id = parse_map(&mut parts)?;
            let position = parse_position(&mut parts, "step position")?;
            let facing_str = parts
                .next()
                .ok_or(QueryParseError::MissingArgument("facing"))?;
            let dt_str = parts
                .next()
                .ok_or(QueryParseError::MissingArgument("delta_time"))?;
            let facing = parse_f32(facing_str, "step facing")?;
            let delta_time = parse_f32(dt_str, "step delta_time")?;
            let mut flags = MovementFlags::empty();
            for token in parts {
                flags |= parse_intent(token)?;
            }
            Ok(Request::PhysicsStep(
                PhysicsInput::new(map_id, position, delta_time)
                    .with_facing(facing)
                    .with_flags(flags),
            ))
        }
        other => Err(QueryParseError::UnknownQuery(other.to_string())),
    }
}

fn parse_map<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<u32, QueryParseError> {
    let map_str = parts
        .next()
        .ok_or(QueryParseError::MissingArgument("map"))?;
    map_str
        .parse::<u32>()
        .map_err(|source| QueryParseError::InvalidInteger {
            value: map_str.to_string(),
            context: "map id",
            source,
        })
}

fn parse_position<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    context: &'static str,
) -> Result<Position, QueryParseError> {
    let mut coords = [0.0f32; 3];
    for coord in coords.iter_mut() {
        let token = parts.next().ok_or(QueryParseError::MissingArgument(context))?;
        *coord = parse_f32(token, context)?;
    }
    Ok(Position::new(coords[0], coords[1], coords[2]))
}

fn parse_f32(value: &str, context: &'static str) -> Result<f32, QueryParseError> {
    value
        .parse::<f32>()
        .map_err(|source| QueryParseError::InvalidFloat {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_intent(token: &str) -> Result<MovementFlags, QueryParseError> {
    match token.to_ascii_lowercase().as_str() {
        "forward" | "fwd" => Ok(MovementFlags::FORWARD),
        "backward" | "back" => Ok(MovementFlags::BACKWARD),
        "strafe_left" => Ok(MovementFlags::STRAFE_LEFT),
        "strafe_right" => Ok(MovementFlags::STRAFE_RIGHT),
        "walk" => Ok(MovementFlags::WALK_MODE),
        "jump" => Ok(MovementFlags::JUMPING),
        "falling" | "fall" => Ok(MovementFlags::FALLING),
        "swim" | "swimming" => Ok(MovementFlags::SWIMMING),
        other => Err(QueryParseError::InvalidIntent(other.to_string())),
    }
}
