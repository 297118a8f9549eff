//! Wire runtime for the navigation service.
//!
//! This crate re-exports the data contracts from `nav_schema` and adds the
//! protobuf request/response envelopes, the length-prefixed framing used on
//! the persistent connection, and a small text query parser for tooling.

pub use nav_schema::*;

pub mod framing;
mod protocol;
mod query_text;

pub use framing::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use protocol::{
    proto, EnvelopeDecodeError, EnvelopeEncodeError, QueryKind, Request, Response, PROTOCOL_VERSION,
};
pub use query_text::{parse_query_line, QueryParseError};
