//! Binary wire format for peer broadcasts.
//!
//! # Responsibility
//! - Encode/decode world-map and object-update envelopes.
//! - Dispatch an inbound blob by trial decode (map first, then update).
//!
//! # Invariants
//! - Both envelopes use the same bincode options: fixed-width little-endian
//!   integers, bounded size, trailing bytes rejected.
//! - Each envelope starts with its own 4-byte schema magic.

use crate::model::transform::TransformError;
use bincode::Options;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod payload;
pub mod update;
pub mod world_map;

pub type WireResult<T> = Result<T, WireError>;

#[derive(Debug, Clone, PartialEq)]
pub enum WireError {
    Encode(String),
    Decode(String),
    BadMagic { expected: [u8; 4], found: [u8; 4] },
    /// Envelope decoded but its optional fields do not fit its kind.
    InvalidShape(&'static str),
    InvalidTransform(TransformError),
    PayloadTooLarge { len: usize, limit: u64 },
    /// Neither schema accepted the payload.
    Unrecognized { map_error: String, update_error: String },
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(message) => write!(f, "payload encode failed: {message}"),
            Self::Decode(message) => write!(f, "payload decode failed: {message}"),
            Self::BadMagic { expected, found } => write!(
                f,
                "schema magic mismatch: expected {:?}, found {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(found)
            ),
            Self::InvalidShape(details) => write!(f, "invalid envelope shape: {details}"),
            Self::InvalidTransform(err) => write!(f, "{err}"),
            Self::PayloadTooLarge { len, limit } => {
                write!(f, "payload of {len} bytes exceeds limit {limit}")
            }
            Self::Unrecognized {
                map_error,
                update_error,
            } => write!(
                f,
                "payload matches no known schema (map: {map_error}; update: {update_error})"
            ),
        }
    }
}

impl Error for WireError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTransform(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransformError> for WireError {
    fn from(value: TransformError) -> Self {
        Self::InvalidTransform(value)
    }
}

/// Default upper bound for one broadcast payload.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 16 * 1024 * 1024;

pub(crate) fn wire_options(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(limit)
        .reject_trailing_bytes()
}

pub(crate) fn check_len(bytes: &[u8], limit: u64) -> WireResult<()> {
    if bytes.len() as u64 > limit {
        return Err(WireError::PayloadTooLarge {
            len: bytes.len(),
            limit,
        });
    }
    Ok(())
}
