//! Errors surfaced to UI callers of the session.
//!
//! Inbound network problems are never errors here; they degrade to logged
//! no-ops reported through `InboundOutcome`.

use crate::config::ConfigError;
use crate::model::object::{ObjectError, ObjectHash};
use crate::model::tracking::WorldMappingStatus;
use crate::sync::update_protocol::ProtocolError;
use crate::wire::WireError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Config(ConfigError),
    /// Map sharing needs `Extending` or `Mapped` status.
    MapNotReady(WorldMappingStatus),
    NoPeers,
    /// The tracking collaborator could not capture a map.
    MapCapture(String),
    Encode(WireError),
    NoPlacementSurface,
    NothingSelected,
    UnknownObject(ObjectHash),
    InvalidObject(ObjectError),
    Protocol(ProtocolError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::MapNotReady(status) => {
                write!(f, "cannot share yet: world mapping is {}", status.label())
            }
            Self::NoPeers => write!(f, "cannot share yet: no connected peers"),
            Self::MapCapture(message) => write!(f, "cannot share yet: {message}"),
            Self::Encode(err) => write!(f, "{err}"),
            Self::NoPlacementSurface => write!(f, "no detected surface under that point"),
            Self::NothingSelected => write!(f, "no object selected"),
            Self::UnknownObject(hash) => write!(f, "object not found: {hash}"),
            Self::InvalidObject(err) => write!(f, "{err}"),
            Self::Protocol(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::InvalidObject(err) => Some(err),
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<WireError> for SessionError {
    fn from(value: WireError) -> Self {
        Self::Encode(value)
    }
}

impl From<ObjectError> for SessionError {
    fn from(value: ObjectError) -> Self {
        Self::InvalidObject(value)
    }
}

impl From<ProtocolError> for SessionError {
    fn from(value: ProtocolError) -> Self {
        match value {
            ProtocolError::UnknownObject(hash) => Self::UnknownObject(hash),
            other => Self::Protocol(other),
        }
    }
}
