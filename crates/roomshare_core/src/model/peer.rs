//! Peers surfaced by the transport collaborator.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Transport-assigned peer identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One device known to this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConnection {
    pub id: PeerId,
    pub display_name: String,
}

impl PeerConnection {
    pub fn connected(id: PeerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Connectivity notification from the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Connected { id: PeerId, display_name: String },
    Disconnected { id: PeerId, display_name: String },
}
