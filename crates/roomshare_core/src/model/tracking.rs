//! Tracking quality as reported by the AR subsystem each frame.

use serde::{Deserialize, Serialize};

/// Why tracking is limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitedReason {
    ExcessiveMotion,
    InsufficientFeatures,
    Initializing,
    Relocalizing,
}

/// Camera tracking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    NotAvailable,
    Limited(LimitedReason),
    Normal,
}

impl TrackingState {
    /// Stable lowercase label used by the host bridge and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAvailable => "not_available",
            Self::Limited(LimitedReason::ExcessiveMotion) => "limited_excessive_motion",
            Self::Limited(LimitedReason::InsufficientFeatures) => "limited_insufficient_features",
            Self::Limited(LimitedReason::Initializing) => "limited_initializing",
            Self::Limited(LimitedReason::Relocalizing) => "limited_relocalizing",
            Self::Normal => "normal",
        }
    }

    /// Parses a label produced by [`TrackingState::label`].
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_available" => Some(Self::NotAvailable),
            "limited_excessive_motion" => Some(Self::Limited(LimitedReason::ExcessiveMotion)),
            "limited_insufficient_features" => {
                Some(Self::Limited(LimitedReason::InsufficientFeatures))
            }
            "limited_initializing" => Some(Self::Limited(LimitedReason::Initializing)),
            "limited_relocalizing" => Some(Self::Limited(LimitedReason::Relocalizing)),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }
}

/// How complete the device's world map is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldMappingStatus {
    #[default]
    NotAvailable,
    Limited,
    Extending,
    Mapped,
}

impl WorldMappingStatus {
    /// Whether a captured map is good enough to hand to peers.
    pub fn allows_sharing(&self) -> bool {
        matches!(self, Self::Extending | Self::Mapped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAvailable => "not_available",
            Self::Limited => "limited",
            Self::Extending => "extending",
            Self::Mapped => "mapped",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_available" => Some(Self::NotAvailable),
            "limited" => Some(Self::Limited),
            "extending" => Some(Self::Extending),
            "mapped" => Some(Self::Mapped),
            _ => None,
        }
    }
}
