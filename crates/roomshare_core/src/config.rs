//! Session configuration.
//!
//! # Responsibility
//! - Hold tunables the host may override (JSON through the FFI layer).
//! - Reject values that would break protocol behavior.
//!
//! # Invariants
//! - Missing fields take defaults; unknown fields are rejected.
//! - A config reaching `SharedSession::new` has passed `validate()`.

use crate::model::object::MAX_OBJECT_TYPE_BYTES;
use crate::wire::DEFAULT_MAX_PAYLOAD_BYTES;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const MAX_APPEAR_DURATION_MS: u32 = 5_000;
const MAX_COALESCE_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidObjectType(String),
    AppearDurationTooLong { value: u32, max: u32 },
    CoalesceIntervalTooLong { value: u64, max: u64 },
    ZeroPayloadLimit,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidObjectType(value) => {
                write!(f, "default_object_type is invalid: `{value}`")
            }
            Self::AppearDurationTooLong { value, max } => {
                write!(f, "appear_duration_ms {value} exceeds {max}")
            }
            Self::CoalesceIntervalTooLong { value, max } => {
                write!(f, "update_coalesce_interval_ms {value} exceeds {max}")
            }
            Self::ZeroPayloadLimit => write!(f, "max_payload_bytes must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Object type used by tap-to-place.
    pub default_object_type: String,
    /// Fade-in duration for objects materialized from peer messages.
    pub appear_duration_ms: u32,
    /// Per-object throttle for outbound transform updates; `0` sends every
    /// gesture delta.
    pub update_coalesce_interval_ms: u64,
    /// Re-broadcast an Add for every live object when a peer connects.
    pub replay_on_connect: bool,
    /// Adopt a peer map even when local anchors already exist.
    pub adopt_over_local_map: bool,
    /// Largest payload accepted or produced.
    pub max_payload_bytes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_object_type: "chair".to_string(),
            appear_duration_ms: 200,
            update_coalesce_interval_ms: 0,
            replay_on_connect: true,
            adopt_over_local_map: false,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let object_type = self.default_object_type.trim();
        if object_type.is_empty() || object_type.len() > MAX_OBJECT_TYPE_BYTES {
            return Err(ConfigError::InvalidObjectType(
                self.default_object_type.clone(),
            ));
        }
        if self.appear_duration_ms > MAX_APPEAR_DURATION_MS {
            return Err(ConfigError::AppearDurationTooLong {
                value: self.appear_duration_ms,
                max: MAX_APPEAR_DURATION_MS,
            });
        }
        if self.update_coalesce_interval_ms > MAX_COALESCE_INTERVAL_MS {
            return Err(ConfigError::CoalesceIntervalTooLong {
                value: self.update_coalesce_interval_ms,
                max: MAX_COALESCE_INTERVAL_MS,
            });
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::ZeroPayloadLimit);
        }
        Ok(())
    }

    pub fn coalesce_interval(&self) -> Duration {
        Duration::from_millis(self.update_coalesce_interval_ms)
    }
}
