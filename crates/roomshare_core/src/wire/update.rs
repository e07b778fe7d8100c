//! Object update envelope: Add, Update and Delete on one message shape.
//!
//! # Invariants
//! - `Add` carries `object_type`, `transform` and `origin`.
//! - `Update` carries `action` or `transform` (or both) and no creation data.
//! - `Delete` is a tombstone: hash only.
//! - Decoding enforces these shapes; a mis-shaped envelope is a decode
//!   failure, not a partial message.

use super::{check_len, wire_options, WireError, WireResult};
use crate::model::object::{ObjectHash, ObjectOrigin, PlacedObject};
use crate::model::transform::{Transform, TransformError};
use bincode::Options;
use serde::{Deserialize, Serialize};

pub const UPDATE_MAGIC: [u8; 4] = *b"RSU1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    Add,
    Update,
    Delete,
}

/// Absolute animation target applied to an existing object.
///
/// Targets are absolute so a duplicated delivery lands in the same place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObjectAction {
    MoveTo { position: [f32; 3] },
    RotateTo { rotation: [f32; 4] },
}

impl ObjectAction {
    pub fn apply_to(&self, transform: &Transform) -> Result<Transform, TransformError> {
        match self {
            Self::MoveTo { position } => transform.with_position(*position),
            Self::RotateTo { rotation } => transform.with_rotation(*rotation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectUpdate {
    magic: [u8; 4],
    pub hash: ObjectHash,
    pub kind: UpdateKind,
    pub object_type: Option<String>,
    pub transform: Option<Transform>,
    pub origin: Option<ObjectOrigin>,
    pub action: Option<ObjectAction>,
}

impl ObjectUpdate {
    fn bare(hash: ObjectHash, kind: UpdateKind) -> Self {
        Self {
            magic: UPDATE_MAGIC,
            hash,
            kind,
            object_type: None,
            transform: None,
            origin: None,
            action: None,
        }
    }

    /// Full creation message for `object` at its current transform.
    pub fn add(object: &PlacedObject) -> Self {
        Self {
            object_type: Some(object.object_type.clone()),
            transform: Some(object.transform),
            origin: Some(object.origin),
            ..Self::bare(object.hash, UpdateKind::Add)
        }
    }

    pub fn set_transform(hash: ObjectHash, transform: Transform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::bare(hash, UpdateKind::Update)
        }
    }

    pub fn run_action(hash: ObjectHash, action: ObjectAction) -> Self {
        Self {
            action: Some(action),
            ..Self::bare(hash, UpdateKind::Update)
        }
    }

    pub fn delete(hash: ObjectHash) -> Self {
        Self::bare(hash, UpdateKind::Delete)
    }

    /// Checks the per-kind shape rules and transform sanity.
    pub fn validate(&self) -> WireResult<()> {
        if self.magic != UPDATE_MAGIC {
            return Err(WireError::BadMagic {
                expected: UPDATE_MAGIC,
                found: self.magic,
            });
        }
        match self.kind {
            UpdateKind::Add => {
                if self.object_type.is_none() || self.transform.is_none() || self.origin.is_none()
                {
                    return Err(WireError::InvalidShape(
                        "add requires object_type, transform and origin",
                    ));
                }
                if self.action.is_some() {
                    return Err(WireError::InvalidShape("add cannot carry an action"));
                }
            }
            UpdateKind::Update => {
                if self.action.is_none() && self.transform.is_none() {
                    return Err(WireError::InvalidShape(
                        "update requires an action or a transform",
                    ));
                }
                if self.object_type.is_some() || self.origin.is_some() {
                    return Err(WireError::InvalidShape("update cannot carry creation data"));
                }
            }
            UpdateKind::Delete => {
                if self.object_type.is_some()
                    || self.transform.is_some()
                    || self.origin.is_some()
                    || self.action.is_some()
                {
                    return Err(WireError::InvalidShape("delete carries the hash only"));
                }
            }
        }
        if let Some(transform) = &self.transform {
            transform.validate()?;
        }
        if let Some(origin) = &self.origin {
            origin.transform.validate()?;
        }
        Ok(())
    }

    pub fn encode(&self, limit: u64) -> WireResult<Vec<u8>> {
        self.validate()?;
        wire_options(limit)
            .serialize(self)
            .map_err(|err| WireError::Encode(err.to_string()))
    }

    pub fn decode(bytes: &[u8], limit: u64) -> WireResult<Self> {
        check_len(bytes, limit)?;
        let update: Self = wire_options(limit)
            .deserialize(bytes)
            .map_err(|err| WireError::Decode(err.to_string()))?;
        update.validate()?;
        Ok(update)
    }
}
