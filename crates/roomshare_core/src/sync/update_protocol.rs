//! Object update protocol: local mutations out, remote updates in.
//!
//! # Responsibility
//! - Turn local place/move/rotate/delete into `ObjectUpdate` messages.
//! - Apply decoded remote messages idempotently against the identity index.
//! - Throttle transform bursts through the `UpdateCoalescer`.
//!
//! # Invariants
//! - Applying the same message twice leaves the index as applying it once.
//! - An Add for a known hash never materializes a second object.
//! - Update/Delete for an unknown hash is a silent no-op.
//! - A deleted hash is remembered (up to `MAX_DELETED_OBJECTS`), so a replayed
//!   or late Add for it is ignored. A peer that missed the Delete still holds
//!   its copy and will not learn about the removal.
//! - Concurrent edits resolve as last-applied-wins; there is no merge.

use crate::index::identity_index::{IndexError, ObjectIdentityIndex};
use crate::index::tombstones::TombstoneSet;
use crate::model::object::{ObjectError, ObjectHash, PlacedObject};
use crate::model::transform::{Transform, TransformError};
use crate::sync::coalescer::UpdateCoalescer;
use crate::wire::update::{ObjectUpdate, UpdateKind};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Result of applying one remote message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Materialized(ObjectHash),
    Updated(ObjectHash),
    Removed(ObjectHash),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Add for a hash this device already holds.
    DuplicateAdd,
    /// Update/Delete for a hash this device does not hold.
    UnknownReference,
    /// Add whose hash does not match its carried creation data.
    HashMismatch,
    /// Add/Update whose payload is not a usable object or transform.
    InvalidPayload,
    /// Add for a hash this device has seen deleted.
    AlreadyDeleted,
}

/// Deleted object hashes remembered per session.
pub const MAX_DELETED_OBJECTS: usize = 4096;

/// Local mutation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    UnknownObject(ObjectHash),
    DuplicateObject(ObjectHash),
    InvalidTransform(TransformError),
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownObject(hash) => write!(f, "object not found: {hash}"),
            Self::DuplicateObject(hash) => write!(f, "object already placed: {hash}"),
            Self::InvalidTransform(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTransform(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransformError> for ProtocolError {
    fn from(value: TransformError) -> Self {
        Self::InvalidTransform(value)
    }
}

impl From<IndexError> for ProtocolError {
    fn from(value: IndexError) -> Self {
        match value {
            IndexError::DuplicateHash(hash) => Self::DuplicateObject(hash),
        }
    }
}

#[derive(Debug)]
pub struct ObjectUpdateProtocol {
    index: ObjectIdentityIndex,
    coalescer: UpdateCoalescer,
    deleted: TombstoneSet<ObjectHash>,
}

impl ObjectUpdateProtocol {
    pub fn new(coalesce_interval: Duration) -> Self {
        Self {
            index: ObjectIdentityIndex::new(),
            coalescer: UpdateCoalescer::new(coalesce_interval),
            deleted: TombstoneSet::new(MAX_DELETED_OBJECTS),
        }
    }

    pub fn index(&self) -> &ObjectIdentityIndex {
        &self.index
    }

    /// Applies one decoded remote message.
    ///
    /// Precedence: Add of an unknown, never-deleted hash materializes;
    /// Update of a known hash mutates in place; Delete of a known hash
    /// removes; anything else is dropped.
    pub fn apply_remote(&mut self, update: &ObjectUpdate) -> ApplyOutcome {
        let hash = update.hash;
        match update.kind {
            UpdateKind::Add if self.index.contains(&hash) => {
                ApplyOutcome::Ignored(IgnoreReason::DuplicateAdd)
            }
            UpdateKind::Add if self.deleted.contains(&hash) => {
                ApplyOutcome::Ignored(IgnoreReason::AlreadyDeleted)
            }
            UpdateKind::Add => self.materialize_remote(update),
            UpdateKind::Update => {
                let Some(object) = self.index.lookup_mut(&hash) else {
                    return ApplyOutcome::Ignored(IgnoreReason::UnknownReference);
                };
                let mut next = update.transform.unwrap_or(object.transform);
                if let Some(action) = &update.action {
                    next = match action.apply_to(&next) {
                        Ok(transform) => transform,
                        Err(_) => return ApplyOutcome::Ignored(IgnoreReason::InvalidPayload),
                    };
                }
                object.transform = next;
                // A remote edit supersedes any held-back local drag.
                self.coalescer.discard(&hash);
                ApplyOutcome::Updated(hash)
            }
            UpdateKind::Delete => match self.index.remove(&hash) {
                Some(_) => {
                    self.coalescer.discard(&hash);
                    self.deleted.insert(hash);
                    ApplyOutcome::Removed(hash)
                }
                None => ApplyOutcome::Ignored(IgnoreReason::UnknownReference),
            },
        }
    }

    fn materialize_remote(&mut self, update: &ObjectUpdate) -> ApplyOutcome {
        let (Some(object_type), Some(transform), Some(origin)) =
            (&update.object_type, update.transform, update.origin)
        else {
            return ApplyOutcome::Ignored(IgnoreReason::InvalidPayload);
        };
        let object = match PlacedObject::restore(update.hash, object_type.as_str(), transform, origin)
        {
            Ok(object) => object,
            Err(ObjectError::HashMismatch { claimed, computed }) => {
                debug!(
                    "event=object_add module=protocol status=ignored reason=hash_mismatch claimed={} computed={}",
                    claimed, computed
                );
                return ApplyOutcome::Ignored(IgnoreReason::HashMismatch);
            }
            Err(_) => return ApplyOutcome::Ignored(IgnoreReason::InvalidPayload),
        };
        match self.index.insert(object) {
            Ok(()) => ApplyOutcome::Materialized(update.hash),
            Err(IndexError::DuplicateHash(_)) => ApplyOutcome::Ignored(IgnoreReason::DuplicateAdd),
        }
    }

    /// Registers a locally placed object and returns its Add message.
    pub fn place_local(&mut self, object: PlacedObject) -> Result<ObjectUpdate, ProtocolError> {
        let update = ObjectUpdate::add(&object);
        self.index.insert(object)?;
        Ok(update)
    }

    /// Moves a local object; `None` means the update was held back.
    pub fn move_local(
        &mut self,
        hash: ObjectHash,
        transform: Transform,
        now: Instant,
    ) -> Result<Option<ObjectUpdate>, ProtocolError> {
        transform.validate()?;
        let object = self
            .index
            .lookup_mut(&hash)
            .ok_or(ProtocolError::UnknownObject(hash))?;
        object.transform = transform;
        Ok(self
            .coalescer
            .offer(hash, transform, now)
            .map(|transform| ObjectUpdate::set_transform(hash, transform)))
    }

    /// Rotates a local object about world up and sends the resulting pose.
    pub fn rotate_local(
        &mut self,
        hash: ObjectHash,
        yaw_radians: f32,
        now: Instant,
    ) -> Result<Option<ObjectUpdate>, ProtocolError> {
        let current = self
            .index
            .lookup(&hash)
            .ok_or(ProtocolError::UnknownObject(hash))?
            .transform;
        let rotated = current.rotated_by_yaw(yaw_radians)?;
        self.move_local(hash, rotated, now)
    }

    /// Removes a local object; returns it with the tombstone to broadcast.
    pub fn delete_local(
        &mut self,
        hash: ObjectHash,
    ) -> Result<(PlacedObject, ObjectUpdate), ProtocolError> {
        let object = self
            .index
            .remove(&hash)
            .ok_or(ProtocolError::UnknownObject(hash))?;
        self.coalescer.discard(&hash);
        self.deleted.insert(hash);
        Ok((object, ObjectUpdate::delete(hash)))
    }

    /// Held-back updates whose interval has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Vec<ObjectUpdate> {
        self.coalescer
            .take_due(now)
            .into_iter()
            .map(|(hash, transform)| ObjectUpdate::set_transform(hash, transform))
            .collect()
    }

    /// Every held-back update.
    pub fn flush(&mut self, now: Instant) -> Vec<ObjectUpdate> {
        self.coalescer
            .drain(now)
            .into_iter()
            .map(|(hash, transform)| ObjectUpdate::set_transform(hash, transform))
            .collect()
    }

    /// Add messages for every live object, in placement order.
    pub fn replay_adds(&self) -> Vec<ObjectUpdate> {
        self.index.iter().map(ObjectUpdate::add).collect()
    }

    /// Drops all objects, pending updates and delete memory, returning the
    /// removed objects.
    pub fn clear(&mut self) -> Vec<PlacedObject> {
        self.coalescer.clear();
        self.deleted.clear();
        self.index.clear()
    }
}
