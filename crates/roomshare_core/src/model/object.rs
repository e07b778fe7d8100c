//! Placed virtual object and its cross-device content hash.
//!
//! # Responsibility
//! - Define the canonical record for one piece of furniture in the scene.
//! - Derive the network-visible identity key from creation-time data.
//!
//! # Invariants
//! - `hash == ObjectHash::compute(object_type, origin)` for every instance
//!   built through this module.
//! - The hash never depends on the current transform, clocks or memory
//!   addresses, so every device computes the same value from an Add message.
//!
//! # See also
//! - `crate::wire::update` for the Add/Update/Delete envelope.

use crate::model::transform::{Transform, TransformError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Upper bound for object type names carried on the wire.
pub const MAX_OBJECT_TYPE_BYTES: usize = 128;

const HASH_DOMAIN: &[u8] = b"roomshare.placed_object.v1";

/// Content hash used as the object's identity key across devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(u64);

impl ObjectHash {
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Derives the identity key from creation-time attributes.
    ///
    /// BLAKE3 over a domain tag, the length-prefixed type name, the canonical
    /// origin transform bits and the nonce; the first 8 digest bytes are read
    /// little-endian.
    pub fn compute(object_type: &str, origin: &ObjectOrigin) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_DOMAIN);
        hasher.update(&(object_type.len() as u32).to_le_bytes());
        hasher.update(object_type.as_bytes());
        for bits in origin.transform.canonical_bits() {
            hasher.update(&bits.to_le_bytes());
        }
        hasher.update(origin.nonce.as_bytes());

        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        Self(u64::from_le_bytes(head))
    }

    /// Parses the 16-digit hex form produced by `Display`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.len() > 16 {
            return None;
        }
        u64::from_str_radix(trimmed, 16).ok().map(Self)
    }
}

impl Display for ObjectHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Creation-time data that, together with the type name, fixes identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectOrigin {
    /// Transform at the moment of placement.
    pub transform: Transform,
    /// Random per-placement nonce so two chairs dropped on the same spot
    /// stay distinct.
    pub nonce: Uuid,
}

impl ObjectOrigin {
    /// Origin with a fresh random nonce.
    pub fn new(transform: Transform) -> Self {
        Self::with_nonce(transform, Uuid::new_v4())
    }

    pub fn with_nonce(transform: Transform, nonce: Uuid) -> Self {
        Self { transform, nonce }
    }
}

/// Validation and identity errors for placed objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    EmptyType,
    TypeTooLong { len: usize, max: usize },
    InvalidTransform(TransformError),
    /// The hash carried by a message does not match its type + origin.
    HashMismatch {
        claimed: ObjectHash,
        computed: ObjectHash,
    },
}

impl Display for ObjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyType => write!(f, "object type cannot be empty"),
            Self::TypeTooLong { len, max } => {
                write!(f, "object type is {len} bytes; at most {max} allowed")
            }
            Self::InvalidTransform(err) => write!(f, "{err}"),
            Self::HashMismatch { claimed, computed } => write!(
                f,
                "object hash {claimed} does not match computed hash {computed}"
            ),
        }
    }
}

impl Error for ObjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTransform(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransformError> for ObjectError {
    fn from(value: TransformError) -> Self {
        Self::InvalidTransform(value)
    }
}

/// One virtual asset instance in the shared scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub hash: ObjectHash,
    pub object_type: String,
    /// Current pose; mutated by drag/rotate and remote updates.
    pub transform: Transform,
    pub origin: ObjectOrigin,
}

impl PlacedObject {
    /// Places a new object at `transform` with a fresh creation nonce.
    pub fn new(object_type: impl Into<String>, transform: Transform) -> Result<Self, ObjectError> {
        Self::from_origin(object_type, ObjectOrigin::new(transform))
    }

    /// Builds an object whose current transform equals its origin.
    pub fn from_origin(
        object_type: impl Into<String>,
        origin: ObjectOrigin,
    ) -> Result<Self, ObjectError> {
        let object_type = object_type.into();
        validate_type(&object_type)?;
        origin.transform.validate()?;
        Ok(Self {
            hash: ObjectHash::compute(&object_type, &origin),
            object_type,
            transform: origin.transform,
            origin,
        })
    }

    /// Rebuilds an object received from a peer, checking its claimed hash.
    pub fn restore(
        claimed: ObjectHash,
        object_type: impl Into<String>,
        transform: Transform,
        origin: ObjectOrigin,
    ) -> Result<Self, ObjectError> {
        transform.validate()?;
        let mut object = Self::from_origin(object_type, origin)?;
        if object.hash != claimed {
            return Err(ObjectError::HashMismatch {
                claimed,
                computed: object.hash,
            });
        }
        object.transform = transform;
        Ok(object)
    }
}

fn validate_type(object_type: &str) -> Result<(), ObjectError> {
    if object_type.trim().is_empty() {
        return Err(ObjectError::EmptyType);
    }
    if object_type.len() > MAX_OBJECT_TYPE_BYTES {
        return Err(ObjectError::TypeTooLong {
            len: object_type.len(),
            max: MAX_OBJECT_TYPE_BYTES,
        });
    }
    Ok(())
}
