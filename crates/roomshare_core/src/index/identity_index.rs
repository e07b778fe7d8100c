//! Content hash -> locally materialized object.
//!
//! # Responsibility
//! - Own every live `PlacedObject` on this device, keyed by content hash.
//! - Preserve placement order for replay and rendering.
//!
//! # Invariants
//! - `insert` never replaces an existing entry; duplicates are rejected.
//! - `order` holds exactly the keys of `objects`.

use crate::model::object::{ObjectHash, PlacedObject};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    DuplicateHash(ObjectHash),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateHash(hash) => write!(f, "object already indexed: {hash}"),
        }
    }
}

impl Error for IndexError {}

#[derive(Debug, Default)]
pub struct ObjectIdentityIndex {
    objects: HashMap<ObjectHash, PlacedObject>,
    order: Vec<ObjectHash>,
}

impl ObjectIdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, hash: &ObjectHash) -> Option<&PlacedObject> {
        self.objects.get(hash)
    }

    pub fn lookup_mut(&mut self, hash: &ObjectHash) -> Option<&mut PlacedObject> {
        self.objects.get_mut(hash)
    }

    pub fn contains(&self, hash: &ObjectHash) -> bool {
        self.objects.contains_key(hash)
    }

    /// Inserts under `object.hash`; an existing entry is left untouched.
    pub fn insert(&mut self, object: PlacedObject) -> Result<(), IndexError> {
        let hash = object.hash;
        if self.objects.contains_key(&hash) {
            return Err(IndexError::DuplicateHash(hash));
        }
        self.objects.insert(hash, object);
        self.order.push(hash);
        Ok(())
    }

    pub fn remove(&mut self, hash: &ObjectHash) -> Option<PlacedObject> {
        let removed = self.objects.remove(hash)?;
        self.order.retain(|existing| existing != hash);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Live objects in placement order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedObject> {
        self.order.iter().filter_map(|hash| self.objects.get(hash))
    }

    pub fn hashes(&self) -> Vec<ObjectHash> {
        self.order.clone()
    }

    /// Removes everything, returning objects in placement order.
    pub fn clear(&mut self) -> Vec<PlacedObject> {
        let order = std::mem::take(&mut self.order);
        let mut objects = std::mem::take(&mut self.objects);
        order
            .into_iter()
            .filter_map(|hash| objects.remove(&hash))
            .collect()
    }
}
