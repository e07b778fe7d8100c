//! Anchor id -> `VirtualPlane` registry.
//!
//! # Responsibility
//! - Apply discovered/updated/removed callbacks from the AR subsystem.
//!
//! # Invariants
//! - Unknown ids are ignored on update/remove; the AR subsystem is trusted.
//! - A removed id stays removed, so a late or duplicated callback cannot
//!   resurrect it. At most `MAX_REMOVED_ANCHORS` ids are remembered; past
//!   that the oldest removal is forgotten.
//! - `clear` forgets every removed id (map adoption, new session).

use crate::index::tombstones::TombstoneSet;
use crate::model::plane::{AnchorId, PlaneGeometry, VirtualPlane};
use log::debug;
use std::collections::HashMap;

/// Removed anchor ids remembered per session.
pub const MAX_REMOVED_ANCHORS: usize = 1024;

/// Callback delivered by the AR subsystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorEvent {
    Discovered {
        id: AnchorId,
        geometry: PlaneGeometry,
    },
    Updated {
        id: AnchorId,
        geometry: PlaneGeometry,
    },
    Removed {
        id: AnchorId,
    },
}

impl AnchorEvent {
    pub fn anchor_id(&self) -> AnchorId {
        match self {
            Self::Discovered { id, .. } | Self::Updated { id, .. } | Self::Removed { id } => *id,
        }
    }
}

/// Effect of one anchor event on the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorChange {
    Created,
    /// Discovered again while live; geometry replaced.
    Refreshed,
    Updated,
    Removed,
    Ignored,
}

#[derive(Debug)]
pub struct SpatialAnchorRegistry {
    planes: HashMap<AnchorId, VirtualPlane>,
    removed: TombstoneSet<AnchorId>,
}

impl Default for SpatialAnchorRegistry {
    fn default() -> Self {
        Self::with_removed_capacity(MAX_REMOVED_ANCHORS)
    }
}

impl SpatialAnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_removed_capacity(capacity: usize) -> Self {
        Self {
            planes: HashMap::new(),
            removed: TombstoneSet::new(capacity),
        }
    }

    /// Dispatches one AR callback.
    pub fn apply(&mut self, event: AnchorEvent) -> AnchorChange {
        let change = match event {
            AnchorEvent::Discovered { id, geometry } => self.on_anchor_discovered(id, geometry),
            AnchorEvent::Updated { id, geometry } => self.on_anchor_updated(id, geometry),
            AnchorEvent::Removed { id } => self.on_anchor_removed(id),
        };
        debug!(
            "event=anchor_event module=anchor status=ok anchor_id={} change={:?} live={}",
            event.anchor_id(),
            change,
            self.planes.len()
        );
        change
    }

    pub fn on_anchor_discovered(&mut self, id: AnchorId, geometry: PlaneGeometry) -> AnchorChange {
        if self.removed.contains(&id) {
            return AnchorChange::Ignored;
        }
        match self.planes.get_mut(&id) {
            Some(plane) => {
                plane.apply_geometry(geometry);
                AnchorChange::Refreshed
            }
            None => {
                self.planes.insert(id, VirtualPlane::new(id, geometry));
                AnchorChange::Created
            }
        }
    }

    pub fn on_anchor_updated(&mut self, id: AnchorId, geometry: PlaneGeometry) -> AnchorChange {
        match self.planes.get_mut(&id) {
            Some(plane) => {
                plane.apply_geometry(geometry);
                AnchorChange::Updated
            }
            None => AnchorChange::Ignored,
        }
    }

    pub fn on_anchor_removed(&mut self, id: AnchorId) -> AnchorChange {
        self.removed.insert(id);
        match self.planes.remove(&id) {
            Some(_) => AnchorChange::Removed,
            None => AnchorChange::Ignored,
        }
    }

    pub fn get(&self, id: &AnchorId) -> Option<&VirtualPlane> {
        self.planes.get(id)
    }

    pub fn contains(&self, id: &AnchorId) -> bool {
        self.planes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Drops every plane and the removed-id memory.
    pub fn clear(&mut self) {
        self.planes.clear();
        self.removed.clear();
    }
}
