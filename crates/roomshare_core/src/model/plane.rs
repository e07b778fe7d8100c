//! Detected flat surface owned by the spatial anchor registry.

use crate::model::transform::Transform;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned by the AR subsystem to a tracked anchor.
///
/// Opaque and unique within one device session.
pub type AnchorId = Uuid;

/// Geometry reported with an anchor discovered/updated callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneGeometry {
    /// Anchor pose in session coordinates.
    pub transform: Transform,
    /// Plane centre relative to the anchor.
    pub center: [f32; 3],
    /// Width (x) and length (z) in metres.
    pub extent: [f32; 2],
}

/// Local representation of one live plane anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualPlane {
    pub anchor_id: AnchorId,
    pub transform: Transform,
    pub center: [f32; 3],
    pub extent: [f32; 2],
}

impl VirtualPlane {
    pub fn new(anchor_id: AnchorId, geometry: PlaneGeometry) -> Self {
        Self {
            anchor_id,
            transform: geometry.transform,
            center: geometry.center,
            extent: geometry.extent,
        }
    }

    /// Replaces pose and bounds with a newer estimate for the same anchor.
    pub fn apply_geometry(&mut self, geometry: PlaneGeometry) {
        self.transform = geometry.transform;
        self.center = geometry.center;
        self.extent = geometry.extent;
    }
}
