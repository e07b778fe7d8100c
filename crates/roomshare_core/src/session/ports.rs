//! Capability interfaces implemented by the host shell.
//!
//! The core never touches scene-graph, camera or transport types directly;
//! hosts adapt their runtimes to these traits.

use crate::model::object::{ObjectHash, PlacedObject};
use crate::model::transform::Transform;
use crate::wire::world_map::TrackingSnapshot;

/// Point on the device screen, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// How a newly materialized object enters the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Immediate,
    /// Cosmetic fade-in; never networked.
    FadeIn { duration_ms: u32 },
}

/// Best-effort broadcast to every currently connected peer.
pub trait PeerTransport: Send + Sync {
    fn broadcast(&self, payload: &[u8]);
}

/// Rendering and hit-testing port of the scene graph engine.
pub trait SceneRenderer: Send + Sync {
    /// Pose on a detected surface under `point`, if any.
    fn hit_test_surface(&self, point: ScreenPoint) -> Option<Transform>;
    /// Placed object under `point`, if any.
    fn hit_test_object(&self, point: ScreenPoint) -> Option<ObjectHash>;
    fn materialize(&self, object: &PlacedObject, appearance: Appearance);
    fn set_transform(&self, hash: ObjectHash, transform: &Transform);
    fn detach(&self, hash: ObjectHash);
}

/// World tracking port of the AR subsystem.
pub trait TrackingSession: Send + Sync {
    /// Captures the current world map. Fails when the map is not ready.
    fn capture_snapshot(&self) -> Result<TrackingSnapshot, String>;
    /// Restarts tracking from `snapshot`, resetting tracking and removing
    /// existing anchors.
    fn adopt_world_map(&self, snapshot: &TrackingSnapshot);
}
