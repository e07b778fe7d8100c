//! Queue-backed implementation of the core ports for the Flutter host.
//!
//! # Responsibility
//! - Buffer outbound payloads and scene effects until Dart drains them.
//! - Hold the most recent platform world map handed over for sharing.
//!
//! # Invariants
//! - Effects are drained in the order the session produced them.
//! - Nothing here blocks on Dart; the host pulls.

use parking_lot::Mutex;
use roomshare_core::{
    Appearance, ObjectHash, PeerTransport, PlacedObject, SceneRenderer, ScreenPoint,
    TrackingSession, TrackingSnapshot, Transform, WorldMappingStatus,
};

/// Scene or tracking effect the host must perform.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostEffect {
    Materialize {
        hash: ObjectHash,
        object_type: String,
        transform: Transform,
        fade_in_ms: u32,
    },
    SetTransform {
        hash: ObjectHash,
        transform: Transform,
    },
    Detach {
        hash: ObjectHash,
    },
    AdoptWorldMap {
        platform_map: Vec<u8>,
    },
}

#[derive(Default)]
pub(crate) struct HostBridge {
    outbound: Mutex<Vec<Vec<u8>>>,
    effects: Mutex<Vec<HostEffect>>,
    mapping: Mutex<WorldMappingStatus>,
    platform_map: Mutex<Option<Vec<u8>>>,
}

impl HostBridge {
    pub(crate) fn take_outbound(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.outbound.lock())
    }

    pub(crate) fn take_effects(&self) -> Vec<HostEffect> {
        std::mem::take(&mut *self.effects.lock())
    }

    pub(crate) fn set_mapping(&self, mapping: WorldMappingStatus) {
        *self.mapping.lock() = mapping;
    }

    /// Stages the platform archive returned by the host's map capture.
    pub(crate) fn stage_platform_map(&self, platform_map: Vec<u8>) {
        *self.platform_map.lock() = Some(platform_map);
    }

    fn push(&self, effect: HostEffect) {
        self.effects.lock().push(effect);
    }
}

impl PeerTransport for HostBridge {
    fn broadcast(&self, payload: &[u8]) {
        self.outbound.lock().push(payload.to_vec());
    }
}

impl SceneRenderer for HostBridge {
    // Dart performs hit tests itself and passes the resolved transform in.
    fn hit_test_surface(&self, _point: ScreenPoint) -> Option<Transform> {
        None
    }

    fn hit_test_object(&self, _point: ScreenPoint) -> Option<ObjectHash> {
        None
    }

    fn materialize(&self, object: &PlacedObject, appearance: Appearance) {
        let fade_in_ms = match appearance {
            Appearance::Immediate => 0,
            Appearance::FadeIn { duration_ms } => duration_ms,
        };
        self.push(HostEffect::Materialize {
            hash: object.hash,
            object_type: object.object_type.clone(),
            transform: object.transform,
            fade_in_ms,
        });
    }

    fn set_transform(&self, hash: ObjectHash, transform: &Transform) {
        self.push(HostEffect::SetTransform {
            hash,
            transform: *transform,
        });
    }

    fn detach(&self, hash: ObjectHash) {
        self.push(HostEffect::Detach { hash });
    }
}

impl TrackingSession for HostBridge {
    fn capture_snapshot(&self) -> Result<TrackingSnapshot, String> {
        let platform_map = self
            .platform_map
            .lock()
            .take()
            .ok_or_else(|| "no world map was handed over by the host".to_string())?;
        Ok(TrackingSnapshot {
            mapping_status: *self.mapping.lock(),
            anchors: Vec::new(),
            platform_map,
        })
    }

    fn adopt_world_map(&self, snapshot: &TrackingSnapshot) {
        self.push(HostEffect::AdoptWorldMap {
            platform_map: snapshot.platform_map.clone(),
        });
    }
}
