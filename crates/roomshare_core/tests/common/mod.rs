//! In-memory ports and a two-device harness shared by integration tests.
#![allow(dead_code)]

use parking_lot::Mutex;
use roomshare_core::{
    AnchorEvent, AnchorSnapshot, Appearance, InboundOutcome, ObjectHash, PeerEvent, PeerId,
    PeerTransport, PlacedObject, PlaneGeometry, SceneRenderer, ScreenPoint, SessionConfig,
    SessionPorts, SharedSession, TrackingSession, TrackingSnapshot, Transform, WorldMapCodec,
    WorldMappingStatus,
};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use uuid::Uuid;

/// Held by a transport that parks its next broadcast until released.
struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    gate: Mutex<Option<Gate>>,
}

impl RecordingTransport {
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn sent_len(&self) -> usize {
        self.sent.lock().len()
    }

    /// Parks the next broadcast. The returned receiver fires once that
    /// broadcast has started; sending on the returned sender lets it finish.
    pub fn hold_next_broadcast(&self) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        *self.gate.lock() = Some(Gate {
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }
}

impl PeerTransport for RecordingTransport {
    fn broadcast(&self, payload: &[u8]) {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
        self.sent.lock().push(payload.to_vec());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderEffect {
    Materialize(ObjectHash, Appearance),
    SetTransform(ObjectHash, Transform),
    Detach(ObjectHash),
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub surface: Mutex<Option<Transform>>,
    pub object_hit: Mutex<Option<ObjectHash>>,
    effects: Mutex<Vec<RenderEffect>>,
}

impl RecordingRenderer {
    pub fn take(&self) -> Vec<RenderEffect> {
        std::mem::take(&mut *self.effects.lock())
    }

    pub fn materialized(&self) -> usize {
        self.effects
            .lock()
            .iter()
            .filter(|effect| matches!(effect, RenderEffect::Materialize(..)))
            .count()
    }
}

impl SceneRenderer for RecordingRenderer {
    fn hit_test_surface(&self, _point: ScreenPoint) -> Option<Transform> {
        *self.surface.lock()
    }

    fn hit_test_object(&self, _point: ScreenPoint) -> Option<ObjectHash> {
        *self.object_hit.lock()
    }

    fn materialize(&self, object: &PlacedObject, appearance: Appearance) {
        self.effects
            .lock()
            .push(RenderEffect::Materialize(object.hash, appearance));
    }

    fn set_transform(&self, hash: ObjectHash, transform: &Transform) {
        self.effects
            .lock()
            .push(RenderEffect::SetTransform(hash, *transform));
    }

    fn detach(&self, hash: ObjectHash) {
        self.effects.lock().push(RenderEffect::Detach(hash));
    }
}

#[derive(Default)]
pub struct FakeTracking {
    pub fail_capture: Mutex<bool>,
    adopted: Mutex<Vec<TrackingSnapshot>>,
}

impl FakeTracking {
    pub fn adopted(&self) -> Vec<TrackingSnapshot> {
        self.adopted.lock().clone()
    }
}

impl TrackingSession for FakeTracking {
    fn capture_snapshot(&self) -> Result<TrackingSnapshot, String> {
        if *self.fail_capture.lock() {
            return Err("world map unavailable".to_string());
        }
        Ok(TrackingSnapshot {
            mapping_status: WorldMappingStatus::Mapped,
            anchors: vec![AnchorSnapshot {
                id: Uuid::from_u128(7),
                transform: Transform::IDENTITY,
            }],
            platform_map: vec![0xAB; 64],
        })
    }

    fn adopt_world_map(&self, snapshot: &TrackingSnapshot) {
        self.adopted.lock().push(snapshot.clone());
    }
}

pub struct Device {
    pub id: PeerId,
    pub name: String,
    pub session: SharedSession,
    pub transport: Arc<RecordingTransport>,
    pub renderer: Arc<RecordingRenderer>,
    pub tracking: Arc<FakeTracking>,
}

pub fn peer_id(name: &str) -> PeerId {
    PeerId::new(format!("{name}-id"))
}

impl Device {
    pub fn new(name: &str) -> Self {
        Self::with_config(name, SessionConfig::default())
    }

    pub fn with_config(name: &str, config: SessionConfig) -> Self {
        Self::build(name, config, None)
    }

    pub fn with_codec(name: &str, codec: Arc<dyn WorldMapCodec>) -> Self {
        Self::build(name, SessionConfig::default(), Some(codec))
    }

    fn build(name: &str, config: SessionConfig, codec: Option<Arc<dyn WorldMapCodec>>) -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let renderer = Arc::new(RecordingRenderer::default());
        let tracking = Arc::new(FakeTracking::default());
        let mut ports = SessionPorts::new(transport.clone(), renderer.clone(), tracking.clone());
        if let Some(codec) = codec {
            ports = ports.with_map_codec(codec);
        }
        Self {
            id: peer_id(name),
            name: name.to_string(),
            session: SharedSession::new(config, ports).unwrap(),
            transport,
            renderer,
            tracking,
        }
    }

    pub fn discover_plane(&self, id: u128) {
        self.session.on_anchor_event(AnchorEvent::Discovered {
            id: Uuid::from_u128(id),
            geometry: plane_geometry(),
        });
    }
}

pub fn plane_geometry() -> PlaneGeometry {
    PlaneGeometry {
        transform: Transform::IDENTITY,
        center: [0.0, 0.0, 0.0],
        extent: [1.0, 2.0],
    }
}

pub fn at(x: f32, z: f32) -> Transform {
    Transform::from_position([x, 0.0, z]).unwrap()
}

/// Tells each device the other one connected.
pub fn connect(a: &Device, b: &Device) {
    a.session.on_peer_event(PeerEvent::Connected {
        id: b.id.clone(),
        display_name: b.name.clone(),
    });
    b.session.on_peer_event(PeerEvent::Connected {
        id: a.id.clone(),
        display_name: a.name.clone(),
    });
}

/// Delivers everything `from` broadcast so far to `to`.
pub fn deliver(from: &Device, to: &Device) -> Vec<InboundOutcome> {
    from.transport
        .take()
        .iter()
        .map(|bytes| to.session.on_data_received(bytes, &from.id))
        .collect()
}
