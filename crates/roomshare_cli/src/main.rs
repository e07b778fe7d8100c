//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `roomshare_core` linkage.
//! - Run two sessions over an in-memory loopback and print what each
//!   device ends up holding.

use parking_lot::Mutex;
use roomshare_core::{
    Appearance, ObjectHash, PeerEvent, PeerId, PeerTransport, PlacedObject, SceneRenderer,
    ScreenPoint, SessionConfig, SessionPorts, SharedSession, TrackingSession, TrackingSnapshot,
    Transform,
};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Default)]
struct LoopbackPort {
    outbound: Mutex<Vec<Vec<u8>>>,
}

impl LoopbackPort {
    fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.outbound.lock())
    }
}

impl PeerTransport for LoopbackPort {
    fn broadcast(&self, payload: &[u8]) {
        self.outbound.lock().push(payload.to_vec());
    }
}

impl SceneRenderer for LoopbackPort {
    fn hit_test_surface(&self, _point: ScreenPoint) -> Option<Transform> {
        None
    }

    fn hit_test_object(&self, _point: ScreenPoint) -> Option<ObjectHash> {
        None
    }

    fn materialize(&self, object: &PlacedObject, _appearance: Appearance) {
        log::debug!("event=cli_materialize module=cli status=ok hash={}", object.hash);
    }

    fn set_transform(&self, _hash: ObjectHash, _transform: &Transform) {}

    fn detach(&self, _hash: ObjectHash) {}
}

impl TrackingSession for LoopbackPort {
    fn capture_snapshot(&self) -> Result<TrackingSnapshot, String> {
        Err("loopback devices have no world map".to_string())
    }

    fn adopt_world_map(&self, _snapshot: &TrackingSnapshot) {}
}

struct Device {
    id: PeerId,
    name: &'static str,
    port: Arc<LoopbackPort>,
    session: SharedSession,
}

impl Device {
    fn start(name: &'static str) -> Result<Self, String> {
        let port = Arc::new(LoopbackPort::default());
        let ports = SessionPorts::new(port.clone(), port.clone(), port.clone());
        let session =
            SharedSession::new(SessionConfig::default(), ports).map_err(|err| err.to_string())?;
        Ok(Self {
            id: PeerId::new(name.to_ascii_lowercase()),
            name,
            port,
            session,
        })
    }

    fn deliver_to(&self, other: &Device) {
        for payload in self.port.take() {
            other.session.on_data_received(&payload, &self.id);
        }
    }
}

fn main() -> ExitCode {
    println!("roomshare_core ping={}", roomshare_core::ping());
    println!("roomshare_core version={}", roomshare_core::core_version());

    match run_loopback() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("loopback failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_loopback() -> Result<(), String> {
    let ana = Device::start("Ana")?;
    let ben = Device::start("Ben")?;
    for (local, remote) in [(&ana, &ben), (&ben, &ana)] {
        local.session.on_peer_event(PeerEvent::Connected {
            id: remote.id.clone(),
            display_name: remote.name.to_string(),
        });
    }

    let origin = Transform::from_position([0.0, 0.0, -1.0]).map_err(|err| err.to_string())?;
    let hash = ana
        .session
        .place_object("chair_1", origin)
        .map_err(|err| err.to_string())?;
    ana.deliver_to(&ben);
    print_counts("place", &ana, &ben);

    let moved = origin
        .with_position([0.5, 0.0, -1.5])
        .map_err(|err| err.to_string())?;
    ana.session
        .move_object(hash, moved)
        .map_err(|err| err.to_string())?;
    ana.deliver_to(&ben);
    let synced = ben
        .session
        .object(&hash)
        .is_some_and(|object| object.transform == moved);
    println!("step=drag hash={hash} synced={synced}");

    ben.session
        .delete_object(hash)
        .map_err(|err| err.to_string())?;
    ben.deliver_to(&ana);
    print_counts("delete", &ana, &ben);
    Ok(())
}

fn print_counts(step: &str, ana: &Device, ben: &Device) {
    println!(
        "step={step} {}_objects={} {}_objects={}",
        ana.name,
        ana.session.object_count(),
        ben.name,
        ben.session.object_count()
    );
}
