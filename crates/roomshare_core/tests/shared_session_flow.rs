mod common;

use common::{
    at, connect, deliver, Device, FakeTracking, RecordingRenderer, RecordingTransport,
    RenderEffect,
};
use roomshare_core::{
    Appearance, ApplyOutcome, ConfigError, ExchangeState, GestureCommand, IgnoreReason,
    InboundOutcome, LimitedReason, MapProvider, MapRejection, ObjectHash, PeerEvent, ScreenPoint,
    SessionConfig, SessionError, SessionPorts, SharedSession, TrackingSnapshot, TrackingState,
    WireError, WireResult, WorldMapCodec, WorldMappingStatus,
};
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn placed_object_follows_add_move_rotate_delete_on_peer() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);

    let hash = a.session.place_object("chair_1", at(0.0, -1.0)).unwrap();
    assert_eq!(
        deliver(&a, &b),
        vec![InboundOutcome::Object(ApplyOutcome::Materialized(hash))]
    );
    let remote = b.session.object(&hash).unwrap();
    assert_eq!(remote.object_type, "chair_1");
    assert_eq!(remote.transform, at(0.0, -1.0));
    assert_eq!(
        b.renderer.take(),
        vec![RenderEffect::Materialize(
            hash,
            Appearance::FadeIn { duration_ms: 200 }
        )]
    );

    a.session.move_object(hash, at(1.0, -1.0)).unwrap();
    assert_eq!(
        deliver(&a, &b),
        vec![InboundOutcome::Object(ApplyOutcome::Updated(hash))]
    );
    assert_eq!(b.session.object(&hash).unwrap().transform, at(1.0, -1.0));

    a.session.rotate_object(hash, FRAC_PI_2).unwrap();
    deliver(&a, &b);
    assert_eq!(
        b.session.object(&hash).unwrap().transform,
        a.session.object(&hash).unwrap().transform
    );

    a.session.delete_object(hash).unwrap();
    let delete_bytes = a.transport.take();
    assert_eq!(delete_bytes.len(), 1);
    assert_eq!(
        b.session.on_data_received(&delete_bytes[0], &a.id),
        InboundOutcome::Object(ApplyOutcome::Removed(hash))
    );
    assert_eq!(b.session.object_count(), 0);
    assert_eq!(a.session.object_count(), 0);

    // Redelivery of the same tombstone is a no-op.
    assert_eq!(
        b.session.on_data_received(&delete_bytes[0], &a.id),
        InboundOutcome::Object(ApplyOutcome::Ignored(IgnoreReason::UnknownReference))
    );
}

#[test]
fn duplicate_add_never_materializes_twice() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);

    let hash = a.session.place_object("lamp", at(0.5, 0.5)).unwrap();
    let add = a.transport.take().remove(0);

    b.session.on_data_received(&add, &a.id);
    let second = b.session.on_data_received(&add, &a.id);

    assert_eq!(
        second,
        InboundOutcome::Object(ApplyOutcome::Ignored(IgnoreReason::DuplicateAdd))
    );
    assert_eq!(b.session.object_count(), 1);
    assert_eq!(b.renderer.materialized(), 1);
    assert!(b.session.object(&hash).is_some());
}

#[test]
fn update_for_unknown_object_is_ignored() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);

    let hash = a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    a.transport.take();
    a.session.move_object(hash, at(2.0, 2.0)).unwrap();

    assert_eq!(
        deliver(&a, &b),
        vec![InboundOutcome::Object(ApplyOutcome::Ignored(
            IgnoreReason::UnknownReference
        ))]
    );
    assert_eq!(b.session.object_count(), 0);
    assert!(b.renderer.take().is_empty());
}

#[test]
fn connecting_peer_receives_replayed_objects() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    let c = Device::new("Cleo");
    connect(&a, &b);

    let first = a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    let second = a.session.place_object("table", at(1.0, 0.0)).unwrap();
    deliver(&a, &b);

    a.session.on_peer_event(PeerEvent::Connected {
        id: c.id.clone(),
        display_name: c.name.clone(),
    });
    let replay = a.transport.take();
    assert_eq!(replay.len(), 2);

    for bytes in &replay {
        assert!(matches!(
            b.session.on_data_received(bytes, &a.id),
            InboundOutcome::Object(ApplyOutcome::Ignored(IgnoreReason::DuplicateAdd))
        ));
        c.session.on_data_received(bytes, &a.id);
    }
    assert_eq!(b.session.object_count(), 2);
    assert_eq!(c.session.object_hashes(), vec![first, second]);
}

#[test]
fn replay_can_be_disabled() {
    let config = SessionConfig {
        replay_on_connect: false,
        ..SessionConfig::default()
    };
    let a = Device::with_config("Ana", config);
    let b = Device::new("Ben");

    a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    a.transport.take();
    connect(&a, &b);

    assert_eq!(a.transport.sent_len(), 0);
}

#[test]
fn first_received_map_wins() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    let c = Device::new("Cleo");
    connect(&a, &b);
    connect(&c, &b);
    b.transport.take();
    assert_eq!(b.session.exchange_state(), ExchangeState::MapRequested);

    for sharer in [&a, &c] {
        sharer
            .session
            .on_frame(TrackingState::Normal, WorldMappingStatus::Mapped);
        sharer.session.share_map().unwrap();
    }
    assert_eq!(a.session.map_provider(), Some(MapProvider::Local));

    assert_eq!(deliver(&a, &b), vec![InboundOutcome::MapAdopted]);
    assert_eq!(
        deliver(&c, &b),
        vec![InboundOutcome::MapRejected(
            MapRejection::ProviderAlreadySet
        )]
    );
    assert_eq!(b.tracking.adopted().len(), 1);
    assert_eq!(
        b.session
            .map_provider()
            .as_ref()
            .and_then(MapProvider::peer_display_name),
        Some("Ana")
    );
    assert_eq!(b.session.exchange_state(), ExchangeState::MapReceived);

    b.session.on_frame(
        TrackingState::Limited(LimitedReason::Relocalizing),
        WorldMappingStatus::Limited,
    );
    assert_eq!(b.session.status_message(), "Received map from Ana.");

    b.session
        .on_frame(TrackingState::Normal, WorldMappingStatus::Extending);
    assert_eq!(b.session.exchange_state(), ExchangeState::Active);
    assert_eq!(b.session.status_message(), "");
}

#[test]
fn map_is_not_adopted_over_local_anchors_by_default() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);
    b.discover_plane(1);

    a.session
        .on_frame(TrackingState::Normal, WorldMappingStatus::Mapped);
    a.session.share_map().unwrap();

    assert_eq!(
        deliver(&a, &b),
        vec![InboundOutcome::MapRejected(
            MapRejection::LocalMapNotEmpty
        )]
    );
    assert_eq!(b.session.plane_count(), 1);
    assert!(b.tracking.adopted().is_empty());
}

#[test]
fn adopting_over_local_map_drops_local_planes() {
    let config = SessionConfig {
        adopt_over_local_map: true,
        ..SessionConfig::default()
    };
    let a = Device::new("Ana");
    let b = Device::with_config("Ben", config);
    connect(&a, &b);
    b.discover_plane(1);
    b.discover_plane(2);

    a.session
        .on_frame(TrackingState::Normal, WorldMappingStatus::Extending);
    a.session.share_map().unwrap();

    assert_eq!(deliver(&a, &b), vec![InboundOutcome::MapAdopted]);
    assert_eq!(b.session.plane_count(), 0);
    assert_eq!(b.tracking.adopted().len(), 1);
}

#[test]
fn share_map_reports_why_it_cannot_share() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");

    assert_eq!(
        a.session.share_map(),
        Err(SessionError::MapNotReady(WorldMappingStatus::NotAvailable))
    );

    a.session
        .on_frame(TrackingState::Normal, WorldMappingStatus::Mapped);
    assert!(!a.session.can_share_map());
    assert_eq!(a.session.share_map(), Err(SessionError::NoPeers));

    connect(&a, &b);
    assert!(a.session.can_share_map());
    *a.tracking.fail_capture.lock() = true;
    assert!(matches!(
        a.session.share_map(),
        Err(SessionError::MapCapture(_))
    ));

    assert_eq!(a.transport.sent_len(), 0);
    assert_eq!(a.session.map_provider(), None);
}

#[test]
fn garbage_payload_is_dropped_without_state_change() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);
    a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    deliver(&a, &b);

    let outcome = b.session.on_data_received(b"definitely not a payload", &a.id);

    assert!(matches!(outcome, InboundOutcome::Dropped(_)));
    assert_eq!(b.session.object_count(), 1);
    assert_eq!(b.session.map_provider(), None);
}

#[test]
fn tap_to_place_uses_surface_hit_and_default_type() {
    let a = Device::new("Ana");

    assert_eq!(
        a.session.place_object_at(ScreenPoint::new(10.0, 20.0)),
        Err(SessionError::NoPlacementSurface)
    );

    *a.renderer.surface.lock() = Some(at(0.2, -0.8));
    let hash = a
        .session
        .execute(GestureCommand::PlaceAt(ScreenPoint::new(10.0, 20.0)))
        .unwrap();

    let object = a.session.object(&hash).unwrap();
    assert_eq!(object.object_type, "chair");
    assert_eq!(object.transform, at(0.2, -0.8));
    assert_eq!(a.session.selected(), Some(hash));
    assert_eq!(
        a.renderer.take(),
        vec![RenderEffect::Materialize(hash, Appearance::Immediate)]
    );
}

#[test]
fn selection_drives_delete() {
    let a = Device::new("Ana");
    let hash = a.session.place_object("chair", at(0.0, 0.0)).unwrap();

    *a.renderer.object_hit.lock() = None;
    assert_eq!(a.session.select_at(ScreenPoint::new(1.0, 1.0)), None);
    assert_eq!(
        a.session.delete_selected(),
        Err(SessionError::NothingSelected)
    );

    *a.renderer.object_hit.lock() = Some(hash);
    assert_eq!(a.session.select_at(ScreenPoint::new(1.0, 1.0)), Some(hash));
    assert_eq!(a.session.delete_selected(), Ok(hash));
    assert_eq!(a.session.selected(), None);
    assert_eq!(a.session.object_count(), 0);
}

#[test]
fn commands_on_unknown_objects_fail() {
    let a = Device::new("Ana");
    let missing = ObjectHash::from_u64(99);

    assert_eq!(
        a.session.execute(GestureCommand::DragTo {
            hash: missing,
            transform: at(1.0, 1.0),
        }),
        Err(SessionError::UnknownObject(missing))
    );
    assert_eq!(
        a.session.execute(GestureCommand::Delete(missing)),
        Err(SessionError::UnknownObject(missing))
    );
    assert_eq!(
        a.session.select(missing),
        Err(SessionError::UnknownObject(missing))
    );
    assert_eq!(a.transport.sent_len(), 0);
}

#[test]
fn remote_delete_clears_selection() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);
    let hash = a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    deliver(&a, &b);
    b.session.select(hash).unwrap();

    a.session.delete_object(hash).unwrap();
    deliver(&a, &b);

    assert_eq!(b.session.selected(), None);
    assert_eq!(b.renderer.take().last(), Some(&RenderEffect::Detach(hash)));
}

#[test]
fn status_message_tracks_connectivity() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");

    assert_eq!(a.session.status_message(), "Tracking unavailable.");

    a.session
        .on_frame(TrackingState::Normal, WorldMappingStatus::Limited);
    assert!(a
        .session
        .status_message()
        .starts_with("Move around to map the environment"));

    connect(&a, &b);
    assert_eq!(a.session.status_message(), "Connected with Ben.");

    a.session.on_peer_event(PeerEvent::Disconnected {
        id: b.id.clone(),
        display_name: b.name.clone(),
    });
    assert_eq!(a.session.connected_peer_count(), 0);
    assert_eq!(a.session.exchange_state(), ExchangeState::NoMap);
}

#[test]
fn reset_detaches_objects_and_forgets_provider() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);
    a.discover_plane(3);
    let first = a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    let second = a.session.place_object("chair", at(1.0, 0.0)).unwrap();
    a.session
        .on_frame(TrackingState::Normal, WorldMappingStatus::Mapped);
    a.session.share_map().unwrap();
    a.renderer.take();

    a.session.reset();

    assert_eq!(a.session.object_count(), 0);
    assert_eq!(a.session.plane_count(), 0);
    assert_eq!(a.session.map_provider(), None);
    assert_eq!(a.session.exchange_state(), ExchangeState::MapRequested);
    assert_eq!(
        a.renderer.take(),
        vec![RenderEffect::Detach(first), RenderEffect::Detach(second)]
    );
}

#[test]
fn invalid_config_is_rejected() {
    let config = SessionConfig {
        default_object_type: String::new(),
        ..SessionConfig::default()
    };
    let ports = SessionPorts::new(
        Arc::new(RecordingTransport::default()),
        Arc::new(RecordingRenderer::default()),
        Arc::new(FakeTracking::default()),
    );

    assert!(matches!(
        SharedSession::new(config, ports),
        Err(SessionError::Config(ConfigError::InvalidObjectType(_)))
    ));
}

#[test]
fn delete_is_not_overtaken_by_replay_in_flight() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    connect(&a, &b);
    let hash = a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    deliver(&a, &b);

    let (entered, release) = a.transport.hold_next_broadcast();
    thread::scope(|scope| {
        let joining = scope.spawn(|| {
            a.session.on_peer_event(PeerEvent::Connected {
                id: common::peer_id("Cleo"),
                display_name: "Cleo".to_string(),
            })
        });
        entered.recv().unwrap();

        let deleting = scope.spawn(|| a.session.delete_object(hash));
        thread::sleep(Duration::from_millis(50));
        release.send(()).unwrap();

        joining.join().unwrap();
        deleting.join().unwrap().unwrap();
    });

    assert_eq!(
        deliver(&a, &b),
        vec![
            InboundOutcome::Object(ApplyOutcome::Ignored(IgnoreReason::DuplicateAdd)),
            InboundOutcome::Object(ApplyOutcome::Removed(hash)),
        ]
    );
    assert_eq!(b.session.object_count(), 0);
}

#[test]
fn stale_replay_does_not_resurrect_deleted_object() {
    let a = Device::new("Ana");
    let b = Device::new("Ben");
    let c = Device::new("Cleo");
    connect(&a, &b);
    connect(&b, &c);
    let hash = a.session.place_object("chair", at(0.0, 0.0)).unwrap();
    let add = a.transport.take();
    for bytes in &add {
        b.session.on_data_received(bytes, &a.id);
        c.session.on_data_received(bytes, &a.id);
    }
    b.transport.take();

    b.session.delete_object(hash).unwrap();
    deliver(&b, &c);
    assert_eq!(c.session.object_count(), 0);

    // Ana missed the delete and replays her copy when Cleo connects.
    connect(&a, &c);
    assert_eq!(
        deliver(&a, &c),
        vec![InboundOutcome::Object(ApplyOutcome::Ignored(
            IgnoreReason::AlreadyDeleted
        ))]
    );
    assert_eq!(c.session.object_count(), 0);
    assert_eq!(a.session.object_count(), 1);
}

/// Host archive format: a fixed prefix followed by the raw platform map.
struct PrefixedMapCodec;

const MAP_PREFIX: &[u8] = b"MAP:";

impl WorldMapCodec for PrefixedMapCodec {
    fn encode(&self, snapshot: &TrackingSnapshot) -> WireResult<Vec<u8>> {
        let mut bytes = MAP_PREFIX.to_vec();
        bytes.extend_from_slice(&snapshot.platform_map);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> WireResult<TrackingSnapshot> {
        let platform_map = bytes
            .strip_prefix(MAP_PREFIX)
            .ok_or_else(|| WireError::Decode("missing map prefix".to_string()))?;
        Ok(TrackingSnapshot {
            mapping_status: WorldMappingStatus::Mapped,
            anchors: Vec::new(),
            platform_map: platform_map.to_vec(),
        })
    }
}

#[test]
fn injected_map_codec_carries_the_world_map() {
    let a = Device::with_codec("Ana", Arc::new(PrefixedMapCodec));
    let b = Device::with_codec("Ben", Arc::new(PrefixedMapCodec));
    connect(&a, &b);
    a.session
        .on_frame(TrackingState::Normal, WorldMappingStatus::Mapped);
    a.session.share_map().unwrap();

    let sent = a.transport.take();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with(MAP_PREFIX));

    assert_eq!(
        b.session.on_data_received(&sent[0], &a.id),
        InboundOutcome::MapAdopted
    );
    let adopted = b.tracking.adopted();
    assert_eq!(adopted.len(), 1);
    assert_eq!(adopted[0].platform_map, vec![0xAB; 64]);
}

#[test]
fn payload_rejected_by_map_codec_is_tried_as_update() {
    let a = Device::new("Ana");
    let b = Device::with_codec("Ben", Arc::new(PrefixedMapCodec));
    connect(&a, &b);
    let hash = a.session.place_object("chair", at(0.0, 0.0)).unwrap();

    assert_eq!(
        deliver(&a, &b),
        vec![InboundOutcome::Object(ApplyOutcome::Materialized(hash))]
    );
    assert!(b.tracking.adopted().is_empty());
}
