//! Shared AR session: the per-device protocol context.
//!
//! # Responsibility
//! - Route AR anchor callbacks into the anchor registry.
//! - Route peer connectivity and inbound payloads into map exchange and the
//!   object update protocol.
//! - Turn UI commands into local mutations plus broadcasts.
//!
//! # Invariants
//! - All state lives in one `SessionState` behind one mutex, so a network
//!   delete and a local drag on the same hash never interleave.
//! - Map capture and map adoption run with the state lock released.
//! - Outbound payloads leave in the order their state changes were made: the
//!   send lock is taken before the state lock is released and is held
//!   through `PeerTransport::broadcast`. A transport must therefore not call
//!   back into the session synchronously from `broadcast`.
//! - Last-applied-wins; nothing here merges concurrent edits.

use crate::anchor::registry::{AnchorChange, AnchorEvent, SpatialAnchorRegistry};
use crate::config::SessionConfig;
use crate::logging::sanitize_field;
use crate::model::object::{ObjectHash, PlacedObject};
use crate::model::peer::{PeerConnection, PeerEvent, PeerId};
use crate::model::tracking::{TrackingState, WorldMappingStatus};
use crate::model::transform::Transform;
use crate::session::error::{SessionError, SessionResult};
use crate::session::ports::{Appearance, PeerTransport, SceneRenderer, ScreenPoint, TrackingSession};
use crate::sync::map_exchange::{ExchangeState, MapProvider, MapRejection, WorldMapExchange};
use crate::sync::narrator::{narrate, NarratorInput};
use crate::sync::update_protocol::{ApplyOutcome, ObjectUpdateProtocol};
use crate::wire::payload::{decode_payload, InboundPayload};
use crate::wire::update::ObjectUpdate;
use crate::wire::world_map::{BincodeWorldMapCodec, TrackingSnapshot, WorldMapCodec};
use crate::wire::WireError;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Host collaborators injected into a session.
#[derive(Clone)]
pub struct SessionPorts {
    pub transport: Arc<dyn PeerTransport>,
    pub renderer: Arc<dyn SceneRenderer>,
    pub tracking: Arc<dyn TrackingSession>,
    pub map_codec: Arc<dyn WorldMapCodec>,
}

impl SessionPorts {
    /// Ports with the default bincode world map codec.
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        renderer: Arc<dyn SceneRenderer>,
        tracking: Arc<dyn TrackingSession>,
    ) -> Self {
        Self {
            transport,
            renderer,
            tracking,
            map_codec: Arc::new(BincodeWorldMapCodec::default()),
        }
    }

    pub fn with_map_codec(mut self, map_codec: Arc<dyn WorldMapCodec>) -> Self {
        self.map_codec = map_codec;
        self
    }
}

/// Discrete UI command decoupled from gesture recognition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureCommand {
    PlaceAt(ScreenPoint),
    DragTo {
        hash: ObjectHash,
        transform: Transform,
    },
    RotateBy {
        hash: ObjectHash,
        yaw_radians: f32,
    },
    Delete(ObjectHash),
}

/// What happened to one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    MapAdopted,
    MapRejected(MapRejection),
    Object(ApplyOutcome),
    /// Matched neither schema.
    Dropped(WireError),
}

struct SessionState {
    anchors: SpatialAnchorRegistry,
    exchange: WorldMapExchange,
    protocol: ObjectUpdateProtocol,
    peers: BTreeMap<PeerId, PeerConnection>,
    selection: Option<ObjectHash>,
    tracking: TrackingState,
    mapping: WorldMappingStatus,
}

pub struct SharedSession {
    config: SessionConfig,
    ports: SessionPorts,
    state: Mutex<SessionState>,
    send_lock: Mutex<()>,
}

impl SharedSession {
    /// Starts a new session.
    ///
    /// # Errors
    /// - `SessionError::Config` when `config` fails validation.
    pub fn new(config: SessionConfig, ports: SessionPorts) -> SessionResult<Self> {
        config.validate()?;
        let state = SessionState {
            anchors: SpatialAnchorRegistry::new(),
            exchange: WorldMapExchange::new(),
            protocol: ObjectUpdateProtocol::new(config.coalesce_interval()),
            peers: BTreeMap::new(),
            selection: None,
            tracking: TrackingState::default(),
            mapping: WorldMappingStatus::default(),
        };
        info!(
            "event=session_start module=session status=ok coalesce_ms={} replay_on_connect={}",
            config.update_coalesce_interval_ms, config.replay_on_connect
        );
        Ok(Self {
            config,
            ports,
            state: Mutex::new(state),
            send_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ---- AR subsystem ----

    pub fn on_anchor_event(&self, event: AnchorEvent) -> AnchorChange {
        self.state.lock().anchors.apply(event)
    }

    /// Per-frame tracking update; also releases coalesced updates that are due.
    pub fn on_frame(&self, tracking: TrackingState, mapping: WorldMappingStatus) {
        let mut state = self.state.lock();
        if state.tracking != tracking {
            debug!(
                "event=tracking_changed module=session status=ok from={} to={}",
                state.tracking.label(),
                tracking.label()
            );
        }
        state.tracking = tracking;
        state.mapping = mapping;

        let before = state.exchange.state();
        state.exchange.on_tracking(tracking);
        if before != state.exchange.state() {
            info!(
                "event=exchange_state module=session status=ok from={:?} to={:?}",
                before,
                state.exchange.state()
            );
        }
        let due = state.protocol.take_due(Instant::now());
        let payloads = self.encode_updates(&due);
        self.send_in_order(state, payloads);
    }

    // ---- transport ----

    pub fn on_peer_event(&self, event: PeerEvent) {
        let mut state = self.state.lock();
        let replay = match event {
            PeerEvent::Connected { id, display_name } => {
                info!(
                    "event=peer_connected module=session status=ok peer={}",
                    sanitize_field(&display_name)
                );
                state
                    .peers
                    .insert(id.clone(), PeerConnection::connected(id, display_name));
                if self.config.replay_on_connect {
                    state.protocol.replay_adds()
                } else {
                    Vec::new()
                }
            }
            PeerEvent::Disconnected { id, display_name } => {
                info!(
                    "event=peer_disconnected module=session status=ok peer={}",
                    sanitize_field(&display_name)
                );
                state.peers.remove(&id);
                Vec::new()
            }
        };
        let connected = state.peers.len();
        state.exchange.on_peers_changed(connected);
        let payloads = self.encode_updates(&replay);
        self.send_in_order(state, payloads);
    }

    /// Classifies and applies one payload received from `from`.
    pub fn on_data_received(&self, bytes: &[u8], from: &PeerId) -> InboundOutcome {
        let payload = match decode_payload(
            bytes,
            self.ports.map_codec.as_ref(),
            self.config.max_payload_bytes,
        ) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    "event=payload_dropped module=session status=error peer={} bytes={} error={}",
                    sanitize_field(from.as_str()),
                    bytes.len(),
                    err
                );
                return InboundOutcome::Dropped(err);
            }
        };

        match payload {
            InboundPayload::WorldMap(snapshot) => self.receive_map(snapshot, from),
            InboundPayload::Update(update) => self.receive_update(&update),
        }
    }

    fn receive_map(&self, snapshot: TrackingSnapshot, from: &PeerId) -> InboundOutcome {
        {
            let mut state = self.state.lock();
            let sender = state
                .peers
                .get(from)
                .cloned()
                .unwrap_or_else(|| PeerConnection::connected(from.clone(), from.as_str()));
            let sender_name = sanitize_field(&sender.display_name);
            let local_map_empty = state.anchors.is_empty();

            if let Err(rejection) =
                state
                    .exchange
                    .offer_map(sender, local_map_empty, self.config.adopt_over_local_map)
            {
                info!(
                    "event=map_rejected module=session status=ignored peer={} reason={:?}",
                    sender_name, rejection
                );
                return InboundOutcome::MapRejected(rejection);
            }
            state.anchors.clear();
            info!(
                "event=map_adopted module=session status=ok peer={} anchors={} map_bytes={}",
                sender_name,
                snapshot.anchors.len(),
                snapshot.platform_map.len()
            );
        }
        self.ports.tracking.adopt_world_map(&snapshot);
        InboundOutcome::MapAdopted
    }

    fn receive_update(&self, update: &ObjectUpdate) -> InboundOutcome {
        let mut state = self.state.lock();
        let outcome = state.protocol.apply_remote(update);
        match outcome {
            ApplyOutcome::Materialized(hash) => {
                if let Some(object) = state.protocol.index().lookup(&hash) {
                    self.ports.renderer.materialize(
                        object,
                        Appearance::FadeIn {
                            duration_ms: self.config.appear_duration_ms,
                        },
                    );
                    info!(
                        "event=object_added module=session status=ok origin=remote hash={} type={}",
                        hash,
                        sanitize_field(&object.object_type)
                    );
                }
            }
            ApplyOutcome::Updated(hash) => {
                if let Some(object) = state.protocol.index().lookup(&hash) {
                    self.ports.renderer.set_transform(hash, &object.transform);
                }
            }
            ApplyOutcome::Removed(hash) => {
                self.ports.renderer.detach(hash);
                if state.selection == Some(hash) {
                    state.selection = None;
                }
                info!(
                    "event=object_removed module=session status=ok origin=remote hash={}",
                    hash
                );
            }
            ApplyOutcome::Ignored(reason) => {
                debug!(
                    "event=update_ignored module=session status=ignored hash={} kind={:?} reason={:?}",
                    update.hash, update.kind, reason
                );
            }
        }
        InboundOutcome::Object(outcome)
    }

    // ---- UI commands ----

    pub fn execute(&self, command: GestureCommand) -> SessionResult<ObjectHash> {
        match command {
            GestureCommand::PlaceAt(point) => self.place_object_at(point),
            GestureCommand::DragTo { hash, transform } => {
                self.move_object(hash, transform)?;
                Ok(hash)
            }
            GestureCommand::RotateBy { hash, yaw_radians } => {
                self.rotate_object(hash, yaw_radians)?;
                Ok(hash)
            }
            GestureCommand::Delete(hash) => {
                self.delete_object(hash)?;
                Ok(hash)
            }
        }
    }

    /// Tap-to-place of the configured default object type.
    pub fn place_object_at(&self, point: ScreenPoint) -> SessionResult<ObjectHash> {
        let transform = self
            .ports
            .renderer
            .hit_test_surface(point)
            .ok_or(SessionError::NoPlacementSurface)?;
        self.place_object(&self.config.default_object_type, transform)
    }

    /// Places `object_type` at `transform`, selects it and broadcasts an Add.
    pub fn place_object(&self, object_type: &str, transform: Transform) -> SessionResult<ObjectHash> {
        let object = PlacedObject::new(object_type, transform)?;
        let hash = object.hash;
        let mut state = self.state.lock();
        let update = state.protocol.place_local(object.clone())?;
        self.ports.renderer.materialize(&object, Appearance::Immediate);
        state.selection = Some(hash);
        info!(
            "event=object_added module=session status=ok origin=local hash={} type={}",
            hash,
            sanitize_field(object_type)
        );
        let payloads = self.encode_updates(&[update]);
        self.send_in_order(state, payloads);
        Ok(hash)
    }

    pub fn move_object(&self, hash: ObjectHash, transform: Transform) -> SessionResult<()> {
        let mut state = self.state.lock();
        let update = state.protocol.move_local(hash, transform, Instant::now())?;
        self.ports.renderer.set_transform(hash, &transform);
        let updates: Vec<ObjectUpdate> = update.into_iter().collect();
        let payloads = self.encode_updates(&updates);
        self.send_in_order(state, payloads);
        Ok(())
    }

    pub fn rotate_object(&self, hash: ObjectHash, yaw_radians: f32) -> SessionResult<()> {
        let mut state = self.state.lock();
        let update = state
            .protocol
            .rotate_local(hash, yaw_radians, Instant::now())?;
        if let Some(object) = state.protocol.index().lookup(&hash) {
            self.ports.renderer.set_transform(hash, &object.transform);
        }
        let updates: Vec<ObjectUpdate> = update.into_iter().collect();
        let payloads = self.encode_updates(&updates);
        self.send_in_order(state, payloads);
        Ok(())
    }

    pub fn delete_object(&self, hash: ObjectHash) -> SessionResult<()> {
        let mut state = self.state.lock();
        let (_, update) = state.protocol.delete_local(hash)?;
        self.ports.renderer.detach(hash);
        if state.selection == Some(hash) {
            state.selection = None;
        }
        info!(
            "event=object_removed module=session status=ok origin=local hash={}",
            hash
        );
        let payloads = self.encode_updates(&[update]);
        self.send_in_order(state, payloads);
        Ok(())
    }

    /// Selects the object under `point`, or clears selection when none.
    pub fn select_at(&self, point: ScreenPoint) -> Option<ObjectHash> {
        let hit = self.ports.renderer.hit_test_object(point);
        let mut state = self.state.lock();
        let selection = hit.filter(|hash| state.protocol.index().contains(hash));
        state.selection = selection;
        selection
    }

    pub fn select(&self, hash: ObjectHash) -> SessionResult<()> {
        let mut state = self.state.lock();
        if !state.protocol.index().contains(&hash) {
            return Err(SessionError::UnknownObject(hash));
        }
        state.selection = Some(hash);
        Ok(())
    }

    pub fn selected(&self) -> Option<ObjectHash> {
        self.state.lock().selection
    }

    pub fn delete_selected(&self) -> SessionResult<ObjectHash> {
        let hash = self.selected().ok_or(SessionError::NothingSelected)?;
        self.delete_object(hash)?;
        Ok(hash)
    }

    /// Sends every held-back transform update now. Returns how many were sent.
    pub fn flush_pending_updates(&self) -> usize {
        let mut state = self.state.lock();
        let pending = state.protocol.flush(Instant::now());
        let payloads = self.encode_updates(&pending);
        let count = payloads.len();
        self.send_in_order(state, payloads);
        count
    }

    // ---- world map ----

    pub fn can_share_map(&self) -> bool {
        let state = self.state.lock();
        state.exchange.can_share(state.mapping, state.peers.len())
    }

    /// Captures and broadcasts this device's world map to all peers.
    ///
    /// # Errors
    /// - `MapNotReady` / `NoPeers` when sharing is not possible yet.
    /// - `MapCapture` / `Encode` when the map cannot be produced; nothing is
    ///   broadcast in that case.
    pub fn share_map(&self) -> SessionResult<()> {
        let result = self.capture_and_encode_map();
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    "event=map_share module=session status=error error={}",
                    err
                );
                return Err(err);
            }
        };

        let mut state = self.state.lock();
        state.exchange.record_shared();
        info!(
            "event=map_share module=session status=ok bytes={}",
            bytes.len()
        );
        self.send_in_order(state, vec![bytes]);
        Ok(())
    }

    fn capture_and_encode_map(&self) -> SessionResult<Vec<u8>> {
        {
            let state = self.state.lock();
            if !state.mapping.allows_sharing() {
                return Err(SessionError::MapNotReady(state.mapping));
            }
            if state.peers.is_empty() {
                return Err(SessionError::NoPeers);
            }
        }
        let snapshot = self
            .ports
            .tracking
            .capture_snapshot()
            .map_err(SessionError::MapCapture)?;
        let bytes = self.ports.map_codec.encode(&snapshot)?;
        if bytes.len() as u64 > self.config.max_payload_bytes {
            return Err(SessionError::Encode(WireError::PayloadTooLarge {
                len: bytes.len(),
                limit: self.config.max_payload_bytes,
            }));
        }
        Ok(bytes)
    }

    // ---- status ----

    pub fn status_message(&self) -> String {
        let state = self.state.lock();
        let peer_names: Vec<String> = state
            .peers
            .values()
            .map(|peer| peer.display_name.clone())
            .collect();
        narrate(&NarratorInput {
            tracking: state.tracking,
            has_anchors: !state.anchors.is_empty(),
            peer_names: &peer_names,
            map_provider: state.exchange.provider(),
        })
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.state.lock().exchange.state()
    }

    pub fn map_provider(&self) -> Option<MapProvider> {
        self.state.lock().exchange.provider().cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().protocol.index().len()
    }

    pub fn object(&self, hash: &ObjectHash) -> Option<PlacedObject> {
        self.state.lock().protocol.index().lookup(hash).cloned()
    }

    pub fn object_hashes(&self) -> Vec<ObjectHash> {
        self.state.lock().protocol.index().hashes()
    }

    pub fn plane_count(&self) -> usize {
        self.state.lock().anchors.len()
    }

    pub fn connected_peer_count(&self) -> usize {
        self.state.lock().peers.len()
    }

    /// Begins a new session on the same device: objects are detached, planes
    /// and the map provider forgotten. Connected peers are kept.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        for object in state.protocol.clear() {
            self.ports.renderer.detach(object.hash);
        }
        state.anchors.clear();
        state.exchange.reset();
        state.selection = None;
        let connected = state.peers.len();
        state.exchange.on_peers_changed(connected);
        info!("event=session_reset module=session status=ok peers={}", connected);
    }

    fn encode_updates(&self, updates: &[ObjectUpdate]) -> Vec<Vec<u8>> {
        let mut payloads = Vec::with_capacity(updates.len());
        for update in updates {
            match update.encode(self.config.max_payload_bytes) {
                Ok(bytes) => {
                    debug!(
                        "event=update_broadcast module=session status=ok kind={:?} hash={} bytes={}",
                        update.kind,
                        update.hash,
                        bytes.len()
                    );
                    payloads.push(bytes);
                }
                Err(err) => error!(
                    "event=update_broadcast module=session status=error kind={:?} hash={} error={}",
                    update.kind, update.hash, err
                ),
            }
        }
        payloads
    }

    /// Hands `payloads` to the transport after releasing `state`, with the
    /// send lock taken first so no later state change can overtake them.
    fn send_in_order(&self, state: MutexGuard<'_, SessionState>, payloads: Vec<Vec<u8>>) {
        if payloads.is_empty() {
            return;
        }
        let _sending = self.send_lock.lock();
        drop(state);
        for bytes in &payloads {
            self.ports.transport.broadcast(bytes);
        }
    }
}
