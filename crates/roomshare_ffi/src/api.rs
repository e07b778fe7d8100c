//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the shared-session use cases to Dart via FRB.
//! - Own the single per-process session and its queue-backed host bridge.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures come back as envelopes with `ok=false` and a message.
//! - Object hashes cross the boundary as 16-char lowercase hex strings;
//!   transforms as 16-float column-major matrices.

use crate::bridge::{HostBridge, HostEffect};
use log::{info, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use roomshare_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AnchorEvent, ApplyOutcome, BincodeWorldMapCodec, InboundOutcome, ObjectHash, PeerEvent, PeerId,
    PlaneGeometry, SessionConfig, SessionPorts, SharedSession, TrackingState, Transform, WorldMappingStatus,
};
use std::sync::Arc;
use uuid::Uuid;

static SESSION: Lazy<Mutex<Option<ActiveSession>>> = Lazy::new(|| Mutex::new(None));

struct ActiveSession {
    session: SharedSession,
    bridge: Arc<HostBridge>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Object the action touched, when any.
    pub object_hash: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            object_hash: None,
            message: message.into(),
        }
    }

    fn with_object(message: impl Into<String>, hash: ObjectHash) -> Self {
        Self {
            ok: true,
            object_hash: Some(hash.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            object_hash: None,
            message: message.into(),
        }
    }

    fn from_result(result: Result<Self, String>) -> Self {
        result.unwrap_or_else(Self::failure)
    }
}

/// Scene or tracking effect Dart must apply, drained in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCommand {
    /// `materialize|set_transform|detach|adopt_world_map`.
    pub kind: String,
    pub object_hash: Option<String>,
    pub object_type: Option<String>,
    /// Column-major 4x4 matrix; empty for `detach` and `adopt_world_map`.
    pub matrix: Vec<f32>,
    /// Fade-in for `materialize`; `0` means appear immediately.
    pub fade_in_ms: u32,
    /// Platform archive for `adopt_world_map`; empty otherwise.
    pub platform_map: Vec<u8>,
}

/// Starts (or replaces) the process-wide shared session.
///
/// Input semantics:
/// - `config_json`: optional `SessionConfig` JSON; missing fields default.
/// - `local_display_name`: this device's name, used in logs only.
#[flutter_rust_bridge::frb(sync)]
pub fn session_start(config_json: Option<String>, local_display_name: String) -> ActionResponse {
    let config = match parse_config(config_json.as_deref()) {
        Ok(config) => config,
        Err(err) => return ActionResponse::failure(format!("session_start failed: {err}")),
    };
    let bridge = Arc::new(HostBridge::default());
    let ports = SessionPorts::new(bridge.clone(), bridge.clone(), bridge.clone())
        .with_map_codec(Arc::new(BincodeWorldMapCodec::new(config.max_payload_bytes)));
    let session = match SharedSession::new(config, ports) {
        Ok(session) => session,
        Err(err) => return ActionResponse::failure(format!("session_start failed: {err}")),
    };

    let replaced = SESSION
        .lock()
        .replace(ActiveSession { session, bridge })
        .is_some();
    info!(
        "event=ffi_session_start module=ffi status=ok replaced={} device_name_len={}",
        replaced,
        local_display_name.chars().count()
    );
    ActionResponse::success("Session started.")
}

/// Clears objects, planes and map provider; keeps connected peers.
#[flutter_rust_bridge::frb(sync)]
pub fn session_reset() -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        active.session.reset();
        Ok(ActionResponse::success("Session reset."))
    }))
}

/// Forwards an AR plane-anchor discovery.
///
/// `matrix` is the anchor pose (16 floats), `center` the plane centre (3),
/// `extent` width and length in metres (2).
///
/// # FFI contract
/// - `ok=false` for a malformed id, wrong vector lengths, non-finite values
///   or a negative extent; the registry is not touched then.
/// - `message` is the registry change label, e.g. `Created` or `Refreshed`.
#[flutter_rust_bridge::frb(sync)]
pub fn anchor_discovered(
    anchor_id: String,
    matrix: Vec<f32>,
    center: Vec<f32>,
    extent: Vec<f32>,
) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let id = parse_anchor_id(&anchor_id)?;
        let geometry = parse_geometry(&matrix, &center, &extent)?;
        let change = active
            .session
            .on_anchor_event(AnchorEvent::Discovered { id, geometry });
        Ok(ActionResponse::success(format!("{change:?}")))
    }))
}

/// Forwards a refined pose or extent for a live anchor.
///
/// Takes the same geometry arguments as `anchor_discovered`.
///
/// # FFI contract
/// - Unknown or already removed anchors are reported as `Ignored`, not as
///   failures.
/// - `ok=false` only when the id or geometry cannot be parsed.
#[flutter_rust_bridge::frb(sync)]
pub fn anchor_updated(
    anchor_id: String,
    matrix: Vec<f32>,
    center: Vec<f32>,
    extent: Vec<f32>,
) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let id = parse_anchor_id(&anchor_id)?;
        let geometry = parse_geometry(&matrix, &center, &extent)?;
        let change = active
            .session
            .on_anchor_event(AnchorEvent::Updated { id, geometry });
        Ok(ActionResponse::success(format!("{change:?}")))
    }))
}

/// Forwards an anchor removal.
///
/// # FFI contract
/// - A removed id stays removed; later discoveries for it report `Ignored`.
#[flutter_rust_bridge::frb(sync)]
pub fn anchor_removed(anchor_id: String) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let id = parse_anchor_id(&anchor_id)?;
        let change = active.session.on_anchor_event(AnchorEvent::Removed { id });
        Ok(ActionResponse::success(format!("{change:?}")))
    }))
}

/// Registers a newly connected peer.
///
/// # FFI contract
/// - When replay on connect is enabled, Add payloads for every live object
///   are queued; drain them with `drain_outbound`.
#[flutter_rust_bridge::frb(sync)]
pub fn peer_connected(peer_id: String, display_name: String) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        active.session.on_peer_event(PeerEvent::Connected {
            id: PeerId::new(peer_id),
            display_name,
        });
        Ok(ActionResponse::success("Peer connected."))
    }))
}

/// Forgets a peer that left.
#[flutter_rust_bridge::frb(sync)]
pub fn peer_disconnected(peer_id: String, display_name: String) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        active.session.on_peer_event(PeerEvent::Disconnected {
            id: PeerId::new(peer_id),
            display_name,
        });
        Ok(ActionResponse::success("Peer disconnected."))
    }))
}

/// Hands one received payload to the session.
///
/// `message` is a stable outcome label such as `object_materialized`,
/// `map_adopted` or `dropped`; `ok=false` only for undecodable payloads.
#[flutter_rust_bridge::frb(sync)]
pub fn data_received(peer_id: String, payload: Vec<u8>) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let outcome = active
            .session
            .on_data_received(&payload, &PeerId::new(peer_id));
        Ok(inbound_response(&outcome))
    }))
}

/// Per-frame tracking labels, as produced by `TrackingState::label` and
/// `WorldMappingStatus::label`.
#[flutter_rust_bridge::frb(sync)]
pub fn frame_updated(tracking: String, mapping: String) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let tracking = TrackingState::from_label(&tracking)
            .ok_or_else(|| format!("unknown tracking state `{tracking}`"))?;
        let mapping = WorldMappingStatus::from_label(&mapping)
            .ok_or_else(|| format!("unknown mapping status `{mapping}`"))?;
        active.bridge.set_mapping(mapping);
        active.session.on_frame(tracking, mapping);
        Ok(ActionResponse::success(tracking.label()))
    }))
}

/// Places an object at a pose Dart resolved from its own surface hit test.
/// `object_type=None` uses the configured default type.
#[flutter_rust_bridge::frb(sync)]
pub fn place_object(object_type: Option<String>, matrix: Vec<f32>) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let transform = parse_matrix(&matrix)?;
        let object_type =
            object_type.unwrap_or_else(|| active.session.config().default_object_type.clone());
        let hash = active
            .session
            .place_object(object_type.trim(), transform)
            .map_err(|err| format!("place_object failed: {err}"))?;
        Ok(ActionResponse::with_object("Object placed.", hash))
    }))
}

/// Marks an object as the target of later drag, rotate and delete calls.
///
/// # FFI contract
/// - `object_hash` is the 16-char hex hash returned by `place_object`.
/// - `ok=false` for malformed or unknown hashes; selection is unchanged then.
#[flutter_rust_bridge::frb(sync)]
pub fn select_object(object_hash: String) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let hash = parse_hash(&object_hash)?;
        active
            .session
            .select(hash)
            .map_err(|err| format!("select_object failed: {err}"))?;
        Ok(ActionResponse::with_object("Object selected.", hash))
    }))
}

/// Moves the selected object to `position`, keeping its rotation.
#[flutter_rust_bridge::frb(sync)]
pub fn drag_selected(position: Vec<f32>) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let position = parse_vec3(&position)?;
        let hash = selected_hash(active)?;
        let current = active
            .session
            .object(&hash)
            .ok_or_else(|| format!("drag_selected failed: object not found: {hash}"))?;
        let transform = current
            .transform
            .with_position(position)
            .map_err(|err| format!("drag_selected failed: {err}"))?;
        active
            .session
            .move_object(hash, transform)
            .map_err(|err| format!("drag_selected failed: {err}"))?;
        Ok(ActionResponse::with_object("Object moved.", hash))
    }))
}

/// Rotates the selected object about world up by `yaw_radians`.
///
/// # FFI contract
/// - `ok=false` when nothing is selected or the result is not a valid pose.
#[flutter_rust_bridge::frb(sync)]
pub fn rotate_selected(yaw_radians: f32) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let hash = selected_hash(active)?;
        active
            .session
            .rotate_object(hash, yaw_radians)
            .map_err(|err| format!("rotate_selected failed: {err}"))?;
        Ok(ActionResponse::with_object("Object rotated.", hash))
    }))
}

/// Deletes the selected object and clears the selection.
///
/// # FFI contract
/// - `ok=false` when nothing is selected.
/// - On success `object_hash` names the deleted object.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_selected() -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        let hash = active
            .session
            .delete_selected()
            .map_err(|err| format!("delete_selected failed: {err}"))?;
        Ok(ActionResponse::with_object("Object deleted.", hash))
    }))
}

/// Shares the platform world map Dart just captured with every peer.
#[flutter_rust_bridge::frb(sync)]
pub fn share_map(platform_map: Vec<u8>) -> ActionResponse {
    ActionResponse::from_result(with_session(|active| {
        active.bridge.stage_platform_map(platform_map);
        active
            .session
            .share_map()
            .map_err(|err| format!("share_map failed: {err}"))?;
        Ok(ActionResponse::success("Map shared."))
    }))
}

/// Sends held-back transform updates; returns how many were queued.
#[flutter_rust_bridge::frb(sync)]
pub fn flush_pending_updates() -> u32 {
    with_session(|active| Ok(active.session.flush_pending_updates()))
        .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Current status line; empty when nothing needs saying or no session runs.
#[flutter_rust_bridge::frb(sync)]
pub fn status_message() -> String {
    with_session(|active| Ok(active.session.status_message())).unwrap_or_default()
}

/// Whether `share_map` would currently be accepted.
///
/// # FFI contract
/// - `false` when no session runs, the map is not yet mapped or extending,
///   or no peer is connected.
#[flutter_rust_bridge::frb(sync)]
pub fn can_share_map() -> bool {
    with_session(|active| Ok(active.session.can_share_map())).unwrap_or(false)
}

/// Payloads to broadcast to every connected peer, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn drain_outbound() -> Vec<Vec<u8>> {
    with_session(|active| Ok(active.bridge.take_outbound())).unwrap_or_default()
}

/// Scene and tracking effects to apply, in the order they were produced.
///
/// # FFI contract
/// - Each call returns only commands produced since the previous call.
/// - Empty when no session runs.
#[flutter_rust_bridge::frb(sync)]
pub fn drain_render_commands() -> Vec<RenderCommand> {
    with_session(|active| {
        Ok(active
            .bridge
            .take_effects()
            .into_iter()
            .map(to_render_command)
            .collect())
    })
    .unwrap_or_default()
}

fn with_session<T>(f: impl FnOnce(&ActiveSession) -> Result<T, String>) -> Result<T, String> {
    let guard = SESSION.lock();
    let active = guard.as_ref().ok_or_else(|| {
        warn!("event=ffi_call module=ffi status=error reason=no_session");
        "no active session; call session_start first".to_string()
    })?;
    f(active)
}

fn parse_config(config_json: Option<&str>) -> Result<SessionConfig, String> {
    match config_json.map(str::trim) {
        None | Some("") => Ok(SessionConfig::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|err| format!("invalid config: {err}")),
    }
}

fn selected_hash(active: &ActiveSession) -> Result<ObjectHash, String> {
    active
        .session
        .selected()
        .ok_or_else(|| "no object selected".to_string())
}

fn parse_anchor_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| format!("invalid anchor id `{raw}`: {err}"))
}

fn parse_hash(raw: &str) -> Result<ObjectHash, String> {
    ObjectHash::from_hex(raw.trim()).ok_or_else(|| format!("invalid object hash `{raw}`"))
}

fn parse_matrix(values: &[f32]) -> Result<Transform, String> {
    let matrix: &[f32; 16] = values
        .try_into()
        .map_err(|_| format!("matrix needs 16 floats, got {}", values.len()))?;
    Transform::from_matrix(matrix).map_err(|err| err.to_string())
}

fn parse_vec3(values: &[f32]) -> Result<[f32; 3], String> {
    values
        .try_into()
        .map_err(|_| format!("position needs 3 floats, got {}", values.len()))
}

fn parse_geometry(matrix: &[f32], center: &[f32], extent: &[f32]) -> Result<PlaneGeometry, String> {
    let extent: [f32; 2] = extent
        .try_into()
        .map_err(|_| format!("extent needs 2 floats, got {}", extent.len()))?;
    let center = parse_vec3(center)?;
    if !center.iter().chain(extent.iter()).all(|value| value.is_finite()) {
        return Err("plane center and extent must be finite".to_string());
    }
    if extent.iter().any(|value| *value < 0.0) {
        return Err("plane extent must not be negative".to_string());
    }
    Ok(PlaneGeometry {
        transform: parse_matrix(matrix)?,
        center,
        extent,
    })
}

fn inbound_response(outcome: &InboundOutcome) -> ActionResponse {
    match outcome {
        InboundOutcome::MapAdopted => ActionResponse::success("map_adopted"),
        InboundOutcome::MapRejected(reason) => {
            ActionResponse::success(format!("map_rejected:{reason:?}"))
        }
        InboundOutcome::Object(ApplyOutcome::Materialized(hash)) => {
            ActionResponse::with_object("object_materialized", *hash)
        }
        InboundOutcome::Object(ApplyOutcome::Updated(hash)) => {
            ActionResponse::with_object("object_updated", *hash)
        }
        InboundOutcome::Object(ApplyOutcome::Removed(hash)) => {
            ActionResponse::with_object("object_removed", *hash)
        }
        InboundOutcome::Object(ApplyOutcome::Ignored(reason)) => {
            ActionResponse::success(format!("ignored:{reason:?}"))
        }
        InboundOutcome::Dropped(_) => ActionResponse::failure("dropped"),
    }
}

fn to_render_command(effect: HostEffect) -> RenderCommand {
    let empty = RenderCommand {
        kind: String::new(),
        object_hash: None,
        object_type: None,
        matrix: Vec::new(),
        fade_in_ms: 0,
        platform_map: Vec::new(),
    };
    match effect {
        HostEffect::Materialize {
            hash,
            object_type,
            transform,
            fade_in_ms,
        } => RenderCommand {
            kind: "materialize".to_string(),
            object_hash: Some(hash.to_string()),
            object_type: Some(object_type),
            matrix: transform.to_matrix().to_vec(),
            fade_in_ms,
            ..empty
        },
        HostEffect::SetTransform { hash, transform } => RenderCommand {
            kind: "set_transform".to_string(),
            object_hash: Some(hash.to_string()),
            matrix: transform.to_matrix().to_vec(),
            ..empty
        },
        HostEffect::Detach { hash } => RenderCommand {
            kind: "detach".to_string(),
            object_hash: Some(hash.to_string()),
            ..empty
        },
        HostEffect::AdoptWorldMap { platform_map } => RenderCommand {
            kind: "adopt_world_map".to_string(),
            platform_map,
            ..empty
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        anchor_discovered, can_share_map, core_version, data_received, delete_selected,
        drag_selected, drain_outbound, drain_render_commands, frame_updated, init_logging,
        peer_connected, ping, place_object, select_object, session_start, share_map,
        status_message,
    };
    use parking_lot::Mutex;
    use roomshare_core::Transform;

    // The session is process-wide; tests touching it run one at a time.
    static SESSION_TEST_LOCK: Mutex<()> = parking_lot::const_mutex(());

    fn identity_matrix() -> Vec<f32> {
        Transform::IDENTITY.to_matrix().to_vec()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn session_start_rejects_bad_config() {
        let _guard = SESSION_TEST_LOCK.lock();
        let response = session_start(Some(r#"{"unknown": 1}"#.to_string()), "Ana".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("invalid config"));
    }

    #[test]
    fn place_drag_delete_produce_outbound_and_render_commands() {
        let _guard = SESSION_TEST_LOCK.lock();
        assert!(session_start(None, "Ana".to_string()).ok);
        assert!(peer_connected("ben".to_string(), "Ben".to_string()).ok);

        let placed = place_object(Some("chair".to_string()), identity_matrix());
        assert!(placed.ok, "{}", placed.message);
        let hash = placed.object_hash.clone().unwrap();

        let dragged = drag_selected(vec![0.5, 0.0, -1.0]);
        assert!(dragged.ok, "{}", dragged.message);
        assert!(select_object(hash.clone()).ok);
        assert!(delete_selected().ok);

        assert_eq!(drain_outbound().len(), 3);
        let kinds: Vec<String> = drain_render_commands()
            .into_iter()
            .map(|command| command.kind)
            .collect();
        assert_eq!(kinds, vec!["materialize", "set_transform", "detach"]);
        assert!(!delete_selected().ok);
    }

    #[test]
    fn payloads_round_trip_between_two_started_sessions() {
        let _guard = SESSION_TEST_LOCK.lock();
        assert!(session_start(None, "Ana".to_string()).ok);
        assert!(peer_connected("ben".to_string(), "Ben".to_string()).ok);
        let placed = place_object(None, identity_matrix());
        let outbound = drain_outbound();

        assert!(session_start(None, "Ben".to_string()).ok);
        let received = data_received("ana".to_string(), outbound[0].clone());
        assert!(received.ok);
        assert_eq!(received.message, "object_materialized");
        assert_eq!(received.object_hash, placed.object_hash);

        let commands = drain_render_commands();
        assert_eq!(commands[0].kind, "materialize");
        assert_eq!(commands[0].object_type.as_deref(), Some("chair"));
        assert_eq!(commands[0].fade_in_ms, 200);

        assert!(!data_received("ana".to_string(), vec![0, 1, 2]).ok);
    }

    #[test]
    fn share_map_needs_mapping_and_peers() {
        let _guard = SESSION_TEST_LOCK.lock();
        assert!(session_start(None, "Ana".to_string()).ok);
        assert!(!share_map(vec![9; 8]).ok);
        assert!(!frame_updated("sideways".to_string(), "mapped".to_string()).ok);

        assert!(frame_updated("normal".to_string(), "mapped".to_string()).ok);
        assert!(!can_share_map());
        assert!(peer_connected("ben".to_string(), "Ben".to_string()).ok);
        assert!(can_share_map());

        let shared = share_map(vec![9; 8]);
        assert!(shared.ok, "{}", shared.message);
        assert_eq!(drain_outbound().len(), 1);
        assert_eq!(status_message(), "");
    }

    #[test]
    fn anchor_geometry_must_be_finite() {
        let _guard = SESSION_TEST_LOCK.lock();
        assert!(session_start(None, "Ana".to_string()).ok);
        let anchor = "6f9619ff-8b86-d011-b42d-00cf4fc964ff".to_string();

        let bad_center = anchor_discovered(
            anchor.clone(),
            identity_matrix(),
            vec![0.0, f32::NAN, 0.0],
            vec![1.0, 1.0],
        );
        assert!(!bad_center.ok);
        assert!(bad_center.message.contains("finite"));

        let bad_extent = anchor_discovered(
            anchor.clone(),
            identity_matrix(),
            vec![0.0, 0.0, 0.0],
            vec![f32::INFINITY, 1.0],
        );
        assert!(!bad_extent.ok);

        let negative = anchor_discovered(
            anchor.clone(),
            identity_matrix(),
            vec![0.0, 0.0, 0.0],
            vec![-1.0, 1.0],
        );
        assert!(!negative.ok);

        let good = anchor_discovered(anchor, identity_matrix(), vec![0.0; 3], vec![1.0, 2.0]);
        assert!(good.ok, "{}", good.message);
        assert_eq!(good.message, "Created");
    }
}
