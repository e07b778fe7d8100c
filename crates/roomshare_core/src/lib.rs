//! Core protocol logic for RoomShare shared AR sessions.
//! This crate is the single source of truth for session invariants: object
//! identity, map authority and update application.

pub mod anchor;
pub mod config;
pub mod index;
pub mod logging;
pub mod model;
pub mod session;
pub mod sync;
pub mod wire;

pub use anchor::registry::{AnchorChange, AnchorEvent, SpatialAnchorRegistry};
pub use config::{ConfigError, SessionConfig};
pub use index::identity_index::{IndexError, ObjectIdentityIndex};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::object::{ObjectError, ObjectHash, ObjectOrigin, PlacedObject};
pub use model::peer::{PeerConnection, PeerEvent, PeerId};
pub use model::plane::{AnchorId, PlaneGeometry, VirtualPlane};
pub use model::tracking::{LimitedReason, TrackingState, WorldMappingStatus};
pub use model::transform::{Transform, TransformError};
pub use session::error::{SessionError, SessionResult};
pub use session::ports::{Appearance, PeerTransport, SceneRenderer, ScreenPoint, TrackingSession};
pub use session::shared_session::{GestureCommand, InboundOutcome, SessionPorts, SharedSession};
pub use sync::map_exchange::{ExchangeState, MapProvider, MapRejection, WorldMapExchange};
pub use sync::narrator::{narrate, NarratorInput};
pub use sync::update_protocol::{ApplyOutcome, IgnoreReason, ObjectUpdateProtocol, ProtocolError};
pub use wire::payload::{decode_payload, InboundPayload};
pub use wire::update::{ObjectAction, ObjectUpdate, UpdateKind};
pub use wire::world_map::{AnchorSnapshot, BincodeWorldMapCodec, TrackingSnapshot, WorldMapCodec};
pub use wire::{WireError, WireResult, DEFAULT_MAX_PAYLOAD_BYTES};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
