//! World map snapshot and its pluggable codec.
//!
//! # Responsibility
//! - Define the snapshot handed between the tracking collaborator and peers.
//! - Provide the default bincode codec; hosts with a platform archive format
//!   inject their own `WorldMapCodec`.
//!
//! # Invariants
//! - The protocol only observes codec success or failure; the snapshot's
//!   internals are opaque to it.

use super::{check_len, wire_options, WireError, WireResult};
use crate::model::plane::AnchorId;
use crate::model::tracking::WorldMappingStatus;
use crate::model::transform::Transform;
use bincode::Options;
use serde::{Deserialize, Serialize};

pub const WORLD_MAP_MAGIC: [u8; 4] = *b"RSM1";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorSnapshot {
    pub id: AnchorId,
    pub transform: Transform,
}

/// Device-captured spatial tracking state usable to re-anchor a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub mapping_status: WorldMappingStatus,
    pub anchors: Vec<AnchorSnapshot>,
    /// Platform archive of feature points; never interpreted here.
    pub platform_map: Vec<u8>,
}

/// Injected map serialization capability.
pub trait WorldMapCodec: Send + Sync {
    fn encode(&self, snapshot: &TrackingSnapshot) -> WireResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> WireResult<TrackingSnapshot>;
}

#[derive(Serialize)]
struct WorldMapEnvelopeRef<'a> {
    magic: [u8; 4],
    snapshot: &'a TrackingSnapshot,
}

#[derive(Deserialize)]
struct WorldMapEnvelope {
    magic: [u8; 4],
    snapshot: TrackingSnapshot,
}

/// Default codec: magic-prefixed bincode envelope.
#[derive(Debug, Clone, Copy)]
pub struct BincodeWorldMapCodec {
    limit: u64,
}

impl BincodeWorldMapCodec {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl Default for BincodeWorldMapCodec {
    fn default() -> Self {
        Self::new(super::DEFAULT_MAX_PAYLOAD_BYTES)
    }
}

impl WorldMapCodec for BincodeWorldMapCodec {
    fn encode(&self, snapshot: &TrackingSnapshot) -> WireResult<Vec<u8>> {
        let envelope = WorldMapEnvelopeRef {
            magic: WORLD_MAP_MAGIC,
            snapshot,
        };
        wire_options(self.limit)
            .serialize(&envelope)
            .map_err(|err| WireError::Encode(err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> WireResult<TrackingSnapshot> {
        check_len(bytes, self.limit)?;
        let envelope: WorldMapEnvelope = wire_options(self.limit)
            .deserialize(bytes)
            .map_err(|err| WireError::Decode(err.to_string()))?;
        if envelope.magic != WORLD_MAP_MAGIC {
            return Err(WireError::BadMagic {
                expected: WORLD_MAP_MAGIC,
                found: envelope.magic,
            });
        }
        for anchor in &envelope.snapshot.anchors {
            anchor.transform.validate()?;
        }
        Ok(envelope.snapshot)
    }
}
