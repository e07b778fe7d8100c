//! Inbound payload classification by trial decode.
//!
//! The envelope is not self-describing: each broadcast is either a world map
//! or an object update, and the receiver finds out which by attempting the
//! map schema first and the update schema second. The first success wins.

use super::update::ObjectUpdate;
use super::world_map::{TrackingSnapshot, WorldMapCodec};
use super::{check_len, WireError, WireResult};

#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    WorldMap(TrackingSnapshot),
    Update(ObjectUpdate),
}

/// Classifies one received blob.
///
/// # Errors
/// - `PayloadTooLarge` when `bytes` exceeds `limit`.
/// - `Unrecognized` when neither schema accepts the blob.
pub fn decode_payload(
    bytes: &[u8],
    map_codec: &dyn WorldMapCodec,
    limit: u64,
) -> WireResult<InboundPayload> {
    check_len(bytes, limit)?;

    let map_error = match map_codec.decode(bytes) {
        Ok(snapshot) => return Ok(InboundPayload::WorldMap(snapshot)),
        Err(err) => err,
    };

    match ObjectUpdate::decode(bytes, limit) {
        Ok(update) => Ok(InboundPayload::Update(update)),
        Err(update_error) => Err(WireError::Unrecognized {
            map_error: map_error.to_string(),
            update_error: update_error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_payload, InboundPayload};
    use crate::model::object::ObjectHash;
    use crate::model::tracking::WorldMappingStatus;
    use crate::wire::update::ObjectUpdate;
    use crate::wire::world_map::{BincodeWorldMapCodec, TrackingSnapshot, WorldMapCodec};
    use crate::wire::{WireError, DEFAULT_MAX_PAYLOAD_BYTES};

    #[test]
    fn map_blob_is_classified_as_world_map() {
        let codec = BincodeWorldMapCodec::default();
        let snapshot = TrackingSnapshot {
            mapping_status: WorldMappingStatus::Extending,
            anchors: Vec::new(),
            platform_map: vec![7; 32],
        };
        let bytes = codec.encode(&snapshot).unwrap();
        assert_eq!(
            decode_payload(&bytes, &codec, DEFAULT_MAX_PAYLOAD_BYTES).unwrap(),
            InboundPayload::WorldMap(snapshot)
        );
    }

    #[test]
    fn update_blob_falls_through_to_update_schema() {
        let codec = BincodeWorldMapCodec::default();
        let update = ObjectUpdate::delete(ObjectHash::from_u64(77));
        let bytes = update.encode(DEFAULT_MAX_PAYLOAD_BYTES).unwrap();
        assert_eq!(
            decode_payload(&bytes, &codec, DEFAULT_MAX_PAYLOAD_BYTES).unwrap(),
            InboundPayload::Update(update)
        );
    }

    #[test]
    fn unknown_blob_is_unrecognized() {
        let codec = BincodeWorldMapCodec::default();
        let err = decode_payload(b"definitely not ours", &codec, DEFAULT_MAX_PAYLOAD_BYTES)
            .unwrap_err();
        assert!(matches!(err, WireError::Unrecognized { .. }));
    }
}
