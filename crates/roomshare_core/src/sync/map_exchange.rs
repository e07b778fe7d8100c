//! World map exchange: which device is the coordinate authority.
//!
//! # Responsibility
//! - Track the exchange state and the single map provider of this session.
//! - Decide whether an incoming map is adopted or rejected.
//! - Gate map sharing on mapping quality and peer presence.
//!
//! # Invariants
//! - The provider is set at most once per session; only `reset` clears it.
//! - Once a provider exists every later map is rejected (first valid wins).
//! - `MapReceived`/`Active` always have a provider.

use crate::model::peer::PeerConnection;
use crate::model::tracking::{TrackingState, WorldMappingStatus};

/// Whose map defines this session's coordinate frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapProvider {
    /// This device shared its own map before adopting anyone else's.
    Local,
    /// Adopted from this peer.
    Peer(PeerConnection),
}

impl MapProvider {
    pub fn peer_display_name(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Peer(peer) => Some(peer.display_name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    NoMap,
    /// Peers are connected and this device waits for one of them to share.
    MapRequested,
    /// A peer map was adopted; tracking is relocalizing into it.
    MapReceived,
    /// Tracking runs in the shared frame.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapRejection {
    ProviderAlreadySet,
    LocalMapNotEmpty,
}

#[derive(Debug, Default)]
pub struct WorldMapExchange {
    state: ExchangeState,
    provider: Option<MapProvider>,
}

impl WorldMapExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn provider(&self) -> Option<&MapProvider> {
        self.provider.as_ref()
    }

    /// Moves between `NoMap` and `MapRequested` as peers come and go.
    pub fn on_peers_changed(&mut self, connected_peers: usize) {
        match (self.state, connected_peers) {
            (ExchangeState::NoMap, n) if n > 0 && self.provider.is_none() => {
                self.state = ExchangeState::MapRequested;
            }
            (ExchangeState::MapRequested, 0) => self.state = ExchangeState::NoMap,
            _ => {}
        }
    }

    /// Accepts `sender`'s map as the session authority, or says why not.
    ///
    /// On `Ok` the caller must reset tracking with the map and drop local
    /// anchors; the provider is already recorded.
    pub fn offer_map(
        &mut self,
        sender: PeerConnection,
        local_map_empty: bool,
        adopt_over_local_map: bool,
    ) -> Result<(), MapRejection> {
        if self.provider.is_some() {
            return Err(MapRejection::ProviderAlreadySet);
        }
        if !local_map_empty && !adopt_over_local_map {
            return Err(MapRejection::LocalMapNotEmpty);
        }
        self.provider = Some(MapProvider::Peer(sender));
        self.state = ExchangeState::MapReceived;
        Ok(())
    }

    /// `MapReceived -> Active` once tracking is normal in the adopted frame.
    pub fn on_tracking(&mut self, tracking: TrackingState) {
        if self.state == ExchangeState::MapReceived && tracking == TrackingState::Normal {
            self.state = ExchangeState::Active;
        }
    }

    pub fn can_share(&self, mapping: WorldMappingStatus, connected_peers: usize) -> bool {
        mapping.allows_sharing() && connected_peers > 0
    }

    /// Records a completed local share. The first sharer becomes the
    /// authority; a device that already follows a peer keeps that provider.
    pub fn record_shared(&mut self) {
        if self.provider.is_none() {
            self.provider = Some(MapProvider::Local);
            self.state = ExchangeState::Active;
        }
    }

    /// Starts a new session.
    pub fn reset(&mut self) {
        self.provider = None;
        self.state = ExchangeState::NoMap;
    }
}
