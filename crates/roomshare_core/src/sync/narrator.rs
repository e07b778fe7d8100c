//! Human-readable session status derived from tracking and connectivity.
//!
//! Pure function; it never mutates session state.

use crate::model::tracking::{LimitedReason, TrackingState};
use crate::sync::map_exchange::MapProvider;

/// Everything the status line depends on.
#[derive(Debug, Clone, Copy)]
pub struct NarratorInput<'a> {
    pub tracking: TrackingState,
    pub has_anchors: bool,
    /// Display names of connected peers, in display order.
    pub peer_names: &'a [String],
    pub map_provider: Option<&'a MapProvider>,
}

/// Returns the status message; empty when nothing needs saying.
pub fn narrate(input: &NarratorInput<'_>) -> String {
    let peer_provider = input.map_provider.and_then(MapProvider::peer_display_name);
    let has_peers = !input.peer_names.is_empty();

    match input.tracking {
        TrackingState::Normal if !input.has_anchors && !has_peers => {
            "Move around to map the environment, or wait to join a shared session.".to_string()
        }
        TrackingState::Normal if has_peers && input.map_provider.is_none() => {
            format!("Connected with {}.", input.peer_names.join(", "))
        }
        TrackingState::NotAvailable => "Tracking unavailable.".to_string(),
        TrackingState::Limited(LimitedReason::ExcessiveMotion) => {
            "Tracking limited - Move the device more slowly.".to_string()
        }
        TrackingState::Limited(LimitedReason::InsufficientFeatures) => {
            "Tracking limited - Point the device at an area with visible surface detail, or improve lighting conditions."
                .to_string()
        }
        TrackingState::Limited(LimitedReason::Initializing | LimitedReason::Relocalizing)
            if peer_provider.is_some() =>
        {
            format!("Received map from {}.", peer_provider.unwrap_or_default())
        }
        TrackingState::Limited(LimitedReason::Relocalizing) => {
            "Resuming session \u{2014} move to where you were when the session was interrupted."
                .to_string()
        }
        TrackingState::Limited(LimitedReason::Initializing) => {
            "Initializing AR session.".to_string()
        }
        TrackingState::Normal => String::new(),
    }
}
