//! Flutter-facing bindings for the RoomShare core.

pub mod api;
mod bridge;
