//! Shared-session synchronization protocol.
//!
//! # Responsibility
//! - World map exchange and provider bookkeeping.
//! - Object add/update/delete propagation with update coalescing.
//! - Status narration for the UI.
//!
//! # Invariants
//! - No component here performs I/O; the session drives ports.

pub mod coalescer;
pub mod map_exchange;
pub mod narrator;
pub mod update_protocol;
