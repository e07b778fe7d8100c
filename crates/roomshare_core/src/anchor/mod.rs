//! Spatial anchor bookkeeping fed by the AR subsystem.
//!
//! # Responsibility
//! - Mirror live plane anchors as local `VirtualPlane` records.
//!
//! # Invariants
//! - Exactly one plane per live anchor id.
//! - Anchor events are never broadcast to peers.

pub mod registry;
