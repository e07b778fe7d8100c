//! Domain model for the shared AR session.
//!
//! # Responsibility
//! - Define the value types exchanged between registries, wire codec and
//!   session: transforms, planes, placed objects, peers, tracking state.
//!
//! # Invariants
//! - A `PlacedObject` hash depends only on its type and creation origin.
//! - Transforms reaching the model are finite.

pub mod object;
pub mod peer;
pub mod plane;
pub mod tracking;
pub mod transform;
