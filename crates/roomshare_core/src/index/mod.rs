//! Object identity bookkeeping.
//!
//! # Responsibility
//! - Answer "is this message about an object I already hold".
//! - Remember recently removed ids so late messages cannot resurrect them.
//!
//! # Invariants
//! - At most one live `PlacedObject` per `ObjectHash` on this device.

pub mod identity_index;
pub mod tombstones;
