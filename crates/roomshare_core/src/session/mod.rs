//! Per-device shared AR session.
//!
//! # Responsibility
//! - Own all protocol state behind one lock and serialize the three event
//!   sources: UI commands, AR anchor callbacks, inbound peer payloads.
//! - Talk to host collaborators only through the port traits.
//!
//! # Invariants
//! - Protocol state is never touched without holding the session lock.
//! - Broadcasts happen after the lock is released.

pub mod error;
pub mod ports;
pub mod shared_session;
