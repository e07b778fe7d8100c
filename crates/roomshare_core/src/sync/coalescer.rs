//! Per-object throttling of outbound transform updates.
//!
//! # Invariants
//! - A zero interval passes every update through unchanged.
//! - At most one pending transform per object; the newest replaces older ones.
//! - `discard` forgets an object entirely (deleted locally or remotely).

use crate::model::object::ObjectHash;
use crate::model::transform::Transform;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct UpdateCoalescer {
    interval: Duration,
    last_sent: HashMap<ObjectHash, Instant>,
    pending: BTreeMap<ObjectHash, Transform>,
}

impl UpdateCoalescer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: HashMap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Returns the transform to send now, or `None` when it was held back.
    pub fn offer(&mut self, hash: ObjectHash, transform: Transform, now: Instant) -> Option<Transform> {
        if !self.is_enabled() {
            return Some(transform);
        }
        if let Some(sent_at) = self.last_sent.get(&hash) {
            if now.saturating_duration_since(*sent_at) < self.interval {
                self.pending.insert(hash, transform);
                return None;
            }
        }
        self.pending.remove(&hash);
        self.last_sent.insert(hash, now);
        Some(transform)
    }

    /// Pending updates whose interval has elapsed by `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<(ObjectHash, Transform)> {
        let due: Vec<ObjectHash> = self
            .pending
            .keys()
            .filter(|hash| {
                self.last_sent
                    .get(hash)
                    .map_or(true, |sent_at| now.saturating_duration_since(*sent_at) >= self.interval)
            })
            .copied()
            .collect();
        self.release(due, now)
    }

    /// Every pending update regardless of age (gesture end, explicit flush).
    pub fn drain(&mut self, now: Instant) -> Vec<(ObjectHash, Transform)> {
        let all: Vec<ObjectHash> = self.pending.keys().copied().collect();
        self.release(all, now)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn discard(&mut self, hash: &ObjectHash) {
        self.pending.remove(hash);
        self.last_sent.remove(hash);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.last_sent.clear();
    }

    fn release(&mut self, hashes: Vec<ObjectHash>, now: Instant) -> Vec<(ObjectHash, Transform)> {
        let mut released = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(transform) = self.pending.remove(&hash) {
                self.last_sent.insert(hash, now);
                released.push((hash, transform));
            }
        }
        released
    }
}
