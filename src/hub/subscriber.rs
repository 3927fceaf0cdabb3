//! Subscriber identity and per-subscriber state

use std::time::Instant;

use bytes::Bytes;

use super::ring::SampleRing;

/// Opaque handle to a hub subscription
///
/// Ids come from a monotonically increasing counter and are never reused, so a
/// stale id can only miss, never alias a newer subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(super) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Entry for a single subscriber in the hub
#[derive(Debug)]
pub struct Subscriber {
    pub id: SubscriberId,

    /// Most recent audio, at most one second
    pub(super) ring: SampleRing,

    /// When the subscription was created
    pub created_at: Instant,

    /// Frames handed out by `read`
    pub frames_delivered: u64,
}

impl Subscriber {
    pub(super) fn new(id: SubscriberId, capacity: usize) -> Self {
        Self {
            id,
            ring: SampleRing::with_capacity(capacity),
            created_at: Instant::now(),
            frames_delivered: 0,
        }
    }

    /// Append a slice; returns bytes evicted
    pub(super) fn append(&mut self, chunk: &[u8]) -> usize {
        self.ring.push(chunk)
    }

    /// Drain once a full frame has accumulated
    pub(super) fn take_frame(&mut self, frame_bytes: usize) -> Option<Bytes> {
        let frame = self.ring.drain_if_at_least(frame_bytes)?;
        self.frames_delivered += 1;
        Some(frame)
    }

    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    pub fn evicted(&self) -> u64 {
        self.ring.evicted()
    }
}
