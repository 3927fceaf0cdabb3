//! Fixed-capacity overwrite buffer
//!
//! Each subscriber owns one ring sized to exactly one second of audio. When a
//! slice arrives and the ring is full, the oldest bytes are evicted to make
//! room, so a slow reader only ever sees the most recent second.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Byte ring with overwrite-oldest semantics
#[derive(Debug)]
pub struct SampleRing {
    /// Maximum number of buffered bytes
    capacity: usize,
    /// Buffered bytes, oldest first
    data: VecDeque<u8>,
    /// Total bytes evicted over the ring's lifetime
    evicted: u64,
}

impl SampleRing {
    /// Create an empty ring
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            data: VecDeque::with_capacity(capacity),
            evicted: 0,
        }
    }

    /// Append bytes, evicting the oldest ones if needed
    ///
    /// Returns the number of bytes evicted by this call. A slice longer than
    /// the capacity keeps only its tail.
    pub fn push(&mut self, chunk: &[u8]) -> usize {
        if self.capacity == 0 {
            return 0;
        }

        let mut dropped = 0;
        let chunk = if chunk.len() > self.capacity {
            let skip = chunk.len() - self.capacity;
            dropped += skip;
            &chunk[skip..]
        } else {
            chunk
        };

        let overflow = (self.data.len() + chunk.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.data.drain(..overflow);
            dropped += overflow;
        }

        self.data.extend(chunk);
        self.evicted += dropped as u64;
        dropped
    }

    /// Take the whole contents if at least `threshold` bytes are buffered
    ///
    /// Returns `None` (leaving the ring untouched) below the threshold.
    pub fn drain_if_at_least(&mut self, threshold: usize) -> Option<Bytes> {
        if self.data.len() < threshold {
            return None;
        }

        let (front, back) = self.data.as_slices();
        let mut out = BytesMut::with_capacity(self.data.len());
        out.extend_from_slice(front);
        out.extend_from_slice(back);
        self.data.clear();

        Some(out.freeze())
    }

    /// Copy of the buffered bytes, oldest first
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total bytes evicted since creation
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
