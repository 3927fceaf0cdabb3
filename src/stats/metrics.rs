//! Statistics for listener sessions and the hub

use std::time::{Duration, Instant};

/// Per-connection statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Header and audio bytes written
    pub bytes_sent: u64,
    /// One-second frames written
    pub frames_sent: u64,
    /// Empty polls while waiting for a full frame
    pub idle_polls: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            connected_at: Instant::now(),
            bytes_sent: 0,
            frames_sent: 0,
            idle_polls: 0,
        }
    }

    /// Record a written audio frame
    pub fn record_frame(&mut self, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Connection duration so far
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Average send rate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Hub-wide statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Slices passed to `append`
    pub chunks_appended: u64,
    /// Bytes passed to `append` (counted once, not per subscriber)
    pub bytes_appended: u64,
    /// Bytes discarded from full rings, summed across subscribers
    pub bytes_evicted: u64,
    /// Frames handed out by `read`
    pub frames_delivered: u64,
    /// Subscriptions ever created
    pub total_subscriptions: u64,
}
