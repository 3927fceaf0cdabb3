//! Listener session state machine
//!
//! Tracks one HTTP listener from accept to close:
//!
//! ```text
//! Accepted → HeaderSent → Subscribed → Streaming → Unsubscribed
//!     │           │
//!     └───────────┴──────────────────────────────→ Closed
//! ```
//!
//! `Closed` is reached when the connection ends before a subscription
//! exists; a session that subscribed always ends in `Unsubscribed`.

use std::net::SocketAddr;

use crate::hub::SubscriberId;
use crate::stats::SessionStats;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP connected, request not yet answered
    Accepted,
    /// HTTP head and WAV header written
    HeaderSent,
    /// Registered with the hub
    Subscribed,
    /// Delivering audio frames
    Streaming,
    /// Ended without ever subscribing
    Closed,
    /// Subscription released
    Unsubscribed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Hub subscription, present between subscribe and unsubscribe
    subscriber: Option<SubscriberId>,

    /// Transfer statistics
    pub stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Accepted,
            subscriber: None,
            stats: SessionStats::new(),
        }
    }

    /// Record that the response head went out
    pub fn header_sent(&mut self, bytes: usize) {
        if self.phase == SessionPhase::Accepted {
            self.phase = SessionPhase::HeaderSent;
        }
        self.stats.bytes_sent += bytes as u64;
    }

    /// Record the hub subscription
    pub fn subscribed(&mut self, id: SubscriberId) {
        if self.phase == SessionPhase::HeaderSent {
            self.phase = SessionPhase::Subscribed;
            self.subscriber = Some(id);
        }
    }

    /// Enter the streaming loop
    pub fn start_streaming(&mut self) {
        if self.phase == SessionPhase::Subscribed {
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Current subscription, if any
    pub fn subscriber(&self) -> Option<SubscriberId> {
        self.subscriber
    }

    /// Hand out the subscription for release
    ///
    /// Returns the id only the first time, so the hub sees exactly one
    /// unsubscribe per session.
    pub fn take_subscription(&mut self) -> Option<SubscriberId> {
        let id = self.subscriber.take()?;
        self.phase = SessionPhase::Unsubscribed;
        Some(id)
    }

    /// Mark the session finished
    pub fn close(&mut self) {
        if self.subscriber.is_none() && self.phase != SessionPhase::Unsubscribed {
            self.phase = SessionPhase::Closed;
        }
    }

    /// Check whether audio is flowing
    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    /// Check whether the session reached a terminal phase
    pub fn is_finished(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Closed | SessionPhase::Unsubscribed
        )
    }
}
