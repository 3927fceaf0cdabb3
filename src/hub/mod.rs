//! Broadcast hub for live fan-out
//!
//! The hub owns one bounded ring per subscriber and copies every source slice
//! into all of them. Readers poll; the producer never waits for a reader.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<BroadcastHub>
//!                 ┌──────────────────────────────┐
//!                 │ subscribers: HashMap<Id,     │
//!                 │   Subscriber {               │
//!                 │     ring: SampleRing (1 s),  │
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   [AudioSource]           [Responder]             [Responder]
//!   every 250ms             read(id) ≥ 1 s          read(id) ≥ 1 s
//!        │                       │                       │
//!        └──► hub.append() ──────┴──► socket ────────────┘
//! ```
//!
//! # Freshness over completeness
//!
//! Each ring holds exactly one second. A reader that falls behind loses the
//! oldest audio rather than stalling the producer or growing memory.

pub mod error;
pub mod ring;
pub mod store;
pub mod subscriber;

pub use error::HubError;
pub use ring::SampleRing;
pub use store::BroadcastHub;
pub use subscriber::{Subscriber, SubscriberId};
