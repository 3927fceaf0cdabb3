//! Broadcast hub implementation
//!
//! The central registry that owns every subscriber's ring and fans each
//! source slice out to all of them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify, RwLock};

use crate::format::AudioFormat;
use crate::shutdown::Shutdown;
use crate::stats::HubStats;

use super::error::HubError;
use super::subscriber::{Subscriber, SubscriberId};

/// Single-producer, multi-consumer live audio hub
///
/// The map is behind a `RwLock`: `append` and `read` only need shared access
/// to the map plus the individual subscriber's lock, so they run concurrently
/// with each other. `subscribe` and `unsubscribe` take the write lock and
/// therefore never interleave with an in-progress iteration.
pub struct BroadcastHub {
    /// Map of subscriber id to subscriber
    subscribers: RwLock<HashMap<SubscriberId, Mutex<Subscriber>>>,

    /// Stream format, fixed for the hub's lifetime
    format: AudioFormat,

    /// Cached `format.frame_bytes()`
    frame_bytes: usize,

    /// Process-wide stop signal
    shutdown: Shutdown,

    /// Id counter for new subscribers
    next_id: AtomicU64,

    /// Woken after every append
    appended: Notify,

    chunks_appended: AtomicU64,
    bytes_appended: AtomicU64,
    bytes_evicted: AtomicU64,
    frames_delivered: AtomicU64,
}

impl BroadcastHub {
    /// Create a hub for the given format
    pub fn new(format: AudioFormat, shutdown: Shutdown) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            format,
            frame_bytes: format.frame_bytes(),
            shutdown,
            next_id: AtomicU64::new(1),
            appended: Notify::new(),
            chunks_appended: AtomicU64::new(0),
            bytes_appended: AtomicU64::new(0),
            bytes_evicted: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
        }
    }

    /// Stream format
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Bytes per one-second frame (ring capacity and read threshold)
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Shutdown handle shared with the hub
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// False once shutdown has been requested
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_triggered()
    }

    /// Request shutdown
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Register a new subscriber with an empty one-second ring
    pub async fn subscribe(&self) -> SubscriberId {
        let id = SubscriberId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber::new(id, self.frame_bytes);

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, Mutex::new(subscriber));

        tracing::info!(
            subscriber = %id,
            subscribers = subscribers.len(),
            "Subscriber added"
        );

        id
    }

    /// Remove a subscriber and discard its buffer
    ///
    /// Returns false if the id was unknown. Removing twice is harmless.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;

        match subscribers.remove(&id) {
            Some(entry) => {
                let subscriber = entry.into_inner();
                tracing::info!(
                    subscriber = %id,
                    subscribers = subscribers.len(),
                    frames_delivered = subscriber.frames_delivered,
                    evicted = subscriber.evicted(),
                    lifetime_secs = subscriber.created_at.elapsed().as_secs(),
                    "Subscriber removed"
                );
                true
            }
            None => {
                tracing::warn!(subscriber = %id, "Unsubscribe for unknown subscriber");
                false
            }
        }
    }

    /// Append a slice to every subscriber's ring
    ///
    /// Never waits for a reader: full rings drop their oldest bytes. Returns
    /// the number of subscribers the slice was written to.
    pub async fn append(&self, chunk: &[u8]) -> usize {
        let subscribers = self.subscribers.read().await;

        let mut evicted = 0u64;
        for entry in subscribers.values() {
            let mut subscriber = entry.lock().await;
            evicted += subscriber.append(chunk) as u64;
        }

        self.chunks_appended.fetch_add(1, Ordering::Relaxed);
        self.bytes_appended.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        if evicted > 0 {
            self.bytes_evicted.fetch_add(evicted, Ordering::Relaxed);
        }

        let delivered_to = subscribers.len();
        drop(subscribers);

        self.appended.notify_waiters();

        tracing::trace!(
            bytes = chunk.len(),
            subscribers = delivered_to,
            evicted = evicted,
            "Slice appended"
        );

        delivered_to
    }

    /// Take a subscriber's buffered audio once a full second is available
    ///
    /// Returns the entire buffer and empties it when it holds at least
    /// `frame_bytes`; otherwise returns empty `Bytes` without waiting.
    pub async fn read(&self, id: SubscriberId) -> Result<Bytes, HubError> {
        let subscribers = self.subscribers.read().await;

        let entry = subscribers
            .get(&id)
            .ok_or(HubError::UnknownSubscriber(id))?;

        let mut subscriber = entry.lock().await;
        match subscriber.take_frame(self.frame_bytes) {
            Some(frame) => {
                self.frames_delivered.fetch_add(1, Ordering::Relaxed);
                Ok(frame)
            }
            None => Ok(Bytes::new()),
        }
    }

    /// Future that resolves after the next `append`
    ///
    /// Take it before calling `read` so an append between the two is not
    /// missed.
    pub fn data_appended(&self) -> Notified<'_> {
        self.appended.notified()
    }

    /// Bytes currently buffered for a subscriber
    pub async fn buffered(&self, id: SubscriberId) -> Result<usize, HubError> {
        let subscribers = self.subscribers.read().await;

        let entry = subscribers
            .get(&id)
            .ok_or(HubError::UnknownSubscriber(id))?;

        let subscriber = entry.lock().await;
        Ok(subscriber.buffered())
    }

    /// Check whether a subscriber is registered
    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Snapshot of hub counters
    pub async fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count().await,
            chunks_appended: self.chunks_appended.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            bytes_evicted: self.bytes_evicted.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            total_subscriptions: self.next_id.load(Ordering::Relaxed) - 1,
        }
    }
}
