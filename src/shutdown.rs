//! Process-wide stop signal
//!
//! One `Shutdown` is created at startup and cloned into the hub, the audio
//! source and the server. Once triggered it stays triggered.

use std::sync::Arc;

use tokio::sync::watch;

/// Clonable handle to the shared stop signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new, untriggered signal
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal
    ///
    /// Idempotent; only the first call is logged.
    pub fn trigger(&self) {
        let first = self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        });

        if first {
            tracing::info!("Shutdown requested");
        }
    }

    /// Check whether the signal has been raised
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal is raised
    ///
    /// Returns immediately if it already has been.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
