//! Real-time PCM reader feeding the hub
//!
//! The upstream decoder expects to be drained at playback speed, not in bulk,
//! so the loop reads one quarter-second slice and then sleeps a fixed tick
//! regardless of how long the read took.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use crate::hub::BroadcastHub;

use super::config::{ReadErrorPolicy, SourceConfig};

/// How the source loop ended
#[derive(Debug)]
pub enum SourceExit {
    /// Shutdown was requested
    Shutdown,
    /// The upstream read failed under `ReadErrorPolicy::Halt`
    ReadFailed(io::Error),
}

/// The single producer of a hub
pub struct AudioSource {
    hub: Arc<BroadcastHub>,
    config: SourceConfig,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<SourceExit>>,
}

impl AudioSource {
    pub fn new(hub: Arc<BroadcastHub>, config: SourceConfig) -> Self {
        Self {
            hub,
            config,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Start reading from `reader` on a dedicated task
    ///
    /// Does nothing if the source was already started.
    pub fn start<R>(&mut self, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        if self.task.is_some() {
            tracing::warn!("Audio source already started");
            return;
        }

        self.running.store(true, Ordering::Release);

        let hub = Arc::clone(&self.hub);
        let config = self.config.clone();
        let running = Arc::clone(&self.running);

        self.task = Some(tokio::spawn(read_loop(reader, hub, config, running)));
    }

    /// True while the read loop is alive
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request shutdown and wait for the loop to exit
    pub async fn stop(&mut self) -> Option<SourceExit> {
        self.hub.stop();
        self.join().await
    }

    /// Wait for the loop to exit on its own
    ///
    /// Returns `None` if the source was never started or already joined.
    pub async fn join(&mut self) -> Option<SourceExit> {
        let task = self.task.take()?;

        match task.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                tracing::error!(error = %e, "Audio source task failed");
                self.running.store(false, Ordering::Release);
                None
            }
        }
    }
}

async fn read_loop<R>(
    mut reader: R,
    hub: Arc<BroadcastHub>,
    config: SourceConfig,
    running: Arc<AtomicBool>,
) -> SourceExit
where
    R: AsyncRead + Unpin,
{
    let shutdown = hub.shutdown().clone();
    let chunk_bytes = hub.format().chunk_bytes();
    let mut buf = vec![0u8; chunk_bytes];
    let mut at_eof = false;
    let mut slices: u64 = 0;
    let mut bytes_read: u64 = 0;
    let mut short_reads: u64 = 0;

    tracing::info!(
        format = %hub.format(),
        chunk_bytes = chunk_bytes,
        tick_ms = config.tick.as_millis() as u64,
        "Audio source started"
    );

    let exit = loop {
        if shutdown.is_triggered() {
            break SourceExit::Shutdown;
        }

        let (filled, error) = tokio::select! {
            _ = shutdown.wait() => break SourceExit::Shutdown,
            read = read_chunk(&mut reader, &mut buf) => read,
        };

        if filled == 0 && error.is_none() {
            if !at_eof {
                tracing::warn!("Upstream reached EOF, delivering silence");
                at_eof = true;
            }
        } else {
            at_eof = false;
            if filled < chunk_bytes {
                short_reads += 1;
                tracing::debug!(bytes = filled, expected = chunk_bytes, "Short read");
            }
        }

        hub.append(&buf[..filled]).await;
        slices += 1;
        bytes_read += filled as u64;

        if let Some(e) = error {
            match config.on_read_error {
                ReadErrorPolicy::Halt => {
                    tracing::error!(error = %e, "Upstream read failed, stopping feed");
                    break SourceExit::ReadFailed(e);
                }
                ReadErrorPolicy::Silence => {
                    tracing::warn!(error = %e, "Upstream read failed, continuing");
                }
            }
        }

        tokio::select! {
            _ = shutdown.wait() => break SourceExit::Shutdown,
            _ = tokio::time::sleep(config.tick) => {}
        }
    };

    running.store(false, Ordering::Release);

    if matches!(exit, SourceExit::ReadFailed(_)) {
        // Without a producer nothing will ever reach the responders again
        shutdown.trigger();
    }

    tracing::info!(
        slices = slices,
        bytes_read = bytes_read,
        short_reads = short_reads,
        "Audio source stopped"
    );
    exit
}

/// Fill `buf` until it is full, the reader hits EOF, or a read fails
///
/// Returns the number of bytes filled and the error that stopped the read,
/// if any. Bytes read before an error are kept.
async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> (usize, Option<io::Error>)
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (filled, Some(e)),
        }
    }

    (filled, None)
}
