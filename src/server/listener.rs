//! WAV stream server listener
//!
//! Handles the TCP accept loop and spawns one responder per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::Result;
use crate::hub::BroadcastHub;
use crate::server::config::ServerConfig;
use crate::server::http::{self, Status};
use crate::server::responder::{Responder, SessionEnd};

/// HTTP server that fans the hub out to listeners
pub struct StreamServer {
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl StreamServer {
    /// Create a new server streaming from `hub`
    pub fn new(config: ServerConfig, hub: Arc<BroadcastHub>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown
    ///
    /// On shutdown, stops accepting, waits up to `drain_timeout` for open
    /// responders to finish, and releases the listener last.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            format = %self.hub.format(),
            "WAV stream server listening"
        );

        let shutdown = self.hub.shutdown().clone();
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(&mut sessions, socket, peer_addr);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            }
        }

        self.drain(&mut sessions).await;
        drop(listener);

        tracing::info!(addr = %local_addr, "WAV stream server stopped");
        Ok(())
    }

    fn handle_connection(
        &self,
        sessions: &mut JoinSet<()>,
        mut socket: TcpStream,
        peer_addr: SocketAddr,
    ) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    let request_timeout = self.config.request_timeout;
                    let write_timeout = self.config.write_timeout;
                    sessions.spawn(async move {
                        // Consume the request so closing does not reset the connection
                        let _ = tokio::time::timeout(
                            request_timeout,
                            http::read_request_head(&mut socket),
                        )
                        .await;
                        let response = http::error_response(Status::ServiceUnavailable);
                        let _ = tokio::time::timeout(write_timeout, socket.write_all(&response))
                            .await;
                        let _ = socket.shutdown().await;
                    });
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let config = self.config.clone();
        let hub = Arc::clone(&self.hub);

        sessions.spawn(async move {
            let _permit = permit;
            let mut responder = Responder::new(session_id, socket, peer_addr, config, hub);

            match responder.run().await {
                Ok(SessionEnd::Disconnected) => {
                    tracing::debug!(session_id = session_id, "Client disconnected");
                }
                Ok(SessionEnd::Rejected(status)) => {
                    tracing::debug!(
                        session_id = session_id,
                        status = status.code(),
                        "Request rejected"
                    );
                }
                Ok(SessionEnd::Shutdown) => {}
                Err(e) => {
                    tracing::debug!(
                        session_id = session_id,
                        error = %e,
                        "Connection error"
                    );
                }
            }

            let state = responder.state();
            tracing::info!(
                session_id = session_id,
                peer = %peer_addr,
                bytes_sent = state.stats.bytes_sent,
                frames_sent = state.stats.frames_sent,
                idle_polls = state.stats.idle_polls,
                bitrate = state.stats.bitrate(),
                duration_secs = state.stats.duration().as_secs(),
                "Listener closed"
            );
        });
    }

    async fn drain(&self, sessions: &mut JoinSet<()>) {
        if sessions.is_empty() {
            return;
        }

        tracing::info!(open = sessions.len(), "Waiting for listeners to close");

        let drained = tokio::time::timeout(self.config.drain_timeout, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = sessions.len(),
                "Listeners did not close in time, aborting"
            );
            sessions.abort_all();
            while sessions.join_next().await.is_some() {}
        }
    }
}
