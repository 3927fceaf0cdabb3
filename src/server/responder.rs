//! Per-connection stream responder
//!
//! Answers one HTTP request with a WAV stream: response head, placeholder
//! WAV header, then whole-second PCM frames polled from the hub until the
//! client leaves or the server shuts down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::hub::{BroadcastHub, SubscriberId};
use crate::session::SessionState;

use super::config::ServerConfig;
use super::http::{self, Status};

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server shutdown was requested
    Shutdown,
    /// The client closed or reset the connection
    Disconnected,
    /// The request was answered with an error status
    Rejected(Status),
}

/// Streams the hub's audio to one client
pub struct Responder<S> {
    state: SessionState,
    stream: S,
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
}

impl<S> Responder<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        session_id: u64,
        stream: S,
        peer_addr: SocketAddr,
        config: ServerConfig,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            state: SessionState::new(session_id, peer_addr),
            stream,
            config,
            hub,
        }
    }

    /// Session state and statistics
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Serve the connection to completion
    ///
    /// A subscription taken here is always released before returning.
    pub async fn run(&mut self) -> Result<SessionEnd> {
        let result = self.serve().await;

        if let Some(id) = self.state.take_subscription() {
            self.hub.unsubscribe(id).await;
        }
        self.state.close();

        match result {
            Err(e) if e.is_disconnect() => Ok(SessionEnd::Disconnected),
            other => other,
        }
    }

    async fn serve(&mut self) -> Result<SessionEnd> {
        let shutdown = self.hub.shutdown().clone();

        let head = tokio::select! {
            _ = shutdown.wait() => return Ok(SessionEnd::Shutdown),
            head = timeout(self.config.request_timeout, http::read_request_head(&mut self.stream)) => head,
        };

        let head = match head {
            Ok(Ok(head)) => head,
            Ok(Err(Error::BadRequest(reason))) => {
                tracing::debug!(
                    session_id = self.state.id,
                    reason = %reason,
                    "Rejecting malformed request"
                );
                return self.reject(Status::BadRequest).await;
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                let _ = self.reject(Status::BadRequest).await;
                return Err(Error::Timeout("request head"));
            }
        };

        if !head.is_get() {
            tracing::debug!(
                session_id = self.state.id,
                method = %head.method,
                "Unsupported method"
            );
            return self.reject(Status::NotImplemented).await;
        }

        tracing::info!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            path = %head.path,
            user_agent = head.header("user-agent").unwrap_or("-"),
            "New listener"
        );

        self.send_stream_head().await?;

        let id = self.hub.subscribe().await;
        self.state.subscribed(id);

        self.stream_frames(id).await
    }

    async fn send_stream_head(&mut self) -> Result<()> {
        let head = http::stream_response_head();
        let wav = self.hub.format().wav_header().to_bytes();

        self.write(&head, "response head").await?;
        self.write(&wav, "wav header").await?;
        self.stream.flush().await?;

        self.state.header_sent(head.len() + wav.len());
        Ok(())
    }

    async fn stream_frames(&mut self, id: SubscriberId) -> Result<SessionEnd> {
        let hub = Arc::clone(&self.hub);
        let shutdown = hub.shutdown().clone();
        let poll_interval = self.config.poll_interval;
        // Anything the client sends after the request head is discarded
        let mut scratch = [0u8; 512];

        self.state.start_streaming();

        while hub.is_running() {
            let appended = hub.data_appended();
            let frame = hub.read(id).await?;

            if frame.is_empty() {
                self.state.stats.idle_polls += 1;
                tokio::select! {
                    _ = appended => {}
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = shutdown.wait() => {}
                    // A silent upstream never fails a write, so watch the socket
                    read = self.stream.read(&mut scratch) => match read {
                        Ok(0) => {
                            tracing::debug!(
                                session_id = self.state.id,
                                "Client closed while idle"
                            );
                            return Ok(SessionEnd::Disconnected);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::debug!(
                                session_id = self.state.id,
                                error = %e,
                                "Client read failed while idle"
                            );
                            return Ok(SessionEnd::Disconnected);
                        }
                    },
                }
                continue;
            }

            self.write(&frame, "audio frame").await?;
            self.state.stats.record_frame(frame.len());

            tracing::trace!(
                session_id = self.state.id,
                bytes = frame.len(),
                "Frame sent"
            );
        }

        let _ = self.stream.shutdown().await;
        Ok(SessionEnd::Shutdown)
    }

    async fn reject(&mut self, status: Status) -> Result<SessionEnd> {
        let response = http::error_response(status);
        self.write(&response, "error response").await?;
        let _ = self.stream.shutdown().await;
        Ok(SessionEnd::Rejected(status))
    }

    async fn write(&mut self, data: &[u8], what: &'static str) -> Result<()> {
        match timeout(self.config.write_timeout, self.stream.write_all(data)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(what)),
        }
    }
}
