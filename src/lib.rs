//! Live PCM fan-out over HTTP
//!
//! `wavcast` reads one continuous raw PCM stream (typically a decoder's
//! stdout) in real time and re-broadcasts it to any number of HTTP clients.
//! Every client gets its own WAV header with an unknown length followed by
//! live audio from the moment it joined.
//!
//! ```text
//!  decoder stdout ──► AudioSource ──► BroadcastHub ──► Responder ──► client
//!                     (250ms slices)   (1s ring each)   (1s frames)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wavcast::{AudioFormat, AudioSource, BroadcastHub, ServerConfig, Shutdown, SourceConfig, StreamServer};
//!
//! # async fn example() -> wavcast::Result<()> {
//! let shutdown = Shutdown::new();
//! let hub = Arc::new(BroadcastHub::new(AudioFormat::cd_quality(), shutdown.clone()));
//!
//! let mut source = AudioSource::new(Arc::clone(&hub), SourceConfig::default());
//! source.start(tokio::io::stdin());
//!
//! let server = StreamServer::new(ServerConfig::default(), hub);
//! let serving = tokio::spawn(async move { server.run().await });
//!
//! tokio::signal::ctrl_c().await?;
//! shutdown.trigger();
//!
//! source.stop().await;
//! let _ = serving.await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod format;
pub mod hub;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod source;
pub mod stats;

pub use error::{Error, Result};
pub use format::{AudioFormat, WavHeader};
pub use hub::{BroadcastHub, HubError, SubscriberId};
pub use server::{ServerConfig, StreamServer};
pub use shutdown::Shutdown;
pub use source::{AudioSource, DecoderConfig, ReadErrorPolicy, SourceConfig, SourceExit};
