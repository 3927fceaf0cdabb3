//! WAV-over-HTTP stream server
//!
//! - `listener`: accept loop, connection limit, shutdown drain
//! - `responder`: one per connection, streams hub frames to the socket
//! - `http`: request head parsing and response framing

pub mod config;
pub mod http;
pub mod listener;
pub mod responder;

pub use config::ServerConfig;
pub use http::{RequestHead, Status};
pub use listener::StreamServer;
pub use responder::{Responder, SessionEnd};
