//! Audio source: the hub's single producer
//!
//! - `reader`: real-time slice loop over any `AsyncRead`
//! - `decoder`: launcher for the external decoder whose stdout feeds the loop

pub mod config;
pub mod decoder;
pub mod reader;

pub use config::{ReadErrorPolicy, SourceConfig};
pub use decoder::{DecoderConfig, DecoderProcess};
pub use reader::{AudioSource, SourceExit};
