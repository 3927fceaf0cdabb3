//! Audio source configuration

use std::time::Duration;

/// What the source loop does when the upstream read fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorPolicy {
    /// Stop the loop and request process shutdown
    Halt,
    /// Log the error, deliver nothing for this tick, and keep going
    Silence,
}

impl std::str::FromStr for ReadErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "halt" => Ok(ReadErrorPolicy::Halt),
            "silence" => Ok(ReadErrorPolicy::Silence),
            other => Err(format!(
                "unknown read error policy '{}', expected 'halt' or 'silence'",
                other
            )),
        }
    }
}

/// Source loop options
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Fixed pause after each slice; also the slice duration
    pub tick: Duration,

    /// Behaviour on upstream I/O errors
    pub on_read_error: ReadErrorPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            on_read_error: ReadErrorPolicy::Halt,
        }
    }
}

impl SourceConfig {
    /// Set the pause between slices
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the read error policy
    pub fn on_read_error(mut self, policy: ReadErrorPolicy) -> Self {
        self.on_read_error = policy;
        self
    }
}
