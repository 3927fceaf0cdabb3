//! Hub error types

use super::subscriber::SubscriberId;

/// Error type for hub operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// No subscriber with this id (never subscribed, or already removed)
    UnknownSubscriber(SubscriberId),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::UnknownSubscriber(id) => write!(f, "Unknown subscriber: {}", id),
        }
    }
}

impl std::error::Error for HubError {}
