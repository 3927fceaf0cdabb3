//! Crate-wide error type

use crate::hub::HubError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by wavcast components
#[derive(Debug)]
pub enum Error {
    /// Socket or pipe I/O failure
    Io(std::io::Error),
    /// Broadcast hub rejected an operation
    Hub(HubError),
    /// Audio format parameters are unusable
    InvalidFormat(String),
    /// Client sent something that is not a usable HTTP request
    BadRequest(String),
    /// An operation did not finish in time
    Timeout(&'static str),
}

impl Error {
    /// True when the error means the peer went away
    ///
    /// Reset, broken pipe and aborted connections all end a stream normally
    /// from the server's point of view.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Hub(e) => write!(f, "Hub error: {}", e),
            Error::InvalidFormat(msg) => write!(f, "Invalid audio format: {}", msg),
            Error::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Error::Timeout(what) => write!(f, "Timed out: {}", what),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Hub(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<HubError> for Error {
    fn from(e: HubError) -> Self {
        Error::Hub(e)
    }
}
