use std::fmt;

/// Result type for failsight-backends operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the backends layer
#[derive(Debug)]
pub enum Error {
    /// Backend exists but was never (successfully) configured; the request
    /// is rejected before any network call
    NotInitialized(String),

    /// Backend answered with a non-success status
    Request {
        status: Option<u16>,
        message: String,
    },

    /// Transport-level failure (connect, timeout, broken stream)
    Network(String),

    /// Backend answered 2xx but the body was not usable
    InvalidResponse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized(name) => {
                write!(f, "Backend '{}' not initialized", name)
            }
            Error::Request {
                status: Some(status),
                message,
            } => write!(f, "Backend request failed ({}): {}", status, message),
            Error::Request {
                status: None,
                message,
            } => write!(f, "Backend request failed: {}", message),
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::InvalidResponse(msg) => write!(f, "Invalid backend response: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Error::Request {
                status: Some(status.as_u16()),
                message: err.to_string(),
            }
        } else {
            Error::Network(err.to_string())
        }
    }
}
