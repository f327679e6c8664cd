//! Common error types used throughout theatre.
//!
//! Covers malformed wire values, transport failures against the media backend,
//! unexpected HTTP statuses and response decoding problems.

/// Common error type for theatre.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A time code did not have the `MM:SS` shape.
    #[error("Malformed time code: {0:?}")]
    Format(String),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request never produced a response (connect, timeout, reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("{endpoint} returned status {status}")]
    Status {
        /// Endpoint that was called, e.g. `POST /stop-cronos`.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// A response body could not be interpreted.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new Format error for the offending input.
    pub fn format<S: Into<String>>(input: S) -> Self {
        Self::Format(input.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Transport error.
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new Status error.
    pub fn status<S: Into<String>>(endpoint: S, status: u16) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Create a new Decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Io(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
