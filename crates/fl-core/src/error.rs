//! Error types for the Floodlight client
//!
//! Every fallible operation in the workspace returns [`Result`]. Callers
//! branch on [`Error::kind`] rather than on message text.

use thiserror::Error;

/// Main error type for controller operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    #[error("No device tracked with IPv4 address {0}")]
    HostNotFound(String),

    #[error("Device with IPv4 address {0} has no attachment point")]
    AttachmentPointMissing(String),

    #[error("No usable route from {src} to {dst} ({hops} hops returned)")]
    RouteNotFound {
        src: String,
        dst: String,
        hops: usize,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Controller returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // ========================================================================
    // Response Errors
    // ========================================================================
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    HostNotFound,
    AttachmentPointMissing,
    RouteNotFound,
    Transport,
    MalformedResponse,
    Config,
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a malformed response error for the given endpoint
    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Classify this error. `HttpStatus` counts as a transport failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::HostNotFound(_) => ErrorKind::HostNotFound,
            Error::AttachmentPointMissing(_) => ErrorKind::AttachmentPointMissing,
            Error::RouteNotFound { .. } => ErrorKind::RouteNotFound,
            Error::Transport(_) | Error::HttpStatus { .. } => ErrorKind::Transport,
            Error::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns true if the controller could not be reached or refused the request
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Get a helpful suggestion for resolving this error
    pub fn suggestion(&self) -> &'static str {
        match self {
            Error::HostNotFound(_) => {
                "The controller only tracks hosts that have sent traffic; ping from the host first"
            }
            Error::AttachmentPointMissing(_) => {
                "The host is known but not attached to an OpenFlow switch port"
            }
            Error::RouteNotFound { .. } => {
                "Check inter-switch links with `floodlight links` and switch clusters"
            }
            Error::Transport(_) => {
                "Check that the controller REST API is listening (default port 8080)"
            }
            Error::HttpStatus { status, .. } if *status == 404 => {
                "The endpoint is not available on this controller version"
            }
            Error::HttpStatus { .. } => "Check the controller logs for the rejected request",
            Error::MalformedResponse { .. } => {
                "The controller version may use a different JSON layout"
            }
            Error::Config(_) => "Set FLOODLIGHT_URL or pass --controller",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::malformed("json", err.to_string())
    }
}
