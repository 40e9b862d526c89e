use std::io;

use thiserror::Error;

/// Request descriptor could not be built. Aborts the dispatch before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid method {0:?}")]
    InvalidMethod(String),
    #[error("unsupported scheme {0:?} (expected http or https)")]
    UnknownScheme(String),
    #[error("path must start with '/': {0:?}")]
    InvalidPath(String),
    #[error("invalid header {name:?}: {message}")]
    InvalidHeader { name: String, message: String },
    #[error("invalid url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// A connection strategy failed for one target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("broker {broker} unreachable: {message}")]
    BrokerUnreachable { broker: String, message: String },
    #[error("tunnel upgrade failed: {0}")]
    UpgradeFailed(String),
    #[error("proxy refused tunnel: {0}")]
    ProxyRefused(String),
    #[error("broker negotiated protocol {actual:?}, expected {expected:?}")]
    ProtocolMismatch {
        expected: String,
        actual: Option<String>,
    },
    #[error("connection setup failed: {0}")]
    Setup(String),
    #[error("no connection strategy configured")]
    NoStrategy,
}

impl ConnectionError {
    /// Whether the next strategy in a fallback chain should be tried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectionError::BrokerUnreachable { .. }
                | ConnectionError::UpgradeFailed(_)
                | ConnectionError::ProxyRefused(_)
        )
    }
}

/// Request or response I/O failed for one target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("reading body failed: {0}")]
    Body(String),
    #[error("scheme {0:?} is not supported by this transport")]
    UnsupportedScheme(String),
}

/// The display backend failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("display failed to start: {0}")]
    Start(String),
    #[error("display io error: {0}")]
    Io(String),
    #[error("display thread panicked")]
    Panicked,
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        RenderError::Io(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("unknown group {0:?}")]
    UnknownGroup(String),
    #[error("group {0:?} has no live targets")]
    NoLiveTargets(String),
}

/// Whole-operation failures; per-target failures live in each [`crate::Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Display(RenderError),
}

/// Why a single target did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetFailure {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("cancelled by user")]
    Cancelled,
    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl TargetFailure {
    /// Short text for the row next to the bar.
    pub fn label(&self) -> &'static str {
        match self {
            TargetFailure::Connection(_) => "connection failed",
            TargetFailure::Transport(_) => "request failed",
            TargetFailure::Cancelled => "cancelled",
            TargetFailure::Panicked(_) => "worker crashed",
        }
    }
}
