//! Transport-level error types.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to the node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, reset, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP status without a JSON-RPC body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The node rejected the credentials.
    #[error("authentication rejected by node (HTTP {status})")]
    Unauthorized { status: u16 },

    /// JSON-RPC error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if this error is transient and the request may be retried.
    ///
    /// Covers connection failures, timeouts, 5xx responses without a JSON-RPC
    /// body (bitcoind's "Work queue depth exceeded" is a bare 503) and a node
    /// that is still warming up.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Rpc(err) => err.code == JsonRpcError::IN_WARMUP,
            _ => false,
        }
    }
}
