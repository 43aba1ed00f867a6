//! Error types for the nullindex pipeline.

use thiserror::Error;

/// Errors that can occur while walking and indexing the chain.
///
/// Duplicate-key conflicts on insert are deliberately absent: they are
/// reported as [`crate::store::InsertOutcome::Conflict`].
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Malformed node response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(
        "Node is synchronized to height {best_height}, below the indexing depth limit {depth_limit}"
    )]
    InsufficientChainHeight { best_height: u64, depth_limit: u64 },

    #[error("Block {hash} has no previous block hash but the walk boundary was not reached")]
    BrokenChain { hash: String },

    #[error("Walker is already running")]
    AlreadyRunning,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` if retrying the run without operator action cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InsufficientChainHeight { .. } | Self::Config(_) | Self::BrokenChain { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_height_is_fatal() {
        let err = IndexerError::InsufficientChainHeight {
            best_height: 10,
            depth_limit: 50,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("below the indexing depth limit 50"));
    }

    #[test]
    fn transport_failures_are_not_fatal() {
        assert!(!IndexerError::Rpc("connection refused".into()).is_fatal());
        assert!(!IndexerError::Storage("pool timed out".into()).is_fatal());
    }
}
