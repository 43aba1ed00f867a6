//! The chain source port — read-only access to a node's block history.

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::Block;

/// Trait for fetching blocks from a node.
///
/// Implementations must reject malformed node responses with
/// [`IndexerError::Decode`] instead of returning partially filled blocks.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Hash of the block at `height` on the node's active chain.
    async fn block_hash(&self, height: u64) -> Result<String, IndexerError>;

    /// Hash of the node's current tip.
    async fn best_block_hash(&self) -> Result<String, IndexerError>;

    /// The block with hash `hash`, including full transaction detail.
    async fn block(&self, hash: &str) -> Result<Block, IndexerError>;

    /// Height of the block with hash `hash`.
    ///
    /// The default fetches the whole block; adapters with a cheaper header
    /// lookup should override it.
    async fn block_height(&self, hash: &str) -> Result<u64, IndexerError> {
        Ok(self.block(hash).await?.height)
    }
}

// ─── In-memory chain (for testing) ────────────────────────────────────────────

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::Transaction;

/// A linear in-memory chain for tests and demos.
///
/// Block `h` has hash [`MemoryChain::hash_at(h)`](MemoryChain::hash_at) and
/// links back to block `h - 1`.
pub struct MemoryChain {
    blocks: Vec<Block>,
    block_fetches: AtomicUsize,
}

impl MemoryChain {
    /// A chain of empty blocks from genesis up to `tip_height`.
    pub fn linear(tip_height: u64) -> Self {
        let blocks = (0..=tip_height)
            .map(|height| Block {
                hash: Self::hash_at(height),
                height,
                previous_block_hash: height.checked_sub(1).map(Self::hash_at),
                transactions: vec![],
            })
            .collect();
        Self {
            blocks,
            block_fetches: AtomicUsize::new(0),
        }
    }

    /// Replace the transactions of the block at `height`.
    pub fn with_transactions(mut self, height: u64, transactions: Vec<Transaction>) -> Self {
        if let Some(block) = usize::try_from(height).ok().and_then(|h| self.blocks.get_mut(h)) {
            block.transactions = transactions;
        }
        self
    }

    /// The hash this chain assigns to `height`.
    pub fn hash_at(height: u64) -> String {
        format!("{height:064x}")
    }

    /// How many times [`ChainSource::block`] has been called.
    pub fn block_fetches(&self) -> usize {
        self.block_fetches.load(Ordering::SeqCst)
    }

    fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    fn find(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == hash)
    }
}

#[async_trait]
impl ChainSource for MemoryChain {
    async fn block_hash(&self, height: u64) -> Result<String, IndexerError> {
        usize::try_from(height)
            .ok()
            .and_then(|h| self.blocks.get(h))
            .map(|b| b.hash.clone())
            .ok_or_else(|| IndexerError::Rpc(format!("Block height {height} out of range")))
    }

    async fn best_block_hash(&self) -> Result<String, IndexerError> {
        self.tip()
            .map(|b| b.hash.clone())
            .ok_or_else(|| IndexerError::Rpc("empty chain".into()))
    }

    async fn block(&self, hash: &str) -> Result<Block, IndexerError> {
        self.block_fetches.fetch_add(1, Ordering::SeqCst);
        self.find(hash)
            .cloned()
            .ok_or_else(|| IndexerError::Rpc(format!("Block {hash} not found")))
    }

    async fn block_height(&self, hash: &str) -> Result<u64, IndexerError> {
        self.find(hash)
            .map(|b| b.height)
            .ok_or_else(|| IndexerError::Rpc(format!("Block {hash} not found")))
    }
}
