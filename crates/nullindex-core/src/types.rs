//! Shared types for the indexing pipeline.
//!
//! The chain payload types (`Block`, `Transaction`, `TxOutput`, `ScriptPubKey`)
//! mirror the node's `getblock <hash> 2` response. Deserializing into them is
//! the validation boundary: a response that does not fit is rejected there
//! instead of travelling further into the pipeline.

use serde::{Deserialize, Serialize};

// ─── Chain payloads ──────────────────────────────────────────────────────────

/// A block with full transaction detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block hash (hex, display byte order).
    pub hash: String,
    /// Block height.
    pub height: u64,
    /// Hash of the parent block; absent only for the genesis block.
    #[serde(rename = "previousblockhash", default, skip_serializing_if = "Option::is_none")]
    pub previous_block_hash: Option<String>,
    /// Transactions in block order.
    #[serde(rename = "tx")]
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The `{height, hash}` reference for this block.
    pub fn block_ref(&self) -> BlockRef {
        BlockRef::new(self.height, self.hash.clone())
    }
}

/// A transaction inside a [`Block`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    #[serde(rename = "vout")]
    pub outputs: Vec<TxOutput>,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Zero-based position of the output within its transaction.
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// An output script as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    /// The node's classification of the script.
    #[serde(rename = "type")]
    pub kind: ScriptType,
    /// Raw script bytes (hex on the wire).
    #[serde(with = "hex")]
    pub hex: Vec<u8>,
}

/// Script classifications reported by Bitcoin Core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptType {
    #[serde(rename = "nonstandard")]
    Nonstandard,
    #[serde(rename = "pubkey")]
    PubKey,
    #[serde(rename = "pubkeyhash")]
    PubKeyHash,
    #[serde(rename = "scripthash")]
    ScriptHash,
    #[serde(rename = "multisig")]
    Multisig,
    #[serde(rename = "nulldata")]
    NullData,
    #[serde(rename = "witness_v0_keyhash")]
    WitnessV0KeyHash,
    #[serde(rename = "witness_v0_scripthash")]
    WitnessV0ScriptHash,
    #[serde(rename = "witness_v1_taproot")]
    WitnessV1Taproot,
    #[serde(rename = "witness_unknown")]
    WitnessUnknown,
    #[serde(rename = "anchor")]
    Anchor,
    /// Any classification this version does not know about.
    #[serde(other)]
    Unknown,
}

// ─── NullDataRecord ──────────────────────────────────────────────────────────

/// One decoded null-data payload, ready to persist.
///
/// `(block_hash, tx_hash, output_index)` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullDataRecord {
    /// Payload text.
    pub data: String,
    /// Zero-based output position within the transaction.
    pub output_index: u32,
    /// Hash of the containing block.
    pub block_hash: String,
    /// Hash of the containing transaction.
    pub tx_hash: String,
    /// Height of the containing block.
    pub height: u64,
}

// ─── BlockRef / ParsingLimits ────────────────────────────────────────────────

/// A `{height, hash}` pair identifying one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub height: u64,
    pub hash: String,
}

impl BlockRef {
    pub fn new(height: u64, hash: impl Into<String>) -> Self {
        Self {
            height,
            hash: hash.into(),
        }
    }
}

/// The work window for one walk.
///
/// `start` is processed first (inclusive). The walk stops when it reaches
/// `end`, which is not processed. `start.height >= end.height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsingLimits {
    pub start: BlockRef,
    pub end: BlockRef,
}

impl ParsingLimits {
    /// Number of blocks the walk will process if it runs to completion.
    pub fn span(&self) -> u64 {
        self.start.height.saturating_sub(self.end.height)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
