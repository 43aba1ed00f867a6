//! nullindex-core — foundation for the resumable null-data (`OP_RETURN`) indexer.
//!
//! # Architecture
//!
//! ```text
//! Walker ──► compute_limits ──► ParsingLimits { start, end }
//!   │
//!   └── loop (backward, one block at a time)
//!         ├── ChainSource::block        (full transaction detail)
//!         ├── extract_block             (script decoder per output)
//!         └── RecordStore::insert_records  (Inserted | Conflict)
//! ```

pub mod error;
pub mod extract;
pub mod limits;
pub mod network;
pub mod script;
pub mod source;
pub mod store;
pub mod types;
pub mod walker;

pub use error::IndexerError;
pub use extract::extract_block;
pub use limits::{compute_limits, WalkMode};
pub use network::Network;
pub use script::{decompile, null_data_payload, output_payload, ScriptElement};
pub use source::{ChainSource, MemoryChain};
pub use store::{InsertOutcome, MemoryRecordStore, RecordSearch, RecordStore};
pub use types::{Block, BlockRef, NullDataRecord, ParsingLimits, ScriptPubKey, ScriptType, Transaction, TxOutput};
pub use walker::{WalkOutcome, WalkState, Walker};
