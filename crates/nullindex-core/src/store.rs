//! The storage port — where extracted records are persisted.
//!
//! Storage coverage (the lowest and highest indexed heights) is the main
//! progress marker. Catch-up walks additionally persist their remaining window
//! as a checkpoint: records alone cannot tell an interrupted catch-up from a
//! finished one once the new tip is stored.

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::{NullDataRecord, ParsingLimits};

/// Result of inserting one block's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Every record was written.
    Inserted(usize),
    /// At least one record's `(block_hash, tx_hash, output_index)` already
    /// existed, so nothing from this batch was written.
    Conflict,
}

/// Trait for persisting extracted records.
///
/// Implementations include [`MemoryRecordStore`] here, and the SQLite and
/// Postgres stores in `nullindex-storage`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert all `records` atomically.
    ///
    /// A uniqueness violation on any record must roll back the whole batch
    /// and return `Ok(InsertOutcome::Conflict)`.
    async fn insert_records(&self, records: &[NullDataRecord]) -> Result<InsertOutcome, IndexerError>;

    /// Lowest indexed height, `None` when the store is empty.
    async fn lowest_height(&self) -> Result<Option<u64>, IndexerError>;

    /// Highest indexed height, `None` when the store is empty.
    async fn highest_height(&self) -> Result<Option<u64>, IndexerError>;

    /// Remaining window of an unfinished catch-up walk, if any.
    async fn load_checkpoint(&self) -> Result<Option<ParsingLimits>, IndexerError>;

    /// Save (upsert) the catch-up checkpoint.
    async fn save_checkpoint(&self, window: &ParsingLimits) -> Result<(), IndexerError>;

    /// Delete the catch-up checkpoint once its window is fully walked.
    async fn delete_checkpoint(&self) -> Result<(), IndexerError>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Substring search over stored payloads.
#[async_trait]
pub trait RecordSearch: Send + Sync {
    /// Records whose `data` contains `fragment`, at most `limit` of them,
    /// highest block first.
    async fn search(&self, fragment: &str, limit: u32) -> Result<Vec<NullDataRecord>, IndexerError>;
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type RecordKey = (String, String, u32);

fn key_of(record: &NullDataRecord) -> RecordKey {
    (record.block_hash.clone(), record.tx_hash.clone(), record.output_index)
}

/// In-memory record store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<RecordKey, NullDataRecord>>,
    checkpoint: Mutex<Option<ParsingLimits>>,
    closed: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// All stored records, ordered by key.
    pub fn records(&self) -> Vec<NullDataRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// Returns `true` once [`RecordStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), IndexerError> {
        if self.is_closed() {
            return Err(IndexerError::Storage("store is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_records(&self, records: &[NullDataRecord]) -> Result<InsertOutcome, IndexerError> {
        self.ensure_open()?;
        let mut stored = self.records.lock().unwrap();

        let mut batch = HashSet::with_capacity(records.len());
        for record in records {
            let key = key_of(record);
            if stored.contains_key(&key) || !batch.insert(key) {
                return Ok(InsertOutcome::Conflict);
            }
        }

        for record in records {
            stored.insert(key_of(record), record.clone());
        }
        Ok(InsertOutcome::Inserted(records.len()))
    }

    async fn lowest_height(&self) -> Result<Option<u64>, IndexerError> {
        self.ensure_open()?;
        Ok(self.records.lock().unwrap().values().map(|r| r.height).min())
    }

    async fn highest_height(&self) -> Result<Option<u64>, IndexerError> {
        self.ensure_open()?;
        Ok(self.records.lock().unwrap().values().map(|r| r.height).max())
    }

    async fn load_checkpoint(&self) -> Result<Option<ParsingLimits>, IndexerError> {
        self.ensure_open()?;
        Ok(self.checkpoint.lock().unwrap().clone())
    }

    async fn save_checkpoint(&self, window: &ParsingLimits) -> Result<(), IndexerError> {
        self.ensure_open()?;
        *self.checkpoint.lock().unwrap() = Some(window.clone());
        Ok(())
    }

    async fn delete_checkpoint(&self) -> Result<(), IndexerError> {
        self.ensure_open()?;
        self.checkpoint.lock().unwrap().take();
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordSearch for MemoryRecordStore {
    async fn search(&self, fragment: &str, limit: u32) -> Result<Vec<NullDataRecord>, IndexerError> {
        self.ensure_open()?;
        let mut hits: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.data.contains(fragment))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.height.cmp(&a.height));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(block: &str, tx: &str, idx: u32, height: u64, data: &str) -> NullDataRecord {
        NullDataRecord {
            data: data.into(),
            output_index: idx,
            block_hash: block.into(),
            tx_hash: tx.into(),
            height,
        }
    }

    #[tokio::test]
    async fn empty_store_has_no_bounds() {
        let store = MemoryRecordStore::new();
        assert_eq!(store.lowest_height().await.unwrap(), None);
        assert_eq!(store.highest_height().await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_then_bounds() {
        let store = MemoryRecordStore::new();
        let outcome = store
            .insert_records(&[rec("b1", "t1", 0, 120, "a"), rec("b2", "t2", 1, 101, "b")])
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted(2));
        assert_eq!(store.lowest_height().await.unwrap(), Some(101));
        assert_eq!(store.highest_height().await.unwrap(), Some(120));
    }

    #[tokio::test]
    async fn duplicate_rejects_whole_batch() {
        let store = MemoryRecordStore::new();
        store.insert_records(&[rec("b1", "t1", 0, 5, "a")]).await.unwrap();

        let outcome = store
            .insert_records(&[rec("b1", "t1", 1, 5, "new"), rec("b1", "t1", 0, 5, "dup")])
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Conflict);
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let store = MemoryRecordStore::new();
        assert_eq!(store.insert_records(&[]).await.unwrap(), InsertOutcome::Inserted(0));
    }

    #[tokio::test]
    async fn search_matches_substring() {
        let store = MemoryRecordStore::new();
        store
            .insert_records(&[
                rec("b1", "t1", 0, 10, "hello world"),
                rec("b2", "t2", 0, 20, "say hello"),
                rec("b3", "t3", 0, 30, "goodbye"),
            ])
            .await
            .unwrap();
        let hits = store.search("hello", 10).await.unwrap();
        let heights: Vec<_> = hits.iter().map(|r| r.height).collect();
        assert_eq!(heights, vec![20, 10]);
        assert_eq!(store.search("hello", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn checkpoint_upsert_and_delete() {
        use crate::types::BlockRef;

        let store = MemoryRecordStore::new();
        assert_eq!(store.load_checkpoint().await.unwrap(), None);

        let first = ParsingLimits {
            start: BlockRef::new(40, "h40"),
            end: BlockRef::new(20, "h20"),
        };
        let second = ParsingLimits {
            start: BlockRef::new(33, "h33"),
            ..first.clone()
        };
        store.save_checkpoint(&first).await.unwrap();
        store.save_checkpoint(&second).await.unwrap();
        assert_eq!(store.load_checkpoint().await.unwrap(), Some(second));

        store.delete_checkpoint().await.unwrap();
        assert_eq!(store.load_checkpoint().await.unwrap(), None);
    }

    #[tokio::test]
    async fn closed_store_refuses_work() {
        let store = MemoryRecordStore::new();
        store.close().await;
        assert!(store.is_closed());
        assert!(matches!(
            store.insert_records(&[]).await,
            Err(IndexerError::Storage(_))
        ));
    }
}
