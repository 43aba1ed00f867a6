//! SQLite storage backend.
//!
//! Persists null-data records to a single SQLite file. Substring search
//! scans the table, which is fine for the embedded use case; use the Postgres
//! backend for large indexes.
//!
//! # Usage
//! ```rust,no_run
//! use nullindex_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./opreturns.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use nullindex_core::{
    BlockRef, IndexerError, InsertOutcome, NullDataRecord, ParsingLimits, RecordSearch, RecordStore,
};

use crate::sql::{height_from_db, is_unique_violation, storage_err};

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./opreturns.db"`) or a full
    /// SQLite URL (`"sqlite:./opreturns.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// All data is lost when the pool is closed. Ideal for tests.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        // Each connection to `:memory:` is its own database, so pin the pool
        // to one connection that never expires.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), IndexerError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS opreturns (
                block_hash   TEXT    NOT NULL,
                tx_hash      TEXT    NOT NULL,
                output_index INTEGER NOT NULL,
                data         TEXT    NOT NULL,
                height       INTEGER NOT NULL,
                PRIMARY KEY (block_hash, tx_hash, output_index)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_opreturns_height ON opreturns (height);")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        // Single-row table: the pending catch-up window, if any.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS catch_up_checkpoint (
                id           INTEGER PRIMARY KEY CHECK (id = 1),
                next_height  INTEGER NOT NULL,
                next_hash    TEXT    NOT NULL,
                floor_height INTEGER NOT NULL,
                floor_hash   TEXT    NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    /// Total number of stored records.
    pub async fn record_count(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM opreturns")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }

    /// Get the underlying connection pool (for custom queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn height_bound(&self, sql: &str) -> Result<Option<u64>, IndexerError> {
        let row = sqlx::query(sql).fetch_one(&self.pool).await.map_err(storage_err)?;
        height_from_db(row.try_get("h").map_err(storage_err)?)
    }
}

fn record_from_row(row: &SqliteRow) -> NullDataRecord {
    NullDataRecord {
        data: row.get("data"),
        output_index: row.get::<i64, _>("output_index") as u32,
        block_hash: row.get("block_hash"),
        tx_hash: row.get("tx_hash"),
        height: row.get::<i64, _>("height") as u64,
    }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

#[async_trait]
impl RecordStore for SqliteStorage {
    async fn insert_records(&self, records: &[NullDataRecord]) -> Result<InsertOutcome, IndexerError> {
        if records.is_empty() {
            return Ok(InsertOutcome::Inserted(0));
        }

        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for record in records {
            let result = sqlx::query(
                "INSERT INTO opreturns (block_hash, tx_hash, output_index, data, height)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&record.block_hash)
            .bind(&record.tx_hash)
            .bind(record.output_index as i64)
            .bind(&record.data)
            .bind(record.height as i64)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback().await.map_err(storage_err)?;
                    debug!(
                        block = %record.block_hash,
                        tx = %record.tx_hash,
                        output = record.output_index,
                        "duplicate record, batch rolled back"
                    );
                    return Ok(InsertOutcome::Conflict);
                }
                Err(e) => return Err(storage_err(e)),
            }
        }

        tx.commit()
            .await
            .map_err(|e| IndexerError::Storage(format!("commit batch: {e}")))?;
        Ok(InsertOutcome::Inserted(records.len()))
    }

    async fn lowest_height(&self) -> Result<Option<u64>, IndexerError> {
        self.height_bound("SELECT MIN(height) AS h FROM opreturns").await
    }

    async fn highest_height(&self) -> Result<Option<u64>, IndexerError> {
        self.height_bound("SELECT MAX(height) AS h FROM opreturns").await
    }

    async fn load_checkpoint(&self) -> Result<Option<ParsingLimits>, IndexerError> {
        let row = sqlx::query(
            "SELECT next_height, next_hash, floor_height, floor_hash
             FROM catch_up_checkpoint WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|r| ParsingLimits {
            start: BlockRef::new(r.get::<i64, _>("next_height") as u64, r.get::<String, _>("next_hash")),
            end: BlockRef::new(r.get::<i64, _>("floor_height") as u64, r.get::<String, _>("floor_hash")),
        }))
    }

    async fn save_checkpoint(&self, window: &ParsingLimits) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT OR REPLACE INTO catch_up_checkpoint
             (id, next_height, next_hash, floor_height, floor_hash)
             VALUES (1, ?, ?, ?, ?)",
        )
        .bind(window.start.height as i64)
        .bind(&window.start.hash)
        .bind(window.end.height as i64)
        .bind(&window.end.hash)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(next = window.start.height, floor = window.end.height, "checkpoint saved");
        Ok(())
    }

    async fn delete_checkpoint(&self) -> Result<(), IndexerError> {
        sqlx::query("DELETE FROM catch_up_checkpoint WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordSearch for SqliteStorage {
    async fn search(&self, fragment: &str, limit: u32) -> Result<Vec<NullDataRecord>, IndexerError> {
        let rows = sqlx::query(
            "SELECT block_hash, tx_hash, output_index, data, height
             FROM opreturns
             WHERE instr(data, ?) > 0
             ORDER BY height DESC, tx_hash, output_index
             LIMIT ?",
        )
        .bind(fragment)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.iter().map(record_from_row).collect())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
