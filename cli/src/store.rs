//! Backend selection by connection URL.

use anyhow::{Context, Result};
use async_trait::async_trait;

use nullindex_core::{
    IndexerError, InsertOutcome, NullDataRecord, ParsingLimits, RecordSearch, RecordStore,
};
use nullindex_storage::{PostgresOptions, PostgresStorage, SqliteStorage};

use crate::config::DatabaseTarget;

/// The storage backend picked from the URL scheme.
#[derive(Clone)]
pub enum AnyStore {
    Postgres(PostgresStorage),
    Sqlite(SqliteStorage),
}

impl AnyStore {
    /// Connect and initialise the schema. `sqlite:` URLs open a SQLite file,
    /// every other target is handed to Postgres.
    pub async fn connect(target: &DatabaseTarget) -> Result<Self> {
        let store = match target {
            DatabaseTarget::Url(url) if url.starts_with("sqlite:") => Self::Sqlite(
                SqliteStorage::open(url)
                    .await
                    .context("failed to open SQLite database")?,
            ),
            DatabaseTarget::Url(url) => Self::Postgres(
                PostgresStorage::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL")?,
            ),
            DatabaseTarget::Postgres(options) => Self::Postgres(
                PostgresStorage::connect_with(options.clone(), PostgresOptions::default())
                    .await
                    .context("failed to connect to PostgreSQL")?,
            ),
        };
        Ok(store)
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Sqlite(_) => "sqlite",
        }
    }
}

#[async_trait]
impl RecordStore for AnyStore {
    async fn insert_records(&self, records: &[NullDataRecord]) -> Result<InsertOutcome, IndexerError> {
        match self {
            Self::Postgres(s) => s.insert_records(records).await,
            Self::Sqlite(s) => s.insert_records(records).await,
        }
    }

    async fn lowest_height(&self) -> Result<Option<u64>, IndexerError> {
        match self {
            Self::Postgres(s) => s.lowest_height().await,
            Self::Sqlite(s) => s.lowest_height().await,
        }
    }

    async fn highest_height(&self) -> Result<Option<u64>, IndexerError> {
        match self {
            Self::Postgres(s) => s.highest_height().await,
            Self::Sqlite(s) => s.highest_height().await,
        }
    }

    async fn load_checkpoint(&self) -> Result<Option<ParsingLimits>, IndexerError> {
        match self {
            Self::Postgres(s) => s.load_checkpoint().await,
            Self::Sqlite(s) => s.load_checkpoint().await,
        }
    }

    async fn save_checkpoint(&self, window: &ParsingLimits) -> Result<(), IndexerError> {
        match self {
            Self::Postgres(s) => s.save_checkpoint(window).await,
            Self::Sqlite(s) => s.save_checkpoint(window).await,
        }
    }

    async fn delete_checkpoint(&self) -> Result<(), IndexerError> {
        match self {
            Self::Postgres(s) => s.delete_checkpoint().await,
            Self::Sqlite(s) => s.delete_checkpoint().await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Postgres(s) => s.close().await,
            Self::Sqlite(s) => s.close().await,
        }
    }
}

#[async_trait]
impl RecordSearch for AnyStore {
    async fn search(&self, fragment: &str, limit: u32) -> Result<Vec<NullDataRecord>, IndexerError> {
        match self {
            Self::Postgres(s) => s.search(fragment, limit).await,
            Self::Sqlite(s) => s.search(fragment, limit).await,
        }
    }
}
