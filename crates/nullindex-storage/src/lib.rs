//! nullindex-storage — persistent backends for extracted null-data records.
//!
//! Backends:
//! - [`sqlite`] — SQLite via `sqlx` (embedded, single-file persistence)
//! - [`postgres`] — PostgreSQL via `sqlx`, with a trigram index for search
//!
//! Both store rows in one `opreturns` table keyed by
//! `(block_hash, tx_hash, output_index)` and implement
//! [`RecordStore`](nullindex_core::RecordStore) and
//! [`RecordSearch`](nullindex_core::RecordSearch).

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod sql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresOptions, PostgresStorage};
