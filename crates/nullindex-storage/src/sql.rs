//! Pieces shared by the sqlx backends.

use nullindex_core::IndexerError;

pub(crate) fn storage_err(e: sqlx::Error) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

/// `true` when `e` is a primary-key or unique-constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Heights are stored as signed 64-bit integers.
pub(crate) fn height_from_db(value: Option<i64>) -> Result<Option<u64>, IndexerError> {
    value
        .map(|h| u64::try_from(h).map_err(|_| IndexerError::Storage(format!("negative height {h} in storage"))))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_from_db() {
        assert_eq!(height_from_db(None).unwrap(), None);
        assert_eq!(height_from_db(Some(812_000)).unwrap(), Some(812_000));
        assert!(height_from_db(Some(-1)).is_err());
    }

    #[test]
    fn pool_errors_are_not_conflicts() {
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
        assert!(matches!(storage_err(sqlx::Error::PoolClosed), IndexerError::Storage(_)));
    }
}
