//! Repository Module
//!
//! Function-style CRUD over the SQLite pool, one module per table. Store
//! errors are translated to the repository taxonomy at this boundary: raw
//! sqlx error codes never reach handlers.

pub mod activity_log;
pub mod fare;
pub mod order;
pub mod shipment;
pub mod user;
pub mod vendor;
pub mod warehouse;

use thiserror::Error;

use crate::utils::AppError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db) => match db.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    RepoError::Duplicate(db.message().to_string())
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    RepoError::Validation("Foreign key constraint failed".to_string())
                }
                _ => RepoError::Database(err.to_string()),
            },
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::not_found(msg),
            RepoError::Duplicate(msg) => AppError::conflict(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => AppError::database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Clamp a (page, limit) pair to sane bounds, returning (page, limit, offset)
pub fn page_bounds(page: i64, limit: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    (page, limit, (page - 1) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::{Role, ShipmentCreate};

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(0, 10), (1, 10, 0));
        assert_eq!(page_bounds(3, 10), (3, 10, 20));
        assert_eq!(page_bounds(1, 1000), (1, 100, 0));
        assert_eq!(page_bounds(-5, 0), (1, 1, 0));
    }

    async fn test_pool() -> (sqlx::SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = DbService::new(&dir.path().join("test.db").to_string_lossy())
            .await
            .expect("open test db");
        (db.pool, dir)
    }

    #[tokio::test]
    async fn unique_violation_maps_to_duplicate() {
        let (pool, _dir) = test_pool().await;
        user::create(&pool, "A", "same@example.com", "hash", Role::User, None)
            .await
            .unwrap();
        let err = user::create(&pool, "B", "same@example.com", "hash", Role::User, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn foreign_key_violation_maps_to_validation() {
        let (pool, _dir) = test_pool().await;
        let data = ShipmentCreate {
            order_id: 12_345,
            warehouse_id: 678,
            carrier: None,
            estimated_delivery: None,
            notes: None,
        };
        let err = shipment::create(&pool, &data, "TRK-1-AAAAAAAAA")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)), "got {err:?}");
    }
}
