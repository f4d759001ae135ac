//! # Store Repository
//!
//! Read access to the retail locations. The rows are seeded by the initial
//! migration; there is no write path.

use sqlx::SqlitePool;

use crate::error::DbResult;
use matvic_core::Store;

/// Repository for store lookups.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    /// Creates a new StoreRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// All stores, by id.
    pub async fn list(&self) -> DbResult<Vec<Store>> {
        let stores = sqlx::query_as("SELECT id, name, manager FROM stores ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(stores)
    }

    /// Gets a store by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Store>> {
        let store = sqlx::query_as("SELECT id, name, manager FROM stores WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(store)
    }
}
