use std::time::Duration;

use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::items::item_models::{InventoryItem, ItemFields, ItemId};

const ITEM_COLUMNS: &str = "id, name, description, quantity, created_at, updated_at";

#[derive(Error, Debug)]
pub enum StoreError {
    /// A table constraint rejected the write. Carries the constraint name when known.
    #[error("integrity violation on constraint {0:?}")]
    IntegrityViolation(Option<String>),
    #[error("database unavailable: {0}")]
    Unavailable(sqlx::Error),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    StoreError::IntegrityViolation(db_err.constraint().map(str::to_string))
                }
                _ => StoreError::Database(sqlx::Error::Database(db_err)),
            },
            err @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
                StoreError::Unavailable(err)
            }
            err => StoreError::Database(err),
        }
    }
}

/// The authoritative record store for inventory items.
#[async_trait]
pub trait ItemStore {
    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError>;
    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError>;
    async fn insert(&self, fields: ItemFields) -> Result<InventoryItem, StoreError>;
    /// Overwrites every mutable column and refreshes `updated_at`.
    /// Returns `None` when no row has this id.
    async fn update(
        &self,
        id: ItemId,
        fields: ItemFields,
    ) -> Result<Option<InventoryItem>, StoreError>;
    /// Returns whether a row was deleted.
    async fn delete(&self, id: ItemId) -> Result<bool, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    pub fn new(pool: PgPool) -> Self {
        PgItemStore { pool }
    }

    /// Builds the pool lazily: connections are opened on first use.
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)
            .map_err(StoreError::Database)?;

        Ok(PgItemStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM inventory_item ORDER BY id");
        let rows = sqlx::query_as::<_, InventoryItem>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM inventory_item WHERE id = $1");
        let row = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, fields: ItemFields) -> Result<InventoryItem, StoreError> {
        let query = format!(
            "INSERT INTO inventory_item (name, description, quantity, created_at, updated_at)
             VALUES ($1, $2, $3, NOW(), NOW())
             RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(fields.name)
            .bind(fields.description)
            .bind(fields.quantity)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: ItemId,
        fields: ItemFields,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let query = format!(
            "UPDATE inventory_item
             SET name = $2, description = $3, quantity = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .bind(fields.name)
            .bind(fields.description)
            .bind(fields.quantity)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM inventory_item WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
