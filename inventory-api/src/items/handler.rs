//! Sequencing of store and cache calls for each item operation.
//!
//! The store is authoritative. The cache is written after every successful
//! store write, populated on read misses and cleared on delete. Cache failures
//! never fail a request: they are logged and counted, and the operation
//! continues against the store alone.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::items::item_cache::{CacheError, CacheLookup, ItemCache};
use crate::items::item_models::{InventoryItem, ItemChanges, ItemFields, ItemId};
use crate::items::item_store::{ItemStore, StoreError};
use crate::metrics_consts::{
    ITEM_CACHE_INVALIDATION_ERRORS_COUNTER, ITEM_CACHE_REQUESTS_COUNTER,
    ITEM_CACHE_WRITE_ERRORS_COUNTER, ITEM_DUPLICATE_REJECTIONS_COUNTER,
};

#[derive(Error, Debug)]
pub enum ItemError {
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("an item with this name and description already exists")]
    Duplicate,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ItemError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::IntegrityViolation(constraint) => {
                info!(?constraint, "store rejected write");
                metrics::counter!(ITEM_DUPLICATE_REJECTIONS_COUNTER).increment(1);
                ItemError::Duplicate
            }
            other => ItemError::Store(other),
        }
    }
}

#[derive(Clone)]
pub struct ItemHandler {
    store: Arc<dyn ItemStore + Send + Sync>,
    cache: ItemCache,
}

impl ItemHandler {
    pub fn new(store: Arc<dyn ItemStore + Send + Sync>, cache: ItemCache) -> Self {
        ItemHandler { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn ItemStore + Send + Sync> {
        &self.store
    }

    #[instrument(skip_all)]
    pub async fn list(&self) -> Result<Vec<InventoryItem>, ItemError> {
        Ok(self.store.list().await?)
    }

    /// Returns the store's current value. The cache lookup only decides whether
    /// to write a population entry; a cached payload is never returned.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, id: ItemId) -> Result<InventoryItem, ItemError> {
        let item = self.store.get(id).await?.ok_or(ItemError::NotFound(id))?;

        match self.cache.get(id).await {
            Ok(CacheLookup::Fresh(_)) => {
                metrics::counter!(ITEM_CACHE_REQUESTS_COUNTER, "outcome" => "hit").increment(1);
                info!(id, "item found in cache");
            }
            Ok(CacheLookup::Absent) => {
                metrics::counter!(ITEM_CACHE_REQUESTS_COUNTER, "outcome" => "miss").increment(1);
                self.refresh(&item).await;
                info!(id, "caching item");
            }
            Err(CacheError::Corrupted(err)) => {
                metrics::counter!(ITEM_CACHE_REQUESTS_COUNTER, "outcome" => "corrupted")
                    .increment(1);
                warn!(id, error = %err, "replacing unreadable cache entry");
                self.refresh(&item).await;
            }
            Err(err) => {
                metrics::counter!(ITEM_CACHE_REQUESTS_COUNTER, "outcome" => "error").increment(1);
                warn!(id, error = %err, "cache lookup failed, serving from store");
            }
        }

        Ok(item)
    }

    #[instrument(skip_all, fields(name = %fields.name))]
    pub async fn create(&self, fields: ItemFields) -> Result<InventoryItem, ItemError> {
        let item = self.store.insert(fields).await?;
        info!(id = item.id, "item created");

        self.refresh(&item).await;
        Ok(item)
    }

    /// Resolves the item through the read path, applies `changes` on top of it
    /// and writes the full record back. PUT sends every field, PATCH a subset.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: ItemId,
        changes: ItemChanges,
    ) -> Result<InventoryItem, ItemError> {
        let current = self.retrieve(id).await?;
        self.apply(&current, changes).await
    }

    /// Second half of `update`, for callers that resolved `current` with `retrieve`
    /// and validated the request body in between.
    #[instrument(skip_all, fields(id = current.id))]
    pub async fn apply(
        &self,
        current: &InventoryItem,
        changes: ItemChanges,
    ) -> Result<InventoryItem, ItemError> {
        let id = current.id;
        let fields = current.merged(changes);

        let item = self
            .store
            .update(id, fields)
            .await?
            .ok_or(ItemError::NotFound(id))?;
        info!(id, "item updated");

        self.refresh(&item).await;
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn destroy(&self, id: ItemId) -> Result<(), ItemError> {
        if !self.store.delete(id).await? {
            return Err(ItemError::NotFound(id));
        }
        info!(id, "item deleted from the store");

        // The store delete stands even if this fails; the entry then lives until its TTL.
        if let Err(err) = self.cache.invalidate(id).await {
            metrics::counter!(ITEM_CACHE_INVALIDATION_ERRORS_COUNTER).increment(1);
            warn!(id, error = %err, "failed to remove item from cache");
        }
        Ok(())
    }

    async fn refresh(&self, item: &InventoryItem) {
        if let Err(err) = self.cache.set(item).await {
            metrics::counter!(ITEM_CACHE_WRITE_ERRORS_COUNTER).increment(1);
            warn!(id = item.id, error = %err, "failed to cache item");
        }
    }
}
