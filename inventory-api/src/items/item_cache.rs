use std::sync::Arc;

use common_redis::{Client as RedisClient, CustomRedisError};
use thiserror::Error;

use crate::items::item_models::{InventoryItem, ItemId};

pub const ITEM_CACHE_PREFIX: &str = "item_";
pub const DEFAULT_ITEM_CACHE_TTL_SECONDS: u64 = 3600;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(#[from] CustomRedisError),
    #[error("cached payload is not a valid item: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Fresh(InventoryItem),
    Absent,
}

/// Serialized item projections in redis, one key per item, each with a fixed TTL.
#[derive(Clone)]
pub struct ItemCache {
    client: Arc<dyn RedisClient + Send + Sync>,
    ttl_seconds: u64,
}

pub fn cache_key(id: ItemId) -> String {
    format!("{ITEM_CACHE_PREFIX}{id}")
}

impl ItemCache {
    pub fn new(client: Arc<dyn RedisClient + Send + Sync>, ttl_seconds: u64) -> Self {
        ItemCache {
            client,
            ttl_seconds,
        }
    }

    pub async fn get(&self, id: ItemId) -> Result<CacheLookup, CacheError> {
        match self.client.get(cache_key(id)).await {
            Ok(payload) => Ok(CacheLookup::Fresh(serde_json::from_str(&payload)?)),
            Err(CustomRedisError::NotFound) => Ok(CacheLookup::Absent),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the full item, replacing any previous entry and restarting its TTL.
    pub async fn set(&self, item: &InventoryItem) -> Result<(), CacheError> {
        let payload = serde_json::to_string(item)?;
        self.client
            .setex(cache_key(item.id), payload, self.ttl_seconds)
            .await?;
        Ok(())
    }

    pub async fn invalidate(&self, id: ItemId) -> Result<(), CacheError> {
        self.client.del(cache_key(id)).await?;
        Ok(())
    }
}
