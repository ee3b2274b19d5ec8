use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Error;
use async_trait::async_trait;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::PgPool;

use crate::api::auth::{hash_key_value, AuthenticatedPrincipal, Authenticator};
use crate::items::item_models::{InventoryItem, ItemFields, ItemId};
use crate::items::item_store::{ItemStore, StoreError};

const NAME_DESCRIPTION_CONSTRAINT: &str = "inventory_item_name_description_key";

pub fn random_string(prefix: &str, length: usize) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, suffix)
}

/// Creates an API key row and returns the raw key to send as a bearer token.
pub async fn insert_api_key(pool: &PgPool, label: &str) -> Result<String, Error> {
    let key = random_string("inv_", 32);
    sqlx::query("INSERT INTO inventory_api_key (label, secure_value) VALUES ($1, $2)")
        .bind(label)
        .bind(hash_key_value(&key))
        .execute(pool)
        .await?;
    Ok(key)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Default)]
struct MemoryTable {
    rows: BTreeMap<ItemId, InventoryItem>,
    last_id: ItemId,
    calls: usize,
}

impl MemoryTable {
    fn conflicts(&self, fields: &ItemFields, except: Option<ItemId>) -> bool {
        self.rows.values().any(|row| {
            Some(row.id) != except
                && row.name == fields.name
                && row.description == fields.description
        })
    }

    fn integrity_violation() -> StoreError {
        StoreError::IntegrityViolation(Some(NAME_DESCRIPTION_CONSTRAINT.to_string()))
    }

    fn insert(&mut self, fields: ItemFields) -> Result<InventoryItem, StoreError> {
        if self.conflicts(&fields, None) {
            return Err(Self::integrity_violation());
        }
        self.last_id += 1;
        let now = Utc::now();
        let item = InventoryItem {
            id: self.last_id,
            name: fields.name,
            description: fields.description,
            quantity: fields.quantity,
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(item.id, item.clone());
        Ok(item)
    }
}

/// An `ItemStore` over a map, with the same `(name, description)` uniqueness
/// and id sequence as the postgres table. Clones share the same rows.
#[derive(Clone, Default)]
pub struct MemoryItemStore {
    table: Arc<Mutex<MemoryTable>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row directly, without counting it as a store call.
    pub fn seed(&self, fields: ItemFields) -> InventoryItem {
        lock(&self.table)
            .insert(fields)
            .unwrap_or_else(|e| panic!("Failed to seed item: {e}"))
    }

    pub fn len(&self) -> usize {
        lock(&self.table).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `ItemStore` calls made so far.
    pub fn call_count(&self) -> usize {
        lock(&self.table).calls
    }

    fn table(&self) -> MutexGuard<'_, MemoryTable> {
        let mut table = lock(&self.table);
        table.calls += 1;
        table
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list(&self) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(self.table().rows.values().cloned().collect())
    }

    async fn get(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.table().rows.get(&id).cloned())
    }

    async fn insert(&self, fields: ItemFields) -> Result<InventoryItem, StoreError> {
        self.table().insert(fields)
    }

    async fn update(
        &self,
        id: ItemId,
        fields: ItemFields,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let mut table = self.table();
        if !table.rows.contains_key(&id) {
            return Ok(None);
        }
        if table.conflicts(&fields, Some(id)) {
            return Err(MemoryTable::integrity_violation());
        }

        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        row.name = fields.name;
        row.description = fields.description;
        row.quantity = fields.quantity;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        Ok(self.table().rows.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Accepts a fixed set of raw keys.
#[derive(Clone, Default)]
pub struct MemoryAuthenticator {
    keys: HashMap<String, AuthenticatedPrincipal>,
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: &str, label: &str) -> Self {
        let principal = AuthenticatedPrincipal {
            key_id: self.keys.len() as i64 + 1,
            label: label.to_string(),
        };
        self.keys.insert(hash_key_value(key), principal);
        self
    }
}

#[async_trait]
impl Authenticator for MemoryAuthenticator {
    async fn authenticate(&self, key: &str) -> Result<Option<AuthenticatedPrincipal>, StoreError> {
        Ok(self.keys.get(&hash_key_value(key)).cloned())
    }
}
