use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = i64;

/// A row of `inventory_item`, and the JSON body returned by every item endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mutable columns of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub name: String,
    pub description: String,
    pub quantity: i32,
}

/// A partial set of column changes, as accepted by PATCH.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
}

impl InventoryItem {
    /// Fields after applying `changes`; unset changes keep the current value.
    pub fn merged(&self, changes: ItemChanges) -> ItemFields {
        ItemFields {
            name: changes.name.unwrap_or_else(|| self.name.clone()),
            description: changes
                .description
                .unwrap_or_else(|| self.description.clone()),
            quantity: changes.quantity.unwrap_or(self.quantity),
        }
    }
}

impl From<ItemFields> for ItemChanges {
    fn from(fields: ItemFields) -> Self {
        ItemChanges {
            name: Some(fields.name),
            description: Some(fields.description),
            quantity: Some(fields.quantity),
        }
    }
}
