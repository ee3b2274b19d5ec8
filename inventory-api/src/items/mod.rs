pub mod handler;
pub mod item_cache;
pub mod item_models;
pub mod item_store;
