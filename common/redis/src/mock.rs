use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Client, CustomRedisError};

/// In-memory stand-in for redis that records every call.
///
/// Values written with `setex` are readable with `get` (TTLs are recorded
/// but never expire). `get_ret`/`set_ret`/`del_ret` override the result for a key,
/// and `unavailable` makes every command fail.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    values: Arc<Mutex<HashMap<String, String>>>,
    get_ret: HashMap<String, Result<String, CustomRedisError>>,
    set_ret: HashMap<String, Result<(), CustomRedisError>>,
    del_ret: HashMap<String, Result<(), CustomRedisError>>,
    unavailable: Option<CustomRedisError>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockRedisValue {
    None,
    StringWithTTL(String, u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
    pub value: MockRedisValue,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_ret(&mut self, key: &str, ret: Result<String, CustomRedisError>) -> Self {
        self.get_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn set_ret(&mut self, key: &str, ret: Result<(), CustomRedisError>) -> Self {
        self.set_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn del_ret(&mut self, key: &str, ret: Result<(), CustomRedisError>) -> Self {
        self.del_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn unavailable(&mut self, err: CustomRedisError) -> Self {
        self.unavailable = Some(err);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        lock(&self.calls).clone()
    }

    /// Calls recorded for one operation, in order.
    pub fn calls_for(&self, op: &str) -> Vec<MockRedisCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    /// Current content of a key, bypassing call recording.
    pub fn stored(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn record(&self, op: &str, key: &str, value: MockRedisValue) {
        lock(&self.calls).push(MockRedisCall {
            op: op.to_string(),
            key: key.to_string(),
            value,
        });
    }

    fn write(&self, key: String, value: String) -> Result<(), CustomRedisError> {
        if let Some(err) = &self.unavailable {
            return Err(err.clone());
        }
        if let Some(ret) = self.set_ret.get(&key) {
            ret.clone()?;
        }
        lock(&self.values).insert(key, value);
        Ok(())
    }
}

#[async_trait]
impl Client for MockRedisClient {
    async fn get(&self, key: String) -> Result<String, CustomRedisError> {
        self.record("get", &key, MockRedisValue::None);

        if let Some(err) = &self.unavailable {
            return Err(err.clone());
        }
        if let Some(ret) = self.get_ret.get(&key) {
            return ret.clone();
        }
        lock(&self.values)
            .get(&key)
            .cloned()
            .ok_or(CustomRedisError::NotFound)
    }

    async fn setex(
        &self,
        key: String,
        value: String,
        seconds: u64,
    ) -> Result<(), CustomRedisError> {
        self.record(
            "setex",
            &key,
            MockRedisValue::StringWithTTL(value.clone(), seconds),
        );
        self.write(key, value)
    }

    async fn del(&self, key: String) -> Result<(), CustomRedisError> {
        self.record("del", &key, MockRedisValue::None);

        if let Some(err) = &self.unavailable {
            return Err(err.clone());
        }
        if let Some(ret) = self.del_ret.get(&key) {
            ret.clone()?;
        }
        lock(&self.values).remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_written_are_read_back() {
        let client = MockRedisClient::new();
        client
            .setex("item_1".to_string(), "payload".to_string(), 60)
            .await
            .unwrap();

        assert_eq!(client.get("item_1".to_string()).await.unwrap(), "payload");
        assert_eq!(
            client.calls_for("setex"),
            vec![MockRedisCall {
                op: "setex".to_string(),
                key: "item_1".to_string(),
                value: MockRedisValue::StringWithTTL("payload".to_string(), 60),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let client = MockRedisClient::new();
        assert!(matches!(
            client.get("item_404".to_string()).await,
            Err(CustomRedisError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_del_removes_the_value() {
        let client = MockRedisClient::new();
        client
            .setex("item_1".to_string(), "x".to_string(), 60)
            .await
            .unwrap();
        client.del("item_1".to_string()).await.unwrap();

        assert_eq!(client.stored("item_1"), None);
        assert_eq!(client.get_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_command_but_records_it() {
        let client = MockRedisClient::new().unavailable(CustomRedisError::Timeout);

        assert!(client.get("k".to_string()).await.is_err());
        assert!(client.setex("k".to_string(), "v".to_string(), 1).await.is_err());
        assert!(client.del("k".to_string()).await.is_err());
        assert_eq!(client.get_calls().len(), 3);
        assert_eq!(client.stored("k"), None);
    }

    #[tokio::test]
    async fn test_overrides_take_precedence() {
        let client = MockRedisClient::new()
            .get_ret("k", Ok("override".to_string()))
            .set_ret("k", Err(CustomRedisError::Timeout));

        assert!(client
            .setex("k".to_string(), "v".to_string(), 60)
            .await
            .is_err());
        assert_eq!(client.get("k".to_string()).await.unwrap(), "override");
    }
}
