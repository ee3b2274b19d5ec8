use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use redis::ErrorKind as RedisErrorKind;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Not found in redis")]
    NotFound,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl CustomRedisError {
    /// Create a Redis error from an ErrorKind (primarily for testing)
    pub fn from_redis_kind(kind: redis::ErrorKind, description: &'static str) -> Self {
        CustomRedisError::Redis(Arc::new(redis::RedisError::from((kind, description))))
    }

    /// True when the connection that produced this error should not be reused.
    pub fn is_connection_error(&self) -> bool {
        match self {
            CustomRedisError::Timeout => true,
            CustomRedisError::Redis(err) => err.is_io_error() || err.is_connection_dropped(),
            CustomRedisError::NotFound | CustomRedisError::InvalidConfiguration(_) => false,
        }
    }
}

/// The subset of redis commands the services need. Values are UTF-8 strings.
#[async_trait]
pub trait Client {
    /// Returns `CustomRedisError::NotFound` when the key is absent or expired.
    async fn get(&self, k: String) -> Result<String, CustomRedisError>;
    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CustomRedisError>;
    async fn del(&self, k: String) -> Result<(), CustomRedisError>;
}

mod client;
mod mock;

pub use client::RedisClient;
pub use mock::{MockRedisCall, MockRedisClient, MockRedisValue};
