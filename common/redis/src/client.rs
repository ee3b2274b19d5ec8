use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{Client, CustomRedisError};

/// Redis client sharing one multiplexed connection between callers.
///
/// The connection is opened on first use rather than in the constructor, so a
/// service can start while redis is down. When a command fails with a
/// connection-level error the connection is dropped and the next command
/// dials again.
pub struct RedisClient {
    client: redis::Client,
    config: redis::AsyncConnectionConfig,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisClient {
    /// Create a new RedisClient without timeouts.
    pub fn new(addr: String) -> Result<RedisClient, CustomRedisError> {
        Self::with_config(addr, None, None)
    }

    /// Create a new RedisClient.
    ///
    /// `None` timeouts block indefinitely. `Some(Duration::ZERO)` is rejected with
    /// `CustomRedisError::InvalidConfiguration`, use `None` instead.
    pub fn with_config(
        addr: String,
        response_timeout: Option<Duration>,
        connection_timeout: Option<Duration>,
    ) -> Result<RedisClient, CustomRedisError> {
        let client = redis::Client::open(addr)?;

        let mut config = redis::AsyncConnectionConfig::new();
        if let Some(timeout) = response_timeout {
            if timeout.is_zero() {
                return Err(CustomRedisError::InvalidConfiguration(
                    "Redis response timeout cannot be Duration::ZERO - use None for no timeout"
                        .to_string(),
                ));
            }
            config = config.set_response_timeout(timeout);
        }
        if let Some(timeout) = connection_timeout {
            if timeout.is_zero() {
                return Err(CustomRedisError::InvalidConfiguration(
                    "Redis connection timeout cannot be Duration::ZERO - use None for no timeout"
                        .to_string(),
                ));
            }
            config = config.set_connection_timeout(timeout);
        }

        Ok(RedisClient {
            client,
            config,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CustomRedisError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection_with_config(&self.config)
            .await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Forget the shared connection if `err` means it is broken.
    async fn observe<T>(&self, result: Result<T, CustomRedisError>) -> Result<T, CustomRedisError> {
        if let Err(err) = &result {
            if err.is_connection_error() {
                warn!(error = %err, "dropping redis connection");
                *self.connection.lock().await = None;
            }
        }
        result
    }
}

#[async_trait]
impl Client for RedisClient {
    async fn get(&self, k: String) -> Result<String, CustomRedisError> {
        let result = async {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(k).await?;
            value.ok_or(CustomRedisError::NotFound)
        }
        .await;
        self.observe(result).await
    }

    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CustomRedisError> {
        let result = async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(k, v, seconds).await?;
            Ok::<(), CustomRedisError>(())
        }
        .await;
        self.observe(result).await
    }

    async fn del(&self, k: String) -> Result<(), CustomRedisError> {
        let result = async {
            let mut conn = self.connection().await?;
            conn.del::<_, ()>(k).await?;
            Ok::<(), CustomRedisError>(())
        }
        .await;
        self.observe(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_response_timeout_is_rejected() {
        let result = RedisClient::with_config(
            "redis://localhost:6379/".to_string(),
            Some(Duration::ZERO),
            None,
        );
        assert!(matches!(
            result,
            Err(CustomRedisError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_connection_timeout_is_rejected() {
        let result = RedisClient::with_config(
            "redis://localhost:6379/".to_string(),
            None,
            Some(Duration::ZERO),
        );
        assert!(matches!(
            result,
            Err(CustomRedisError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(RedisClient::new("not a url".to_string()).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_surfaces_an_error() {
        // nothing listens on port 1; the first command fails instead of the constructor
        let client = RedisClient::with_config(
            "redis://127.0.0.1:1/".to_string(),
            Some(Duration::from_millis(100)),
            Some(Duration::from_millis(100)),
        )
        .expect("client construction does not connect");

        let result = client.get("item_1".to_string()).await;
        assert!(result.is_err());
        assert!(!matches!(result, Err(CustomRedisError::NotFound)));
    }
}
