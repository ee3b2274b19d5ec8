use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common_redis::RedisClient;
use tokio::net::TcpListener;

use crate::api::auth::PgApiKeyAuthenticator;
use crate::config::Config;
use crate::items::handler::ItemHandler;
use crate::items::item_cache::ItemCache;
use crate::items::item_store::PgItemStore;
use crate::router;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = match PgItemStore::connect_lazy(
        &config.database_url,
        config.max_pg_connections,
        Duration::from_secs(config.acquire_timeout_secs),
    ) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to create database pool: {}", e);
            return;
        }
    };

    if *config.run_migrations {
        if let Err(e) = sqlx::migrate!("../migrations").run(store.pool()).await {
            tracing::error!("Failed to run migrations: {}", e);
            return;
        }
        tracing::info!("migrations applied");
    }

    // Redis is connected on first use, so the service starts even while it is down
    let redis_client = match RedisClient::with_config(
        config.redis_url.clone(),
        config.redis_response_timeout(),
        config.redis_connection_timeout(),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(
                "Failed to create Redis client for URL {}: {}",
                config.redis_url,
                e
            );
            return;
        }
    };

    let authenticator = Arc::new(PgApiKeyAuthenticator::new(store.pool().clone()));
    let cache = ItemCache::new(redis_client, config.item_cache_ttl_seconds);
    let item_handler = ItemHandler::new(Arc::new(store), cache);

    let app = router::router(item_handler, authenticator, &config);

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {:?}", addr),
        Err(e) => tracing::warn!("listening on an unknown address: {}", e),
    }
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}
