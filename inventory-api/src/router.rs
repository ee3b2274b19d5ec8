use std::future::ready;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api::auth::Authenticator;
use crate::api::endpoint;
use crate::config::Config;
use crate::items::handler::ItemHandler;
use crate::metrics_utils::{setup_metrics_recorder, track_metrics};

#[derive(Clone)]
pub struct State {
    pub item_handler: ItemHandler,
    pub authenticator: Arc<dyn Authenticator + Send + Sync>,
}

pub fn router(
    item_handler: ItemHandler,
    authenticator: Arc<dyn Authenticator + Send + Sync>,
    config: &Config,
) -> Router {
    let state = State {
        item_handler,
        authenticator,
    };

    // liveness/readiness checks
    let status_router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(readiness))
        .route("/_liveness", get(|| ready("ok")));

    let item_collection = get(endpoint::list_items).post(endpoint::create_item);
    let item_detail = get(endpoint::retrieve_item)
        .put(endpoint::update_item)
        .patch(endpoint::partial_update_item)
        .delete(endpoint::destroy_item);

    let items_router = Router::new()
        .route("/api/items", item_collection.clone())
        .route("/api/items/", item_collection)
        .route("/api/items/:id", item_detail.clone())
        .route("/api/items/:id/", item_detail)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(ConcurrencyLimitLayer::new(config.concurrency_limit));

    let router = Router::new()
        .merge(status_router)
        .merge(items_router)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Don't install metrics unless asked to
    // Global metrics recorders can play poorly with e.g. tests
    if !*config.enable_metrics {
        return router;
    }
    match setup_metrics_recorder() {
        Ok(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        Err(e) => {
            tracing::error!("Failed to install metrics recorder: {}", e);
            router
        }
    }
}

pub async fn index() -> &'static str {
    "inventory api"
}

pub async fn readiness(
    axum::extract::State(state): axum::extract::State<State>,
) -> Result<&'static str, (StatusCode, String)> {
    state.item_handler.store().ping().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("database unavailable: {e}"),
        )
    })?;
    Ok("ready")
}
