use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::auth::AuthenticatedPrincipal;
use crate::api::errors::ApiError;
use crate::api::types::{parse_full_payload, parse_partial_payload};
use crate::items::item_models::{InventoryItem, ItemId};
use crate::router;

/// Ids that are not integers cannot name an item, so they are reported as missing.
fn parse_item_id(raw: &str) -> Result<ItemId, ApiError> {
    raw.parse::<ItemId>().map_err(|_| ApiError::NotFound)
}

pub async fn list_items(
    principal: AuthenticatedPrincipal,
    State(state): State<router::State>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    tracing::info!(key_id = principal.key_id, "listing items");
    let items = state.item_handler.list().await?;
    Ok(Json(items))
}

pub async fn create_item(
    principal: AuthenticatedPrincipal,
    State(state): State<router::State>,
    body: Bytes,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let fields = parse_full_payload(&body)?;
    tracing::info!(key_id = principal.key_id, name = %fields.name, "creating item");

    let item = state.item_handler.create(fields).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn retrieve_item(
    principal: AuthenticatedPrincipal,
    State(state): State<router::State>,
    Path(id): Path<String>,
) -> Result<Json<InventoryItem>, ApiError> {
    let id = parse_item_id(&id)?;
    tracing::info!(key_id = principal.key_id, id, "retrieving item");

    let item = state.item_handler.retrieve(id).await?;
    Ok(Json(item))
}

pub async fn update_item(
    principal: AuthenticatedPrincipal,
    State(state): State<router::State>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<InventoryItem>, ApiError> {
    let id = parse_item_id(&id)?;
    tracing::info!(key_id = principal.key_id, id, "updating item");

    // The target must exist before the body is looked at
    let current = state.item_handler.retrieve(id).await?;
    let fields = parse_full_payload(&body)?;

    let item = state.item_handler.apply(&current, fields.into()).await?;
    Ok(Json(item))
}

pub async fn partial_update_item(
    principal: AuthenticatedPrincipal,
    State(state): State<router::State>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<InventoryItem>, ApiError> {
    let id = parse_item_id(&id)?;
    tracing::info!(key_id = principal.key_id, id, "partially updating item");

    let current = state.item_handler.retrieve(id).await?;
    let changes = parse_partial_payload(&body)?;

    let item = state.item_handler.apply(&current, changes).await?;
    Ok(Json(item))
}

pub async fn destroy_item(
    principal: AuthenticatedPrincipal,
    State(state): State<router::State>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_item_id(&id)?;
    tracing::info!(key_id = principal.key_id, id, "deleting item");

    state.item_handler.destroy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
