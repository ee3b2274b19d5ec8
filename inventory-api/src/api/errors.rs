use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::items::handler::ItemError;
use crate::items::item_store::StoreError;

pub const DUPLICATE_ITEM_DETAIL: &str = "An item with this name and description already exists.";

/// Field name to messages, rendered as `{"name": ["This field is required."]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error body shape used by every non-field error: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid fields: {0:?}")]
    Validation(FieldErrors),
    #[error("failed to parse request: {0}")]
    RequestParsingError(String),
    #[error("duplicate name and description")]
    DuplicateItem,
    #[error("not found")]
    NotFound,
    #[error("no authentication credentials provided")]
    NotAuthenticated,
    #[error("invalid token")]
    AuthenticationFailed,
    #[error("database unavailable")]
    DatabaseUnavailable,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::RequestParsingError(_)
            | ApiError::DuplicateItem => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::NotAuthenticated | ApiError::AuthenticationFailed => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ItemError> for ApiError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::NotFound(_) => ApiError::NotFound,
            ItemError::Duplicate => ApiError::DuplicateItem,
            ItemError::Store(StoreError::Unavailable(err)) => {
                tracing::error!("Database unavailable: {}", err);
                ApiError::DatabaseUnavailable
            }
            ItemError::Store(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ItemError::Store(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match self {
            ApiError::Validation(errors) => {
                return (status, Json(errors)).into_response();
            }
            ApiError::RequestParsingError(msg) => format!("JSON parse error - {msg}"),
            ApiError::DuplicateItem => DUPLICATE_ITEM_DETAIL.to_string(),
            ApiError::NotFound => "Not found.".to_string(),
            ApiError::NotAuthenticated => {
                "Authentication credentials were not provided.".to_string()
            }
            ApiError::AuthenticationFailed => "Invalid token.".to_string(),
            ApiError::DatabaseUnavailable => {
                "Our database service is currently unavailable. Please try again later."
                    .to_string()
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "A server error occurred.".to_string()
            }
        };

        let mut response = (status, Json(ErrorDetail { detail })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer realm=\"api\""),
            );
        }
        response
    }
}

/// Body for a payload that is not a JSON object.
pub fn non_field_error(message: String) -> ApiError {
    ApiError::Validation(FieldErrors::from([(
        "non_field_errors".to_string(),
        vec![message],
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_duplicate_item_body() {
        let (status, body) = render(ApiError::DuplicateItem).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"detail": "An item with this name and description already exists."})
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let errors = FieldErrors::from([(
            "name".to_string(),
            vec!["This field is required.".to_string()],
        )]);
        let (status, body) = render(ApiError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"name": ["This field is required."]}));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) = render(ApiError::Internal(
            "relation \"inventory_item\" does not exist".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "A server error occurred."}));
    }

    #[tokio::test]
    async fn test_unauthenticated_responses() {
        let response = ApiError::NotAuthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response
            .headers()
            .contains_key(axum::http::header::WWW_AUTHENTICATE));

        let (_, body) = render(ApiError::AuthenticationFailed).await;
        assert_eq!(body, json!({"detail": "Invalid token."}));
    }

    #[test]
    fn test_item_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(ItemError::NotFound(1)),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(ItemError::Duplicate),
            ApiError::DuplicateItem
        ));
        assert!(matches!(
            ApiError::from(StoreError::Unavailable(sqlx::Error::PoolTimedOut)),
            ApiError::DatabaseUnavailable
        ));
        assert!(matches!(
            ApiError::from(StoreError::Database(sqlx::Error::RowNotFound)),
            ApiError::Internal(_)
        ));
    }
}
