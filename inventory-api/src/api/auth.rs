use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::api::errors::ApiError;
use crate::items::item_store::StoreError;
use crate::router;

const BEARER_KEYWORD: &str = "bearer";

/// The API key a request was authenticated with.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuthenticatedPrincipal {
    pub key_id: i64,
    pub label: String,
}

/// Resolves a raw API key to the principal that owns it.
#[async_trait]
pub trait Authenticator {
    async fn authenticate(&self, key: &str) -> Result<Option<AuthenticatedPrincipal>, StoreError>;
}

/// Keys are looked up by the sha256 of their value; raw keys are never stored.
pub fn hash_key_value(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Reads `Authorization: Bearer <key>`.
///
/// Returns `Ok(None)` when no bearer credentials were sent at all, and
/// `AuthenticationFailed` when the header uses the bearer scheme but is malformed.
pub fn find_bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::AuthenticationFailed)?;

    let mut parts = value.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_KEYWORD) => {}
        _ => return Ok(None),
    }

    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(Some(token.to_string())),
        _ => Err(ApiError::AuthenticationFailed),
    }
}

pub struct PgApiKeyAuthenticator {
    pool: PgPool,
}

impl PgApiKeyAuthenticator {
    pub fn new(pool: PgPool) -> Self {
        PgApiKeyAuthenticator { pool }
    }
}

#[async_trait]
impl Authenticator for PgApiKeyAuthenticator {
    async fn authenticate(&self, key: &str) -> Result<Option<AuthenticatedPrincipal>, StoreError> {
        let principal = sqlx::query_as::<_, AuthenticatedPrincipal>(
            "SELECT id AS key_id, label FROM inventory_api_key WHERE secure_value = $1",
        )
        .bind(hash_key_value(key))
        .fetch_optional(&self.pool)
        .await?;
        Ok(principal)
    }
}

#[async_trait]
impl FromRequestParts<router::State> for AuthenticatedPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &router::State,
    ) -> Result<Self, Self::Rejection> {
        let token = find_bearer_token(&parts.headers)?.ok_or(ApiError::NotAuthenticated)?;

        match state.authenticator.authenticate(&token).await? {
            Some(principal) => {
                tracing::debug!(key_id = principal.key_id, "request authenticated");
                Ok(principal)
            }
            None => Err(ApiError::AuthenticationFailed),
        }
    }
}
