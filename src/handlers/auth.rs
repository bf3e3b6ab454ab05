//! Login, registration and current-account handlers.

use super::entity::json_body;
use crate::auth::hash_for_storage;
use crate::config::catalog::ACCOUNT_ENTITY;
use crate::error::AppError;
use crate::extractors::{Credentials, CurrentAccount};
use crate::response::{success_created, success_one};
use crate::service::{Repository, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// `POST /token`: exchange credentials for a bearer token.
pub async fn token(State(state): State<AppState>, credentials: Credentials) -> Result<impl IntoResponse, AppError> {
    let accounts = Repository::new(&state.pool, state.registry.require(ACCOUNT_ENTITY)?);
    let account = state
        .auth
        .authenticate(&accounts, &credentials.username, &credentials.password)
        .await?;
    tracing::info!(username = %account.username, "issued token");
    Ok(Json(state.auth.issue_token(&account)?))
}

/// `POST /users/create`: register a non-admin account.
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.registry.require(ACCOUNT_ENTITY)?;
    let Registration {
        username,
        email,
        password,
    } = json_body(body)?;
    let hash = hash_for_storage(&password)?;
    let body = json!({
        "username": username,
        "email": email,
        "password": hash,
        "is_admin": false,
    });
    let fields = match body {
        Value::Object(m) => RequestValidator::validate(m.into_iter().collect(), entity)?,
        _ => return Err(AppError::Internal("registration body is not an object".into())),
    };
    let row = Repository::new(&state.pool, entity).add(&fields).await?;
    tracing::info!(username = ?row.get("username"), "registered account");
    Ok(success_created(entity, row))
}

/// `GET /users/me`: the account the bearer token resolves to.
pub async fn me(State(state): State<AppState>, CurrentAccount(account): CurrentAccount) -> Result<impl IntoResponse, AppError> {
    let entity = state.registry.require(ACCOUNT_ENTITY)?;
    let row = serde_json::to_value(&account).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(success_one(entity, row))
}
