//! The authenticated caller, resolved against the live accounts table.

use super::BearerToken;
use crate::auth::Account;
use crate::config::{catalog::ACCOUNT_ENTITY, Access};
use crate::error::AppError;
use crate::service::Repository;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub struct CurrentAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match BearerToken::from_request_parts(parts, state).await {
            Ok(token) => token,
            Err(never) => match never {},
        };
        let accounts = Repository::new(&state.pool, state.registry.require(ACCOUNT_ENTITY)?);
        let account = state
            .auth
            .authorize(&accounts, token.as_deref(), Access::Authenticated)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Not authenticated".into()))?;
        Ok(CurrentAccount(account))
    }
}
