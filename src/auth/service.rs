//! Credential verification, token issuance/verification and access checks.
//!
//! Every token verification re-resolves the account through the repository, so a
//! deleted account or a revoked admin flag takes effect on the next request.

use super::password::{hash_password, verify_password};
use super::token::{Claims, TokenKeys, TokenResponse};
use crate::config::Access;
use crate::error::AppError;
use crate::service::Repository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const INVALID_CREDENTIALS: &str = "Incorrect username or password";
const INVALID_TOKEN: &str = "Could not validate credentials";

/// A live account row, without its password hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn from_row(row: &Value) -> Result<Self, AppError> {
        serde_json::from_value(row.clone())
            .map_err(|e| AppError::Internal(format!("malformed account row: {}", e)))
    }
}

pub struct AuthService {
    keys: TokenKeys,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Result<Self, AppError> {
        Ok(AuthService {
            keys: TokenKeys::new(secret, ttl_minutes),
            dummy_hash: hash_password("not-a-real-password")?,
        })
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Check a username/password pair. Unknown users and wrong passwords fail identically.
    pub async fn authenticate(
        &self,
        accounts: &Repository<'_>,
        username: &str,
        password: &str,
    ) -> Result<Account, AppError> {
        let username = username.trim().to_lowercase();
        let row = accounts
            .find_one("username", &Value::String(username.clone()))
            .await?;
        let Some(row) = row else {
            verify_password(password, &self.dummy_hash);
            tracing::warn!(%username, "login for unknown username");
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.into()));
        };
        let stored = row.get("password").and_then(Value::as_str).unwrap_or_default();
        if !verify_password(password, stored) {
            tracing::warn!(%username, "login with wrong password");
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.into()));
        }
        Account::from_row(&row)
    }

    pub fn issue_token(&self, account: &Account) -> Result<TokenResponse, AppError> {
        self.keys.issue(&account.username, account.is_admin)
    }

    /// Validate signature and expiry, then load the account the token names.
    pub async fn verify_token(&self, accounts: &Repository<'_>, token: &str) -> Result<Account, AppError> {
        let Claims { sub, .. } = self.keys.decode(token)?;
        match accounts.find_one("username", &Value::String(sub.clone())).await? {
            Some(row) => Account::from_row(&row),
            None => {
                tracing::warn!(username = %sub, "token names a missing account");
                Err(AppError::Unauthenticated(INVALID_TOKEN.into()))
            }
        }
    }

    pub fn require_admin(account: &Account) -> Result<(), AppError> {
        if account.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not enough permissions".into()))
        }
    }

    /// Enforce an access level. Public access never touches the token or the store.
    pub async fn authorize(
        &self,
        accounts: &Repository<'_>,
        token: Option<&str>,
        access: Access,
    ) -> Result<Option<Account>, AppError> {
        if access == Access::Public {
            return Ok(None);
        }
        let token = token.ok_or_else(|| AppError::Unauthenticated("Not authenticated".into()))?;
        let account = self.verify_token(accounts, token).await?;
        if access == Access::Admin {
            Self::require_admin(&account)?;
        }
        Ok(Some(account))
    }
}

/// Hash a registration password before it reaches the repository.
pub fn hash_for_storage(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("password cannot be empty".into()));
    }
    hash_password(password)
}
