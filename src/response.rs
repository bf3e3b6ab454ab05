//! Success response helpers. Bodies are the bare rows with sensitive fields removed.

use crate::config::ResolvedEntity;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct DetailBody {
    pub detail: String,
}

pub fn success_one(entity: &ResolvedEntity, row: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(entity.strip_sensitive(row)))
}

pub fn success_created(entity: &ResolvedEntity, row: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(entity.strip_sensitive(row)))
}

pub fn success_many(entity: &ResolvedEntity, rows: Vec<Value>) -> (StatusCode, Json<Vec<Value>>) {
    let rows = rows.into_iter().map(|r| entity.strip_sensitive(r)).collect();
    (StatusCode::OK, Json(rows))
}

pub fn detail(message: impl Into<String>) -> (StatusCode, Json<DetailBody>) {
    (
        StatusCode::OK,
        Json(DetailBody {
            detail: message.into(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::{builtin, ACCOUNT_ENTITY};
    use crate::config::resolve;
    use serde_json::json;

    #[test]
    fn rows_never_carry_sensitive_fields() {
        let registry = resolve(&builtin(), "public").unwrap();
        let accounts = registry.entity(ACCOUNT_ENTITY).unwrap();
        let row = json!({"id": 1, "username": "user", "password": "$argon2id$x"});
        let (status, Json(body)) = success_created(accounts, row.clone());
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.get("password").is_none());
        let (_, Json(rows)) = success_many(accounts, vec![row]);
        assert!(rows[0].get("password").is_none());
        assert_eq!(rows[0]["username"], json!("user"));
    }
}
