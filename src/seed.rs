//! One-time data import: products from the delimited feed, bootstrap accounts.
//!
//! Both run only against empty tables, so restarts never duplicate rows.

use crate::auth::hash_for_storage;
use crate::config::catalog::{ACCOUNT_ENTITY, PRODUCT_ENTITY};
use crate::config::{ResolvedEntity, SchemaRegistry, Settings};
use crate::error::{AppError, ConfigError};
use crate::service::{Repository, RequestValidator};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::Path;

const DELIMITER: char = ';';
const RATING_FIELD: &str = "rating";

/// Ratings in the feed carry stray thousands separators ("68.402.973"); only the
/// text before the first `.` is kept.
pub fn clean_rating(raw: &str) -> &str {
    raw.split('.').next().unwrap_or(raw).trim()
}

/// Parse feed text into validated rows. The first line names the fields, the second
/// (units) line is skipped, blank lines are ignored.
pub fn parse_products(text: &str, entity: &ResolvedEntity) -> Result<Vec<HashMap<String, Value>>, AppError> {
    let mut lines = text.lines().enumerate();
    let header: Vec<String> = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .map(|(_, l)| l.split(DELIMITER).map(|h| h.trim().to_string()).collect())
        .ok_or_else(|| AppError::Validation("seed file is empty".into()))?;
    for name in &header {
        if entity.field(name).is_none() {
            return Err(AppError::Validation(format!("seed file has unknown column {}", name)));
        }
    }
    lines.next();

    let mut rows = Vec::new();
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let cells: Vec<&str> = line.split(DELIMITER).collect();
        if cells.len() != header.len() {
            return Err(AppError::Validation(format!(
                "line {}: expected {} columns, found {}",
                line_no,
                header.len(),
                cells.len()
            )));
        }
        let mut body = HashMap::with_capacity(header.len());
        for (name, cell) in header.iter().zip(cells) {
            let cell = if name == RATING_FIELD { clean_rating(cell) } else { cell.trim() };
            let value = match entity.field(name) {
                Some(_) if cell.is_empty() => Value::Null,
                Some(f) => f
                    .coerce_str(cell)
                    .map_err(|e| AppError::Validation(format!("line {}: {}", line_no, e)))?,
                None => continue,
            };
            body.insert(name.clone(), value);
        }
        let row = RequestValidator::validate(body, entity).map_err(|e| match e {
            AppError::Validation(m) => AppError::Validation(format!("line {}: {}", line_no, m)),
            other => other,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Import the product feed when the products table is empty. Returns the number of rows added.
pub async fn seed_products(pool: &PgPool, registry: &SchemaRegistry, path: &Path) -> Result<usize, AppError> {
    let products = Repository::new(pool, registry.require(PRODUCT_ENTITY)?);
    if products.count().await? > 0 {
        tracing::info!("products already present, skipping seed import");
        return Ok(0);
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let rows = parse_products(&text, products.entity())?;
    let added = products.add_many(&rows).await?;
    tracing::info!(count = added.len(), file = %path.display(), "imported products");
    Ok(added.len())
}

/// Create the `user` and `admin` accounts when the accounts table is empty.
pub async fn seed_accounts(pool: &PgPool, registry: &SchemaRegistry, settings: &Settings) -> Result<usize, AppError> {
    let entity = registry.require(ACCOUNT_ENTITY)?;
    let accounts = Repository::new(pool, entity);
    if accounts.count().await? > 0 {
        return Ok(0);
    }
    let user_password = settings
        .bootstrap_user_password
        .as_deref()
        .ok_or(ConfigError::Missing("BOOTSTRAP_USER_PASSWORD"))?;
    let admin_password = settings
        .bootstrap_admin_password
        .as_deref()
        .ok_or(ConfigError::Missing("BOOTSTRAP_ADMIN_PASSWORD"))?;

    let mut rows = Vec::with_capacity(2);
    for (username, password, is_admin) in [("user", user_password, false), ("admin", admin_password, true)] {
        let body = json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": hash_for_storage(password)?,
            "is_admin": is_admin,
        });
        if let Value::Object(m) = body {
            rows.push(RequestValidator::validate(m.into_iter().collect(), entity)?);
        }
    }
    let added = accounts.add_many(&rows).await?;
    tracing::info!(count = added.len(), "created bootstrap accounts");
    Ok(added.len())
}
