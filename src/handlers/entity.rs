//! Entity handlers: list, read, sorted, field/value, filter, upsert, delete.
//!
//! The entity is resolved from the path segment; allowed operations and access
//! levels come from its definition in the registry.

use crate::auth::Account;
use crate::config::{catalog::ACCOUNT_ENTITY, Access, Operation, ResolvedEntity};
use crate::error::AppError;
use crate::extractors::BearerToken;
use crate::response::{detail, success_created, success_many, success_one};
use crate::service::{FilterSpec, Repository, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FieldValueQuery {
    pub comparison: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpsertQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FilterBody {
    pub filters: Map<String, Value>,
    pub order: Option<String>,
}

/// Resolve the entity for a path segment and check that it supports `op`.
pub(crate) fn entity_for<'a>(
    state: &'a AppState,
    path_segment: &str,
    op: Operation,
) -> Result<&'a ResolvedEntity, AppError> {
    let entity = state
        .registry
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("Unknown resource: {}", path_segment)))?;
    if !entity.allows(op) {
        return Err(AppError::InvalidArgument(format!(
            "{} is not allowed on {}",
            op.as_str(),
            path_segment
        )));
    }
    Ok(entity)
}

/// Enforce the access level `op` requires on `entity`.
pub(crate) async fn authorize(
    state: &AppState,
    entity: &ResolvedEntity,
    op: Operation,
    token: &BearerToken,
) -> Result<Option<Account>, AppError> {
    let access = match op {
        Operation::Read => entity.read_access,
        Operation::Upsert | Operation::Delete => entity.write_access,
    };
    if access == Access::Public {
        return Ok(None);
    }
    let accounts = Repository::new(&state.pool, state.registry.require(ACCOUNT_ENTITY)?);
    state.auth.authorize(&accounts, token.as_deref(), access).await
}

pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(v)| v)
        .map_err(|e| AppError::Validation(e.body_text()))
}

fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::Validation("body must be a JSON object".into())),
    }
}

/// `{field: [comparator, value]}` pairs, in the order the client sent them.
fn filter_specs(filters: Map<String, Value>) -> Result<Vec<FilterSpec>, AppError> {
    filters
        .into_iter()
        .map(|(field, spec)| match spec {
            Value::Array(mut pair) if pair.len() == 2 => {
                let value = pair.pop().unwrap_or(Value::Null);
                let comparator = match pair.pop() {
                    Some(Value::String(c)) => c,
                    _ => {
                        return Err(AppError::InvalidArgument(format!(
                            "comparator for {} must be a string",
                            field
                        )))
                    }
                };
                Ok(FilterSpec {
                    field,
                    comparator,
                    value,
                })
            }
            _ => Err(AppError::InvalidArgument(format!(
                "filter for {} must be [comparator, value]",
                field
            ))),
        })
        .collect()
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    token: BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Read)?;
    authorize(&state, entity, Operation::Read, &token).await?;
    let rows = Repository::new(&state.pool, entity).get_all().await?;
    Ok(success_many(entity, rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    token: BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Read)?;
    authorize(&state, entity, Operation::Read, &token).await?;
    let id = entity.parse_id(&id_str)?;
    let row = Repository::new(&state.pool, entity).get_by_id(&id).await?;
    Ok(success_one(entity, row))
}

pub async fn sorted(
    State(state): State<AppState>,
    Path((path_segment, field)): Path<(String, String)>,
    Query(query): Query<OrderQuery>,
    token: BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Read)?;
    authorize(&state, entity, Operation::Read, &token).await?;
    let order = query.order.as_deref().unwrap_or("asc");
    let rows = Repository::new(&state.pool, entity)
        .get_by_field_sorted(&field, order)
        .await?;
    Ok(success_many(entity, rows))
}

pub async fn field_value(
    State(state): State<AppState>,
    Path((path_segment, field, value)): Path<(String, String, String)>,
    Query(query): Query<FieldValueQuery>,
    token: BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Read)?;
    authorize(&state, entity, Operation::Read, &token).await?;
    let comparison = query.comparison.as_deref().unwrap_or("eq");
    let order = query.order.as_deref().unwrap_or("asc");
    let rows = Repository::new(&state.pool, entity)
        .get_by_field_value(&field, &Value::String(value), comparison, order)
        .await?;
    Ok(success_many(entity, rows))
}

pub async fn filter(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    token: BearerToken,
    body: Result<Json<FilterBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Read)?;
    authorize(&state, entity, Operation::Read, &token).await?;
    let body = json_body(body)?;
    let specs = filter_specs(body.filters)?;
    let order = body.order.as_deref().unwrap_or("asc");
    let rows = Repository::new(&state.pool, entity)
        .get_by_filters(&specs, order)
        .await?;
    Ok(success_many(entity, rows))
}

/// Update when `?id=` is given (partial body, 200), create otherwise (full body, 201).
pub async fn upsert(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(query): Query<UpsertQuery>,
    token: BearerToken,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Upsert)?;
    authorize(&state, entity, Operation::Upsert, &token).await?;
    let body = body_to_map(json_body(body)?)?;
    let repo = Repository::new(&state.pool, entity);
    match query.id.as_deref() {
        Some(id_str) => {
            let id = entity.parse_id(id_str)?;
            let fields = RequestValidator::validate_partial(body, entity)?;
            let row = repo.upsert(Some(&id), &fields).await?;
            Ok(success_one(entity, row))
        }
        None => {
            let fields = RequestValidator::validate(body, entity)?;
            let row = repo.upsert(None, &fields).await?;
            tracing::info!(entity = %entity.id, "created row");
            Ok(success_created(entity, row))
        }
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    token: BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Delete)?;
    let caller = authorize(&state, entity, Operation::Delete, &token).await?;
    let id = entity.parse_id(&id_str)?;
    Repository::new(&state.pool, entity).delete(&id).await?;
    tracing::info!(
        entity = %entity.id,
        id = %id,
        by = caller.as_ref().map(|a| a.username.as_str()).unwrap_or("anonymous"),
        "deleted row"
    );
    Ok(detail(format!("{} {} deleted", entity.id, id)))
}
