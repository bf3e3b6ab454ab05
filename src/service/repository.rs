//! Generic repository: CRUD and filtered queries for any registered entity kind.
//!
//! Every mutation runs in its own transaction. An integrity violation rolls the
//! transaction back explicitly before it is surfaced as `AppError::Conflict`.
//! Queries that match nothing fail with `AppError::NotFound`.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::sql::{self, Comparator, Condition, PgBindValue, QueryBuf, SortOrder};
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;

/// One filter of `get_by_filters`: field name, comparator token, raw value.
#[derive(Clone, Debug)]
pub struct FilterSpec {
    pub field: String,
    pub comparator: String,
    pub value: Value,
}

pub struct Repository<'a> {
    pool: &'a PgPool,
    entity: &'a ResolvedEntity,
}

impl<'a> Repository<'a> {
    pub fn new(pool: &'a PgPool, entity: &'a ResolvedEntity) -> Self {
        Repository { pool, entity }
    }

    pub fn entity(&self) -> &'a ResolvedEntity {
        self.entity
    }

    /// Insert one row. Returns the stored row with its generated identifier.
    pub async fn add(&self, fields: &HashMap<String, Value>) -> Result<Value, AppError> {
        let q = sql::insert(self.entity, fields);
        let mut tx = self.pool.begin().await?;
        match fetch_optional(&mut *tx, &q).await {
            Ok(Some(row)) => {
                tx.commit().await?;
                Ok(row)
            }
            Ok(None) => {
                tx.rollback().await?;
                Err(AppError::Internal("insert returned no row".into()))
            }
            Err(e) => Err(abort(tx, e).await),
        }
    }

    /// Insert many rows in one transaction; any failure rolls back the whole batch.
    pub async fn add_many(&self, rows: &[HashMap<String, Value>]) -> Result<Vec<Value>, AppError> {
        let mut out = Vec::with_capacity(rows.len());
        let mut tx = self.pool.begin().await?;
        for fields in rows {
            let q = sql::insert(self.entity, fields);
            match fetch_optional(&mut *tx, &q).await {
                Ok(Some(row)) => out.push(row),
                Ok(None) => {
                    tx.rollback().await?;
                    return Err(AppError::Internal("insert returned no row".into()));
                }
                Err(e) => return Err(abort(tx, e).await),
            }
        }
        tx.commit().await?;
        Ok(out)
    }

    /// Partial update by id. Fields not mentioned keep their values.
    pub async fn update(&self, id: &Value, fields: &HashMap<String, Value>) -> Result<Value, AppError> {
        let mut tx = self.pool.begin().await?;
        let existing = match fetch_optional(&mut *tx, &sql::lock_by_id(self.entity, id)).await {
            Ok(row) => row,
            Err(e) => return Err(abort(tx, e).await),
        };
        let Some(existing) = existing else {
            tx.rollback().await?;
            return Err(self.not_found_id(id));
        };
        let Some(q) = sql::update(self.entity, id, fields) else {
            tx.commit().await?;
            return Ok(existing);
        };
        match fetch_optional(&mut *tx, &q).await {
            Ok(Some(row)) => {
                tx.commit().await?;
                Ok(row)
            }
            Ok(None) => {
                tx.rollback().await?;
                Err(self.not_found_id(id))
            }
            Err(e) => Err(abort(tx, e).await),
        }
    }

    /// Single mutation entry point: update when an id is given, insert otherwise.
    pub async fn upsert(&self, id: Option<&Value>, fields: &HashMap<String, Value>) -> Result<Value, AppError> {
        match id {
            Some(id) => self.update(id, fields).await,
            None => self.add(fields).await,
        }
    }

    /// Delete by id. Returns the removed row.
    pub async fn delete(&self, id: &Value) -> Result<Value, AppError> {
        let mut tx = self.pool.begin().await?;
        match fetch_optional(&mut *tx, &sql::delete(self.entity, id)).await {
            Ok(Some(row)) => {
                tx.commit().await?;
                Ok(row)
            }
            Ok(None) => {
                tx.rollback().await?;
                Err(self.not_found_id(id))
            }
            Err(e) => Err(abort(tx, e).await),
        }
    }

    pub async fn get_by_id(&self, id: &Value) -> Result<Value, AppError> {
        let q = sql::select_by_id(self.entity, id);
        let mut conn = self.pool.acquire().await?;
        fetch_optional(&mut conn, &q)
            .await?
            .ok_or_else(|| self.not_found_id(id))
    }

    pub async fn get_all(&self) -> Result<Vec<Value>, AppError> {
        let q = sql::select_where(self.entity, &[], None, None);
        self.non_empty(fetch_all(self.pool, &q).await?)
    }

    /// Rows where `field <comparator> value`, sorted by that field.
    pub async fn get_by_field_value(
        &self,
        field: &str,
        value: &Value,
        comparator: &str,
        order: &str,
    ) -> Result<Vec<Value>, AppError> {
        let filter = FilterSpec {
            field: field.to_string(),
            comparator: comparator.to_string(),
            value: value.clone(),
        };
        self.get_by_filters(std::slice::from_ref(&filter), order).await
    }

    /// Every row sorted by `field`.
    pub async fn get_by_field_sorted(&self, field: &str, order: &str) -> Result<Vec<Value>, AppError> {
        let descriptor = self.entity.queryable_field(field)?;
        let order = SortOrder::parse(order)?;
        let q = sql::select_where(self.entity, &[], Some((descriptor, order)), None);
        self.non_empty(fetch_all(self.pool, &q).await?)
    }

    /// Rows matching every filter (logical AND), sorted by the first filter's field.
    pub async fn get_by_filters(&self, filters: &[FilterSpec], order: &str) -> Result<Vec<Value>, AppError> {
        let order = SortOrder::parse(order)?;
        let conditions = filters
            .iter()
            .map(|f| self.condition(f))
            .collect::<Result<Vec<_>, _>>()?;
        let first = conditions
            .first()
            .map(|c| c.field)
            .ok_or_else(|| AppError::InvalidArgument("at least one filter is required".into()))?;
        let q = sql::select_where(self.entity, &conditions, Some((first, order)), None);
        self.non_empty(fetch_all(self.pool, &q).await?)
    }

    /// First row with `field = value`, or None. Not subject to the empty-result policy.
    pub async fn find_one(&self, field: &str, value: &Value) -> Result<Option<Value>, AppError> {
        let descriptor = self
            .entity
            .field(field)
            .ok_or_else(|| AppError::InvalidArgument(format!("Invalid field: {}", field)))?;
        let value = descriptor.coerce_json(value).map_err(AppError::InvalidArgument)?;
        let conditions = [Condition {
            field: descriptor,
            comparator: Comparator::Eq,
            value,
        }];
        let q = sql::select_where(self.entity, &conditions, None, Some(1));
        Ok(fetch_all(self.pool, &q).await?.into_iter().next())
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let q = sql::count(self.entity);
        tracing::debug!(sql = %q.sql, "query");
        let n: i64 = sqlx::query_scalar(&q.sql).fetch_one(self.pool).await?;
        Ok(n)
    }

    fn condition(&self, f: &FilterSpec) -> Result<Condition<'a>, AppError> {
        let descriptor = self.entity.queryable_field(&f.field)?;
        let comparator = Comparator::parse(&f.comparator)?;
        let value = descriptor.coerce_json(&f.value).map_err(AppError::InvalidArgument)?;
        if value.is_null() {
            return Err(AppError::InvalidArgument(format!("filter value for {} cannot be null", f.field)));
        }
        Ok(Condition {
            field: descriptor,
            comparator,
            value,
        })
    }

    fn non_empty(&self, rows: Vec<Value>) -> Result<Vec<Value>, AppError> {
        if rows.is_empty() {
            Err(AppError::NotFound(format!("No {} found", self.entity.table_name)))
        } else {
            Ok(rows)
        }
    }

    fn not_found_id(&self, id: &Value) -> AppError {
        AppError::NotFound(format!("{} {} not found", self.entity.id, id))
    }
}

/// Roll back and translate the store error. Uniqueness violations become conflicts,
/// other constraint violations become validation errors.
async fn abort(tx: Transaction<'_, Postgres>, err: sqlx::Error) -> AppError {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::warn!(error = %rollback_err, "rollback failed");
    }
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let detail = db.constraint().map(|c| format!(" ({})", c)).unwrap_or_default();
            AppError::Conflict(format!("duplicate value violates a uniqueness constraint{}", detail))
        }
        sqlx::Error::Database(db) if db.is_check_violation() || db.is_foreign_key_violation() => {
            AppError::Validation(db.message().to_string())
        }
        _ => AppError::Db(err),
    }
}

fn bind_all<'q>(q: &'q QueryBuf) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

async fn fetch_optional(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<Value>, sqlx::Error> {
    let row = bind_all(q).fetch_optional(conn).await?;
    Ok(row.map(|r| row_to_json(&r)))
}

async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, sqlx::Error> {
    let rows = bind_all(q).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}
