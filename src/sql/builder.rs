//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.

use crate::config::{FieldDescriptor, ResolvedEntity};
use crate::sql::filter::{Condition, SortOrder};
use serde_json::Value;
use std::collections::HashMap;

/// Quote identifier for PostgreSQL (safe: only from the registry).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder, cast to the field's type.
    fn push_param(&mut self, field: &FieldDescriptor, v: Value) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), field.pg_type())
    }
}

fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .fields
        .iter()
        .map(|f| quoted(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(entity.pk_field(), id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        qualified_table(entity),
        quoted(&entity.pk),
        ph
    );
    q
}

/// SELECT with AND-ed conditions, ordered by `order` (ties broken by primary key) or by primary key.
pub fn select_where(
    entity: &ResolvedEntity,
    conditions: &[Condition<'_>],
    order: Option<(&FieldDescriptor, SortOrder)>,
    limit: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::with_capacity(conditions.len());
    for c in conditions {
        let ph = q.push_param(c.field, c.value.clone());
        where_parts.push(format!("{} {} {}", quoted(&c.field.name), c.comparator.sql_operator(), ph));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_clause = match order {
        Some((field, dir)) if field.name != entity.pk => format!(
            " ORDER BY {} {}, {} ASC",
            quoted(&field.name),
            dir.sql(),
            quoted(&entity.pk)
        ),
        Some((_, dir)) => format!(" ORDER BY {} {}", quoted(&entity.pk), dir.sql()),
        None => format!(" ORDER BY {}", quoted(&entity.pk)),
    };
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}",
        select_column_list(entity),
        qualified_table(entity),
        where_clause,
        order_clause,
        limit_clause
    );
    q
}

pub fn count(entity: &ResolvedEntity) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) AS \"count\" FROM {}", qualified_table(entity));
    q
}

/// INSERT: columns present in body and known to the entity. Omitted columns take the store default.
pub fn insert(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in &entity.fields {
        let Some(val) = body.get(&f.name) else { continue };
        if f.primary_key && f.has_default {
            continue;
        }
        placeholders.push(q.push_param(f, val.clone()));
        cols.push(quoted(&f.name));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(entity),
            select_column_list(entity)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(entity),
            cols.join(", "),
            placeholders.join(", "),
            select_column_list(entity)
        )
    };
    q
}

/// UPDATE by id: SET only columns present in body, plus the touch-on-update timestamp.
/// Returns None when there is nothing to set.
pub fn update(entity: &ResolvedEntity, id: &Value, body: &HashMap<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in &entity.fields {
        if f.primary_key || entity.touch_on_update.as_deref() == Some(f.name.as_str()) {
            continue;
        }
        let Some(val) = body.get(&f.name) else { continue };
        let ph = q.push_param(f, val.clone());
        sets.push(format!("{} = {}", quoted(&f.name), ph));
    }
    if sets.is_empty() {
        return None;
    }
    if let Some(touch) = &entity.touch_on_update {
        sets.push(format!("{} = NOW()", quoted(touch)));
    }
    let id_ph = q.push_param(entity.pk_field(), id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        quoted(&entity.pk),
        id_ph,
        select_column_list(entity)
    );
    Some(q)
}

/// Row lock used as the existence check inside a mutation.
pub fn lock_by_id(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(entity.pk_field(), id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} FOR UPDATE",
        select_column_list(entity),
        qualified_table(entity),
        quoted(&entity.pk),
        ph
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(entity.pk_field(), id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        quoted(&entity.pk),
        ph,
        select_column_list(entity)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::{builtin, ACCOUNT_ENTITY, PRODUCT_ENTITY};
    use crate::config::{resolve, SchemaRegistry};
    use crate::sql::filter::Comparator;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        resolve(&builtin(), "catalog").unwrap()
    }

    #[test]
    fn select_by_id_casts_the_key() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let q = select_by_id(products, &json!(7));
        assert!(q.sql.starts_with("SELECT \"id\", \"name\", \"mfr\""));
        assert!(q.sql.ends_with("FROM \"catalog\".\"products\" WHERE \"id\" = $1::integer"));
        assert_eq!(q.params, vec![json!(7)]);
    }

    #[test]
    fn select_where_joins_conditions_and_orders_by_first_field() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let calories = products.field("calories").unwrap();
        let mfr = products.field("mfr").unwrap();
        let conditions = [
            Condition { field: calories, comparator: Comparator::Gt, value: json!(100) },
            Condition { field: mfr, comparator: Comparator::Ne, value: json!("K") },
        ];
        let q = select_where(products, &conditions, Some((calories, SortOrder::Desc)), None);
        assert!(q.sql.contains(" WHERE \"calories\" > $1::integer AND \"mfr\" <> $2::text"));
        assert!(q.sql.ends_with(" ORDER BY \"calories\" DESC, \"id\" ASC"));
        assert_eq!(q.params, vec![json!(100), json!("K")]);
    }

    #[test]
    fn select_where_without_conditions_orders_by_pk() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let q = select_where(products, &[], None, Some(1));
        assert!(q.sql.ends_with("FROM \"catalog\".\"products\" ORDER BY \"id\" LIMIT 1"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_skips_serial_key_and_missing_fields() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let body: HashMap<String, Value> = [
            ("id".to_string(), json!(99)),
            ("name".to_string(), json!("Test Flakes")),
            ("rating".to_string(), json!(41.5)),
        ]
        .into_iter()
        .collect();
        let q = insert(products, &body);
        assert!(q.sql.starts_with(
            "INSERT INTO \"catalog\".\"products\" (\"name\", \"rating\") VALUES ($1::text, $2::double precision) RETURNING"
        ));
        assert_eq!(q.params, vec![json!("Test Flakes"), json!(41.5)]);
    }

    #[test]
    fn update_touches_timestamp_only_when_configured() {
        let registry = registry();
        let body: HashMap<String, Value> = [("is_admin".to_string(), json!(true))].into_iter().collect();
        let accounts = registry.entity(ACCOUNT_ENTITY).unwrap();
        let q = update(accounts, &json!(3), &body).unwrap();
        assert!(q.sql.contains("SET \"is_admin\" = $1::boolean, \"updated_at\" = NOW() WHERE \"id\" = $2::integer"));

        let body: HashMap<String, Value> = [("fat".to_string(), json!(1))].into_iter().collect();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let q = update(products, &json!(3), &body).unwrap();
        assert!(!q.sql.contains("NOW()"));
        assert_eq!(q.params, vec![json!(1), json!(3)]);
    }

    #[test]
    fn update_with_nothing_to_set_is_none() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        assert!(update(products, &json!(1), &HashMap::new()).is_none());
    }

    #[test]
    fn delete_returns_the_row() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let q = delete(products, &json!(5));
        assert!(q.sql.starts_with("DELETE FROM \"catalog\".\"products\" WHERE \"id\" = $1::integer RETURNING"));
    }
}
