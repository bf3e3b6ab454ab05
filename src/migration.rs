//! Apply the registry to the database: schema and one table per entity.
//! Tables are created only when missing unless a reset is requested.

use crate::config::{FieldDefault, FieldDescriptor, FieldType, ResolvedEntity, SchemaRegistry};
use crate::error::AppError;
use crate::sql::{qualified_table, quoted};
use sqlx::PgPool;

/// Column type as declared in DDL.
fn column_type(f: &FieldDescriptor) -> String {
    match &f.field_type {
        FieldType::Serial => "SERIAL".into(),
        FieldType::Integer => "INTEGER".into(),
        FieldType::Float => "DOUBLE PRECISION".into(),
        FieldType::Text { max_length: Some(n) } => format!("VARCHAR({})", n),
        FieldType::Text { max_length: None } => "TEXT".into(),
        FieldType::Enum { .. } => format!("VARCHAR({})", f.max_length().unwrap_or(1)),
        FieldType::Boolean => "BOOLEAN".into(),
        FieldType::Timestamp => "TIMESTAMPTZ".into(),
    }
}

fn sql_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Numbers and booleans pass through; anything else becomes a quoted string literal.
fn default_expr(d: &FieldDefault) -> String {
    match d {
        FieldDefault::Now => "NOW()".into(),
        FieldDefault::Literal(s) => {
            let t = s.trim();
            let is_bool = t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("false");
            let is_number = t.parse::<f64>().map(f64::is_finite).unwrap_or(false);
            if is_bool || is_number {
                t.to_ascii_uppercase()
            } else {
                sql_string(t)
            }
        }
    }
}

fn column_def(f: &FieldDescriptor) -> String {
    let mut def = format!("{} {}", quoted(&f.name), column_type(f));
    if f.primary_key {
        def.push_str(" PRIMARY KEY");
    } else if !f.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = &f.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_expr(d));
    }
    if f.unique && !f.primary_key {
        def.push_str(" UNIQUE");
    }
    if let Some(values) = f.allowed_values() {
        let list: Vec<String> = values.iter().map(|v| sql_string(v)).collect();
        def.push_str(&format!(" CHECK ({} IN ({}))", quoted(&f.name), list.join(", ")));
    }
    def
}

pub fn create_table_sql(entity: &ResolvedEntity) -> String {
    let cols: Vec<String> = entity.fields.iter().map(column_def).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified_table(entity),
        cols.join(",\n  ")
    )
}

/// CREATE SCHEMA, optional DROP TABLE, CREATE TABLE for every registered entity.
pub async fn apply_migrations(pool: &PgPool, registry: &SchemaRegistry, reset: bool) -> Result<(), AppError> {
    let mut schemas: Vec<&str> = registry.entities.iter().map(|e| e.schema_name.as_str()).collect();
    schemas.sort_unstable();
    schemas.dedup();
    for schema in schemas {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
            .execute(pool)
            .await?;
    }

    for entity in &registry.entities {
        if reset {
            tracing::warn!(table = %entity.table_name, "dropping table");
            sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", qualified_table(entity)))
                .execute(pool)
                .await?;
        }
        let sql = create_table_sql(entity);
        tracing::debug!(%sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
        tracing::info!(table = %entity.table_name, schema = %entity.schema_name, "table ready");
    }
    Ok(())
}
