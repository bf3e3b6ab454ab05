//! Resolved schema registry: entity definitions validated and flattened for runtime use.
//! Built once at start-up and shared read-only with the repository and handlers.

use crate::config::types::{Access, FieldDefault, FieldType, Operation};
use crate::error::AppError;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::{HashMap, HashSet};

/// Validation rule with its pattern compiled.
#[derive(Clone, Debug, Default)]
pub struct ResolvedRule {
    pub min_length: Option<u32>,
    pub pattern: Option<Regex>,
    pub email: Option<Regex>,
    pub lowercase: bool,
}

/// Typed accessor for one field: how to coerce client values and how to cast them in SQL.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    /// Whether the store fills the value when a write omits it.
    pub has_default: bool,
    pub default: Option<FieldDefault>,
    pub rule: ResolvedRule,
}

impl FieldDescriptor {
    /// PostgreSQL type used to cast bound parameters.
    pub fn pg_type(&self) -> &'static str {
        match self.field_type {
            FieldType::Serial | FieldType::Integer => "integer",
            FieldType::Float => "double precision",
            FieldType::Text { .. } | FieldType::Enum { .. } => "text",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamptz",
        }
    }

    /// Maximum string length: explicit for text, longest symbol for enums.
    pub fn max_length(&self) -> Option<u32> {
        match &self.field_type {
            FieldType::Text { max_length } => *max_length,
            FieldType::Enum { values } => values.iter().map(|v| v.chars().count() as u32).max(),
            _ => None,
        }
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        match &self.field_type {
            FieldType::Enum { values } => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Managed by the store: identifiers and defaulted timestamps are never written by clients.
    pub fn is_managed(&self) -> bool {
        self.primary_key || (matches!(self.field_type, FieldType::Timestamp) && self.has_default)
    }

    /// Coerce a raw path or query string into a typed JSON value.
    pub fn coerce_str(&self, raw: &str) -> Result<Value, String> {
        let raw = raw.trim();
        match &self.field_type {
            FieldType::Serial | FieldType::Integer => raw
                .parse::<i32>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| format!("'{}' is not a valid integer for field '{}'", raw, self.name)),
            FieldType::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{}' is not a valid number for field '{}'", raw, self.name)),
            FieldType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' is not a valid boolean for field '{}'", raw, self.name)),
            },
            FieldType::Timestamp => chrono::DateTime::parse_from_rfc3339(raw)
                .map(|d| Value::String(d.to_rfc3339()))
                .map_err(|_| format!("'{}' is not a valid timestamp for field '{}'", raw, self.name)),
            FieldType::Text { .. } | FieldType::Enum { .. } => Ok(Value::String(raw.to_string())),
        }
    }

    /// Check a JSON value against the field type, converting where the intent is unambiguous.
    pub fn coerce_json(&self, v: &Value) -> Result<Value, String> {
        match (&self.field_type, v) {
            (_, Value::Null) => Ok(Value::Null),
            (_, Value::String(s)) if !self.is_textual() => self.coerce_str(s),
            (FieldType::Serial | FieldType::Integer, Value::Number(n)) => {
                // Columns are int4; wider values must not reach the store.
                let int = match n.as_i64() {
                    Some(i) => Some(i),
                    None => n
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64),
                };
                match int {
                    Some(i) => i32::try_from(i)
                        .map(|i| Value::Number(i.into()))
                        .map_err(|_| format!("'{}' is not a valid integer for field '{}'", n, self.name)),
                    None => Err(format!("field '{}' must be an integer", self.name)),
                }
            }
            (FieldType::Float, Value::Number(_)) => Ok(v.clone()),
            (FieldType::Boolean, Value::Bool(_)) => Ok(v.clone()),
            (FieldType::Text { .. } | FieldType::Enum { .. }, Value::String(_)) => Ok(v.clone()),
            _ => Err(format!("field '{}' has the wrong type", self.name)),
        }
    }

    fn is_textual(&self) -> bool {
        matches!(self.field_type, FieldType::Text { .. } | FieldType::Enum { .. })
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub id: String,
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: String,
    pub pk: String,
    pub fields: Vec<FieldDescriptor>,
    pub field_index: HashMap<String, usize>,
    pub operations: Vec<Operation>,
    pub read_access: Access,
    pub write_access: Access,
    pub sensitive_fields: HashSet<String>,
    pub touch_on_update: Option<String>,
    pub asset_key: Option<String>,
}

impl ResolvedEntity {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index.get(name).and_then(|i| self.fields.get(*i))
    }

    pub fn pk_field(&self) -> &FieldDescriptor {
        &self.fields[self.field_index[&self.pk]]
    }

    /// Field usable in client queries. Sensitive fields are reported as unknown.
    pub fn queryable_field(&self, name: &str) -> Result<&FieldDescriptor, AppError> {
        self.field(name)
            .filter(|f| !self.sensitive_fields.contains(&f.name))
            .ok_or_else(|| AppError::InvalidArgument(format!("Invalid field: {}", name)))
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    /// Parse a path id into the primary key's type.
    pub fn parse_id(&self, raw: &str) -> Result<Value, AppError> {
        self.pk_field().coerce_str(raw).map_err(AppError::InvalidArgument)
    }

    /// Remove sensitive fields from a row before it leaves the service.
    pub fn strip_sensitive(&self, mut row: Value) -> Value {
        if let Value::Object(ref mut map) = row {
            for name in &self.sensitive_fields {
                map.remove(name);
            }
        }
        row
    }
}

#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_path: HashMap<String, usize>,
    pub entity_by_id: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path).and_then(|i| self.entities.get(*i))
    }

    pub fn entity(&self, id: &str) -> Option<&ResolvedEntity> {
        self.entity_by_id.get(id).and_then(|i| self.entities.get(*i))
    }

    /// Entity by id, for kinds the service cannot run without.
    pub fn require(&self, id: &str) -> Result<&ResolvedEntity, AppError> {
        self.entity(id)
            .ok_or_else(|| AppError::Internal(format!("entity '{}' is not registered", id)))
    }
}
