//! Raw entity definitions. Deserializable so a catalog can also be loaded from JSON.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum FieldType {
    /// Auto-incrementing integer identifier.
    Serial,
    Integer,
    Float,
    Text {
        #[serde(default)]
        max_length: Option<u32>,
    },
    Boolean,
    Timestamp,
    /// Categorical value restricted to a fixed set of symbols.
    Enum { values: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDefault {
    /// Current timestamp at write time.
    Now,
    /// Raw SQL literal, e.g. `false`.
    Literal(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Store the lowercased form of the value.
    #[serde(default)]
    pub lowercase: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub default: Option<FieldDefault>,
    #[serde(default)]
    pub validation: ValidationRule,
}

impl FieldConfig {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        FieldConfig {
            name: name.to_string(),
            field_type,
            nullable: false,
            unique: false,
            primary_key: false,
            default: None,
            validation: ValidationRule::default(),
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn rule(mut self, validation: ValidationRule) -> Self {
        self.validation = validation;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Upsert,
    Delete,
}

impl Operation {
    /// Token as written in entity definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
        }
    }
}

/// Who may perform an operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Public,
    Authenticated,
    Admin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: String,
    pub table_name: String,
    pub path_segment: String,
    pub fields: Vec<FieldConfig>,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub read_access: Access,
    #[serde(default = "default_write_access")]
    pub write_access: Access,
    /// Fields never exposed in API responses nor usable as filters.
    #[serde(default)]
    pub sensitive_fields: Vec<String>,
    /// Timestamp field refreshed on every update.
    #[serde(default)]
    pub touch_on_update: Option<String>,
    /// Field whose value names the entity's picture asset.
    #[serde(default)]
    pub asset_key: Option<String>,
}

fn default_write_access() -> Access {
    Access::Admin
}
