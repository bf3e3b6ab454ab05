//! Built-in entity catalog: products and accounts.

use crate::config::types::*;

pub const PRODUCT_ENTITY: &str = "product";
pub const ACCOUNT_ENTITY: &str = "account";

pub const MANUFACTURERS: &[&str] = &["A", "G", "K", "N", "P", "Q", "R"];
pub const PRODUCT_TYPES: &[&str] = &["C", "H"];

/// Nutritional measures in feed column order; `true` marks floating-point fields.
const NUTRITION_FIELDS: &[(&str, bool)] = &[
    ("calories", false),
    ("protein", false),
    ("fat", false),
    ("sodium", false),
    ("fiber", true),
    ("carbo", true),
    ("sugars", false),
    ("potass", false),
    ("vitamins", false),
    ("shelf", false),
    ("weight", true),
    ("cups", true),
    ("rating", true),
];

/// Email address pattern applied to account emails.
pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.\-]+$";

fn symbols(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn product_config() -> EntityConfig {
    let mut fields = vec![
        FieldConfig::new("id", FieldType::Serial).primary_key(),
        FieldConfig::new("name", FieldType::Text { max_length: Some(50) }).unique(),
        FieldConfig::new("mfr", FieldType::Enum { values: symbols(MANUFACTURERS) }),
        FieldConfig::new("type", FieldType::Enum { values: symbols(PRODUCT_TYPES) }),
    ];
    for (name, is_float) in NUTRITION_FIELDS {
        let ty = if *is_float { FieldType::Float } else { FieldType::Integer };
        fields.push(FieldConfig::new(name, ty));
    }
    EntityConfig {
        id: PRODUCT_ENTITY.into(),
        table_name: "products".into(),
        path_segment: "products".into(),
        fields,
        operations: vec![Operation::Read, Operation::Upsert, Operation::Delete],
        read_access: Access::Public,
        write_access: Access::Admin,
        sensitive_fields: Vec::new(),
        touch_on_update: None,
        asset_key: Some("name".into()),
    }
}

pub fn account_config() -> EntityConfig {
    let fields = vec![
        FieldConfig::new("id", FieldType::Serial).primary_key(),
        FieldConfig::new("username", FieldType::Text { max_length: Some(50) })
            .unique()
            .rule(ValidationRule {
                min_length: Some(3),
                pattern: Some("^[A-Za-z0-9_]+$".into()),
                format: None,
                lowercase: true,
            }),
        FieldConfig::new("email", FieldType::Text { max_length: Some(50) })
            .unique()
            .rule(ValidationRule {
                format: Some("email".into()),
                ..ValidationRule::default()
            }),
        FieldConfig::new("password", FieldType::Text { max_length: Some(255) }),
        FieldConfig::new("is_admin", FieldType::Boolean).default_value(FieldDefault::Literal("false".into())),
        FieldConfig::new("created_at", FieldType::Timestamp).default_value(FieldDefault::Now),
        FieldConfig::new("updated_at", FieldType::Timestamp).default_value(FieldDefault::Now),
    ];
    EntityConfig {
        id: ACCOUNT_ENTITY.into(),
        table_name: "accounts".into(),
        path_segment: "accounts".into(),
        fields,
        operations: vec![Operation::Read, Operation::Delete],
        read_access: Access::Admin,
        write_access: Access::Admin,
        sensitive_fields: vec!["password".into()],
        touch_on_update: Some("updated_at".into()),
        asset_key: None,
    }
}

pub fn builtin() -> Vec<EntityConfig> {
    vec![product_config(), account_config()]
}
