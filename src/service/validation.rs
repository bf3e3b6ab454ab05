//! Request validation from field descriptors. Runs before any store access.

use crate::config::{FieldDescriptor, ResolvedEntity};
use crate::error::AppError;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full record for insertion: every non-nullable field without a default must be present.
    /// Returns the canonical body (typed values, normalized strings, managed fields removed).
    pub fn validate(
        body: HashMap<String, Value>,
        entity: &ResolvedEntity,
    ) -> Result<HashMap<String, Value>, AppError> {
        let out = Self::validate_partial(body, entity)?;
        for f in &entity.fields {
            if f.nullable || f.has_default || f.is_managed() {
                continue;
            }
            if !out.contains_key(&f.name) {
                return Err(AppError::Validation(format!("{} is required", f.name)));
            }
        }
        Ok(out)
    }

    /// Validate only the fields present in body (partial update).
    pub fn validate_partial(
        body: HashMap<String, Value>,
        entity: &ResolvedEntity,
    ) -> Result<HashMap<String, Value>, AppError> {
        let mut out = HashMap::with_capacity(body.len());
        for (name, v) in body {
            let field = entity
                .field(&name)
                .ok_or_else(|| AppError::Validation(format!("unknown field: {}", name)))?;
            if field.is_managed() {
                tracing::debug!(field = %name, "ignoring store-managed field in request body");
                continue;
            }
            let v = validate_field(field, v)?;
            out.insert(name, v);
        }
        Ok(out)
    }
}

fn validate_field(field: &FieldDescriptor, v: Value) -> Result<Value, AppError> {
    let col = field.name.as_str();
    if v.is_null() {
        if !field.nullable {
            return Err(AppError::Validation(format!("{} cannot be null", col)));
        }
        return Ok(Value::Null);
    }
    let v = field.coerce_json(&v).map_err(AppError::Validation)?;
    let s = match v {
        Value::String(s) => s,
        other => return Ok(other),
    };

    let len = s.chars().count();
    if let Some(max) = field.max_length() {
        if len > max as usize {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                col, max
            )));
        }
    }
    if let Some(min) = field.rule.min_length {
        if len < min as usize {
            return Err(AppError::Validation(format!(
                "{} must be at least {} characters long",
                col, min
            )));
        }
    }
    if let Some(allowed) = field.allowed_values() {
        if !allowed.iter().any(|a| *a == s) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                col,
                allowed.join(", ")
            )));
        }
    }
    if let Some(re) = &field.rule.pattern {
        if !re.is_match(&s) {
            return Err(AppError::Validation(format!("{} does not match required pattern", col)));
        }
    }
    if let Some(re) = &field.rule.email {
        if !re.is_match(&s) {
            return Err(AppError::Validation(format!("{} must be a valid email address", col)));
        }
    }
    if field.rule.lowercase {
        return Ok(Value::String(s.to_lowercase()));
    }
    Ok(Value::String(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::{builtin, ACCOUNT_ENTITY, PRODUCT_ENTITY};
    use crate::config::{resolve, SchemaRegistry};
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        resolve(&builtin(), "public").unwrap()
    }

    fn body(v: Value) -> HashMap<String, Value> {
        match v {
            Value::Object(m) => m.into_iter().collect(),
            _ => unreachable!(),
        }
    }

    fn product() -> Value {
        json!({
            "name": "Test Flakes", "mfr": "K", "type": "C", "calories": 110, "protein": 2,
            "fat": 0, "sodium": 200, "fiber": 1.0, "carbo": 14.0, "sugars": 8, "potass": 35,
            "vitamins": 25, "shelf": 1, "weight": 1.0, "cups": 0.75, "rating": 41.0
        })
    }

    #[test]
    fn accepts_a_complete_product() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let out = RequestValidator::validate(body(product()), products).unwrap();
        assert_eq!(out["calories"], json!(110));
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn rejects_manufacturer_outside_enumeration() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let mut p = product();
        p["mfr"] = json!("Z");
        let err = RequestValidator::validate(body(p), products).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.starts_with("mfr must be one of")));
    }

    #[test]
    fn rejects_overlong_name_and_nulls() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let mut p = product();
        p["name"] = json!("x".repeat(51));
        assert!(matches!(
            RequestValidator::validate(body(p), products),
            Err(AppError::Validation(_))
        ));
        let err = RequestValidator::validate_partial(body(json!({"fat": null})), products).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "fat cannot be null"));
    }

    #[test]
    fn missing_required_field_fails_only_for_full_records() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let mut p = product();
        p.as_object_mut().unwrap().remove("sugars");
        let err = RequestValidator::validate(body(p.clone()), products).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "sugars is required"));
        assert!(RequestValidator::validate_partial(body(p), products).is_ok());
    }

    #[test]
    fn ignores_managed_fields_and_rejects_unknown_ones() {
        let registry = registry();
        let products = registry.entity(PRODUCT_ENTITY).unwrap();
        let out = RequestValidator::validate_partial(body(json!({"id": 5, "fat": 2})), products).unwrap();
        assert!(!out.contains_key("id"));
        assert!(matches!(
            RequestValidator::validate_partial(body(json!({"colour": "red"})), products),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn normalizes_usernames_and_checks_emails() {
        let registry = registry();
        let accounts = registry.entity(ACCOUNT_ENTITY).unwrap();
        let out = RequestValidator::validate(
            body(json!({"username": "Bob_1", "email": "bob@example.com", "password": "hash"})),
            accounts,
        )
        .unwrap();
        assert_eq!(out["username"], json!("bob_1"));

        for bad in ["ab", "bob smith", "bob!"] {
            assert!(RequestValidator::validate_partial(body(json!({"username": bad})), accounts).is_err());
        }
        assert!(RequestValidator::validate_partial(body(json!({"email": "not-an-email"})), accounts).is_err());
    }
}
