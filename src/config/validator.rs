//! Entity definition validation: primary keys, field references, unique path segments.

use crate::config::{EntityConfig, FieldType};
use crate::error::ConfigError;
use std::collections::HashSet;

/// First path segments owned by fixed routes.
const RESERVED_SEGMENTS: &[&str] = &["token", "users", "health", "ready", "version", "static"];

pub fn validate(configs: &[EntityConfig]) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();
    let mut path_segments = HashSet::new();

    for entity in configs {
        if !ids.insert(entity.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate entity id: {}", entity.id)));
        }
        if RESERVED_SEGMENTS.contains(&entity.path_segment.as_str()) {
            return Err(ConfigError::Validation(format!(
                "path segment {} is reserved",
                entity.path_segment
            )));
        }
        if !path_segments.insert(entity.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(entity.path_segment.clone()));
        }

        let mut names = HashSet::new();
        for f in &entity.fields {
            if !names.insert(f.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate field {} in entity {}",
                    f.name, entity.id
                )));
            }
            if let FieldType::Enum { values } = &f.field_type {
                if values.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "enum field {}.{} has no values",
                        entity.id, f.name
                    )));
                }
            }
        }

        if entity.fields.iter().filter(|f| f.primary_key).count() != 1 {
            return Err(ConfigError::InvalidPrimaryKey(entity.id.clone()));
        }

        let referenced = entity
            .sensitive_fields
            .iter()
            .chain(entity.touch_on_update.iter())
            .chain(entity.asset_key.iter());
        for name in referenced {
            if !names.contains(name.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "field",
                    id: format!("{}.{}", entity.id, name),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::{account_config, builtin, product_config};

    #[test]
    fn builtin_catalog_is_valid() {
        validate(&builtin()).unwrap();
    }

    #[test]
    fn rejects_duplicate_path_segment() {
        let mut other = account_config();
        other.path_segment = "products".into();
        let err = validate(&[product_config(), other]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePathSegment(p) if p == "products"));
    }

    #[test]
    fn rejects_missing_primary_key() {
        let mut product = product_config();
        product.fields.retain(|f| !f.primary_key);
        assert!(matches!(
            validate(&[product]),
            Err(ConfigError::InvalidPrimaryKey(_))
        ));
    }

    #[test]
    fn rejects_reserved_path_segment() {
        let mut account = account_config();
        account.path_segment = "users".into();
        assert!(matches!(validate(&[account]), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unknown_sensitive_field() {
        let mut account = account_config();
        account.sensitive_fields.push("secret".into());
        assert!(matches!(
            validate(&[account]),
            Err(ConfigError::MissingReference { kind: "field", .. })
        ));
    }
}
