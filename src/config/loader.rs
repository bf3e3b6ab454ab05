//! Build the schema registry from entity definitions, built-in or loaded from a JSON file.

use crate::config::catalog::EMAIL_PATTERN;
use crate::config::resolved::{FieldDescriptor, ResolvedEntity, ResolvedRule, SchemaRegistry};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Build the registry from definitions (validates first). All tables live in `schema_name`.
pub fn resolve(configs: &[EntityConfig], schema_name: &str) -> Result<SchemaRegistry, ConfigError> {
    validate(configs)?;

    let mut entities = Vec::with_capacity(configs.len());
    let mut entity_by_path = HashMap::new();
    let mut entity_by_id = HashMap::new();

    for config in configs {
        let fields = config
            .fields
            .iter()
            .map(|f| resolve_field(&config.id, f))
            .collect::<Result<Vec<_>, _>>()?;
        let field_index: HashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        let pk = fields
            .iter()
            .find(|f| f.primary_key)
            .map(|f| f.name.clone())
            .ok_or_else(|| ConfigError::InvalidPrimaryKey(config.id.clone()))?;

        let entity = ResolvedEntity {
            id: config.id.clone(),
            schema_name: schema_name.to_string(),
            table_name: config.table_name.clone(),
            path_segment: config.path_segment.clone(),
            pk,
            fields,
            field_index,
            operations: config.operations.clone(),
            read_access: config.read_access,
            write_access: config.write_access,
            sensitive_fields: config.sensitive_fields.iter().cloned().collect::<HashSet<_>>(),
            touch_on_update: config.touch_on_update.clone(),
            asset_key: config.asset_key.clone(),
        };
        entity_by_path.insert(entity.path_segment.clone(), entities.len());
        entity_by_id.insert(entity.id.clone(), entities.len());
        entities.push(entity);
    }

    Ok(SchemaRegistry {
        entities,
        entity_by_path,
        entity_by_id,
    })
}

fn resolve_field(entity_id: &str, f: &FieldConfig) -> Result<FieldDescriptor, ConfigError> {
    let pattern = f
        .validation
        .pattern
        .as_deref()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ConfigError::Validation(format!("invalid pattern for {}.{}: {}", entity_id, f.name, e))
            })
        })
        .transpose()?;
    let email = match f.validation.format.as_deref().map(str::to_lowercase).as_deref() {
        None => None,
        Some("email") => Some(
            Regex::new(EMAIL_PATTERN).map_err(|e| ConfigError::Validation(e.to_string()))?,
        ),
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "unknown format '{}' for {}.{}",
                other, entity_id, f.name
            )))
        }
    };
    Ok(FieldDescriptor {
        name: f.name.clone(),
        field_type: f.field_type.clone(),
        // Primary keys are never null; serial ones are filled by the store.
        nullable: f.nullable && !f.primary_key,
        unique: f.unique,
        primary_key: f.primary_key,
        has_default: f.default.is_some() || matches!(f.field_type, FieldType::Serial),
        default: f.default.clone(),
        rule: ResolvedRule {
            min_length: f.validation.min_length,
            pattern,
            email,
            lowercase: f.validation.lowercase,
        },
    })
}

/// Load entity definitions from a JSON array file.
pub async fn load_from_file(path: &Path) -> Result<Vec<EntityConfig>, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}
