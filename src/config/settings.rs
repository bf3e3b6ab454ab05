//! Process settings from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub database_schema: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub seed_file: Option<PathBuf>,
    pub reset_schema: bool,
    pub assets_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub bootstrap_user_password: Option<String>,
    pub bootstrap_admin_password: Option<String>,
    pub schema_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_schema = get("DATABASE_SCHEMA").unwrap_or_else(|| "public".into());
        if !database_schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Invalid {
                name: "DATABASE_SCHEMA",
                reason: "only letters, digits and underscores are allowed".into(),
            });
        }

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/cereal_catalog".into()),
            database_schema,
            max_connections: parse_or(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8000)))?,
            jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            token_ttl_minutes: parse_or(get("TOKEN_TTL_MINUTES"), "TOKEN_TTL_MINUTES", 30)?,
            seed_file: get("SEED_FILE").map(PathBuf::from),
            reset_schema: parse_or(get("RESET_SCHEMA"), "RESET_SCHEMA", false)?,
            assets_dir: get("ASSETS_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("static/images")),
            cors_origins: get("CORS_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            bootstrap_user_password: get("BOOTSTRAP_USER_PASSWORD"),
            bootstrap_admin_password: get("BOOTSTRAP_ADMIN_PASSWORD"),
            schema_file: get("SCHEMA_FILE").map(PathBuf::from),
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let s = settings(&[("JWT_SECRET", "secret")]).unwrap();
        assert_eq!(s.database_schema, "public");
        assert_eq!(s.token_ttl_minutes, 30);
        assert_eq!(s.bind_addr.port(), 8000);
        assert!(!s.reset_schema);
        assert_eq!(s.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(s.seed_file.is_none());
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(matches!(settings(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(matches!(settings(&[("JWT_SECRET", "  ")]), Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = settings(&[("JWT_SECRET", "s"), ("TOKEN_TTL_MINUTES", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TOKEN_TTL_MINUTES", .. }));
        let err = settings(&[("JWT_SECRET", "s"), ("DATABASE_SCHEMA", "x; drop")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DATABASE_SCHEMA", .. }));
    }

    #[test]
    fn parses_origin_list() {
        let s = settings(&[("JWT_SECRET", "s"), ("CORS_ORIGINS", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(s.cors_origins, vec!["http://a.test".to_string(), "http://b.test".to_string()]);
    }
}
