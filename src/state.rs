//! Shared application state for all routes. The registry is built once and read-only.

use crate::auth::AuthService;
use crate::config::SchemaRegistry;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: Arc<SchemaRegistry>,
    pub auth: Arc<AuthService>,
    /// Directory searched for entity pictures.
    pub assets_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(pool: PgPool, registry: SchemaRegistry, auth: AuthService, assets_dir: PathBuf) -> Self {
        AppState {
            pool,
            registry: Arc::new(registry),
            auth: Arc::new(auth),
            assets_dir: Arc::new(assets_dir),
        }
    }
}
