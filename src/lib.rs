//! Cereal catalog: a product catalog and account store behind a REST API with
//! bearer-token authentication.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::AuthService;
pub use config::{load_from_file, resolve, ResolvedEntity, SchemaRegistry, Settings};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::app;
pub use seed::{seed_accounts, seed_products};
pub use service::{FilterSpec, Repository, RequestValidator};
pub use state::AppState;
pub use store::ensure_database_exists;
