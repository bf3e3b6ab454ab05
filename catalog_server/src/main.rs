//! Catalog server: settings, logging, database bootstrap, then serve.
//!
//! Run from repo root: `cargo run -p catalog_server`

use cereal_catalog::{
    app, apply_migrations, config::catalog, ensure_database_exists, load_from_file, resolve, seed_accounts,
    seed_products, AppState, AuthService, Settings,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("cereal_catalog=info,catalog_server=info,tower_http=info")
            }),
        )
        .init();

    let settings = Settings::from_env()?;

    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;

    let definitions = match &settings.schema_file {
        Some(path) => {
            tracing::info!(file = %path.display(), "loading entity definitions");
            load_from_file(path).await?
        }
        None => catalog::builtin(),
    };
    let registry = resolve(&definitions, &settings.database_schema)?;
    apply_migrations(&pool, &registry, settings.reset_schema).await?;

    if let Some(path) = &settings.seed_file {
        seed_products(&pool, &registry, path).await?;
    }
    seed_accounts(&pool, &registry, &settings).await?;

    let auth = AuthService::new(settings.jwt_secret.as_bytes(), settings.token_ttl_minutes)?;
    let state = AppState::new(pool, registry, auth, settings.assets_dir.clone());
    let router = app(state, &settings.cors_origins);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("catalog server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
