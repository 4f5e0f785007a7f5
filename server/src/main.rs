//! celestial-api server.
//!
//! Run from repo root: `cargo run -p celestial-server`
//! Without `DATABASE_URL` the API runs on an in-memory store.

use celestial_api::resource::CATALOG;
use celestial_api::{
    app, apply_migrations, ensure_database_exists, validate_catalog, AppState, MemoryStore, PgStore, Settings, Store,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// How often expired token revocations are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("celestial_api=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    validate_catalog(&CATALOG)?;

    let store: Arc<dyn Store> = match &settings.database_url {
        Some(database_url) => {
            ensure_database_exists(database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect(database_url)
                .await?;
            apply_migrations(&pool, &CATALOG).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; data lives in memory and is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(store, settings);

    let auth = state.auth.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = auth.purge_expired_revocations().await {
                tracing::warn!(error = %e, "revocation purge failed");
            }
        }
    });

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("celestial-api listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
