use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use pill_scheduler::{
    app,
    auth::StaticTokens,
    config::{Config, StoreBackend},
    reset,
    service::ReminderService,
    store::{MemoryStore, PgStore, Store},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            Arc::new(PgStore::connect(url, config.max_connections).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("⚠️ Using in-memory store, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.api_tokens.is_empty() {
        tracing::warn!("⚠️ API_TOKENS is empty, every request will be rejected");
    }

    reset::spawn_daily_reset(store.clone(), config.reset_at);

    let state = AppState {
        service: ReminderService::new(store),
        identity: Arc::new(StaticTokens::new(config.api_tokens.clone())),
    };

    let addr = config.bind_addr;
    tracing::info!("🧠 Server running at {}", addr);

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app(state).into_make_service(),
    )
    .await?;

    Ok(())
}
