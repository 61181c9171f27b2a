use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use guesswhat::{app, store::SqliteStore, AppState, Config, Coordinator};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store = SqliteStore::connect(&config.database_url, config.db_max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let app_state = AppState {
        coordinator: Coordinator::new(Arc::new(store), config.store_timeout),
        config: Arc::new(config.clone()),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "guesswhat listening");

    axum::serve(listener, app(app_state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
