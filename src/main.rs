use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use catalog_search::api::{create_router, AppState};
use catalog_search::config::Config;
use catalog_search::services::{providers::XtreamProvider, SearchSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let provider = XtreamProvider::new(config.catalog_url.clone(), config.request_timeout())
        .context("Failed to build catalog HTTP client")?;
    let session = SearchSession::new(Arc::new(provider), config.search_settings());

    let credentials = config.credentials();
    let state = AppState::new(session, credentials.clone());
    state
        .inner
        .session
        .open(credentials, config.initial_query.as_deref());

    let app = create_router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        address = %addr,
        session_id = %state.inner.session.id(),
        catalog_url = %config.catalog_url,
        "Search host listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    state.inner.session.close();
    Ok(())
}
