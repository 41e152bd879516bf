use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use manualbot_backend::logging;
use manualbot_backend::server;
use manualbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize();
    logging::init(&state.paths);

    let report = state
        .search
        .reload()
        .await
        .context("Failed to load chunk store; run the ingest step and check store/base.json")?;
    tracing::info!(
        "index loaded with {} chunks ({} skipped)",
        report.chunks,
        report.skipped
    );

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(6000);
    let bind_addr = format!("{}:{}", state.config.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app: Router = server::router::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
