// Energy Prices Dashboard - Web Server

use anyhow::{Context, Result};
use energy_prices::server::{router, AppState};
use energy_prices::{init_tracing, load_observation_table, DashboardConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cfg = DashboardConfig::from_env();
    info!(dataset = %cfg.dataset, "Energy prices dashboard starting");

    // Blocking fetch, once, before serving
    let load_cfg = cfg.clone();
    let table = tokio::task::spawn_blocking(move || {
        let source = load_cfg.dataset_source()?;
        load_observation_table(source.as_ref(), &load_cfg.dataset)
    })
    .await
    .context("Dataset loader panicked")??;

    let state = AppState::new(table, &cfg.dataset);
    info!(rows = state.table().len(), "dataset loaded");

    let app = router(state);

    let addr = cfg.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Server running on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
