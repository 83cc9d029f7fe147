//! Tender monitor: binary entrypoint.
//! Loads config, wires the live client, lookup table and session, seeds the
//! collection with a mock batch and serves the JSON API.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tender_monitor::config::AppConfig;
use tender_monitor::ingest::lookup::load_lookup_default;
use tender_monitor::ingest::providers::KimdisClient;
use tender_monitor::metrics::Metrics;
use tender_monitor::{api, AppState};

/// `RUST_LOG` filters (default `tender_monitor=info,warn`);
/// `TENDER_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tender_monitor=info,warn"));

    let json = std::env::var("TENDER_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::load_default();
    let metrics = Metrics::init(&config)?;
    let lookup = load_lookup_default(config.org_lookup_path.as_deref());
    let live = KimdisClient::new(config.api_base.clone(), config.request_timeout())?;

    let bind_addr = config.bind_addr.clone();
    let mock = config.mock.clone();
    let state = AppState::new(config, Arc::new(live), lookup);

    // Start with a generated batch so the views have data before the first search.
    let seeded = state.regenerate(mock.days, mock.count, mock.seed).await;
    tracing::info!(
        accepted = seeded.accepted,
        rejected = seeded.rejected.len(),
        seed = mock.seed,
        "initial mock batch installed"
    );

    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "tender monitor listening");
    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
