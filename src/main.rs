//! Urban Sentinel: binary entrypoint.
//! Boots the Axum HTTP server: logging and config here, the rest in `build_app`.
//!
//! See `README.md` for quickstart and `DESIGN.md` for architecture notes.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use urban_sentinel::{build_app, SentinelConfig};

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
/// `RUST_LOG` wins over the built-in filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("urban_sentinel=info,sentinel=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may already have installed a subscriber; keep it in that case.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = SentinelConfig::load().context("loading sentinel config")?;
    let router = build_app(cfg).await?;

    Ok(router.into())
}
