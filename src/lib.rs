// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod language;
pub mod metrics;
pub mod priority;
pub mod risk;
pub mod signal;
pub mod source_weights;

// Classification pipeline (normalization, keyword, statistical, fusion)
pub mod analyze;

// Raw signal sources
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::SentinelConfig;
pub use crate::engine::{BatchOutcome, SentinelEngine};
pub use crate::risk::{Category, ClassificationResult, RiskLevel};

use anyhow::Context;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics::Metrics;

/// Load the raw signal dataset served by `/signals` and `/alerts`.
///
/// A missing or unreadable dataset is logged and yields an empty list; the
/// service still answers `/classify` and `/analyze`.
pub async fn load_dataset(path: &Path) -> Vec<signal::RawSignal> {
    let sources: Vec<Box<dyn ingest::types::SignalSource>> =
        vec![Box::new(ingest::providers::JsonFileSource::new(path))];
    let signals = ingest::collect(&sources).await;
    if signals.is_empty() {
        warn!(target: "sentinel::ingest", path = %path.display(), "dataset empty or unavailable");
    } else {
        info!(target: "sentinel::ingest", path = %path.display(), count = signals.len(), "dataset loaded");
    }
    signals
}

/// Wire the service: metrics recorder, engine, dataset, routes.
///
/// The recorder goes in first so the engine's start-up gauge and the ingest
/// counters land in it. Without a recorder the service runs without `/metrics`.
pub async fn build_app(cfg: SentinelConfig) -> anyhow::Result<Router> {
    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let engine = {
        let cfg = cfg.clone();
        tokio::task::spawn_blocking(move || SentinelEngine::from_config(&cfg))
            .await
            .context("engine build task")??
    };
    let signals = load_dataset(&cfg.dataset_path()).await;

    let router = api::router(AppState::new(Arc::new(engine), signals));
    Ok(match metrics {
        Some(m) => router.merge(m.router()),
        None => router,
    })
}
