use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const CLASSIFIED_TOTAL: &str = "sentinel_signals_classified_total";
pub const REJECTED_TOTAL: &str = "sentinel_signals_rejected_total";
pub const FORECASTS_TOTAL: &str = "sentinel_forecasts_total";
pub const KEYWORD_ONLY_VARIANTS: &str = "sentinel_keyword_only_variants";
pub const INGEST_SOURCE_ERRORS_TOTAL: &str = "sentinel_ingest_source_errors_total";
pub const INGEST_ARTICLES_TOTAL: &str = "sentinel_ingest_articles_total";

fn describe_all() {
    describe_counter!(CLASSIFIED_TOTAL, "Signals classified, by source method.");
    describe_counter!(REJECTED_TOTAL, "Signals rejected at validation or classification, by reason.");
    describe_counter!(FORECASTS_TOTAL, "Per-category forecasts computed, by status.");
    describe_gauge!(
        KEYWORD_ONLY_VARIANTS,
        "Language variants running without a statistical model."
    );
    describe_counter!(INGEST_SOURCE_ERRORS_TOTAL, "Signal source fetch/parse errors.");
    describe_counter!(INGEST_ARTICLES_TOTAL, "News articles converted into raw signals.");
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    ///
    /// Anything recorded before this call went to the no-op recorder and is
    /// lost, so install before building the engine.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_all();
        Ok(Self { handle })
    }

    /// A handle that is not wired to the global recorder; renders nothing
    /// recorded through the `metrics` macros. Useful in tests.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
