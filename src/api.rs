use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::engine::{BatchOutcome, SentinelEngine};
use crate::error::InputError;
use crate::forecast::{forecast, ForecastConfig, ForecastOutcome, TrendPoint};
use crate::priority::{rank, ScoredSignal};
use crate::risk::{Category, ClassificationResult};
use crate::signal::RawSignal;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared, read-only state behind every handler.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<SentinelEngine>,
    signals: Arc<Vec<RawSignal>>,
    clock: Clock,
}

impl AppState {
    pub fn new(engine: Arc<SentinelEngine>, signals: Vec<RawSignal>) -> Self {
        Self {
            engine,
            signals: Arc::new(signals),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn engine(&self) -> &SentinelEngine {
        &self.engine
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/classify", post(classify))
        .route("/analyze", post(analyze))
        .route("/analyze/batch", post(analyze_batch))
        .route("/forecast", post(forecast_series))
        .route("/signals", get(list_signals))
        .route("/alerts", get(list_alerts))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Handler-level failures. Rendered as JSON with a matching status code.
#[derive(Debug)]
pub enum ApiError {
    Input(InputError),
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<T: Serialize> {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<T>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Input(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    message: e.to_string(),
                    error: Some(e),
                }),
            )
                .into_response(),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::<()> { message, error: None }),
            )
                .into_response(),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::<()> { message, error: None }),
            )
                .into_response(),
        }
    }
}

#[derive(Deserialize)]
struct ClassifyReq {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

async fn classify(State(state): State<AppState>, Json(body): Json<ClassifyReq>) -> Json<ClassificationResult> {
    Json(state.engine.classify(&body.text, body.language.as_deref()))
}

async fn analyze(
    State(state): State<AppState>,
    Json(raw): Json<RawSignal>,
) -> Result<Json<ScoredSignal>, ApiError> {
    let scored = state.engine.process(raw, state.now()).map_err(ApiError::Input)?;
    let mut ranked = rank(vec![scored]);
    ranked
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::Internal("ranking lost the signal".into()))
}

async fn run_batch(state: &AppState, raws: Vec<RawSignal>) -> Result<BatchOutcome, ApiError> {
    let engine = state.engine.clone();
    let now = state.now();
    tokio::task::spawn_blocking(move || engine.process_batch(raws, now))
        .await
        .map_err(|e| ApiError::Internal(format!("batch worker failed: {e}")))
}

async fn analyze_batch(
    State(state): State<AppState>,
    Json(raws): Json<Vec<RawSignal>>,
) -> Result<Json<BatchOutcome>, ApiError> {
    run_batch(&state, raws).await.map(Json)
}

#[derive(Deserialize)]
struct ForecastReq {
    #[serde(default)]
    category: Option<Category>,
    points: Vec<TrendPoint>,
    #[serde(default)]
    degree: Option<usize>,
}

#[derive(Serialize)]
struct ForecastResp {
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
    #[serde(flatten)]
    outcome: ForecastOutcome,
}

async fn forecast_series(
    State(state): State<AppState>,
    Json(body): Json<ForecastReq>,
) -> Result<Json<ForecastResp>, ApiError> {
    let cfg = ForecastConfig {
        degree: body.degree.unwrap_or(state.engine.forecast_config().degree),
        ..*state.engine.forecast_config()
    };
    cfg.validate().map_err(ApiError::BadRequest)?;
    Ok(Json(ForecastResp {
        category: body.category,
        outcome: forecast(&body.points, &cfg),
    }))
}

async fn list_signals(State(state): State<AppState>) -> Json<Vec<RawSignal>> {
    Json(state.signals.as_ref().clone())
}

async fn list_alerts(State(state): State<AppState>) -> Result<Json<Vec<ScoredSignal>>, ApiError> {
    let raws = state.signals.as_ref().clone();
    run_batch(&state, raws).await.map(|out| Json(out.alerts))
}
