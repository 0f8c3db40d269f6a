// tests/metrics_startup.rs
//
// Installs the global recorder, so it lives in its own test binary with a
// single test.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt as _;

use urban_sentinel::{build_app, SentinelConfig};

#[tokio::test]
async fn startup_gauge_and_help_text_reach_metrics_endpoint() {
    let mut cfg = SentinelConfig::default();
    cfg.model.en_path = Some("/definitely/not/here.json".into());

    let app = build_app(cfg).await.expect("build app");

    let req = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .expect("build GET /metrics");
    let resp = app.oneshot(req).await.expect("oneshot /metrics");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");

    assert!(
        text.contains("# HELP sentinel_keyword_only_variants"),
        "missing gauge description:\n{text}"
    );
    let value: f64 = text
        .lines()
        .find_map(|l| l.strip_prefix("sentinel_keyword_only_variants "))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_else(|| panic!("gauge sample missing:\n{text}"));
    assert_eq!(value, 1.0, "en variant should be reported keyword-only");
}
