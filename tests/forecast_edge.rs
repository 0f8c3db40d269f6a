// tests/forecast_edge.rs
//
// Forecaster behaviour at the edges: degenerate series, gaps, degree 2,
// spikes and bucketing of scored signals.

use chrono::{DateTime, Duration, TimeZone, Utc};

use urban_sentinel::forecast::{bucket_start, forecast, ForecastConfig, ForecastOutcome, TrendPoint};

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
}

fn series(values: &[(i64, f64)]) -> Vec<TrendPoint> {
    values
        .iter()
        .map(|&(d, value)| TrendPoint { bucket: day(d), value })
        .collect()
}

fn fitted(outcome: ForecastOutcome) -> urban_sentinel::forecast::Forecast {
    match outcome {
        ForecastOutcome::Ok(f) => f,
        other => panic!("expected a fit, got {other:?}"),
    }
}

#[test]
fn ten_constant_buckets_are_flat_and_quiet() {
    let pts: Vec<(i64, f64)> = (0..10).map(|d| (d, 0.35)).collect();
    let f = fitted(forecast(&series(&pts), &ForecastConfig::default()));

    assert!(f.coefficients[1].abs() < 1e-9, "slope {}", f.coefficients[1]);
    assert_eq!(f.anomaly_count(), 0);
    for p in &f.projection {
        assert!((p.value - 0.35).abs() < 1e-9);
    }
    assert_eq!(f.projection[0].bucket, day(10));
}

#[test]
fn degree_one_needs_three_points() {
    let cfg = ForecastConfig::default();
    match forecast(&series(&[(0, 0.1), (1, 0.2)]), &cfg) {
        ForecastOutcome::InsufficientData { required, available } => {
            assert_eq!(required, 3);
            assert_eq!(available, 2);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(forecast(&series(&[(0, 0.1), (1, 0.2), (2, 0.3)]), &cfg)
        .as_forecast()
        .is_some());
}

#[test]
fn missing_days_keep_their_spacing() {
    // value = 0.1 + 0.05 * day, with days 2..=4 absent
    let pts = series(&[(0, 0.10), (1, 0.15), (5, 0.35), (6, 0.40)]);
    let f = fitted(forecast(&pts, &ForecastConfig::default()));
    assert!((f.coefficients[1] - 0.05).abs() < 1e-9);
    assert_eq!(f.projection[0].bucket, day(7));
    assert!((f.projection[0].value - 0.45).abs() < 1e-9);
}

#[test]
fn unsorted_input_is_sorted_before_fitting() {
    let pts = series(&[(3, 0.4), (0, 0.1), (2, 0.3), (1, 0.2)]);
    let f = fitted(forecast(&pts, &ForecastConfig::default()));
    let buckets: Vec<_> = f.points.iter().map(|p| p.bucket).collect();
    assert_eq!(buckets, vec![day(0), day(1), day(2), day(3)]);
}

#[test]
fn quadratic_fit_recovers_curvature() {
    let cfg = ForecastConfig {
        degree: 2,
        ..ForecastConfig::default()
    };
    let pts: Vec<(i64, f64)> = (0..6).map(|d| (d, 0.01 * (d * d) as f64 + 0.1)).collect();
    let f = fitted(forecast(&series(&pts), &cfg));
    assert_eq!(f.coefficients.len(), 3);
    assert!((f.coefficients[2] - 0.01).abs() < 1e-9);
    assert!((f.coefficients[0] - 0.1).abs() < 1e-9);
}

#[test]
fn single_spike_is_the_only_anomaly() {
    let mut pts: Vec<(i64, f64)> = (0..12).map(|d| (d, 0.3 + if d % 2 == 0 { 0.01 } else { -0.01 })).collect();
    pts[7].1 = 0.9;
    let f = fitted(forecast(&series(&pts), &ForecastConfig::default()));
    let flagged: Vec<usize> = f
        .anomalies
        .iter()
        .enumerate()
        .filter(|(_, a)| **a)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(flagged, vec![7]);
}

#[test]
fn steep_trend_projection_is_clamped() {
    let pts = series(&[(0, 0.2), (1, 0.5), (2, 0.8), (3, 1.0)]);
    let f = fitted(forecast(&pts, &ForecastConfig::default()));
    assert!(f.projection.iter().all(|p| p.value <= 1.0 && p.value >= 0.0));
    assert_eq!(f.projection.last().map(|p| p.value), Some(1.0));
}

#[test]
fn buckets_align_to_epoch_days() {
    let ts = Utc.with_ymd_and_hms(2026, 3, 1, 17, 45, 12).unwrap();
    assert_eq!(
        bucket_start(ts, Duration::hours(24)),
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(
        bucket_start(ts, Duration::hours(6)),
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    );
}
