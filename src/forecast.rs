//! Per-category trend forecasting.
//!
//! Scored signals are bucketed (epoch-aligned, default one day) into mean
//! priority per bucket, a least-squares polynomial of degree 1 or 2 is fitted
//! through the normal equations, and the fit is projected a few buckets ahead.
//! Points whose residual exceeds `k` residual standard deviations are flagged.
//!
//! Everything here works on owned snapshots and has no side effects.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::priority::ScoredSignal;
use crate::risk::Category;

/// Below this the residual spread is treated as zero and nothing is flagged.
const STD_EPSILON: f64 = 1e-9;
const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Polynomial degree, 1 or 2.
    pub degree: usize,
    /// Buckets projected past the last observation.
    pub horizon: usize,
    /// Anomaly threshold in residual standard deviations.
    pub anomaly_k: f64,
    pub bucket_hours: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            degree: 1,
            horizon: 3,
            anomaly_k: 2.0,
            bucket_hours: 24,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=2).contains(&self.degree) {
            return Err(format!("forecast degree must be 1 or 2, got {}", self.degree));
        }
        if self.horizon == 0 {
            return Err("forecast horizon must be >= 1".into());
        }
        if !(self.anomaly_k.is_finite() && self.anomaly_k > 0.0) {
            return Err(format!("forecast anomaly_k must be > 0, got {}", self.anomaly_k));
        }
        if self.bucket_hours == 0 {
            return Err("forecast bucket_hours must be >= 1".into());
        }
        Ok(())
    }

    pub fn bucket_width(&self) -> Duration {
        Duration::hours(i64::from(self.bucket_hours.max(1)))
    }

    /// Fewest points a fit of this degree accepts.
    pub fn min_points(&self) -> usize {
        self.degree + 2
    }
}

/// One bucket of a per-category series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Bucket start (UTC).
    pub bucket: DateTime<Utc>,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub degree: usize,
    /// Polynomial coefficients in ascending powers of the bucket index.
    pub coefficients: Vec<f64>,
    pub points: Vec<TrendPoint>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub anomalies: Vec<bool>,
    pub residual_std: f64,
    pub projection: Vec<TrendPoint>,
}

impl Forecast {
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|a| **a).count()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Ok(Forecast),
    InsufficientData { required: usize, available: usize },
}

impl ForecastOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            ForecastOutcome::Ok(_) => "ok",
            ForecastOutcome::InsufficientData { .. } => "insufficient_data",
        }
    }

    pub fn as_forecast(&self) -> Option<&Forecast> {
        match self {
            ForecastOutcome::Ok(f) => Some(f),
            ForecastOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Epoch-aligned start of the bucket containing `ts`.
pub fn bucket_start(ts: DateTime<Utc>, width: Duration) -> DateTime<Utc> {
    let w = width.num_seconds().max(1);
    let start = ts.timestamp().div_euclid(w) * w;
    Utc.timestamp_opt(start, 0).single().unwrap_or(ts)
}

/// Mean priority per bucket for one category, ascending by bucket. Empty
/// buckets are omitted.
pub fn bucket_series(scored: &[ScoredSignal], category: Category, width: Duration) -> Vec<TrendPoint> {
    let mut sums: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
    for s in scored.iter().filter(|s| s.classification.category == category) {
        let slot = sums
            .entry(bucket_start(s.signal.timestamp(), width))
            .or_insert((0.0, 0));
        slot.0 += f64::from(s.priority_score);
        slot.1 += 1;
    }
    sums.into_iter()
        .map(|(bucket, (sum, n))| TrendPoint {
            bucket,
            value: sum / n as f64,
        })
        .collect()
}

/// Least-squares polynomial coefficients (ascending powers).
///
/// Returns `None` when the normal equations are singular, e.g. fewer
/// distinct `xs` than `degree + 1`.
pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Option<Vec<f64>> {
    let m = degree + 1;
    if xs.len() != ys.len() || xs.len() < m {
        return None;
    }

    // power sums Σx^k for k in 0..=2*degree
    let mut power_sums = vec![0.0; 2 * degree + 1];
    let mut rhs = vec![0.0; m];
    for (&x, &y) in xs.iter().zip(ys) {
        let mut p = 1.0;
        for (k, slot) in power_sums.iter_mut().enumerate() {
            *slot += p;
            if k < m {
                rhs[k] += y * p;
            }
            p *= x;
        }
    }

    let mut a: Vec<Vec<f64>> = (0..m)
        .map(|i| (0..m).map(|j| power_sums[i + j]).collect())
        .collect();
    solve_linear(&mut a, &mut rhs)
}

/// Gaussian elimination with partial pivoting. Consumes `a` and `b`.
fn solve_linear(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Fit, flag and project one series. Points are sorted by bucket first.
pub fn forecast(points: &[TrendPoint], cfg: &ForecastConfig) -> ForecastOutcome {
    let degree = cfg.degree.clamp(1, 2);
    let required = degree + 2;
    if points.len() < required {
        return ForecastOutcome::InsufficientData {
            required,
            available: points.len(),
        };
    }

    let mut points = points.to_vec();
    points.sort_by_key(|p| p.bucket);

    let width = cfg.bucket_width();
    let width_secs = width.num_seconds() as f64;
    let origin = points[0].bucket;
    let xs: Vec<f64> = points
        .iter()
        .map(|p| (p.bucket - origin).num_seconds() as f64 / width_secs)
        .collect();
    let ys: Vec<f64> = points.iter().map(|p| p.value).collect();

    let Some(coefficients) = fit_polynomial(&xs, &ys, degree) else {
        return ForecastOutcome::InsufficientData {
            required,
            available: distinct_count(&xs),
        };
    };

    let fitted: Vec<f64> = xs.iter().map(|&x| evaluate(&coefficients, x)).collect();
    let residuals: Vec<f64> = ys.iter().zip(&fitted).map(|(y, f)| y - f).collect();

    let dof = (points.len() - degree - 1) as f64;
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let residual_std = (ss_res / dof).sqrt();

    let anomalies: Vec<bool> = if residual_std < STD_EPSILON {
        vec![false; residuals.len()]
    } else {
        let limit = cfg.anomaly_k * residual_std;
        residuals.iter().map(|r| r.abs() > limit).collect()
    };

    let last_x = xs.last().copied().unwrap_or(0.0);
    let last_bucket = points[points.len() - 1].bucket;
    let projection: Vec<TrendPoint> = (1..=cfg.horizon)
        .map(|step| TrendPoint {
            bucket: last_bucket + width * step as i32,
            value: evaluate(&coefficients, last_x + step as f64).clamp(0.0, 1.0),
        })
        .collect();

    ForecastOutcome::Ok(Forecast {
        degree,
        coefficients,
        points,
        fitted,
        residuals,
        anomalies,
        residual_std,
        projection,
    })
}

fn distinct_count(xs: &[f64]) -> usize {
    let mut v = xs.to_vec();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v.len()
}

/// One outcome per category present in `scored`.
pub fn forecast_by_category(
    scored: &[ScoredSignal],
    cfg: &ForecastConfig,
) -> BTreeMap<Category, ForecastOutcome> {
    let width = cfg.bucket_width();
    let mut present: Vec<Category> = scored.iter().map(|s| s.classification.category).collect();
    present.sort();
    present.dedup();
    present
        .into_iter()
        .map(|c| (c, forecast(&bucket_series(scored, c, width), cfg)))
        .collect()
}
