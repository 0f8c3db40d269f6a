//! Priority scoring and ranking.
//!
//! `priority = w_r*risk + w_e*economic + w_c*credibility + w_t*recency`, with
//! each component in `[0,1]`, weights normalized by their sum and the result
//! clamped to `[0,1]`. "now" is always passed in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::risk::{ClassificationResult, EconomicImpact, RiskLevel};
use crate::signal::Signal;
use crate::source_weights::CredibilityTable;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub risk: f32,
    pub economic: f32,
    pub credibility: f32,
    pub recency: f32,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            risk: 0.4,
            economic: 0.3,
            credibility: 0.2,
            recency: 0.1,
        }
    }
}

impl PriorityWeights {
    fn as_array(&self) -> [f32; 4] {
        [self.risk, self.economic, self.credibility, self.recency]
    }

    /// Weights divided by their sum. Falls back to defaults if the sum is ~0.
    pub fn normalized(&self) -> Self {
        let ws = self.as_array().map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
        let sum: f32 = ws.iter().sum();
        if sum <= 1e-6 {
            return Self::default();
        }
        Self {
            risk: ws[0] / sum,
            economic: ws[1] / sum,
            credibility: ws[2] / sum,
            recency: ws[3] / sum,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let ws = self.as_array();
        if ws.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(format!("priority weights must be finite and >= 0: {ws:?}"));
        }
        if ws.iter().sum::<f32>() <= 1e-6 {
            return Err("priority weights must not all be zero".into());
        }
        Ok(())
    }
}

/// Exponential recency decay: `0.5^(age / half_life)`, floored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecencyConfig {
    pub half_life_hours: f64,
    /// Signals at least this old get `floor`.
    pub horizon_hours: f64,
    pub floor: f64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 24.0,
            horizon_hours: 24.0 * 7.0,
            floor: 0.05,
        }
    }
}

impl RecencyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.half_life_hours.is_finite() && self.half_life_hours > 0.0) {
            return Err(format!("recency half_life_hours must be > 0, got {}", self.half_life_hours));
        }
        if !(self.horizon_hours.is_finite() && self.horizon_hours > 0.0) {
            return Err(format!("recency horizon_hours must be > 0, got {}", self.horizon_hours));
        }
        if !(self.floor > 0.0 && self.floor <= 1.0) {
            return Err(format!("recency floor must be in (0,1], got {}", self.floor));
        }
        Ok(())
    }
}

pub fn risk_component(level: RiskLevel) -> f32 {
    f32::from(level.get()) / f32::from(RiskLevel::MAX.get())
}

pub fn economic_component(band: EconomicImpact) -> f32 {
    match band {
        EconomicImpact::Low => 0.2,
        EconomicImpact::Medium => 0.6,
        EconomicImpact::High => 1.0,
    }
}

/// Recency weight of a signal published at `ts`, seen at `now`.
pub fn recency_weight(ts: DateTime<Utc>, now: DateTime<Utc>, cfg: &RecencyConfig) -> f32 {
    let age_secs = (now - ts).num_milliseconds() as f64 / 1000.0;
    if age_secs <= 0.0 {
        return 1.0;
    }
    let age_hours = age_secs / 3600.0;
    if age_hours >= cfg.horizon_hours {
        return cfg.floor as f32;
    }
    let decayed = 0.5_f64.powf(age_hours / cfg.half_life_hours);
    decayed.max(cfg.floor).min(1.0) as f32
}

/// The four normalized inputs to the priority formula.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PriorityComponents {
    pub risk: f32,
    pub economic: f32,
    pub credibility: f32,
    pub recency: f32,
}

impl PriorityComponents {
    /// Safe constructor with clamping.
    pub fn new(risk: f32, economic: f32, credibility: f32, recency: f32) -> Self {
        fn c(x: f32) -> f32 {
            if x.is_nan() {
                0.0
            } else {
                x.clamp(0.0, 1.0)
            }
        }
        Self {
            risk: c(risk),
            economic: c(economic),
            credibility: c(credibility),
            recency: c(recency),
        }
    }

    /// Weighted sum, clamped to `[0,1]`.
    pub fn combine(&self, weights: &PriorityWeights) -> f32 {
        let w = weights.normalized();
        let raw = w.risk * self.risk
            + w.economic * self.economic
            + w.credibility * self.credibility
            + w.recency * self.recency;
        raw.clamp(0.0, 1.0)
    }
}

/// A classified signal plus its priority. `rank` is 0 until [`rank`] runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSignal {
    pub signal: Signal,
    pub classification: ClassificationResult,
    pub priority_score: f32,
    pub credibility_weight: f32,
    pub recency_weight: f32,
    pub rank: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriorityScorer {
    pub weights: PriorityWeights,
    pub credibility: CredibilityTable,
    pub recency: RecencyConfig,
}

impl PriorityScorer {
    pub fn new(weights: PriorityWeights, credibility: CredibilityTable, recency: RecencyConfig) -> Self {
        Self {
            weights,
            credibility,
            recency,
        }
    }

    pub fn components(
        &self,
        signal: &Signal,
        classification: &ClassificationResult,
        now: DateTime<Utc>,
    ) -> PriorityComponents {
        PriorityComponents::new(
            risk_component(classification.risk_level),
            economic_component(classification.economic_impact),
            self.credibility.weight_for(signal.source()),
            recency_weight(signal.timestamp(), now, &self.recency),
        )
    }

    pub fn score(
        &self,
        signal: Signal,
        classification: ClassificationResult,
        now: DateTime<Utc>,
    ) -> ScoredSignal {
        let parts = self.components(&signal, &classification, now);
        ScoredSignal {
            priority_score: parts.combine(&self.weights),
            credibility_weight: parts.credibility,
            recency_weight: parts.recency,
            signal,
            classification,
            rank: 0,
        }
    }

    /// Recompute recency and priority against a new "now". Rank is reset.
    pub fn rescore(&self, scored: &ScoredSignal, now: DateTime<Utc>) -> ScoredSignal {
        self.score(scored.signal.clone(), scored.classification.clone(), now)
    }
}

/// Total triage order: higher score, then newer, then higher risk, then id.
pub fn compare_priority(a: &ScoredSignal, b: &ScoredSignal) -> Ordering {
    b.priority_score
        .total_cmp(&a.priority_score)
        .then_with(|| b.signal.timestamp().cmp(&a.signal.timestamp()))
        .then_with(|| b.classification.risk_level.cmp(&a.classification.risk_level))
        .then_with(|| a.signal.id().cmp(b.signal.id()))
}

/// Sort by [`compare_priority`] and assign 1-based ranks.
pub fn rank(mut scored: Vec<ScoredSignal>) -> Vec<ScoredSignal> {
    scored.sort_by(compare_priority);
    for (i, s) in scored.iter_mut().enumerate() {
        s.rank = i + 1;
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{Category, SourceMethod};
    use crate::source_weights::SourceType;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn classification(risk: u8, band: EconomicImpact) -> ClassificationResult {
        ClassificationResult {
            category: Category::Flood,
            risk_level: RiskLevel::new(risk).unwrap(),
            economic_impact: band,
            confidence: 0.7,
            matched_keywords: BTreeSet::new(),
            summary: String::new(),
            source_method: SourceMethod::Fused,
            language: "en".into(),
            caveats: vec![],
        }
    }

    fn scored(id: &str, source: SourceType, age: Duration, risk: u8) -> ScoredSignal {
        let sig = Signal::new(id, "text", source, now() - age);
        PriorityScorer::default().score(sig, classification(risk, EconomicImpact::High), now())
    }

    #[test]
    fn recency_decays_by_half_life() {
        let cfg = RecencyConfig::default();
        assert_eq!(recency_weight(now(), now(), &cfg), 1.0);
        assert_eq!(recency_weight(now() + Duration::hours(1), now(), &cfg), 1.0);
        let day = recency_weight(now() - Duration::hours(24), now(), &cfg);
        assert!((day - 0.5).abs() < 1e-6);
        let two_days = recency_weight(now() - Duration::hours(48), now(), &cfg);
        assert!((two_days - 0.25).abs() < 1e-6);
    }

    #[test]
    fn recency_floors_past_horizon() {
        let cfg = RecencyConfig::default();
        let old = recency_weight(now() - Duration::days(30), now(), &cfg);
        assert!((old - 0.05).abs() < 1e-6);
        // 5 days: 0.5^5 = 0.031 < floor
        let five = recency_weight(now() - Duration::days(5), now(), &cfg);
        assert!((five - 0.05).abs() < 1e-6);
    }

    #[test]
    fn top_everything_scores_one() {
        let s = scored("a", SourceType::Government, Duration::zero(), 5);
        assert!((s.priority_score - 1.0).abs() < 1e-6);
        assert_eq!(s.credibility_weight, 1.0);
        assert_eq!(s.rank, 0);
    }

    #[test]
    fn default_weights_example() {
        // risk 3/5, medium, news, 24h old
        let sig = Signal::new("x", "t", SourceType::News, now() - Duration::hours(24));
        let s = PriorityScorer::default().score(sig, classification(3, EconomicImpact::Medium), now());
        let expected = 0.4 * 0.6 + 0.3 * 0.6 + 0.2 * 0.75 + 0.1 * 0.5;
        assert!((s.priority_score - expected).abs() < 1e-5);
    }

    #[test]
    fn more_recent_ranks_higher_when_otherwise_equal() {
        let older = scored("a", SourceType::News, Duration::hours(6), 4);
        let newer = scored("b", SourceType::News, Duration::hours(1), 4);
        let ranked = rank(vec![older, newer]);
        assert_eq!(ranked[0].signal.id(), "b");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert!(ranked[0].priority_score > ranked[1].priority_score);
    }

    #[test]
    fn exact_ties_fall_back_to_id() {
        let a = scored("alpha", SourceType::Citizen, Duration::hours(2), 3);
        let b = scored("beta", SourceType::Citizen, Duration::hours(2), 3);
        let ranked = rank(vec![b, a]);
        assert_eq!(ranked[0].signal.id(), "alpha");
    }

    #[test]
    fn rescore_moves_recency_only() {
        let scorer = PriorityScorer::default();
        let s = scored("a", SourceType::Social, Duration::zero(), 2);
        let later = scorer.rescore(&s, now() + Duration::hours(24));
        assert!((later.recency_weight - 0.5).abs() < 1e-6);
        assert_eq!(later.credibility_weight, s.credibility_weight);
        assert!(later.priority_score < s.priority_score);
    }

    #[test]
    fn weight_validation() {
        assert!(PriorityWeights::default().validate().is_ok());
        let zero = PriorityWeights { risk: 0.0, economic: 0.0, credibility: 0.0, recency: 0.0 };
        assert!(zero.validate().is_err());
        assert_eq!(zero.normalized(), PriorityWeights::default());
        assert!(RecencyConfig { floor: 0.0, ..Default::default() }.validate().is_err());
    }

    fn unit() -> impl Strategy<Value = f32> {
        0.0f32..=1.0
    }

    fn weights() -> impl Strategy<Value = PriorityWeights> {
        (0.0f32..5.0, 0.0f32..5.0, 0.0f32..5.0, 0.0f32..5.0).prop_map(|(r, e, c, t)| {
            PriorityWeights { risk: r, economic: e, credibility: c, recency: t }
        })
    }

    proptest! {
        #[test]
        fn score_stays_in_unit_interval(
            w in weights(),
            r in -2.0f32..3.0, e in -2.0f32..3.0, c in -2.0f32..3.0, t in -2.0f32..3.0,
        ) {
            let s = PriorityComponents::new(r, e, c, t).combine(&w);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn score_is_monotone_in_each_component(
            w in weights(),
            base in (unit(), unit(), unit(), unit()),
            bump in 0.0f32..=1.0,
            which in 0usize..4,
        ) {
            let (r, e, c, t) = base;
            let lo = PriorityComponents::new(r, e, c, t);
            let mut hi = lo;
            match which {
                0 => hi.risk = (r + bump).min(1.0),
                1 => hi.economic = (e + bump).min(1.0),
                2 => hi.credibility = (c + bump).min(1.0),
                _ => hi.recency = (t + bump).min(1.0),
            }
            prop_assert!(hi.combine(&w) >= lo.combine(&w));
        }

        #[test]
        fn recency_is_non_increasing_in_age(a in 0i64..400_000, b in 0i64..400_000) {
            let cfg = RecencyConfig::default();
            let (young, old) = if a <= b { (a, b) } else { (b, a) };
            let wy = recency_weight(now() - Duration::seconds(young), now(), &cfg);
            let wo = recency_weight(now() - Duration::seconds(old), now(), &cfg);
            prop_assert!(wy >= wo);
            prop_assert!((0.05..=1.0).contains(&wo));
        }
    }
}
