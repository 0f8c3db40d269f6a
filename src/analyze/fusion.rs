//! Fusion of a keyword candidate and a statistical candidate.
//!
//! - Agreement: keep the shared category.
//! - Disagreement: `w_kw * kw_conf[if kw category] + w_stat * p_stat(c)` for
//!   each of the two categories; higher wins, exact ties go to the keyword side.
//! - Risk: `w_kw * kw_risk + w_stat * base_severity(stat category)`, rounded.
//! - Confidence: `w_kw * kw_conf + w_stat * stat_conf`.
//! - Economic band always comes from the winning category's lexicon entry.
//!
//! An abstaining statistical candidate contributes no category and no
//! confidence. Everything here is pure and deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::lexicon::Lexicon;
use super::Candidate;
use crate::risk::{Caveat, Category, ClassificationResult, RiskLevel, SourceMethod};

/// Keyword vs statistical mix. Normalized to sum to 1 before use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub keyword: f32,
    pub statistical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            keyword: 0.6,
            statistical: 0.4,
        }
    }
}

impl FusionWeights {
    /// `(keyword, statistical)` scaled to sum to 1. Degenerate input falls back to defaults.
    pub fn normalized(&self) -> (f32, f32) {
        let k = self.keyword.max(0.0);
        let s = self.statistical.max(0.0);
        let sum = k + s;
        if !sum.is_finite() || sum <= 1e-6 {
            let d = Self::default();
            return (d.keyword, d.statistical);
        }
        (k / sum, s / sum)
    }

    pub fn validate(&self) -> Result<(), String> {
        let ws = [self.keyword, self.statistical];
        if ws.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(format!("fusion weights must be finite and >= 0: {ws:?}"));
        }
        if ws.iter().sum::<f32>() <= 1e-6 {
            return Err("fusion weights must not all be zero".into());
        }
        Ok(())
    }
}

/// Combine both strategies into the final record.
pub fn fuse(
    kw: &Candidate,
    stat: &Candidate,
    lexicon: &Lexicon,
    weights: &FusionWeights,
    language: &str,
) -> ClassificationResult {
    if stat.abstained {
        let mut result = keyword_only(kw, lexicon, weights, language);
        result.caveats.retain(|c| *c != Caveat::KeywordOnly);
        result.caveats.push(Caveat::StatisticalAbstained);
        return result;
    }

    let (w_kw, w_stat) = weights.normalized();

    let category = if kw.category == stat.category {
        kw.category
    } else {
        let support = |c: Category| {
            let kw_part = if c == kw.category { kw.confidence } else { 0.0 };
            w_kw * kw_part + w_stat * stat.score_for(c)
        };
        if support(stat.category) > support(kw.category) {
            stat.category
        } else {
            kw.category
        }
    };

    let risk = w_kw * f32::from(kw.risk_hint.get()) + w_stat * f32::from(stat.risk_hint.get());
    let risk_level = RiskLevel::from_f32_rounded(risk);
    let confidence = (w_kw * kw.confidence + w_stat * stat.confidence).clamp(0.0, 1.0);

    let keyword_found_nothing = kw.matches.is_empty();
    let source_method = if keyword_found_nothing && category == stat.category {
        SourceMethod::Statistical
    } else {
        SourceMethod::Fused
    };

    build(kw, category, risk_level, confidence, source_method, lexicon, language)
}

/// Degraded path when no statistical model is available.
///
/// Confidence is the keyword share alone (`w_kw * kw_conf`), so it can never
/// exceed what the hybrid path reports for the same text.
pub fn keyword_only(
    kw: &Candidate,
    lexicon: &Lexicon,
    weights: &FusionWeights,
    language: &str,
) -> ClassificationResult {
    let (w_kw, _) = weights.normalized();
    let confidence = (w_kw * kw.confidence).clamp(0.0, 1.0);
    let mut result = build(
        kw,
        kw.category,
        kw.risk_hint,
        confidence,
        SourceMethod::Keyword,
        lexicon,
        language,
    );
    result.caveats.push(Caveat::KeywordOnly);
    result
}

fn build(
    kw: &Candidate,
    category: Category,
    risk_level: RiskLevel,
    confidence: f32,
    source_method: SourceMethod,
    lexicon: &Lexicon,
    language: &str,
) -> ClassificationResult {
    let matched: Vec<String> = kw.matches_for(category).to_vec();
    let summary = summarize(category, risk_level, &matched);
    ClassificationResult {
        category,
        risk_level,
        economic_impact: lexicon.economic_impact(category),
        confidence,
        matched_keywords: matched.into_iter().collect::<BTreeSet<_>>(),
        summary,
        source_method,
        language: language.to_string(),
        caveats: Vec::new(),
    }
}

/// `"<Category> risk, level <n>/5: <up to 3 keywords>"`, keywords in lexicon order.
pub fn summarize(category: Category, risk_level: RiskLevel, keywords: &[String]) -> String {
    let head = format!("{} risk, level {}/5", category.label(), risk_level);
    if keywords.is_empty() {
        return format!("{head}: no matching indicators");
    }
    let top: Vec<&str> = keywords.iter().take(3).map(String::as_str).collect();
    format!("{head}: {}", top.join(", "))
}
