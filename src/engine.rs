//! # Sentinel Engine
//! Immutable bundle of language variants, weights and scorer settings, built
//! once at start-up and shared behind `Arc`.
//!
//! Per signal: validate → pick the language variant → keyword and statistical
//! candidates → fusion → priority score. Batches run in parallel; a panic
//! inside one signal is caught and reported for that signal only.

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analyze::{
    fuse, keyword_only, Corpus, FusionWeights, KeywordClassifier, Lexicon, NormalizedText,
    RiskClassifier, StatisticalClassifier, StatisticalModel,
};
use crate::config::SentinelConfig;
use crate::error::{InputError, ModelError};
use crate::forecast::{forecast_by_category, ForecastConfig, ForecastOutcome};
use crate::language::{detect_language, primary_subtag, EN, ZH};
use crate::metrics::{
    ensure_metrics_described, CLASSIFIED_TOTAL, FORECASTS_TOTAL, KEYWORD_ONLY_VARIANTS,
    REJECTED_TOTAL,
};
use crate::priority::{rank, PriorityScorer, ScoredSignal};
use crate::risk::{Caveat, Category, ClassificationResult};
use crate::signal::RawSignal;

/// Languages shipped with embedded lexicons and corpora.
pub const BUILTIN_LANGUAGES: [&str; 2] = [EN, ZH];

/// Short SHA-256 prefix used in logs instead of signal text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Lexicon + classifiers for one language.
#[derive(Debug, Clone)]
pub struct LanguageVariant {
    language: String,
    lexicon: Arc<Lexicon>,
    keyword: KeywordClassifier,
    statistical: Option<StatisticalClassifier>,
}

impl LanguageVariant {
    /// Without a model the variant runs keyword-only.
    pub fn new(language: &str, lexicon: Lexicon, model: Option<StatisticalModel>) -> Self {
        let lexicon = Arc::new(lexicon);
        let statistical = model.map(|m| StatisticalClassifier::new(Arc::new(m), lexicon.clone()));
        Self {
            language: primary_subtag(language),
            keyword: KeywordClassifier::new(lexicon.clone()),
            lexicon,
            statistical,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn is_keyword_only(&self) -> bool {
        self.statistical.is_none()
    }

    /// Classify raw text with this variant's lexicon and model.
    pub fn classify(&self, text: &str, weights: &FusionWeights) -> ClassificationResult {
        let normalized = NormalizedText::new(text, self.lexicon.scheme());
        let kw = self.keyword.classify(&normalized);
        match &self.statistical {
            Some(stat) => {
                let st = stat.classify(&normalized);
                fuse(&kw, &st, &self.lexicon, weights, &self.language)
            }
            None => keyword_only(&kw, &self.lexicon, weights, &self.language),
        }
    }
}

fn builtin_lexicon(language: &str) -> anyhow::Result<Lexicon> {
    let lex = match language {
        EN => Lexicon::builtin_en()?,
        ZH => Lexicon::builtin_zh()?,
        other => anyhow::bail!("no embedded lexicon for language `{other}`"),
    };
    Ok(lex)
}

fn load_model(language: &str, cfg: &SentinelConfig) -> Result<StatisticalModel, ModelError> {
    if let Some(path) = cfg.model.path_for(language) {
        return StatisticalModel::load_from_file(path);
    }
    match Corpus::builtin(language) {
        Some(corpus) => StatisticalModel::train(&corpus?, &cfg.model.train_config()),
        None => Err(ModelError::EmptyCorpus),
    }
}

/// A signal that could not be turned into a [`ScoredSignal`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejected {
    pub id: String,
    pub error: InputError,
}

/// Result of a batch run: ranked alerts, per-signal rejections and one
/// forecast per category present among the alerts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub alerts: Vec<ScoredSignal>,
    pub rejected: Vec<Rejected>,
    pub forecasts: BTreeMap<Category, ForecastOutcome>,
}

#[derive(Debug, Clone)]
pub struct SentinelEngine {
    variants: BTreeMap<String, LanguageVariant>,
    default_language: String,
    unknown_language_penalty: f32,
    fusion: FusionWeights,
    scorer: PriorityScorer,
    forecast: ForecastConfig,
    max_clock_skew: Duration,
}

impl SentinelEngine {
    /// Build every built-in language variant from configuration.
    ///
    /// Lexicon problems are fatal. Model problems only degrade that variant
    /// to keyword-only mode.
    pub fn from_config(cfg: &SentinelConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut variants = Vec::with_capacity(BUILTIN_LANGUAGES.len());
        for lang in BUILTIN_LANGUAGES {
            let lexicon = match cfg.lexicon.path_for(lang) {
                Some(path) => Lexicon::load_from_file(path)
                    .with_context(|| format!("loading `{lang}` lexicon from {}", path.display()))?,
                None => builtin_lexicon(lang)?,
            };
            let model = match load_model(lang, cfg) {
                Ok(m) => {
                    info!(
                        target: "sentinel::engine",
                        language = lang,
                        vocabulary = m.vocabulary_size(),
                        "statistical model ready"
                    );
                    Some(m)
                }
                Err(e) => {
                    warn!(
                        target: "sentinel::engine",
                        language = lang,
                        error = %e,
                        "statistical model unavailable, running keyword-only"
                    );
                    None
                }
            };
            variants.push(LanguageVariant::new(lang, lexicon, model));
        }
        Self::from_variants(variants, cfg)
    }

    /// Default configuration with the embedded lexicons and corpora.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_config(&SentinelConfig::default())
    }

    /// Assemble from prepared variants. The configured default language must
    /// be among them.
    pub fn from_variants(variants: Vec<LanguageVariant>, cfg: &SentinelConfig) -> anyhow::Result<Self> {
        ensure_metrics_described();

        let variants: BTreeMap<String, LanguageVariant> = variants
            .into_iter()
            .map(|v| (v.language().to_string(), v))
            .collect();
        let default_language = primary_subtag(&cfg.language.default);
        if !variants.contains_key(&default_language) {
            anyhow::bail!("default language `{default_language}` has no variant");
        }

        let keyword_only = variants.values().filter(|v| v.is_keyword_only()).count();
        gauge!(KEYWORD_ONLY_VARIANTS).set(keyword_only as f64);

        Ok(Self {
            variants,
            default_language,
            unknown_language_penalty: cfg.language.unknown_language_penalty,
            fusion: cfg.fusion,
            scorer: cfg.scorer(),
            forecast: cfg.forecast,
            max_clock_skew: cfg.max_clock_skew(),
        })
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn scorer(&self) -> &PriorityScorer {
        &self.scorer
    }

    pub fn forecast_config(&self) -> &ForecastConfig {
        &self.forecast
    }

    pub fn fusion_weights(&self) -> &FusionWeights {
        &self.fusion
    }

    /// Resolve a language tag (case-insensitive, primary subtag only).
    ///
    /// Returns the variant and whether it is a fallback to the default.
    pub fn variant_for(&self, tag: &str) -> (&LanguageVariant, bool) {
        if let Some(v) = self.variants.get(&primary_subtag(tag)) {
            return (v, false);
        }
        (self.default_variant(), true)
    }

    fn default_variant(&self) -> &LanguageVariant {
        // presence checked in `from_variants`
        &self.variants[&self.default_language]
    }

    /// Classify one text. Without a tag the language is detected from the text.
    pub fn classify(&self, text: &str, language: Option<&str>) -> ClassificationResult {
        let tag = language
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| detect_language(text));
        let (variant, fallback) = self.variant_for(tag);

        let mut result = variant.classify(text, &self.fusion);
        if fallback {
            result.confidence = (result.confidence * self.unknown_language_penalty).clamp(0.0, 1.0);
            result.caveats.insert(0, Caveat::UnknownLanguage);
        }

        counter!(CLASSIFIED_TOTAL, "method" => result.source_method.as_str()).increment(1);
        debug!(
            target: "sentinel::engine",
            id = %anon_hash(text),
            requested = tag,
            language = %result.language,
            category = %result.category,
            risk = result.risk_level.get(),
            confidence = result.confidence,
            method = result.source_method.as_str(),
            "classified"
        );
        result
    }

    /// Validate, classify and score a single signal. Rank stays 0.
    pub fn process(&self, raw: RawSignal, now: DateTime<Utc>) -> Result<ScoredSignal, InputError> {
        let signal = raw.validate(now, self.max_clock_skew).inspect_err(|e| {
            counter!(REJECTED_TOTAL, "reason" => e.reason()).increment(1);
        })?;
        let classification = self.classify(signal.text(), signal.language());
        Ok(self.scorer.score(signal, classification, now))
    }

    /// Process many signals in parallel, rank the survivors and forecast per
    /// category. Failures are collected, never propagated.
    pub fn process_batch(&self, raws: Vec<RawSignal>, now: DateTime<Utc>) -> BatchOutcome {
        let total = raws.len();
        let results: Vec<Result<ScoredSignal, Rejected>> = raws
            .into_par_iter()
            .map(|raw| {
                let id = raw.id_or_placeholder();
                match catch_unwind(AssertUnwindSafe(|| self.process(raw, now))) {
                    Ok(Ok(scored)) => Ok(scored),
                    Ok(Err(error)) => Err(Rejected { id, error }),
                    Err(payload) => {
                        let detail = panic_message(payload.as_ref());
                        counter!(REJECTED_TOTAL, "reason" => "internal").increment(1);
                        Err(Rejected {
                            error: InputError::Internal {
                                id: id.clone(),
                                detail,
                            },
                            id,
                        })
                    }
                }
            })
            .collect();

        let mut alerts = Vec::with_capacity(total);
        let mut rejected = Vec::new();
        for r in results {
            match r {
                Ok(s) => alerts.push(s),
                Err(rej) => {
                    warn!(
                        target: "sentinel::engine",
                        id = %rej.id,
                        reason = rej.error.reason(),
                        "signal rejected"
                    );
                    rejected.push(rej);
                }
            }
        }

        let alerts = rank(alerts);
        let forecasts = self.forecast(&alerts);

        info!(
            target: "sentinel::engine",
            total,
            accepted = alerts.len(),
            rejected = rejected.len(),
            categories = forecasts.len(),
            "batch processed"
        );

        BatchOutcome {
            alerts,
            rejected,
            forecasts,
        }
    }

    /// Forecast every category present in an owned snapshot of scored signals.
    pub fn forecast(&self, scored: &[ScoredSignal]) -> BTreeMap<Category, ForecastOutcome> {
        let out = forecast_by_category(scored, &self.forecast);
        for (category, outcome) in &out {
            counter!(FORECASTS_TOTAL, "status" => outcome.status()).increment(1);
            if let Some(f) = outcome.as_forecast() {
                let anomalies = f.anomaly_count();
                if anomalies > 0 {
                    info!(
                        target: "sentinel::forecast",
                        category = %category,
                        anomalies,
                        residual_std = f.residual_std,
                        "anomalous buckets detected"
                    );
                }
            }
        }
        out
    }

    /// Recompute priorities against a new "now" and re-rank.
    pub fn rescore_all(&self, scored: &[ScoredSignal], now: DateTime<Utc>) -> Vec<ScoredSignal> {
        rank(scored.iter().map(|s| self.scorer.rescore(s, now)).collect())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during classification".to_string()
    }
}
