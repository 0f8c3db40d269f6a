// src/config/mod.rs
//! Runtime configuration: `config/sentinel.toml` plus a few env overrides.
//!
//! Every tunable of the core (fusion weights, priority weights, credibility
//! table, recency decay, forecaster) is injected from here; nothing in the
//! core reads the environment itself.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analyze::{FusionWeights, TrainConfig};
use crate::forecast::ForecastConfig;
use crate::language::EN;
use crate::priority::{PriorityScorer, PriorityWeights, RecencyConfig};
use crate::source_weights::CredibilityTable;

pub const ENV_CONFIG_PATH: &str = "SENTINEL_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/sentinel.toml";
pub const ENV_FUSION_KEYWORD_WEIGHT: &str = "SENTINEL_FUSION_KEYWORD_WEIGHT";
pub const ENV_FORECAST_DEGREE: &str = "SENTINEL_FORECAST_DEGREE";
pub const ENV_DATASET_PATH: &str = "SENTINEL_DATASET_PATH";
pub const DEFAULT_DATASET_PATH: &str = "data/sample_signals.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Timestamps later than `now + skew` are rejected.
    pub max_clock_skew_secs: u64,
    pub dataset_path: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_clock_skew_secs: 300,
            dataset_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Variant used for unknown tags.
    pub default: String,
    /// Confidence multiplier applied when falling back to `default`.
    pub unknown_language_penalty: f32,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            default: EN.to_string(),
            unknown_language_penalty: 0.8,
        }
    }
}

/// Where to find pre-trained statistical parameters. Without a path the
/// embedded corpus is trained at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub en_path: Option<PathBuf>,
    pub zh_path: Option<PathBuf>,
    pub alpha: f64,
    pub max_features: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let t = TrainConfig::default();
        Self {
            en_path: None,
            zh_path: None,
            alpha: t.alpha,
            max_features: t.max_features,
        }
    }
}

impl ModelConfig {
    pub fn path_for(&self, language: &str) -> Option<&Path> {
        match language {
            "en" => self.en_path.as_deref(),
            "zh" => self.zh_path.as_deref(),
            _ => None,
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            alpha: self.alpha,
            max_features: self.max_features,
        }
    }
}

/// Optional lexicon overrides; the embedded lexicons are used otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconPaths {
    pub en_path: Option<PathBuf>,
    pub zh_path: Option<PathBuf>,
}

impl LexiconPaths {
    pub fn path_for(&self, language: &str) -> Option<&Path> {
        match language {
            "en" => self.en_path.as_deref(),
            "zh" => self.zh_path.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub fusion: FusionWeights,
    pub priority: PriorityWeights,
    pub credibility: CredibilityTable,
    pub recency: RecencyConfig,
    pub forecast: ForecastConfig,
    pub ingest: IngestConfig,
    pub language: LanguageConfig,
    pub model: ModelConfig,
    pub lexicon: LexiconPaths,
}

impl SentinelConfig {
    /// Load using `$SENTINEL_CONFIG_PATH` or `config/sentinel.toml`, then apply
    /// env overrides and validate. A missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from(&path)?
        } else {
            info!(target: "sentinel::config", path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML file without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sentinel config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut cfg: SentinelConfig = toml::from_str(toml_str)?;
        cfg.language.default = cfg.language.default.trim().to_ascii_lowercase();
        Ok(cfg)
    }

    /// Env values win over the file. Unparsable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ENV_FUSION_KEYWORD_WEIGHT) {
            match raw.trim().parse::<f32>() {
                Ok(v) if v.is_finite() => {
                    let k = v.clamp(0.0, 1.0);
                    self.fusion = FusionWeights {
                        keyword: k,
                        statistical: 1.0 - k,
                    };
                }
                _ => warn!(target: "sentinel::config", value = %raw, "ignoring unparsable {}", ENV_FUSION_KEYWORD_WEIGHT),
            }
        }
        if let Ok(raw) = std::env::var(ENV_FORECAST_DEGREE) {
            match raw.trim().parse::<usize>() {
                Ok(d) => self.forecast.degree = d,
                Err(_) => warn!(target: "sentinel::config", value = %raw, "ignoring unparsable {}", ENV_FORECAST_DEGREE),
            }
        }
        if let Ok(raw) = std::env::var(ENV_DATASET_PATH) {
            let raw = raw.trim();
            if !raw.is_empty() {
                self.ingest.dataset_path = Some(PathBuf::from(raw));
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            self.fusion.validate().map_err(|e| anyhow!("[fusion] {e}")),
            self.priority.validate().map_err(|e| anyhow!("[priority] {e}")),
            self.credibility.validate().map_err(|e| anyhow!("[credibility] {e}")),
            self.recency.validate().map_err(|e| anyhow!("[recency] {e}")),
            self.forecast.validate().map_err(|e| anyhow!("[forecast] {e}")),
        ];
        for check in checks {
            check?;
        }

        let penalty = self.language.unknown_language_penalty;
        if !(penalty > 0.0 && penalty <= 1.0) {
            return Err(anyhow!(
                "[language] unknown_language_penalty must be in (0,1], got {penalty}"
            ));
        }
        if self.language.default.is_empty() {
            return Err(anyhow!("[language] default must not be empty"));
        }
        if !(self.model.alpha.is_finite() && self.model.alpha > 0.0) {
            return Err(anyhow!("[model] alpha must be > 0, got {}", self.model.alpha));
        }
        if self.model.max_features == Some(0) {
            return Err(anyhow!("[model] max_features must be >= 1"));
        }
        Ok(())
    }

    pub fn scorer(&self) -> PriorityScorer {
        PriorityScorer::new(self.priority, self.credibility, self.recency)
    }

    pub fn max_clock_skew(&self) -> chrono::Duration {
        let secs = i64::try_from(self.ingest.max_clock_skew_secs).unwrap_or(i64::MAX / 1000);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.ingest
            .dataset_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_defaults() {
        let cfg = SentinelConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, SentinelConfig::default());
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.ingest.max_clock_skew_secs, 300);
        assert_eq!(cfg.forecast.degree, 1);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = SentinelConfig::from_toml_str(
            r#"
[fusion]
keyword = 0.7

[credibility]
news = 0.8

[language]
default = " EN "
"#,
        )
        .unwrap();
        assert_eq!(cfg.fusion.keyword, 0.7);
        assert_eq!(cfg.fusion.statistical, 0.4);
        assert_eq!(cfg.credibility.news, 0.8);
        assert_eq!(cfg.credibility.government, 1.0);
        assert_eq!(cfg.language.default, "en");
    }

    #[test]
    fn validation_rejects_broken_ordering_and_degree() {
        let mut cfg = SentinelConfig::default();
        cfg.credibility.social = 0.9;
        assert!(cfg.validate().is_err());

        let mut cfg = SentinelConfig::default();
        cfg.forecast.degree = 4;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("[forecast]"));

        let mut cfg = SentinelConfig::default();
        cfg.language.unknown_language_penalty = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(SentinelConfig::from_toml_str("[fusion\nkeyword = ").is_err());
        assert!(SentinelConfig::from_toml_str("[fusion]\nkeyword = \"heavy\"").is_err());
    }

    #[test]
    fn model_paths_resolve_by_language() {
        let cfg = SentinelConfig::from_toml_str(
            r#"
[model]
zh_path = "models/zh.json"
"#,
        )
        .unwrap();
        assert_eq!(cfg.model.path_for("zh"), Some(Path::new("models/zh.json")));
        assert_eq!(cfg.model.path_for("en"), None);
        assert_eq!(cfg.model.train_config(), TrainConfig::default());
    }
}
