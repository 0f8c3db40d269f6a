//! Statistical strategy: TF-IDF features into multinomial naive Bayes.
//!
//! Trained once (from the embedded corpus or loaded from JSON parameters) and
//! immutable afterwards. Text with no vocabulary term abstains with a uniform
//! distribution and zero confidence.
//!
//! Confidence is calibrated against the runner-up: `p1² / (p1 + p2)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::lexicon::Lexicon;
use super::normalize::{NormalizedText, TextScheme};
use super::tfidf::TfidfVectorizer;
use super::{argmax_by_priority, Candidate, RiskClassifier};
use crate::error::ModelError;
use crate::risk::{Category, RiskLevel, SourceMethod};

const EN_CORPUS: &str = include_str!("../../data/corpus_en.json");
const ZH_CORPUS: &str = include_str!("../../data/corpus_zh.json");

/// Labeled training texts for one language variant.
#[derive(Debug, Clone, Deserialize)]
pub struct Corpus {
    pub language: String,
    #[serde(default)]
    pub scheme: TextScheme,
    pub documents: BTreeMap<Category, Vec<String>>,
}

impl Corpus {
    pub fn builtin_en() -> Result<Self, ModelError> {
        Ok(serde_json::from_str(EN_CORPUS)?)
    }

    pub fn builtin_zh() -> Result<Self, ModelError> {
        Ok(serde_json::from_str(ZH_CORPUS)?)
    }

    /// Embedded corpus for a language tag, if one ships with the crate.
    pub fn builtin(language: &str) -> Option<Result<Self, ModelError>> {
        match language {
            "en" => Some(Self::builtin_en()),
            "zh" => Some(Self::builtin_zh()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Additive (Lidstone) smoothing.
    pub alpha: f64,
    pub max_features: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            max_features: Some(5000),
        }
    }
}

/// Fitted parameters. Serializable so a deployment can ship them pre-trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalModel {
    pub language: String,
    pub scheme: TextScheme,
    vectorizer: TfidfVectorizer,
    classes: Vec<Category>,
    class_log_prior: Vec<f64>,
    /// `[class][feature]` log P(feature | class).
    feature_log_prob: Vec<Vec<f64>>,
}

impl StatisticalModel {
    pub fn train(corpus: &Corpus, cfg: &TrainConfig) -> Result<Self, ModelError> {
        let mut docs = Vec::new();
        let mut labels = Vec::new();
        for (category, texts) in &corpus.documents {
            for t in texts {
                docs.push(NormalizedText::new(t, corpus.scheme).terms());
                labels.push(*category);
            }
        }
        if docs.is_empty() {
            return Err(ModelError::EmptyCorpus);
        }

        let vectorizer = TfidfVectorizer::fit(&docs, cfg.max_features);
        if vectorizer.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }

        let classes: Vec<Category> = corpus
            .documents
            .iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(c, _)| *c)
            .collect();
        let n_features = vectorizer.len();
        let mut feature_count = vec![vec![0.0f64; n_features]; classes.len()];
        let mut class_count = vec![0usize; classes.len()];

        for (terms, label) in docs.iter().zip(&labels) {
            let Some(ci) = classes.iter().position(|c| c == label) else {
                continue;
            };
            class_count[ci] += 1;
            for (fi, w) in vectorizer.transform(terms) {
                feature_count[ci][fi] += w;
            }
        }

        let alpha = cfg.alpha.max(1e-9);
        let total_docs = docs.len() as f64;
        let class_log_prior = class_count
            .iter()
            .map(|&n| (n as f64 / total_docs).ln())
            .collect();
        let feature_log_prob = feature_count
            .iter()
            .map(|row| {
                let denom = row.iter().sum::<f64>() + alpha * n_features as f64;
                row.iter().map(|fc| ((fc + alpha) / denom).ln()).collect()
            })
            .collect();

        Ok(Self {
            language: corpus.language.trim().to_ascii_lowercase(),
            scheme: corpus.scheme,
            vectorizer,
            classes,
            class_log_prior,
            feature_log_prob,
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let model: Self = serde_json::from_str(&raw)?;
        model.check()?;
        Ok(model)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let body = serde_json::to_vec_pretty(self)?;
        fs::write(path, body).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn check(&self) -> Result<(), ModelError> {
        self.vectorizer.check().map_err(ModelError::Inconsistent)?;
        if self.classes.is_empty() {
            return Err(ModelError::Inconsistent("no classes".into()));
        }
        if self.class_log_prior.len() != self.classes.len()
            || self.feature_log_prob.len() != self.classes.len()
        {
            return Err(ModelError::Inconsistent("class dimension mismatch".into()));
        }
        if self
            .feature_log_prob
            .iter()
            .any(|row| row.len() != self.vectorizer.len())
        {
            return Err(ModelError::Inconsistent("feature dimension mismatch".into()));
        }
        Ok(())
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.len()
    }

    /// Posterior over the closed category set (categories the model never saw
    /// get 0). `None` when the text holds no known term.
    pub fn distribution(&self, text: &NormalizedText) -> Option<BTreeMap<Category, f64>> {
        let row = self.vectorizer.transform(&text.terms());
        if row.is_empty() {
            return None;
        }
        let jll: Vec<f64> = self
            .classes
            .iter()
            .enumerate()
            .map(|(ci, _)| {
                self.class_log_prior[ci]
                    + row
                        .iter()
                        .map(|(fi, x)| x * self.feature_log_prob[ci][*fi])
                        .sum::<f64>()
            })
            .collect();
        let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = jll.iter().map(|l| (l - max).exp()).collect();
        let z: f64 = exp.iter().sum();

        let mut dist: BTreeMap<Category, f64> = Category::ALL.iter().map(|c| (*c, 0.0)).collect();
        for (c, e) in self.classes.iter().zip(exp) {
            dist.insert(*c, e / z);
        }
        Some(dist)
    }
}

/// `p1² / (p1 + p2)`: full probability for a clear winner, roughly halved for a near tie.
pub fn calibrated_confidence(p1: f64, p2: f64) -> f64 {
    let s = p1 + p2;
    if s <= 0.0 {
        return 0.0;
    }
    (p1 * p1 / s).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct StatisticalClassifier {
    model: Arc<StatisticalModel>,
    lexicon: Arc<Lexicon>,
}

impl StatisticalClassifier {
    pub fn new(model: Arc<StatisticalModel>, lexicon: Arc<Lexicon>) -> Self {
        Self { model, lexicon }
    }

    pub fn model(&self) -> &StatisticalModel {
        &self.model
    }

    /// Top `n` categories with their probabilities, highest first.
    pub fn top_n(&self, text: &NormalizedText, n: usize) -> Vec<(Category, f32)> {
        let Some(dist) = self.model.distribution(text) else {
            return Vec::new();
        };
        let mut ranked: Vec<(Category, f32)> =
            dist.into_iter().map(|(c, p)| (c, p as f32)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

impl RiskClassifier for StatisticalClassifier {
    fn method(&self) -> SourceMethod {
        SourceMethod::Statistical
    }

    fn classify(&self, text: &NormalizedText) -> Candidate {
        let Some(dist) = self.model.distribution(text) else {
            let uniform = 1.0 / Category::ALL.len() as f32;
            return Candidate {
                method: SourceMethod::Statistical,
                category: Category::Other,
                confidence: 0.0,
                risk_hint: RiskLevel::MIN,
                scores: Category::ALL.iter().map(|c| (*c, uniform)).collect(),
                matches: BTreeMap::new(),
                abstained: true,
            };
        };

        let (winner, p1) = argmax_by_priority(|c| dist[&c] as f32);
        let p2 = dist
            .iter()
            .filter(|(c, _)| **c != winner)
            .map(|(_, p)| *p)
            .fold(0.0f64, f64::max);

        Candidate {
            method: SourceMethod::Statistical,
            category: winner,
            confidence: calibrated_confidence(p1 as f64, p2) as f32,
            risk_hint: self.lexicon.severity(winner),
            scores: dist.into_iter().map(|(c, p)| (c, p as f32)).collect(),
            matches: BTreeMap::new(),
            abstained: false,
        }
    }
}
