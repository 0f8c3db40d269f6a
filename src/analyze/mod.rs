// src/analyze/mod.rs
//! Classification pipeline: normalization, the two classifier strategies and
//! the fusion combinator.
//!
//! Both strategies implement [`RiskClassifier`] and return a [`Candidate`];
//! fusion only ever sees candidates, so either side can be swapped or tested
//! in isolation.

pub mod fusion;
pub mod keyword;
pub mod lexicon;
pub mod normalize;
pub mod statistical;
pub mod tfidf;

use std::collections::BTreeMap;

use crate::risk::{Category, RiskLevel, SourceMethod};

// Re-export convenient types.
pub use fusion::{fuse, keyword_only, FusionWeights};
pub use keyword::KeywordClassifier;
pub use lexicon::Lexicon;
pub use normalize::{NormalizedText, TextScheme};
pub use statistical::{Corpus, StatisticalClassifier, StatisticalModel, TrainConfig};

/// "Given text, produce category + confidence + severity hint."
pub trait RiskClassifier: Send + Sync {
    fn method(&self) -> SourceMethod;
    fn classify(&self, text: &NormalizedText) -> Candidate;
}

/// One strategy's opinion about a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub method: SourceMethod,
    pub category: Category,
    /// Strategy-specific confidence in `[0,1]`.
    pub confidence: f32,
    /// Lexicon base severity of `category`.
    pub risk_hint: RiskLevel,
    /// Per-category support: rule confidence for keywords, probability for the model.
    pub scores: BTreeMap<Category, f32>,
    /// Keywords found per category (keyword strategy only).
    pub matches: BTreeMap<Category, Vec<String>>,
    /// Strategy had nothing to say (no known terms); must not be treated as evidence.
    pub abstained: bool,
}

impl Candidate {
    pub fn score_for(&self, category: Category) -> f32 {
        self.scores.get(&category).copied().unwrap_or(0.0)
    }

    pub fn matches_for(&self, category: Category) -> &[String] {
        self.matches.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// First category with the strictly highest score, walking the tie-break order.
pub(crate) fn argmax_by_priority<F>(mut score: F) -> (Category, f32)
where
    F: FnMut(Category) -> f32,
{
    let mut best = (Category::Other, f32::NEG_INFINITY);
    for c in Category::ALL {
        let s = score(c);
        if s > best.1 {
            best = (c, s);
        }
    }
    best
}
