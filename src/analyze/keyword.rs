//! Rule-based matcher over the lexicon.
//!
//! Winner = category with the most distinct keyword hits; ties go to the
//! earlier category in [`Category::ALL`]. Severity and economic band come from
//! the lexicon verbatim. Confidence = hits / keywords in that category.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::lexicon::Lexicon;
use super::normalize::NormalizedText;
use super::{argmax_by_priority, Candidate, RiskClassifier};
use crate::risk::{Category, RiskLevel, SourceMethod};

#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    lexicon: Arc<Lexicon>,
}

impl KeywordClassifier {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Distinct keyword hits per category, in lexicon order. Categories without
    /// hits are absent.
    pub fn scan(&self, text: &NormalizedText) -> BTreeMap<Category, Vec<String>> {
        let mut hits = BTreeMap::new();
        if text.is_empty() {
            return hits;
        }
        for (category, entry) in self.lexicon.iter() {
            let found: Vec<String> = entry
                .keywords
                .iter()
                .filter(|k| text.contains_keyword(&k.pattern, k.prefix))
                .map(|k| k.display.clone())
                .collect();
            if !found.is_empty() {
                hits.insert(category, found);
            }
        }
        hits
    }

    fn rule_confidence(&self, category: Category, hit_count: usize) -> f32 {
        let total = self.lexicon.entry(category).keywords.len();
        if total == 0 {
            return 0.0;
        }
        (hit_count as f32 / total as f32).min(1.0)
    }
}

impl RiskClassifier for KeywordClassifier {
    fn method(&self) -> SourceMethod {
        SourceMethod::Keyword
    }

    fn classify(&self, text: &NormalizedText) -> Candidate {
        let matches = self.scan(text);
        let scores: BTreeMap<Category, f32> = matches
            .iter()
            .map(|(c, kws)| (*c, self.rule_confidence(*c, kws.len())))
            .collect();

        let (winner, count) =
            argmax_by_priority(|c| matches.get(&c).map_or(0.0, |v| v.len() as f32));

        if count <= 0.0 {
            return Candidate {
                method: SourceMethod::Keyword,
                category: Category::Other,
                confidence: 0.0,
                risk_hint: RiskLevel::MIN,
                scores,
                matches,
                abstained: false,
            };
        }

        Candidate {
            method: SourceMethod::Keyword,
            category: winner,
            confidence: scores.get(&winner).copied().unwrap_or(0.0),
            risk_hint: self.lexicon.severity(winner),
            scores,
            matches,
            abstained: false,
        }
    }
}
