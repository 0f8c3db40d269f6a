//! TF-IDF vectorizer over pre-extracted terms.
//!
//! `idf(t) = ln((1 + n) / (1 + df(t))) + 1` (smoothed); documents are raw term
//! counts times idf, then L2-normalized.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sparse row: `(feature index, weight)`, sorted by index.
pub type SparseVec = Vec<(usize, f64)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Build vocabulary + idf from tokenized documents.
    ///
    /// With `max_features`, only the most frequent terms across the corpus are
    /// kept (ties broken alphabetically, so the result is deterministic).
    pub fn fit(documents: &[Vec<String>], max_features: Option<usize>) -> Self {
        let mut tf: HashMap<&str, usize> = HashMap::new();
        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let mut unique: HashSet<&str> = HashSet::new();
            for term in doc {
                *tf.entry(term.as_str()).or_insert(0) += 1;
                unique.insert(term.as_str());
            }
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = tf.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(limit) = max_features {
            ranked.truncate(limit);
        }
        let mut kept: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
        kept.sort_unstable();

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (i, term) in kept.into_iter().enumerate() {
            let d = df.get(term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n) / (1.0 + d)).ln() + 1.0);
            vocabulary.insert(term.to_string(), i);
        }

        Self { vocabulary, idf }
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Vector for one document. Unknown terms are ignored; an empty result
    /// means no term was in the vocabulary.
    pub fn transform(&self, terms: &[String]) -> SparseVec {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for t in terms {
            if let Some(i) = self.index_of(t) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }
        let mut row: SparseVec = counts
            .into_iter()
            .map(|(i, c)| (i, c * self.idf[i]))
            .collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }

    /// Internal consistency after deserialization.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but idf has {} entries",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        if self.vocabulary.values().any(|&i| i >= self.idf.len()) {
            return Err("vocabulary index out of range".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|d| d.split_whitespace().map(String::from).collect())
            .collect()
    }

    #[test]
    fn rare_terms_get_higher_idf() {
        let v = TfidfVectorizer::fit(&docs(&["flood river", "flood street", "fire street"]), None);
        let flood = v.idf[v.index_of("flood").unwrap()];
        let river = v.idf[v.index_of("river").unwrap()];
        assert!(river > flood);
    }

    #[test]
    fn rows_are_unit_length() {
        let v = TfidfVectorizer::fit(&docs(&["flood river", "fire street"]), None);
        let row = v.transform(&["flood".into(), "river".into(), "river".into()]);
        let norm: f64 = row.iter().map(|(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_terms_give_empty_row() {
        let v = TfidfVectorizer::fit(&docs(&["flood river"]), None);
        assert!(v.transform(&["volcano".into()]).is_empty());
    }

    #[test]
    fn max_features_keeps_most_frequent() {
        let v = TfidfVectorizer::fit(&docs(&["a a a b b c", "a b"]), Some(2));
        assert_eq!(v.len(), 2);
        assert!(v.index_of("a").is_some());
        assert!(v.index_of("b").is_some());
        assert!(v.index_of("c").is_none());
    }
}
