//! Lexicon: category → {keywords, base severity, economic band}.
//!
//! Loaded from JSON (embedded defaults under `lexicon/`, or a file named in
//! config) into an immutable structure. Keyword strings ending in `*` are
//! stems and match any token they start.
//!
//! JSON shape:
//! {
//!   "language": "en",
//!   "scheme": "whitespace",
//!   "categories": {
//!     "flood": { "severity": 4, "economic_impact": "high", "keywords": ["flood*", "storm surge"] }
//!   }
//! }

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use super::normalize::{normalize, TextScheme};
use crate::error::LexiconError;
use crate::risk::{Category, EconomicImpact, RiskLevel};

const EN_JSON: &str = include_str!("../../lexicon/en.json");
const ZH_JSON: &str = include_str!("../../lexicon/zh.json");

/// One keyword rule after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    /// As written in the lexicon (without the stem marker); reported in results.
    pub display: String,
    /// Normalized form used for matching.
    pub pattern: String,
    pub prefix: bool,
}

impl Keyword {
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (body, prefix) = match trimmed.strip_suffix('*') {
            Some(stem) => (stem.trim(), true),
            None => (trimmed, false),
        };
        let pattern = normalize(body);
        if pattern.is_empty() {
            return None;
        }
        Some(Self {
            display: body.to_lowercase(),
            pattern,
            prefix,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    pub severity: RiskLevel,
    pub economic_impact: EconomicImpact,
    pub keywords: Vec<Keyword>,
}

impl LexiconEntry {
    fn fallback() -> Self {
        Self {
            severity: RiskLevel::MIN,
            economic_impact: EconomicImpact::Low,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLexicon {
    language: String,
    #[serde(default)]
    scheme: TextScheme,
    categories: BTreeMap<Category, RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    severity: u8,
    economic_impact: EconomicImpact,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Immutable keyword table for one language variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    language: String,
    scheme: TextScheme,
    entries: BTreeMap<Category, LexiconEntry>,
}

impl Lexicon {
    pub fn builtin_en() -> Result<Self, LexiconError> {
        Self::from_json_str(EN_JSON)
    }

    pub fn builtin_zh() -> Result<Self, LexiconError> {
        Self::from_json_str(ZH_JSON)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate. Categories missing from the JSON get a
    /// keyword-less entry at the lowest tier so lookups are total.
    pub fn from_json_str(raw: &str) -> Result<Self, LexiconError> {
        let parsed: RawLexicon = serde_json::from_str(raw)?;
        let mut entries = BTreeMap::new();
        for (category, e) in parsed.categories {
            let severity = RiskLevel::new(e.severity).ok_or_else(|| LexiconError::Severity {
                category: category.to_string(),
                severity: e.severity,
            })?;
            let mut seen = HashSet::new();
            let keywords = e
                .keywords
                .iter()
                .filter_map(|k| Keyword::parse(k))
                .filter(|k| seen.insert((k.pattern.clone(), k.prefix)))
                .collect();
            entries.insert(
                category,
                LexiconEntry {
                    severity,
                    economic_impact: e.economic_impact,
                    keywords,
                },
            );
        }
        for c in Category::ALL {
            entries.entry(c).or_insert_with(LexiconEntry::fallback);
        }
        Ok(Self {
            language: parsed.language.trim().to_ascii_lowercase(),
            scheme: parsed.scheme,
            entries,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn scheme(&self) -> TextScheme {
        self.scheme
    }

    pub fn entry(&self, category: Category) -> &LexiconEntry {
        // every category is inserted at load time
        &self.entries[&category]
    }

    pub fn severity(&self, category: Category) -> RiskLevel {
        self.entry(category).severity
    }

    pub fn economic_impact(&self, category: Category) -> EconomicImpact {
        self.entry(category).economic_impact
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &LexiconEntry)> {
        self.entries.iter().map(|(c, e)| (*c, e))
    }
}
