//! # Source Weights
//!
//! Maps the origin of a signal to a credibility weight in `(0.0, 1.0]`.
//!
//! - Four canonical source types: government, news, citizen, social.
//! - Case-insensitive parsing with normalization of punctuation and dashes.
//! - Aliases map feed-specific spellings (`citizen_report`, `gov`, `twitter`)
//!   to a canonical type.
//! - The credibility table is configurable, but must keep the ordering
//!   government > news > citizen > social.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of signal origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[serde(alias = "gov")]
    Government,
    News,
    #[serde(alias = "citizen_report")]
    Citizen,
    #[serde(alias = "social_media")]
    Social,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::Government,
        SourceType::News,
        SourceType::Citizen,
        SourceType::Social,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Government => "government",
            SourceType::News => "news",
            SourceType::Citizen => "citizen",
            SourceType::Social => "social",
        }
    }

    /// Parse a free-form source label.
    ///
    /// Steps:
    /// 1. Normalize (lowercase, separators to spaces, collapse).
    /// 2. Canonical name.
    /// 3. Alias table.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = normalize(raw);
        if let Some(t) = SourceType::ALL.into_iter().find(|t| t.as_str() == s) {
            return Some(t);
        }
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == s)
            .map(|(_, t)| *t)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALIASES: &[(&str, SourceType)] = &[
    ("gov", SourceType::Government),
    ("govt", SourceType::Government),
    ("official", SourceType::Government),
    ("authority", SourceType::Government),
    ("press", SourceType::News),
    ("media", SourceType::News),
    ("newswire", SourceType::News),
    ("citizen report", SourceType::Citizen),
    ("resident", SourceType::Citizen),
    ("hotline", SourceType::Citizen),
    ("social media", SourceType::Social),
    ("twitter", SourceType::Social),
    ("weibo", SourceType::Social),
    ("forum", SourceType::Social),
];

/// Credibility lookup by source type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityTable {
    pub government: f32,
    pub news: f32,
    pub citizen: f32,
    pub social: f32,
}

impl Default for CredibilityTable {
    fn default() -> Self {
        Self {
            government: 1.0,
            news: 0.75,
            citizen: 0.5,
            social: 0.25,
        }
    }
}

impl CredibilityTable {
    pub fn weight_for(&self, source: SourceType) -> f32 {
        let w = match source {
            SourceType::Government => self.government,
            SourceType::News => self.news,
            SourceType::Citizen => self.citizen,
            SourceType::Social => self.social,
        };
        clamp01(w)
    }

    /// Values must lie in `(0, 1]` and strictly decrease from government to social.
    pub fn validate(&self) -> Result<(), String> {
        let ordered = [self.government, self.news, self.citizen, self.social];
        if ordered.iter().any(|w| !w.is_finite() || *w <= 0.0 || *w > 1.0) {
            return Err(format!("credibility weights must be in (0, 1]: {ordered:?}"));
        }
        if !ordered.windows(2).all(|p| p[0] > p[1]) {
            return Err(format!(
                "credibility must satisfy government > news > citizen > social: {ordered:?}"
            ));
        }
        Ok(())
    }
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }
    out = out.replace(['\n', '\r', '\t', '.', ',', '\''], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_parse() {
        for t in SourceType::ALL {
            assert_eq!(SourceType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn alias_and_typography_normalization() {
        assert_eq!(SourceType::parse("citizen_report"), Some(SourceType::Citizen));
        assert_eq!(SourceType::parse("Social-Media"), Some(SourceType::Social));
        assert_eq!(SourceType::parse("  GOV "), Some(SourceType::Government));
        assert_eq!(SourceType::parse("carrier pigeon"), None);
    }

    #[test]
    fn serde_accepts_legacy_labels() {
        let t: SourceType = serde_json::from_str("\"social_media\"").unwrap();
        assert_eq!(t, SourceType::Social);
        let t: SourceType = serde_json::from_str("\"citizen_report\"").unwrap();
        assert_eq!(t, SourceType::Citizen);
    }

    #[test]
    fn default_table_is_ordered() {
        let t = CredibilityTable::default();
        assert!(t.validate().is_ok());
        assert!((t.weight_for(SourceType::Government) - 1.0).abs() < 1e-6);
        assert!((t.weight_for(SourceType::News) - 0.75).abs() < 1e-6);
        assert!((t.weight_for(SourceType::Citizen) - 0.5).abs() < 1e-6);
        assert!((t.weight_for(SourceType::Social) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn inverted_table_is_rejected() {
        let t = CredibilityTable {
            social: 0.9,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn zero_weight_is_rejected() {
        let t = CredibilityTable {
            social: 0.0,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }
}
