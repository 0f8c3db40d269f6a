//! Risk vocabulary shared by the classifiers, the scorer and the API:
//! categories, severity tiers, economic bands and the classification record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Closed set of risk domains.
///
/// Declaration order is the tie-break priority: life-safety categories first,
/// `Other` last. `Ord` follows declaration order, so `a < b` means `a` wins a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Fire,
    Flood,
    Health,
    Crime,
    Traffic,
    Infrastructure,
    Fraud,
    Other,
}

impl Category {
    /// All categories in tie-break priority order.
    pub const ALL: [Category; 8] = [
        Category::Fire,
        Category::Flood,
        Category::Health,
        Category::Crime,
        Category::Traffic,
        Category::Infrastructure,
        Category::Fraud,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Fire => "fire",
            Category::Flood => "flood",
            Category::Health => "health",
            Category::Crime => "crime",
            Category::Traffic => "traffic",
            Category::Infrastructure => "infrastructure",
            Category::Fraud => "fraud",
            Category::Other => "other",
        }
    }

    /// Human label used in summaries.
    pub fn label(self) -> &'static str {
        match self {
            Category::Fire => "Fire",
            Category::Flood => "Flood",
            Category::Health => "Health",
            Category::Crime => "Crime",
            Category::Traffic => "Traffic",
            Category::Infrastructure => "Infrastructure",
            Category::Fraud => "Fraud",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category `{s}`"))
    }
}

/// Severity tier in `1..=5`. Construction is checked, so every value in
/// circulation is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskLevel(u8);

impl RiskLevel {
    pub const MIN: RiskLevel = RiskLevel(1);
    pub const MAX: RiskLevel = RiskLevel(5);

    pub fn new(level: u8) -> Option<Self> {
        (1..=5).contains(&level).then_some(RiskLevel(level))
    }

    /// Round a fractional level to the nearest tier, clamped to `1..=5`.
    pub fn from_f32_rounded(x: f32) -> Self {
        if !x.is_finite() {
            return RiskLevel::MIN;
        }
        RiskLevel(x.round().clamp(1.0, 5.0) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RiskLevel {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        RiskLevel::new(v).ok_or_else(|| format!("risk level {v} outside 1..=5"))
    }
}

impl From<RiskLevel> for u8 {
    fn from(r: RiskLevel) -> u8 {
        r.0
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse economic-impact band, owned by the lexicon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomicImpact {
    Low,
    Medium,
    High,
}

/// Which strategy produced the final classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    Keyword,
    Statistical,
    Fused,
}

impl SourceMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceMethod::Keyword => "keyword",
            SourceMethod::Statistical => "statistical",
            SourceMethod::Fused => "fused",
        }
    }
}

/// Qualifiers recorded on a result when it was produced in a degraded mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Caveat {
    /// Requested language had no variant; the default lexicon/model was used.
    UnknownLanguage,
    /// Statistical model unavailable for this variant.
    KeywordOnly,
    /// Statistical model saw no known vocabulary and contributed nothing.
    StatisticalAbstained,
}

/// Final structured record for one signal. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub risk_level: RiskLevel,
    pub economic_impact: EconomicImpact,
    pub confidence: f32,
    pub matched_keywords: BTreeSet<String>,
    pub summary: String,
    pub source_method: SourceMethod,
    /// Tag of the lexicon/model variant that actually ran.
    pub language: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<Caveat>,
}

impl ClassificationResult {
    pub fn has_caveat(&self, c: Caveat) -> bool {
        self.caveats.contains(&c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_priority_is_life_safety_first() {
        assert!(Category::Fire < Category::Crime);
        assert!(Category::Flood < Category::Infrastructure);
        assert!(Category::Fraud < Category::Other);
    }

    #[test]
    fn category_parse_roundtrips_names() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("volcano".parse::<Category>().is_err());
    }

    #[test]
    fn risk_level_rejects_out_of_range() {
        assert!(RiskLevel::new(0).is_none());
        assert!(RiskLevel::new(6).is_none());
        assert_eq!(RiskLevel::new(3).map(RiskLevel::get), Some(3));
        assert!(serde_json::from_str::<RiskLevel>("9").is_err());
    }

    #[test]
    fn risk_level_rounding_clamps() {
        assert_eq!(RiskLevel::from_f32_rounded(2.4).get(), 2);
        assert_eq!(RiskLevel::from_f32_rounded(2.5).get(), 3);
        assert_eq!(RiskLevel::from_f32_rounded(-3.0).get(), 1);
        assert_eq!(RiskLevel::from_f32_rounded(11.0).get(), 5);
        assert_eq!(RiskLevel::from_f32_rounded(f32::NAN).get(), 1);
    }
}
