//! Signal records: the raw wire shape and the validated, immutable form.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::source_weights::SourceType;

/// Optional point location attached to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Timestamp as it arrives from collaborators: unix seconds or a date string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Unix(i64),
    Text(String),
}

/// Unvalidated signal as supplied by ingestion or the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub geo: Option<GeoPoint>,
    /// Language tag resolved upstream; detected from text when absent.
    #[serde(default)]
    pub language: Option<String>,
}

impl RawSignal {
    /// Best-effort id for error reporting before validation.
    pub fn id_or_placeholder(&self) -> String {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("<missing>")
            .to_string()
    }

    /// Check required fields and turn the record into a [`Signal`].
    ///
    /// Empty text is valid (it classifies as `other`); absent text is not.
    /// Timestamps later than `now + max_skew` are rejected.
    pub fn validate(self, now: DateTime<Utc>, max_skew: Duration) -> Result<Signal, InputError> {
        let id = match self.id.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => return Err(InputError::MissingId),
        };
        let text = self.text.ok_or_else(|| InputError::MissingText { id: id.clone() })?;

        let raw_source = self.source.unwrap_or_default();
        let source =
            SourceType::parse(&raw_source).ok_or_else(|| InputError::InvalidSourceType {
                id: id.clone(),
                source_type: raw_source.clone(),
            })?;

        let timestamp = match self.timestamp {
            None => return Err(InputError::MissingTimestamp { id }),
            Some(raw) => parse_timestamp(&raw).ok_or_else(|| InputError::InvalidTimestamp {
                id: id.clone(),
                raw: match raw {
                    RawTimestamp::Unix(n) => n.to_string(),
                    RawTimestamp::Text(s) => s,
                },
            })?,
        };
        // a skew past chrono's range disables the check
        let too_far_ahead = now
            .checked_add_signed(max_skew)
            .is_some_and(|limit| timestamp > limit);
        if too_far_ahead {
            return Err(InputError::FutureTimestamp { id, timestamp, now });
        }

        Ok(Signal {
            id,
            text,
            source,
            timestamp,
            location: self.location.filter(|l| !l.trim().is_empty()),
            geo: self.geo,
            language: self.language.filter(|l| !l.trim().is_empty()),
        })
    }
}

/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and unix seconds.
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Unix(secs) => Utc.timestamp_opt(*secs, 0).single(),
        RawTimestamp::Text(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
    }
}

/// A validated public-safety signal. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    id: String,
    text: String,
    source: SourceType,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geo: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl Signal {
    /// Build a signal from trusted, already-typed parts.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source: SourceType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source,
            timestamp,
            location: None,
            geo: None,
            language: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_geo(mut self, geo: GeoPoint) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_language(mut self, tag: impl Into<String>) -> Self {
        self.language = Some(tag.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> SourceType {
        self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn geo(&self) -> Option<GeoPoint> {
        self.geo
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}
