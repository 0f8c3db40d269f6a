// src/ingest/providers/json_file.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::ingest::types::SignalSource;
use crate::signal::RawSignal;

/// JSON array of raw signals on disk (the sample dataset by default).
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SignalSource for JsonFileSource {
    async fn fetch(&self) -> Result<Vec<RawSignal>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading signals from {}", self.path.display()))?;
        let signals: Vec<RawSignal> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing signals in {}", self.path.display()))?;
        Ok(signals)
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

/// In-memory source, mostly for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    signals: Vec<RawSignal>,
}

impl StaticSource {
    pub fn new(signals: Vec<RawSignal>) -> Self {
        Self { signals }
    }
}

#[async_trait]
impl SignalSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<RawSignal>> {
        Ok(self.signals.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_array_of_raw_signals() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("signals.json");
        std::fs::write(
            &p,
            r#"[{"id":"s1","text":"Bridge closed","source":"government","timestamp":"2026-03-01T10:00:00Z"},
                {"id":"s2","text":"Bus delayed","source":"citizen","timestamp":1772359200}]"#,
        )
        .unwrap();
        let got = JsonFileSource::new(&p).fetch().await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].id.as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn missing_file_is_error_with_path() {
        let err = JsonFileSource::new("/nope/signals.json").fetch().await.unwrap_err();
        assert!(format!("{err:#}").contains("/nope/signals.json"));
    }
}
