// tests/ingest.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use urban_sentinel::ingest::providers::{JsonFileSource, NewsFeedProvider, StaticSource};
use urban_sentinel::ingest::types::SignalSource;
use urban_sentinel::ingest::{collect, normalize_text, MAX_TEXT_CHARS};
use urban_sentinel::signal::RawSignal;

struct Broken;

#[async_trait]
impl SignalSource for Broken {
    async fn fetch(&self) -> Result<Vec<RawSignal>> {
        Err(anyhow!("upstream unavailable"))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn sig(id: &str, text: &str) -> RawSignal {
    RawSignal {
        id: Some(id.into()),
        text: Some(text.into()),
        source: Some("news".into()),
        ..Default::default()
    }
}

#[test]
fn normalize_strips_markup_and_quotes() {
    let s = "<p>“Flash flood” warning&nbsp;for <b>Riverside</b>!</p>";
    assert_eq!(normalize_text(s), "\"Flash flood\" warning for Riverside");
}

#[test]
fn normalize_handles_cjk_punctuation_and_spaces() {
    assert_eq!(normalize_text("地铁停运\u{3000}交通拥堵。"), "地铁停运 交通拥堵");
}

#[test]
fn normalize_caps_length() {
    let long = "a".repeat(MAX_TEXT_CHARS + 50);
    assert_eq!(normalize_text(&long).chars().count(), MAX_TEXT_CHARS);
}

#[tokio::test]
async fn failing_source_is_skipped() {
    let sources: Vec<Box<dyn SignalSource>> = vec![
        Box::new(Broken),
        Box::new(StaticSource::new(vec![sig("S-1", "Gas leak on Main St.")])),
    ];
    let got = collect(&sources).await;
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].text.as_deref(), Some("Gas leak on Main St"));
}

#[tokio::test]
async fn duplicate_ids_across_sources_keep_first() {
    let sources: Vec<Box<dyn SignalSource>> = vec![
        Box::new(StaticSource::new(vec![sig("S-1", "first"), sig("S-2", "second")])),
        Box::new(StaticSource::new(vec![sig("S-1", "again"), sig("S-3", "third")])),
    ];
    let got = collect(&sources).await;
    let ids: Vec<&str> = got.iter().filter_map(|s| s.id.as_deref()).collect();
    assert_eq!(ids, vec!["S-1", "S-2", "S-3"]);
    assert_eq!(got[0].text.as_deref(), Some("first"));
}

#[tokio::test]
async fn news_feed_and_file_combine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signals.json");
    std::fs::write(
        &path,
        r#"[{"id": "F-1", "text": "Bridge closed", "source": "government", "timestamp": 1772366400}]"#,
    )
    .unwrap();

    let feed = r#"{"articles": [
        {"title": "Warehouse blaze", "description": "Smoke over the park.",
         "publishedAt": "2026-03-01T08:00:00Z", "source": {"name": "Metro Wire"}}
    ]}"#;

    let sources: Vec<Box<dyn SignalSource>> = vec![
        Box::new(JsonFileSource::new(&path)),
        Box::new(NewsFeedProvider::from_fixture(feed)),
    ];
    let got = collect(&sources).await;
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].id.as_deref(), Some("F-1"));
    assert_eq!(got[1].id.as_deref(), Some("NEWS-001"));
    assert_eq!(got[1].text.as_deref(), Some("Warehouse blaze. Smoke over the park"));
    assert_eq!(got[1].location.as_deref(), Some("Metro Wire"));
}
