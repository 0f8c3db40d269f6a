// src/ingest/mod.rs
//! Collecting raw signals from sources before validation.
//!
//! Sources are black boxes returning `RawSignal`s. This module only cleans
//! their text and drops duplicate ids; validation and classification belong
//! to the engine.

pub mod providers;
pub mod types;

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::ingest::types::SignalSource;
use crate::metrics::{ensure_metrics_described, INGEST_SOURCE_ERRORS_TOTAL};
use crate::signal::RawSignal;

/// Upper bound on signal text length after cleaning.
pub const MAX_TEXT_CHARS: usize = 2000;

/// Clean feed text: decode entities, strip tags, fold quotes and whitespace,
/// drop trailing sentence punctuation, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // “ ” « » and ‘ ’ to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // \s also covers NBSP and the ideographic space
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static whitespace regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',' | '。' | '！' | '？' | '，') {
            out.pop();
        } else {
            break;
        }
    }

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Clean every present text and drop later records that reuse an id.
/// Records without an id are kept so validation can reject them.
pub fn normalize_and_dedup(raw: Vec<RawSignal>) -> (Vec<RawSignal>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for mut sig in raw {
        if let Some(t) = sig.text.as_deref() {
            sig.text = Some(normalize_text(t));
        }
        if let Some(id) = sig.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !seen.insert(id.to_string()) {
                dropped += 1;
                continue;
            }
        }
        kept.push(sig);
    }
    (kept, dropped)
}

/// Fetch from every source once. A failing source is logged and skipped.
pub async fn collect(sources: &[Box<dyn SignalSource>]) -> Vec<RawSignal> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for s in sources {
        match s.fetch().await {
            Ok(mut v) => {
                info!(target: "sentinel::ingest", source = s.name(), count = v.len(), "fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                warn!(target: "sentinel::ingest", error = ?e, source = s.name(), "source error");
                counter!(INGEST_SOURCE_ERRORS_TOTAL, "source" => s.name()).increment(1);
            }
        }
    }

    let (kept, dropped) = normalize_and_dedup(raw);
    if dropped > 0 {
        info!(target: "sentinel::ingest", dropped, "duplicate ids dropped");
    }
    kept
}
