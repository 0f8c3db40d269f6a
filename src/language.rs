//! Language gate: cheap script-based detection plus tag normalization.
//!
//! Detection only distinguishes Chinese from everything else; any tag supplied
//! upstream wins over detection. Variant selection lives in the engine.

use once_cell::sync::Lazy;
use regex::Regex;

pub const EN: &str = "en";
pub const ZH: &str = "zh";

/// Share of CJK ideographs above which text is treated as Chinese.
const CJK_RATIO: f32 = 0.15;

static HAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{Han}$").expect("static Han regex"));

/// Detect `zh` vs `en` from script statistics. Empty text is `en`.
pub fn detect_language(text: &str) -> &'static str {
    let trimmed = text.trim();
    let total = trimmed.chars().count().max(1);
    let cjk = trimmed.chars().filter(|c| is_cjk(*c)).count();
    if cjk as f32 / total as f32 > CJK_RATIO {
        ZH
    } else {
        EN
    }
}

/// Reduce a BCP-47-ish tag to its lowercase primary subtag (`zh-Hans-CN` → `zh`).
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// True when a character belongs to the Han script (Unicode `Script=Han`).
/// Shared by detection and CJK term extraction.
pub(crate) fn is_cjk(c: char) -> bool {
    let mut buf = [0u8; 4];
    HAN.is_match(c.encode_utf8(&mut buf))
}
