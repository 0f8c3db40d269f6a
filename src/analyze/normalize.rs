//! Text normalization and term extraction shared by both classifiers.
//!
//! Two schemes:
//! - `Whitespace`: lowercase, non-alphanumerics folded to spaces, tokens split on
//!   whitespace. Keywords match whole tokens, or token prefixes when stemmed.
//! - `Cjk`: same folding, but Han runs are matched by substring and expanded
//!   into character unigrams + bigrams for the statistical model.

use serde::{Deserialize, Serialize};

use crate::language::is_cjk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextScheme {
    #[default]
    Whitespace,
    Cjk,
}

/// Text after scheme-specific normalization. Cheap to build, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    scheme: TextScheme,
    text: String,
}

impl NormalizedText {
    pub fn new(raw: &str, scheme: TextScheme) -> Self {
        Self {
            scheme,
            text: normalize(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn scheme(&self) -> TextScheme {
        self.scheme
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Does `pattern` (already normalized) occur in the text under this scheme?
    ///
    /// With `prefix`, the last word of the pattern may be the start of a longer
    /// token ("impersonat" hits "impersonating").
    pub fn contains_keyword(&self, pattern: &str, prefix: bool) -> bool {
        if pattern.is_empty() {
            return false;
        }
        match self.scheme {
            TextScheme::Cjk => self.text.contains(pattern),
            TextScheme::Whitespace => {
                let padded = format!(" {} ", self.text);
                if prefix {
                    padded.contains(&format!(" {pattern}"))
                } else {
                    padded.contains(&format!(" {pattern} "))
                }
            }
        }
    }

    /// Terms for the statistical vectorizer.
    pub fn terms(&self) -> Vec<String> {
        extract_terms(&self.text, self.scheme)
    }
}

/// Lowercase, fold punctuation to spaces, collapse whitespace.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = true;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Unigrams + adjacent bigrams after stop-word removal.
pub fn extract_terms(normalized: &str, scheme: TextScheme) -> Vec<String> {
    match scheme {
        TextScheme::Whitespace => {
            let words: Vec<&str> = normalized
                .split_whitespace()
                .filter(|w| w.chars().count() > 1 && !is_stop_word(w))
                .collect();
            with_bigrams(&words, " ")
        }
        TextScheme::Cjk => {
            let mut terms = Vec::new();
            for chunk in normalized.split_whitespace() {
                let mut run: Vec<String> = Vec::new();
                let mut word = String::new();
                for c in chunk.chars() {
                    if is_cjk(c) {
                        flush_word(&mut word, &mut terms);
                        run.push(c.to_string());
                    } else {
                        flush_run(&mut run, &mut terms);
                        word.push(c);
                    }
                }
                flush_word(&mut word, &mut terms);
                flush_run(&mut run, &mut terms);
            }
            terms
        }
    }
}

fn flush_run(run: &mut Vec<String>, terms: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    let refs: Vec<&str> = run.iter().map(String::as_str).collect();
    terms.extend(with_bigrams(&refs, ""));
    run.clear();
}

fn flush_word(word: &mut String, terms: &mut Vec<String>) {
    if word.chars().count() > 1 && !is_stop_word(word) {
        terms.push(std::mem::take(word));
    } else {
        word.clear();
    }
}

fn with_bigrams(units: &[&str], sep: &str) -> Vec<String> {
    let mut out: Vec<String> = units.iter().map(|u| u.to_string()).collect();
    out.extend(units.windows(2).map(|w| format!("{}{sep}{}", w[0], w[1])));
    out
}

fn is_stop_word(word: &str) -> bool {
    matches!(
        word,
        "the"
            | "and"
            | "for"
            | "are"
            | "but"
            | "not"
            | "you"
            | "all"
            | "can"
            | "had"
            | "her"
            | "was"
            | "one"
            | "our"
            | "out"
            | "has"
            | "have"
            | "been"
            | "from"
            | "this"
            | "that"
            | "with"
            | "they"
            | "will"
            | "each"
            | "which"
            | "their"
            | "said"
            | "what"
            | "its"
            | "into"
            | "more"
            | "other"
            | "of"
            | "in"
            | "on"
            | "at"
            | "to"
            | "by"
            | "is"
            | "it"
            | "an"
            | "as"
            | "or"
            | "be"
            | "near"
            | "after"
            | "last"
            | "over"
            | "due"
    )
}
