//! Keyword and phrase extraction feeding the popularity lookups.

use np_core::text::{is_cjk_heavy, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;

/// Cap on deduplicated 1-grams per article.
const MAX_KEYWORDS: usize = 30;
/// Raw tokens collected before dedup.
const MAX_RAW_TOKENS: usize = 40;
/// Cap on adjacent 2-gram phrases.
const MAX_NGRAMS: usize = 20;

/// Interrogatives prepended to top keywords to probe question-form searches.
/// Only the first three are sampled.
pub const QUESTION_WORDS: &[&str] = &["何", "とは", "いつ", "どうして", "なぜ", "どう", "どこ", "誰"];

// CJK runs of 2+ (long-vowel mark included) or Latin runs of 3+.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{3040}-\u{9fff}ー]{2,}|[a-zA-Z]{3,}").unwrap());

/// Morphological analysis capability for CJK text. The regex tokenizer below
/// is the fallback when none is plugged in.
pub trait Tokenizer: Send + Sync {
    /// Noun-like surface forms, in text order. Implementations drop tokens
    /// shorter than 2 chars and non-independent/pronoun/numeral/suffix tags.
    fn noun_tokens(&self, text: &str) -> Vec<String>;
}

#[derive(Default)]
pub struct KeywordExtractor {
    tokenizer: Option<Box<dyn Tokenizer>>,
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self { tokenizer: None }
    }

    pub fn with_tokenizer(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            tokenizer: Some(tokenizer),
        }
    }

    /// 1-gram keywords from title + summary: insertion-ordered, deduplicated
    /// case-insensitively, capped at 30.
    pub fn extract(&self, title: &str, summary: &str) -> Vec<String> {
        let text = truncate_chars(&format!("{} {}", title, summary), 2000);
        let raw = if is_cjk_heavy(&text) {
            match &self.tokenizer {
                Some(t) => t.noun_tokens(&text),
                None => simple_tokens(&text),
            }
        } else {
            simple_tokens(&text)
        };

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for token in raw {
            let key = token.to_lowercase();
            if seen.insert(key) {
                out.push(token);
                if out.len() == MAX_KEYWORDS {
                    break;
                }
            }
        }
        out
    }
}

fn simple_tokens(text: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for m in TOKEN_RE.find_iter(text) {
        let w = m.as_str().to_string();
        if !words.contains(&w) {
            words.push(w);
            if words.len() == MAX_RAW_TOKENS {
                break;
            }
        }
    }
    words
}

/// Adjacent n-word join phrases over the 1-gram list.
pub fn make_ngrams(keywords: &[String], n: usize) -> Vec<String> {
    if keywords.len() < n {
        return Vec::new();
    }
    keywords
        .windows(n)
        .map(|w| w.join(" "))
        .take(MAX_NGRAMS)
        .collect()
}

/// Question-form variants: first 5 keywords x first 3 interrogatives.
pub fn question_variants(keywords: &[String]) -> Vec<String> {
    let mut extras = Vec::new();
    for kw in keywords.iter().take(5) {
        for qw in QUESTION_WORDS.iter().take(3) {
            extras.push(format!("{} {}", kw, qw));
        }
    }
    extras
}
