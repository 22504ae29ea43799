//! Text cleanup shared by the feed reader, the pipeline and the web layer.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
// Truncated feeds leave unclosed fragments like `<a href="...` behind.
static OPEN_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NUM_ENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").unwrap());

fn unescape_entities(text: &str) -> String {
    let text = NUM_ENTITY_RE.replace_all(text, |caps: &regex::Captures| {
        let body = &caps[1];
        let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            body.parse::<u32>().ok()
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Strip HTML fragments and entities and collapse whitespace. Applied both at
/// ingest time and on read, so markup cached by earlier versions cannot leak
/// into display text.
pub fn sanitize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = TAG_RE.replace_all(text, "");
    let text = OPEN_TAG_RE.replace_all(&text, "");
    let text = unescape_entities(&text);
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Canonical form of a title used only for duplicate detection: case-folded,
/// punctuation and whitespace dropped, alphanumerics and CJK kept.
pub fn normalized_title_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// True when more than 15% of the code points are CJK (incl. fullwidth forms).
pub fn is_cjk_heavy(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let cjk = text
        .chars()
        .filter(|&c| ('\u{3040}'..='\u{9fff}').contains(&c) || ('\u{ff00}'..='\u{ffef}').contains(&c))
        .count();
    cjk as f64 / total as f64 > 0.15
}

/// True when the text reads as non-Japanese (majority ASCII).
pub fn is_mostly_ascii(text: &str) -> bool {
    let total = text.chars().count();
    if total < 5 {
        return false;
    }
    let ascii = text.chars().filter(char::is_ascii).count();
    ascii as f64 / total as f64 > 0.5
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}
