//! Lightweight accept/reject predicate applied before any scoring work.

use np_core::Category;
use once_cell::sync::Lazy;
use regex::Regex;

/// Combined title+summary shorter than this is not worth an LLM call.
pub const MIN_CONTENT_LENGTH: usize = 80;

const LOW_VALUE_CATEGORIES: [Category; 2] = [Category::Sports, Category::Entertainment];

// 速報 (breaking) is deliberately absent: breaking stories stay eligible.
static LOW_VALUE_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(号外|訃報|結果|スコア|芸能|ランキング|占い|星座|ゴシップ|breaking\s*:?\s*$|score|results|obituary|gossip)",
    )
    .unwrap()
});

/// Fixed allow-list. A hit overrides low-value title/category rejection and
/// feeds the scorer bonus.
pub const HIGH_VALUE_KEYWORDS: &[&str] = &[
    "政策", "法案", "経済", "規制", "金利", "インフレ", "GDP", "予算", "制裁",
    "半導体", "AI", "量子", "脱炭素", "再生可能エネルギー", "外交", "安全保障",
    "サミット", "条約", "改革", "選挙", "判決", "裁判", "汚職", "調査",
    "policy", "regulation", "economy", "inflation", "legislation", "sanctions",
    "semiconductor", "quantum", "climate", "diplomacy", "summit", "reform",
    "election", "ruling", "investigation",
];

pub fn has_high_value_keyword(text: &str) -> bool {
    HIGH_VALUE_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Number of distinct allow-list keywords appearing in the text.
pub fn high_value_hits(text: &str) -> usize {
    HIGH_VALUE_KEYWORDS.iter().filter(|kw| text.contains(*kw)).count()
}

/// Pure predicate: should this candidate enter the scoring stage?
/// Keyword-additive: adding high-value keywords can only flip reject→accept.
pub fn accept(title: &str, summary: &str, category: Option<Category>) -> bool {
    let text = format!("{} {}", title, summary);
    if text.trim().chars().count() < MIN_CONTENT_LENGTH {
        return false;
    }
    if LOW_VALUE_TITLE_RE.is_match(title) && !has_high_value_keyword(&text) {
        return false;
    }
    if let Some(cat) = category {
        if LOW_VALUE_CATEGORIES.contains(&cat) && !has_high_value_keyword(&text) {
            return false;
        }
    }
    true
}
