//! Multi-signal scoring: search-suggestion volume, trending overlap,
//! high-value keywords and recency. Scores are additive and unnormalized;
//! only the ranking within one batch matters.

use chrono::NaiveDateTime;
use np_core::{Candidate, ScoredCandidate, SuggestSource};

use crate::filter::high_value_hits;
use crate::keywords::{make_ngrams, question_variants, KeywordExtractor};

const SAMPLED_1GRAMS: usize = 8;
const SAMPLED_2GRAMS: usize = 5;
const SAMPLED_QUESTIONS: usize = 4;

/// Popularity/reliability proxy per source. Applied in the trend ranking used
/// for seeding and the force-reprocess fallback, not in the main score.
pub fn source_weight(source: &str) -> f64 {
    match source {
        "Yahoo!ニュース" | "NHK" | "読売新聞オンライン" => 1.2,
        "共同通信" => 1.1,
        _ => 1.0,
    }
}

fn recency_bonus(published_at: NaiveDateTime, now: NaiveDateTime) -> f64 {
    let hours = (now - published_at).num_seconds() as f64 / 3600.0;
    (15.0 - hours * 0.5).max(0.0)
}

/// Full score for one candidate. Deterministic for a frozen [`SuggestSource`]
/// and fixed `now`.
///
/// The trending term is a per-keyword sum: each trending keyword present in
/// the text (case-insensitive containment) contributes 5 exactly once, no
/// matter how often it occurs.
pub async fn score(
    candidate: &Candidate,
    trending: &[String],
    suggest: &dyn SuggestSource,
    extractor: &KeywordExtractor,
    now: NaiveDateTime,
) -> f64 {
    let kw_1g = extractor.extract(&candidate.title, &candidate.summary);
    let kw_2g = make_ngrams(&kw_1g, 2);
    let kw_q = question_variants(&kw_1g);

    let mut total = 0.0;
    for kw in kw_1g.iter().take(SAMPLED_1GRAMS) {
        total += suggest.suggestion_count(kw).await as f64;
    }
    for kw in kw_2g.iter().take(SAMPLED_2GRAMS) {
        total += suggest.suggestion_count(kw).await as f64 * 1.5;
    }
    for kw in kw_q.iter().take(SAMPLED_QUESTIONS) {
        total += suggest.suggestion_count(kw).await as f64 * 2.0;
    }

    let text = format!("{} {}", candidate.title, candidate.summary);
    total += 3.0 * high_value_hits(&text) as f64;

    let text_lower = text.to_lowercase();
    let trend_hits = trending
        .iter()
        .filter(|kw| text_lower.contains(&kw.to_lowercase()))
        .count();
    total += 5.0 * trend_hits as f64;

    total + recency_bonus(candidate.published_at, now)
}

/// Score a batch and return it in descending order. The sort is stable, so
/// equal scores keep their input order.
pub async fn rank_candidates(
    candidates: Vec<Candidate>,
    trending: &[String],
    suggest: &dyn SuggestSource,
    extractor: &KeywordExtractor,
    now: NaiveDateTime,
) -> Vec<ScoredCandidate> {
    let mut scored = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let s = score(&candidate, trending, suggest, extractor, now).await;
        scored.push(ScoredCandidate {
            candidate,
            score: s,
        });
    }
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Cheap ranking key for the paths that skip suggestion lookups (seeding and
/// the force-reprocess fallback): trending matches dominate, source weight
/// breaks ties.
pub fn trend_rank_score(candidate: &Candidate, trending: &[String]) -> f64 {
    let text = format!("{} {}", candidate.title, candidate.summary);
    let matches = trending.iter().filter(|kw| text.contains(kw.as_str())).count();
    matches as f64 * 10.0 + source_weight(&candidate.source)
}

/// Order a batch by [`trend_rank_score`], newest first among equals.
pub fn rank_by_trending(mut candidates: Vec<Candidate>, trending: &[String]) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        let sa = trend_rank_score(a, trending);
        let sb = trend_rank_score(b, trending);
        sb.partial_cmp(&sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.published_at.cmp(&a.published_at))
    });
    candidates
}
