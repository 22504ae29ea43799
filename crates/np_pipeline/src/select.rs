//! Duplicate removal and diversity-constrained selection over a ranked batch.

use std::collections::{HashMap, HashSet};

use np_core::text::normalized_title_key;
use np_core::{Candidate, Category, ScoredCandidate};

/// Outcome of the selection stage. `forced` marks the fallback where nothing
/// unpublished survived and the top of the full batch is reprocessed with
/// overwrite allowed.
#[derive(Debug)]
pub struct Selection {
    pub picked: Vec<Candidate>,
    pub forced: bool,
}

/// Select up to `max_count` candidates from `ranked` (already score-descending):
///
/// 1. drop anything already published, by id or by normalized title;
/// 2. drop intra-batch title duplicates, keeping the first (highest-scored);
/// 3. greedy capped pass: at most `max_per_source` per source and
///    `max_per_category` per category;
/// 4. fill pass: if the quota is short, append remaining candidates in order,
///    caps ignored.
///
/// Order is stable throughout. If step 1-2 leaves nothing, the top of the
/// original ranking is returned with `forced = true` so an interactive run
/// always produces at least one outcome.
pub fn select_diverse(
    ranked: &[ScoredCandidate],
    published_titles: &[String],
    processed_ids: &HashSet<String>,
    max_count: usize,
    max_per_source: usize,
    max_per_category: usize,
) -> Selection {
    let existing_norm: HashSet<String> =
        published_titles.iter().map(|t| normalized_title_key(t)).collect();

    let mut seen_norm: HashSet<String> = HashSet::new();
    let mut fresh: Vec<&Candidate> = Vec::new();
    for sc in ranked {
        let cand = &sc.candidate;
        if processed_ids.contains(&cand.id) {
            continue;
        }
        let norm = normalized_title_key(&cand.title);
        if existing_norm.contains(&norm) || !seen_norm.insert(norm) {
            continue;
        }
        fresh.push(cand);
    }

    if fresh.is_empty() {
        return Selection {
            picked: ranked.iter().take(max_count).map(|sc| sc.candidate.clone()).collect(),
            forced: true,
        };
    }

    let mut per_source: HashMap<&str, usize> = HashMap::new();
    let mut per_category: HashMap<Category, usize> = HashMap::new();
    let mut chosen: Vec<usize> = Vec::new();

    for (i, cand) in fresh.iter().enumerate() {
        if chosen.len() == max_count {
            break;
        }
        let src = per_source.entry(cand.source.as_str()).or_insert(0);
        let cat = per_category.entry(cand.category).or_insert(0);
        if *src < max_per_source && *cat < max_per_category {
            *src += 1;
            *cat += 1;
            chosen.push(i);
        }
    }

    if chosen.len() < max_count {
        let taken: HashSet<usize> = chosen.iter().copied().collect();
        for i in 0..fresh.len() {
            if chosen.len() == max_count {
                break;
            }
            if !taken.contains(&i) {
                chosen.push(i);
            }
        }
        chosen.sort_unstable();
    }

    Selection {
        picked: chosen.into_iter().map(|i| fresh[i].clone()).collect(),
        forced: false,
    }
}
