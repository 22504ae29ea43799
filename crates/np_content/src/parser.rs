//! Parsing of LLM output into typed blocks.
//!
//! Models are told to answer with bare JSON, but real answers come wrapped in
//! code fences, prose preambles or an envelope object. Parsing is two-stage:
//! strict first, then progressively more forgiving extraction of the JSON
//! payload. The caller decides what a total miss means.

use np_core::{Block, Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)```").unwrap());

#[derive(Deserialize)]
struct Envelope {
    blocks: Vec<Block>,
}

/// Parse a model answer into blocks. Accepts a bare array, a
/// `{"blocks": [...]}` envelope, and either of those inside a code fence or
/// surrounding prose. Blocks with empty content are dropped; zero surviving
/// blocks is an error.
pub fn parse_blocks(raw: &str) -> Result<Vec<Block>> {
    if let Some(blocks) = parse_json(raw.trim()) {
        return validate(blocks);
    }

    if let Some(caps) = FENCE_RE.captures(raw) {
        if let Some(blocks) = parse_json(caps[1].trim()) {
            return validate(blocks);
        }
    }

    // Last resort: the outermost [...] span, wherever it sits.
    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) {
        if start < end {
            if let Some(blocks) = parse_json(&raw[start..=end]) {
                return validate(blocks);
            }
        }
    }

    Err(Error::Content("block payload is not valid JSON".to_string()))
}

fn parse_json(text: &str) -> Option<Vec<Block>> {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(text) {
        return Some(envelope.blocks);
    }
    serde_json::from_str::<Vec<Block>>(text).ok()
}

fn validate(blocks: Vec<Block>) -> Result<Vec<Block>> {
    let blocks: Vec<Block> = blocks
        .into_iter()
        .filter(|b| !b.content().trim().is_empty())
        .collect();
    if blocks.is_empty() {
        return Err(Error::Content("no usable blocks in payload".to_string()));
    }
    Ok(blocks)
}

/// Normalize a plain-text model answer: fences and wrapping quotes removed,
/// whitespace trimmed.
pub fn clean_text_answer(raw: &str) -> String {
    let text = match FENCE_RE.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    };
    text.trim().trim_matches('"').trim_matches('「').trim_matches('」').trim().to_string()
}
