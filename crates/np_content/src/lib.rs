//! LLM-backed content generation: block restructuring, reader commentary and
//! translation, plus the parsing that turns loose model output into typed
//! blocks.

pub mod dummy;
pub mod openai;
pub mod parser;
pub mod prompts;

pub use dummy::DummyGenerator;
pub use openai::OpenAiGenerator;
pub use parser::parse_blocks;

use std::sync::Arc;

use np_core::ContentGenerator;
use tracing::warn;

/// Build the configured generator: OpenAI when a key is present, the
/// deterministic dummy otherwise.
pub fn generator_from_env(api_key: Option<String>, model: Option<String>) -> Arc<dyn ContentGenerator> {
    match OpenAiGenerator::new(api_key, model) {
        Ok(gen) => Arc::new(gen),
        Err(_) => {
            warn!("no OpenAI API key configured, falling back to dummy generator");
            Arc::new(DummyGenerator)
        }
    }
}
