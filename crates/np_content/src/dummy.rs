use std::fmt;

use async_trait::async_trait;
use np_core::text::truncate_chars;
use np_core::{Block, ContentGenerator, Result, SectionTag};

use crate::prompts;

/// Deterministic generator used when no API key is configured and throughout
/// the pipeline tests. Output is derived from the input text only.
pub struct DummyGenerator;

impl fmt::Debug for DummyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyGenerator").finish()
    }
}

#[async_trait]
impl ContentGenerator for DummyGenerator {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate_blocks(&self, title: &str, content: &str) -> Result<Vec<Block>> {
        Ok(vec![
            Block::Text {
                content: truncate_chars(content, 400),
            },
            Block::Section {
                section: SectionTag::Facts,
                content: format!("「{}」について報じられています。", title),
            },
        ])
    }

    async fn commentary(&self, title: &str, _content: &str, slot: usize) -> Result<String> {
        Ok(format!("{}です。「{}」が気になります。", prompts::persona(slot)?, title))
    }

    async fn translate_pair(&self, title: &str, summary: &str) -> Result<(String, String)> {
        Ok((format!("【注目】{}", title), summary.to_string()))
    }

    async fn translate_body(&self, body: &str) -> Result<String> {
        Ok(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_generator_is_deterministic() {
        let gen = DummyGenerator;
        let a = gen.generate_blocks("見出し", "本文テキスト").await.unwrap();
        let b = gen.generate_blocks("見出し", "本文テキスト").await.unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
        assert_eq!(a.len(), 2);

        let comment = gen.commentary("見出し", "本文", 1).await.unwrap();
        assert!(comment.contains("見出し"));
        assert!(gen.commentary("見出し", "本文", 99).await.is_err());
    }
}
