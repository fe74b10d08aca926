//! Merge undersized chunks and split oversized ones at sentence boundaries.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::apply_patch;
use crate::error::Result;
use crate::processor::ChunkProcessor;
use crate::text::{TextIndex, sentence_spans};
use crate::types::{Position, TextChunk, keys};

pub const NAME: &str = "size-optimizer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeOptimizerConfig {
    pub enabled: bool,
    /// Chunks shorter than this are merged into their predecessor
    pub min_size: usize,
    /// Merges never exceed this; longer chunks are split
    pub max_size: usize,
    /// Packing goal for the pieces of a split chunk
    pub target_size: usize,
    pub merge_small: bool,
    pub split_large: bool,
    /// Never merge chunks that belong to different chapters
    pub respect_chapters: bool,
}

impl Default for SizeOptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_size: 100,
            max_size: 300,
            target_size: 200,
            merge_small: true,
            split_large: true,
            respect_chapters: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SizeOptimizer {
    config: SizeOptimizerConfig,
}

impl SizeOptimizer {
    pub fn new(config: SizeOptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizeOptimizerConfig {
        &self.config
    }

    /// Run the merge pass then the split pass. Disabled optimizers return the input as-is.
    pub fn optimize(&self, chunks: Vec<TextChunk>) -> Vec<TextChunk> {
        if !self.config.enabled {
            return chunks;
        }

        let before = chunks.len();
        let mut chunks = chunks;
        if self.config.merge_small {
            chunks = self.merge_small(chunks);
        }
        if self.config.split_large {
            chunks = chunks
                .into_iter()
                .flat_map(|chunk| self.split_large(chunk))
                .collect();
        }
        debug!("Size optimizer: {} -> {} chunks", before, chunks.len());
        chunks
    }

    fn should_merge(&self, buffer: &TextChunk, candidate: &TextChunk) -> bool {
        let candidate_len = candidate.char_len();
        if candidate_len >= self.config.min_size {
            return false;
        }
        if buffer.char_len() + 1 + candidate_len > self.config.max_size {
            return false;
        }
        !self.config.respect_chapters || buffer.chapter_id() == candidate.chapter_id()
    }

    fn merge_small(&self, chunks: Vec<TextChunk>) -> Vec<TextChunk> {
        let mut merged = Vec::with_capacity(chunks.len());
        let mut buffer: Option<TextChunk> = None;

        for chunk in chunks {
            buffer = match buffer.take() {
                None => Some(chunk),
                Some(buf) if self.should_merge(&buf, &chunk) => Some(merge_pair(buf, chunk)),
                Some(buf) => {
                    merged.push(buf);
                    Some(chunk)
                }
            };
        }

        merged.extend(buffer);
        merged
    }

    /// Greedily pack sentences into pieces of at most `target_size`. A sentence longer than
    /// that stays whole, even past `max_size`.
    fn split_large(&self, chunk: TextChunk) -> Vec<TextChunk> {
        if chunk.char_len() <= self.config.max_size {
            return vec![chunk];
        }

        let spans = sentence_spans(&chunk.content);
        if spans.len() <= 1 {
            return vec![chunk];
        }

        let mut groups: Vec<(usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        for (start, end) in spans {
            current = match current {
                None => Some((start, end)),
                Some((group_start, _)) if end - group_start <= self.config.target_size => {
                    Some((group_start, end))
                }
                Some(group) => {
                    groups.push(group);
                    Some((start, end))
                }
            };
        }
        groups.extend(current);

        if groups.len() <= 1 {
            return vec![chunk];
        }

        let index = TextIndex::new(&chunk.content);
        let base = chunk.position.start;
        groups
            .into_iter()
            .map(|(start, end)| {
                let mut piece = TextChunk {
                    content: index.slice(start, end).to_string(),
                    position: Position::new(base + start, base + end),
                    metadata: chunk.metadata.clone(),
                    chapter: chunk.chapter.clone(),
                };
                piece.metadata.insert(keys::SPLIT.to_string(), true.into());
                piece
            })
            .collect()
    }
}

/// Join two chunks with a single space; the first chunk's chapter wins.
fn merge_pair(first: TextChunk, second: TextChunk) -> TextChunk {
    let mut metadata = first.metadata;
    metadata.extend(second.metadata);
    metadata.insert(keys::MERGED.to_string(), true.into());

    TextChunk {
        content: format!("{} {}", first.content, second.content),
        position: Position::new(first.position.start, second.position.end),
        metadata,
        chapter: first.chapter,
    }
}

#[async_trait]
impl ChunkProcessor for SizeOptimizer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn configure(&mut self, patch: &Value) -> Result<()> {
        self.config = apply_patch(NAME, &self.config, patch)?;
        Ok(())
    }

    async fn process(&self, chunks: Vec<TextChunk>, _text: &str) -> Result<Vec<TextChunk>> {
        Ok(self.optimize(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChapterInfo;

    fn chunk(content: &str, start: usize) -> TextChunk {
        let len = content.chars().count();
        TextChunk::new(content, Position::new(start, start + len))
    }

    fn chapter(id: &str) -> ChapterInfo {
        ChapterInfo {
            id: id.to_string(),
            title: id.to_string(),
            index: 0,
            chunk_index: 0,
        }
    }

    fn optimizer(min_size: usize, max_size: usize, target_size: usize) -> SizeOptimizer {
        SizeOptimizer::new(SizeOptimizerConfig {
            min_size,
            max_size,
            target_size,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_merges_small_chunks() {
        let chunks = vec![chunk("Small chunk 1", 0), chunk("Small chunk 2", 14)];
        let result = optimizer(100, 300, 200).process(chunks, "").await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].content, "Small chunk 1 Small chunk 2");
        assert!(result[0].flag(keys::MERGED));
        assert_eq!(result[0].position, Position::new(0, 27));
    }

    #[tokio::test]
    async fn test_does_not_merge_large_chunks() {
        let a = "a".repeat(150);
        let b = "b".repeat(150);
        let chunks = vec![chunk(&a, 0), chunk(&b, 150)];
        let result = optimizer(100, 300, 200).process(chunks, "").await.unwrap();
        assert_eq!(result.len(), 2);
        assert!(!result[0].flag(keys::MERGED));
    }

    #[tokio::test]
    async fn test_splits_long_chunk_at_sentences() {
        let content = "This is a very long sentence that needs to be split. ".repeat(10);
        let content = content.trim_end();
        let result = optimizer(100, 300, 200)
            .process(vec![chunk(content, 0)], "")
            .await
            .unwrap();
        assert!(result.len() > 1);
        for piece in &result {
            assert!(piece.char_len() <= 300);
            assert!(piece.flag(keys::SPLIT));
        }
        assert_eq!(result[0].position.start, 0);
        assert!(result.windows(2).all(|w| w[0].position.end <= w[1].position.start));
    }

    #[tokio::test]
    async fn test_oversized_sentence_stays_whole() {
        let long_sentence = format!("{}.", "word ".repeat(80).trim_end());
        let content = format!("Short one. {} Another short one.", long_sentence);
        let result = optimizer(10, 100, 60)
            .process(vec![chunk(&content, 0)], "")
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[1].content, long_sentence);
        assert!(result[1].char_len() > 100);
    }

    #[tokio::test]
    async fn test_split_inherits_metadata_and_chapter() {
        let content = "One sentence here. ".repeat(30);
        let input = chunk(content.trim_end(), 50)
            .with_metadata("source", "test")
            .with_chapter(chapter("ch-1"));
        let result = optimizer(10, 100, 80).process(vec![input], "").await.unwrap();
        assert!(result.len() > 1);
        for piece in &result {
            assert_eq!(piece.metadata["source"], "test");
            assert_eq!(piece.chapter_id(), Some("ch-1"));
        }
        assert_eq!(result[0].position.start, 50);
    }

    #[tokio::test]
    async fn test_merge_takes_first_chapter_and_merges_metadata() {
        let a = chunk("First piece.", 0).with_metadata("a", 1).with_chapter(chapter("x"));
        let b = chunk("Second.", 13).with_metadata("b", 2);
        let mut opt = optimizer(100, 300, 200);
        opt.configure(&serde_json::json!({ "respect_chapters": false })).unwrap();
        let result = opt.process(vec![a, b], "").await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].chapter_id(), Some("x"));
        assert_eq!(result[0].metadata["a"], 1);
        assert_eq!(result[0].metadata["b"], 2);
    }

    #[tokio::test]
    async fn test_respects_chapter_boundaries() {
        let a = chunk("First piece.", 0).with_chapter(chapter("x"));
        let b = chunk("Second.", 13).with_chapter(chapter("y"));
        let result = optimizer(100, 300, 200).process(vec![a, b], "").await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_is_identity() {
        let chunks = vec![chunk("tiny", 0), chunk("also tiny", 5), chunk(&"z".repeat(900), 15)];
        let opt = SizeOptimizer::new(SizeOptimizerConfig {
            enabled: false,
            ..Default::default()
        });
        let result = opt.process(chunks.clone(), "").await.unwrap();
        assert_eq!(result, chunks);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = SizeOptimizer::default().process(Vec::new(), "").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_inverted_thresholds_do_not_fail() {
        let chunks = vec![chunk("Tiny.", 0), chunk("Also tiny. Still small.", 6)];
        let result = optimizer(500, 10, 5).process(chunks, "").await.unwrap();
        // nothing fits under max_size, so no merge; the second chunk splits by sentence
        assert_eq!(result.len(), 3);
        assert!(result[1].flag(keys::SPLIT));
    }
}
