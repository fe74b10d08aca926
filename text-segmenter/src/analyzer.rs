//! Per-chapter statistics and narration time estimates for finished chunks.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;

use crate::text::{count_words, strip_markup, unescape_xml};
use crate::types::{TextChunk, keys};

pub const DEFAULT_WORDS_PER_MINUTE: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterAnalysis {
    pub id: String,
    pub title: String,
    pub index: usize,
    pub chunk_count: usize,
    pub word_count: usize,
    pub char_count: usize,
    pub estimated_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterReport {
    /// Ordered by chapter index
    pub chapters: Vec<ChapterAnalysis>,
    pub total_chunks: usize,
    /// Chunks with no chapter attribution
    pub unattributed_chunks: usize,
    pub total_words: usize,
    pub total_chars: usize,
    pub estimated_seconds: f64,
    pub words_per_minute: f64,
}

impl ChapterReport {
    pub fn by_id(&self) -> BTreeMap<&str, &ChapterAnalysis> {
        self.chapters.iter().map(|c| (c.id.as_str(), c)).collect()
    }

    /// Human-readable report. Identical input always renders identically.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Chapter analysis ({} wpm)", self.words_per_minute);

        for chapter in &self.chapters {
            let _ = writeln!(
                out,
                "  #{} {}: {}, {} words, {} chars, ~{}",
                chapter.index + 1,
                chapter.title,
                plural(chapter.chunk_count, "chunk"),
                chapter.word_count,
                chapter.char_count,
                format_duration(chapter.estimated_seconds)
            );
        }

        let _ = write!(
            out,
            "Total: {}, {} ({} without chapter), {} words, {} chars, ~{}",
            plural(self.chapters.len(), "chapter"),
            plural(self.total_chunks, "chunk"),
            self.unattributed_chunks,
            self.total_words,
            self.total_chars,
            format_duration(self.estimated_seconds)
        );
        out
    }
}

/// Read-only aggregation of chunks by chapter.
#[derive(Debug, Clone)]
pub struct ChapterAnalyzer {
    words_per_minute: f64,
}

impl Default for ChapterAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS_PER_MINUTE)
    }
}

impl ChapterAnalyzer {
    pub fn new(words_per_minute: f64) -> Self {
        Self { words_per_minute }
    }

    /// `words / wpm * 60`; a non-positive rate estimates zero.
    pub fn estimate_seconds(&self, words: usize) -> f64 {
        if self.words_per_minute <= 0.0 {
            return 0.0;
        }
        words as f64 / self.words_per_minute * 60.0
    }

    pub fn analyze(&self, chunks: &[TextChunk]) -> ChapterReport {
        let mut chapters: Vec<ChapterAnalysis> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut unattributed = 0;
        let mut total_words = 0;
        let mut total_chars = 0;

        for chunk in chunks {
            let plain = spoken_text(chunk);
            let words = count_words(&plain);
            let chars = plain.chars().count();
            total_words += words;
            total_chars += chars;

            let Some(info) = &chunk.chapter else {
                unattributed += 1;
                continue;
            };

            let slot = *slots.entry(info.id.as_str()).or_insert_with(|| {
                chapters.push(ChapterAnalysis {
                    id: info.id.clone(),
                    title: info.title.clone(),
                    index: info.index,
                    chunk_count: 0,
                    word_count: 0,
                    char_count: 0,
                    estimated_seconds: 0.0,
                });
                chapters.len() - 1
            });
            let entry = &mut chapters[slot];
            entry.chunk_count += 1;
            entry.word_count += words;
            entry.char_count += chars;
        }

        for chapter in &mut chapters {
            chapter.estimated_seconds = self.estimate_seconds(chapter.word_count);
        }
        chapters.sort_by_key(|c| c.index);

        ChapterReport {
            chapters,
            total_chunks: chunks.len(),
            unattributed_chunks: unattributed,
            total_words,
            total_chars,
            estimated_seconds: self.estimate_seconds(total_words),
            words_per_minute: self.words_per_minute,
        }
    }
}

/// The text a chunk narrates: the pre-markup original when stored, else for wrapped chunks
/// the content with tags stripped and entities decoded.
fn spoken_text(chunk: &TextChunk) -> String {
    match chunk.metadata.get(keys::ORIGINAL_CONTENT) {
        Some(Value::String(original)) => original.clone(),
        _ if chunk.flag(keys::SSML) => unescape_xml(&strip_markup(&chunk.content)),
        _ => chunk.content.clone(),
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Format seconds as `1h02m05s`, `3m07s` or `42s`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{MarkupConfig, MarkupWrapper};
    use crate::types::{ChapterInfo, Position};

    fn chunk(content: &str, chapter: Option<(&str, usize)>) -> TextChunk {
        let mut c = TextChunk::new(content, Position::new(0, content.chars().count()));
        if let Some((id, index)) = chapter {
            c = c.with_chapter(ChapterInfo {
                id: id.to_string(),
                title: format!("Title {}", id),
                index,
                chunk_index: 0,
            });
        }
        c
    }

    #[test]
    fn test_groups_by_chapter() {
        let chunks = vec![
            chunk("no chapter here", None),
            chunk("one two three", Some(("b", 1))),
            chunk("four five", Some(("a", 0))),
            chunk("six", Some(("b", 1))),
        ];
        let report = ChapterAnalyzer::default().analyze(&chunks);
        assert_eq!(report.chapters.len(), 2);
        assert_eq!(report.chapters[0].id, "a");
        assert_eq!(report.chapters[1].word_count, 4);
        assert_eq!(report.chapters[1].chunk_count, 2);
        assert_eq!(report.unattributed_chunks, 1);
        assert_eq!(report.total_words, 9);
        assert_eq!(report.by_id()["b"].char_count, 16);
    }

    #[test]
    fn test_markup_is_stripped_before_counting() {
        let chunks = vec![chunk(
            "<speak><prosody rate=\"slow\"><s>שלום עולם</s></prosody></speak>",
            Some(("a", 0)),
        )
        .with_metadata(keys::SSML, true)];
        let report = ChapterAnalyzer::default().analyze(&chunks);
        assert_eq!(report.chapters[0].word_count, 2);
        assert_eq!(report.chapters[0].char_count, 9);
    }

    #[test]
    fn test_raw_angle_brackets_are_counted() {
        let report = ChapterAnalyzer::default().analyze(&[chunk("x<y and y>z", Some(("a", 0)))]);
        assert_eq!(report.chapters[0].char_count, 11);
        assert_eq!(report.chapters[0].word_count, 3);
    }

    #[test]
    fn test_wrapped_chunks_count_like_plain() {
        let plain = vec![
            chunk("\"שלום,\" אמר. 'כן' & <עוד>", Some(("a", 0))),
            chunk("R&D \"x\"", Some(("a", 0))),
        ];
        let wrapped = MarkupWrapper::new(MarkupConfig {
            wrap_sentences: true,
            ..Default::default()
        })
        .wrap_chunks(plain.clone());

        let analyzer = ChapterAnalyzer::default();
        let (before, after) = (analyzer.analyze(&plain), analyzer.analyze(&wrapped));
        assert_eq!(before.chapters[0].char_count, after.chapters[0].char_count);
        assert_eq!(before.chapters[0].word_count, after.chapters[0].word_count);
        assert_eq!(before.total_chars, after.total_chars);

        let stripped: Vec<TextChunk> = wrapped
            .into_iter()
            .map(|mut c| {
                c.metadata.remove(keys::ORIGINAL_CONTENT);
                c
            })
            .collect();
        let decoded = analyzer.analyze(&stripped);
        assert_eq!(decoded.chapters[0].word_count, before.chapters[0].word_count);
        assert_eq!(decoded.chapters[0].char_count, before.chapters[0].char_count);
    }

    #[test]
    fn test_duration_estimate() {
        let words = vec!["word"; 300].join(" ");
        let report = ChapterAnalyzer::default().analyze(&[chunk(&words, Some(("a", 0)))]);
        assert_eq!(report.chapters[0].estimated_seconds, 120.0);
        assert_eq!(ChapterAnalyzer::new(0.0).estimate_seconds(100), 0.0);
    }

    #[test]
    fn test_summary_is_deterministic() {
        let chunks = vec![
            chunk("one two three", Some(("a", 0))),
            chunk("four", Some(("b", 1))),
            chunk("loose", None),
        ];
        let analyzer = ChapterAnalyzer::new(60.0);
        let summary = analyzer.analyze(&chunks).summary();
        assert_eq!(summary, analyzer.analyze(&chunks).summary());
        assert_eq!(
            summary,
            "Chapter analysis (60 wpm)\n  #1 Title a: 1 chunk, 3 words, 13 chars, ~3s\n  #2 Title b: 1 chunk, 1 words, 4 chars, ~1s\nTotal: 2 chapters, 3 chunks (1 without chapter), 5 words, 22 chars, ~5s"
        );
    }

    #[test]
    fn test_empty_input() {
        let report = ChapterAnalyzer::default().analyze(&[]);
        assert!(report.chapters.is_empty());
        assert_eq!(report.total_chunks, 0);
        assert_eq!(report.estimated_seconds, 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.4), "42s");
        assert_eq!(format_duration(187.0), "3m07s");
        assert_eq!(format_duration(3725.0), "1h02m05s");
    }
}
