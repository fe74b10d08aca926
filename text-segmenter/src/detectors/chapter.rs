//! Chapter-title split points.
//!
//! Each expected title is located in three escalating passes, stopping at the first pass that
//! finds anything for that title:
//!
//! 1. exact substring occurrences,
//! 2. the title preceded by an optional numbering prefix ("Chapter 3:", "פרק ב'", "IV."),
//! 3. fuzzy line matching by normalized Levenshtein similarity.
//!
//! Passes 1 and 2 only accept matches at the start of the text or right after a newline when
//! `require_newline` is set. A low `fuzzy_threshold` trades missed titles for false positives.

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::apply_patch;
use crate::detector::SplitPointDetector;
use crate::error::Result;
use crate::text::TextIndex;
use crate::types::{SplitContext, SplitPoint, SplitPriority, keys};

pub const NAME: &str = "chapter";

const DEFAULT_PREFIX: &str = r"(?:(?i:chapter|part|book|פרק|שער|חלק|ספר)\s+[\p{L}\p{N}'׳״]+\s*[.:\-]?\s*|[\p{N}IVXLC]+\s*[.):\-]\s*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Prefixed,
    Fuzzy,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefixed => "prefixed",
            Self::Fuzzy => "fuzzy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterConfig {
    pub enabled: bool,
    /// Expected chapter titles, in reading order
    pub titles: Vec<String>,
    /// Exact and prefixed matches must start a line
    pub require_newline: bool,
    pub fuzzy_matching: bool,
    /// Minimum normalized similarity (0.0-1.0) for a fuzzy line match
    pub fuzzy_threshold: f64,
    pub context_length: usize,
    /// Numbering prefix allowed before a title in the second pass
    pub prefix_pattern: String,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            titles: Vec::new(),
            require_newline: true,
            fuzzy_matching: true,
            fuzzy_threshold: 0.8,
            context_length: 30,
            prefix_pattern: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Locates expected chapter titles in a document.
pub struct ChapterDetector {
    config: ChapterConfig,
    /// One prefixed-title pattern per entry in `config.titles`
    prefixed: Vec<Option<Regex>>,
}

impl ChapterDetector {
    pub fn new(config: ChapterConfig) -> Result<Self> {
        let prefixed = compile_prefixed(&config)?;
        warn_on_threshold(config.fuzzy_threshold);
        Ok(Self { config, prefixed })
    }

    pub fn with_titles(titles: Vec<String>) -> Result<Self> {
        Self::new(ChapterConfig {
            titles,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &ChapterConfig {
        &self.config
    }

    pub fn titles(&self) -> &[String] {
        &self.config.titles
    }

    pub fn has_titles(&self) -> bool {
        self.config.titles.iter().any(|t| !t.trim().is_empty())
    }

    pub fn set_titles(&mut self, titles: Vec<String>) -> Result<()> {
        let config = ChapterConfig {
            titles,
            ..self.config.clone()
        };
        self.prefixed = compile_prefixed(&config)?;
        self.config = config;
        Ok(())
    }

    fn passes_guard(&self, index: &TextIndex, start: usize) -> bool {
        !self.config.require_newline || start == 0 || index.char_at(start - 1) == Some('\n')
    }

    fn exact_matches(&self, index: &TextIndex, title: &str) -> Vec<(usize, String)> {
        index
            .text()
            .match_indices(title)
            .map(|(byte, matched)| (index.char_offset(byte), matched.to_string()))
            .filter(|(start, _)| self.passes_guard(index, *start))
            .collect()
    }

    fn prefixed_matches(&self, index: &TextIndex, regex: &Regex) -> Vec<(usize, String)> {
        regex
            .find_iter(index.text())
            .map(|m| (index.char_offset(m.start()), m.as_str().to_string()))
            .filter(|(start, _)| self.passes_guard(index, *start))
            .collect()
    }

    fn fuzzy_matches(&self, text: &str, title: &str) -> Vec<(usize, String, f64)> {
        let threshold = self.config.fuzzy_threshold;
        let title_len = title.chars().count();
        let mut found = Vec::new();
        let mut line_start = 0;

        for line in text.split('\n') {
            let line_len = line.chars().count();
            let candidate = line.trim();
            if !candidate.is_empty() {
                let candidate_len = candidate.chars().count();
                let (shorter, longer) = if candidate_len < title_len {
                    (candidate_len, title_len)
                } else {
                    (title_len, candidate_len)
                };
                // similarity can never exceed shorter / longer
                if shorter as f64 / longer as f64 >= threshold {
                    let score = similarity(candidate, title);
                    if score >= threshold {
                        found.push((line_start, candidate.to_string(), score));
                    }
                }
            }
            line_start += line_len + 1;
        }

        found
    }

    fn split_point(
        &self,
        index: &TextIndex,
        position: usize,
        marker: String,
        title: &str,
        title_index: usize,
        match_type: MatchType,
        score: f64,
    ) -> SplitPoint {
        let context = self.config.context_length;
        let mut point = SplitPoint {
            position,
            priority: SplitPriority::Chapter,
            marker,
            context: SplitContext {
                before: index.before(position, context).to_string(),
                after: index.after(position, context).to_string(),
            },
            metadata: Default::default(),
        };
        let meta = &mut point.metadata;
        meta.insert(keys::CHAPTER.to_string(), true.into());
        meta.insert(keys::TITLE.to_string(), title.into());
        meta.insert(keys::TITLE_INDEX.to_string(), title_index.into());
        meta.insert(keys::MATCH_TYPE.to_string(), match_type.as_str().into());
        meta.insert(keys::SIMILARITY.to_string(), score.into());
        point
    }
}

impl Default for ChapterDetector {
    fn default() -> Self {
        Self {
            config: ChapterConfig::default(),
            prefixed: Vec::new(),
        }
    }
}

/// Normalized Levenshtein similarity: `(longer - distance) / longer`, in characters.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    (longer - distance.min(longer)) as f64 / longer as f64
}

fn warn_on_threshold(threshold: f64) {
    if !(threshold > 0.0 && threshold <= 1.0) {
        warn!(
            "Fuzzy chapter threshold {} is outside (0, 1]; matches will be unreliable",
            threshold
        );
    }
}

/// Title words are matched with flexible whitespace so reflowed titles still hit.
fn compile_prefixed(config: &ChapterConfig) -> Result<Vec<Option<Regex>>> {
    config
        .titles
        .iter()
        .map(|title| {
            let words: Vec<String> = title.split_whitespace().map(regex::escape).collect();
            if words.is_empty() {
                return Ok(None);
            }
            let pattern = format!("(?:{})?{}", config.prefix_pattern, words.join(r"\s+"));
            Ok(Some(Regex::new(&pattern)?))
        })
        .collect()
}

impl SplitPointDetector for ChapterDetector {
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
        let config: ChapterConfig = apply_patch(NAME, &self.config, patch)?;
        self.prefixed = compile_prefixed(&config)?;
        warn_on_threshold(config.fuzzy_threshold);
        self.config = config;
        Ok(())
    }

    fn detect(&self, text: &str) -> Result<Vec<SplitPoint>> {
        let index = TextIndex::new(text);
        let mut points: Vec<SplitPoint> = Vec::new();

        for (title_index, raw_title) in self.config.titles.iter().enumerate() {
            let title = raw_title.trim();
            if title.is_empty() {
                continue;
            }

            let exact = self.exact_matches(&index, title);
            if !exact.is_empty() {
                for (position, marker) in exact {
                    points.push(self.split_point(
                        &index, position, marker, title, title_index, MatchType::Exact, 1.0,
                    ));
                }
                continue;
            }

            if let Some(Some(regex)) = self.prefixed.get(title_index) {
                let prefixed = self.prefixed_matches(&index, regex);
                if !prefixed.is_empty() {
                    for (position, marker) in prefixed {
                        points.push(self.split_point(
                            &index, position, marker, title, title_index, MatchType::Prefixed, 1.0,
                        ));
                    }
                    continue;
                }
            }

            if self.config.fuzzy_matching {
                for (position, marker, score) in self.fuzzy_matches(text, title) {
                    points.push(self.split_point(
                        &index, position, marker, title, title_index, MatchType::Fuzzy, score,
                    ));
                }
            } else {
                debug!("Chapter title not found: {}", title);
            }
        }

        // first title to claim a position wins
        points.sort_by_key(|p| p.position);
        points.dedup_by_key(|p| p.position);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detector(titles: &[&str]) -> ChapterDetector {
        ChapterDetector::with_titles(titles.iter().map(|t| t.to_string()).collect()).unwrap()
    }

    fn match_type(point: &SplitPoint) -> &str {
        point.metadata[keys::MATCH_TYPE].as_str().unwrap()
    }

    #[test]
    fn test_hebrew_title_at_line_start() {
        let title = "שער ראשון: מקום אחר";
        let text = format!("הקדמה קצרה.\n{}\nוהיה בימים ההם.", title);
        let points = detector(&[title]).detect(&text).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, 12);
        assert_eq!(points[0].title(), Some(title));
        assert_eq!(points[0].priority, SplitPriority::Chapter);
        assert_eq!(match_type(&points[0]), "exact");
    }

    #[test]
    fn test_exact_match_rejected_mid_line() {
        let mut d = detector(&["The End"]);
        d.configure(&json!({ "fuzzy_matching": false })).unwrap();
        let points = d.detect("It was not The End of it.").unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_mid_line_allowed_without_newline_guard() {
        let mut d = detector(&["The End"]);
        d.configure(&json!({ "require_newline": false })).unwrap();
        let points = d.detect("It was not The End of it.").unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, 11);
    }

    #[test]
    fn test_prefixed_match_starts_at_prefix() {
        let text = "Intro text.\nChapter 3: The Storm\nRain fell.";
        let points = detector(&["The Storm"]).detect(text).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, 12);
        assert_eq!(points[0].marker, "Chapter 3: The Storm");
        assert_eq!(match_type(&points[0]), "prefixed");
    }

    #[test]
    fn test_prefixed_match_hebrew_numbering() {
        let text = "פתיחה\nפרק ב׳: הדרך\nטקסט";
        let points = detector(&["הדרך"]).detect(text).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, 6);
    }

    #[test]
    fn test_fuzzy_match_tolerates_ocr_noise() {
        let text = "פתיחה\nשער ראשון: מקום אתר\nוהיה";
        let points = detector(&["שער ראשון: מקום אחר"]).detect(text).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, 6);
        assert_eq!(match_type(&points[0]), "fuzzy");
        let score = points[0].metadata[keys::SIMILARITY].as_f64().unwrap();
        assert!(score >= 0.8 && score < 1.0);
    }

    #[test]
    fn test_fuzzy_threshold_is_configurable() {
        let text = "Prologue\nChaptr Oen\nbody";
        let mut d = detector(&["Chapter One"]);
        assert!(d.detect(text).unwrap().is_empty());
        d.configure(&json!({ "fuzzy_threshold": 0.5 })).unwrap();
        assert_eq!(d.detect(text).unwrap().len(), 1);
    }

    #[test]
    fn test_results_sorted_and_deduplicated() {
        let text = "Part Two\nsecond\nPart One\nfirst\n";
        let points = detector(&["Part One", "Part Two", "Part Two"]).detect(text).unwrap();
        let positions: Vec<usize> = points.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 16]);
        assert_eq!(points[0].title(), Some("Part Two"));
    }

    #[test]
    fn test_no_titles_finds_nothing() {
        let d = ChapterDetector::default();
        assert!(!d.has_titles());
        assert!(d.detect("Chapter 1\ntext").unwrap().is_empty());
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert!((similarity("kitten", "sitting") - 4.0 / 7.0).abs() < 1e-9);
    }
}
