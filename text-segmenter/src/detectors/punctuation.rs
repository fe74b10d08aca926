//! Punctuation-based split points.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::apply_patch;
use crate::detector::SplitPointDetector;
use crate::error::Result;
use crate::text::TextIndex;
use crate::types::{SplitContext, SplitPoint, SplitPriority, keys};

pub const NAME: &str = "punctuation";

/// One punctuation class and the tier it splits at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunctuationPattern {
    pub pattern: String,
    pub priority: SplitPriority,
}

impl PunctuationPattern {
    fn new(pattern: &str, priority: SplitPriority) -> Self {
        Self {
            pattern: pattern.to_string(),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PunctuationConfig {
    pub enabled: bool,
    /// Characters of context captured on each side of a split point
    pub context_length: usize,
    pub patterns: Vec<PunctuationPattern>,
}

impl Default for PunctuationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context_length: 30,
            patterns: default_patterns(),
        }
    }
}

/// Sof pasuq (U+05C3) and the Armenian full stop (U+0589) some Hebrew texts use for it come
/// first so they win ties over the Latin class.
fn default_patterns() -> Vec<PunctuationPattern> {
    vec![
        PunctuationPattern::new("[\u{05C3}\u{0589}]+", SplitPriority::SentenceEnd),
        PunctuationPattern::new("[.!?]+[\"'\u{201D}\u{2019}\u{05F4})]*", SplitPriority::SentenceEnd),
        PunctuationPattern::new(";", SplitPriority::Semicolon),
        PunctuationPattern::new(",", SplitPriority::Comma),
        PunctuationPattern::new(r"\n[ \t]*\n\s*", SplitPriority::Whitespace),
    ]
}

/// Splits after sentence enders, semicolons, commas and paragraph breaks.
pub struct PunctuationDetector {
    config: PunctuationConfig,
    compiled: Vec<(Regex, SplitPriority)>,
}

impl PunctuationDetector {
    pub fn new(config: PunctuationConfig) -> Result<Self> {
        let compiled = compile(&config.patterns)?;
        Ok(Self { config, compiled })
    }

    pub fn config(&self) -> &PunctuationConfig {
        &self.config
    }
}

impl Default for PunctuationDetector {
    fn default() -> Self {
        let config = PunctuationConfig::default();
        let compiled = compile(&config.patterns).expect("default punctuation patterns compile");
        Self { config, compiled }
    }
}

fn compile(patterns: &[PunctuationPattern]) -> Result<Vec<(Regex, SplitPriority)>> {
    patterns
        .iter()
        .map(|p| Ok((Regex::new(&p.pattern)?, p.priority)))
        .collect()
}

/// Punctuation directly followed by a letter or digit ("3.50", "1,000", "e.g") is not a
/// boundary. Matches ending in whitespace are exempt.
fn inside_word(index: &TextIndex, matched: &str, end: usize) -> bool {
    !matched.ends_with(char::is_whitespace) && index.char_at(end).is_some_and(char::is_alphanumeric)
}

impl SplitPointDetector for PunctuationDetector {
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
        let config: PunctuationConfig = apply_patch(NAME, &self.config, patch)?;
        self.compiled = compile(&config.patterns)?;
        self.config = config;
        Ok(())
    }

    fn detect(&self, text: &str) -> Result<Vec<SplitPoint>> {
        let index = TextIndex::new(text);
        let context = self.config.context_length;
        let mut points = Vec::new();

        for (regex, priority) in &self.compiled {
            for m in regex.find_iter(text) {
                let position = index.char_offset(m.end());
                if inside_word(&index, m.as_str(), position) {
                    continue;
                }
                let mut point = SplitPoint {
                    position,
                    priority: *priority,
                    marker: m.as_str().to_string(),
                    context: SplitContext {
                        before: index.before(position, context).to_string(),
                        after: index.after(position, context).to_string(),
                    },
                    metadata: Default::default(),
                };
                point
                    .metadata
                    .insert(keys::SPLIT_PRIORITY.to_string(), priority.as_str().into());
                points.push(point);
            }
        }

        points.sort_by_key(|p| (p.position, p.priority));
        Ok(points)
    }
}
