//! Output shaping for collaborators: structured chunks, speech markup, or plain text.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use crate::processors::{MarkupConfig, MarkupWrapper, unwrap_chunk};
use crate::types::TextChunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Chunks as produced
    #[default]
    Json,
    /// Every chunk wrapped in speech markup
    Markup,
    /// Markup removed and original content restored
    Plain,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markup" | "ssml" => Ok(Self::Markup),
            "plain" | "text" => Ok(Self::Plain),
            _ => Err(SegmentError::UnknownFormat(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markup => "markup",
            Self::Plain => "plain",
        }
    }

    /// Reshape chunks for this format. `markup` supplies prosody for chunks not yet wrapped.
    pub fn apply(&self, chunks: Vec<TextChunk>, markup: &MarkupConfig) -> Vec<TextChunk> {
        match self {
            Self::Json => chunks,
            Self::Markup => MarkupWrapper::new(markup.clone()).wrap_chunks(chunks),
            Self::Plain => chunks.into_iter().map(unwrap_chunk).collect(),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, keys};

    fn chunks() -> Vec<TextChunk> {
        vec![
            TextChunk::new("First.", Position::new(0, 6)),
            TextChunk::new("Second.", Position::new(7, 14)),
        ]
    }

    #[test]
    fn test_from_name() {
        assert_eq!(OutputFormat::from_name("SSML").unwrap(), OutputFormat::Markup);
        assert_eq!(OutputFormat::from_name("text").unwrap(), OutputFormat::Plain);
        assert!(OutputFormat::from_name("xml").is_err());
    }

    #[test]
    fn test_json_is_unchanged() {
        let input = chunks();
        assert_eq!(OutputFormat::Json.apply(input.clone(), &MarkupConfig::default()), input);
    }

    #[test]
    fn test_markup_wraps_even_when_wrapper_disabled() {
        let config = MarkupConfig {
            enabled: false,
            ..Default::default()
        };
        let out = OutputFormat::Markup.apply(chunks(), &config);
        assert!(out.iter().all(|c| c.flag(keys::SSML)));
        assert!(!out[0].content.contains("<break"));
        assert!(out[1].content.contains("<break"));
    }

    #[test]
    fn test_plain_restores_original() {
        let wrapped = OutputFormat::Markup.apply(chunks(), &MarkupConfig::default());
        let plain = OutputFormat::Plain.apply(wrapped, &MarkupConfig::default());
        assert_eq!(plain, chunks());
    }

    #[test]
    fn test_plain_leaves_unwrapped_text_untouched() {
        let raw = vec![TextChunk::new(
            "if x<y and y>z then\nR&amp;D stays",
            Position::new(0, 33),
        )];
        let plain = OutputFormat::Plain.apply(raw.clone(), &MarkupConfig::default());
        assert_eq!(plain, raw);
    }

    #[test]
    fn test_plain_round_trips_text_with_markup_characters() {
        let raw = vec![TextChunk::new("a <b> & \"c\"\nd", Position::new(0, 14))];
        let wrapped = OutputFormat::Markup.apply(raw.clone(), &MarkupConfig::default());
        assert_ne!(wrapped, raw);
        assert_eq!(OutputFormat::Plain.apply(wrapped, &MarkupConfig::default()), raw);
    }
}
