//! Speech-markup (SSML) envelope for narration engines.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::apply_patch;
use crate::error::Result;
use crate::processor::ChunkProcessor;
use crate::text::{split_sentences, strip_markup, unescape_xml};
use crate::types::{TextChunk, keys};

pub const NAME: &str = "markup";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    pub enabled: bool,
    pub rate: String,
    pub pitch: String,
    pub volume: String,
    /// `xml:lang` on the root element
    pub language: Option<String>,
    /// Emit one `<s>` element per sentence
    pub wrap_sentences: bool,
    /// Insert a `<break>` before every chunk but the first
    pub add_pauses: bool,
    pub pause_ms: u32,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: "medium".to_string(),
            pitch: "medium".to_string(),
            volume: "medium".to_string(),
            language: Some("he-IL".to_string()),
            wrap_sentences: false,
            add_pauses: true,
            pause_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkupWrapper {
    config: MarkupConfig,
}

impl MarkupWrapper {
    pub fn new(config: MarkupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MarkupConfig {
        &self.config
    }

    /// Wrap every chunk not already wrapped. The pause rule counts position in `chunks`,
    /// so the first chunk of the sequence never gets a break.
    pub fn wrap_chunks(&self, chunks: Vec<TextChunk>) -> Vec<TextChunk> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                if chunk.flag(keys::SSML) {
                    return chunk;
                }
                let pause = self.config.add_pauses && i > 0;
                let mut wrapped = chunk;
                let original = std::mem::take(&mut wrapped.content);
                wrapped.content = self.wrap_content(&original, pause);
                wrapped.metadata.insert(keys::SSML.to_string(), true.into());
                wrapped
                    .metadata
                    .insert(keys::ORIGINAL_CONTENT.to_string(), original.into());
                wrapped
            })
            .collect()
    }

    pub fn wrap_content(&self, content: &str, pause: bool) -> String {
        let config = &self.config;
        let mut out = String::with_capacity(content.len() + 128);

        match &config.language {
            Some(lang) => out.push_str(&format!("<speak xml:lang=\"{}\">", escape_xml(lang))),
            None => out.push_str("<speak>"),
        }
        if pause {
            out.push_str(&format!("<break time=\"{}ms\"/>", config.pause_ms));
        }
        out.push_str(&format!(
            "<prosody rate=\"{}\" pitch=\"{}\" volume=\"{}\">",
            escape_xml(&config.rate),
            escape_xml(&config.pitch),
            escape_xml(&config.volume)
        ));

        if config.wrap_sentences {
            for sentence in split_sentences(content) {
                out.push_str("<s>");
                out.push_str(&escape_xml(sentence));
                out.push_str("</s>");
            }
        } else {
            out.push_str(&escape_xml(content));
        }

        out.push_str("</prosody></speak>");
        out
    }
}

/// Undo `wrap_chunks`: restore the stored original, or strip tags when it is missing.
/// Chunks that were never wrapped are returned as-is.
pub fn unwrap_chunk(mut chunk: TextChunk) -> TextChunk {
    if !chunk.flag(keys::SSML) {
        return chunk;
    }
    chunk.metadata.remove(keys::SSML);

    match chunk.metadata.remove(keys::ORIGINAL_CONTENT) {
        Some(Value::String(original)) => chunk.content = original,
        _ => chunk.content = unescape_xml(&strip_markup(&chunk.content)),
    }
    chunk
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl ChunkProcessor for MarkupWrapper {
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
        if !self.config.enabled {
            return Ok(chunks);
        }
        Ok(self.wrap_chunks(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn chunks(contents: &[&str]) -> Vec<TextChunk> {
        contents
            .iter()
            .map(|c| TextChunk::new(*c, Position::new(0, c.chars().count())))
            .collect()
    }

    #[tokio::test]
    async fn test_wraps_with_prosody() {
        let wrapper = MarkupWrapper::new(MarkupConfig {
            rate: "slow".to_string(),
            language: None,
            ..Default::default()
        });
        let result = wrapper.process(chunks(&["Hello"]), "").await.unwrap();
        assert_eq!(
            result[0].content,
            "<speak><prosody rate=\"slow\" pitch=\"medium\" volume=\"medium\">Hello</prosody></speak>"
        );
        assert!(result[0].flag(keys::SSML));
        assert_eq!(result[0].metadata[keys::ORIGINAL_CONTENT], "Hello");
    }

    #[tokio::test]
    async fn test_pauses_skip_first_chunk() {
        let wrapper = MarkupWrapper::default();
        let result = wrapper.process(chunks(&["One.", "Two.", "Three."]), "").await.unwrap();
        assert!(!result[0].content.contains("<break"));
        assert!(result[1].content.contains("<break time=\"500ms\"/>"));
        assert!(result[2].content.contains("<break time=\"500ms\"/>"));
    }

    #[tokio::test]
    async fn test_sentence_wrapping() {
        let wrapper = MarkupWrapper::new(MarkupConfig {
            wrap_sentences: true,
            ..Default::default()
        });
        let result = wrapper.process(chunks(&["שלום. מה שלומך?"]), "").await.unwrap();
        assert!(result[0].content.contains("<s>שלום.</s><s>מה שלומך?</s>"));
        assert!(result[0].content.starts_with("<speak xml:lang=\"he-IL\">"));
    }

    #[tokio::test]
    async fn test_escapes_special_characters() {
        let wrapper = MarkupWrapper::default();
        let result = wrapper.process(chunks(&["a < b & c"]), "").await.unwrap();
        assert!(result[0].content.contains("a &lt; b &amp; c"));
    }

    #[tokio::test]
    async fn test_round_trip_restores_original() {
        let input = chunks(&["First \"quoted\" line.", "Second & last."]);
        let wrapped = MarkupWrapper::default().process(input.clone(), "").await.unwrap();
        let restored: Vec<TextChunk> = wrapped.into_iter().map(unwrap_chunk).collect();
        assert_eq!(restored, input);
    }

    #[test]
    fn test_unwrap_without_original_strips_tags() {
        let chunk = TextChunk::new(
            "<speak><prosody rate=\"slow\">Fish &amp; chips</prosody></speak>",
            Position::new(0, 14),
        )
        .with_metadata(keys::SSML, true);
        let plain = unwrap_chunk(chunk);
        assert_eq!(plain.content, "Fish & chips");
        assert!(!plain.flag(keys::SSML));
    }

    #[test]
    fn test_unwrap_ignores_unwrapped_chunk() {
        let chunk = TextChunk::new("x<y &amp; y>z\nnext", Position::new(0, 18));
        assert_eq!(unwrap_chunk(chunk.clone()), chunk);
    }

    #[tokio::test]
    async fn test_already_wrapped_is_left_alone() {
        let wrapper = MarkupWrapper::default();
        let once = wrapper.process(chunks(&["Hi.", "There."]), "").await.unwrap();
        let twice = wrapper.process(once.clone(), "").await.unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_disabled_passes_through() {
        let wrapper = MarkupWrapper::new(MarkupConfig {
            enabled: false,
            ..Default::default()
        });
        let input = chunks(&["plain"]);
        assert_eq!(wrapper.process(input.clone(), "").await.unwrap(), input);
    }
}
