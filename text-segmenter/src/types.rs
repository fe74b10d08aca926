//! Data model shared by detectors, processors and the orchestrator.
//!
//! Every offset is a character offset into the original document, not a byte offset.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached to split points and chunks.
pub type Metadata = Map<String, Value>;

/// Metadata keys written by the built-in plugins.
pub mod keys {
    pub const MERGED: &str = "merged";
    pub const SPLIT: &str = "split";
    pub const FORCED: &str = "forced";
    pub const END_OF_TEXT: &str = "end_of_text";
    pub const SPLIT_PRIORITY: &str = "split_priority";
    pub const MARKER: &str = "marker";
    pub const SSML: &str = "ssml";
    pub const ORIGINAL_CONTENT: &str = "original_content";
    pub const TITLE: &str = "title";
    pub const CHAPTER: &str = "chapter";
    pub const TITLE_INDEX: &str = "title_index";
    pub const MATCH_TYPE: &str = "match_type";
    pub const SIMILARITY: &str = "similarity";
}

/// A `[start, end)` span in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    /// Create a span; `end` is clamped so that `start <= end` always holds.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Translate a scope-local span into document coordinates.
    pub fn offset(self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// Precedence of a split point. Lower rank wins when positions tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitPriority {
    Chapter = 0,
    SentenceEnd = 1,
    Semicolon = 2,
    Comma = 3,
    Whitespace = 4,
}

impl SplitPriority {
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::SentenceEnd => "sentence-end",
            Self::Semicolon => "semicolon",
            Self::Comma => "comma",
            Self::Whitespace => "whitespace",
        }
    }
}

/// Text on either side of a split point, for debugging and review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitContext {
    pub before: String,
    pub after: String,
}

/// A candidate position at which the document may be divided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPoint {
    pub position: usize,
    pub priority: SplitPriority,
    /// The matched text that produced this point.
    pub marker: String,
    pub context: SplitContext,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
}

impl SplitPoint {
    pub fn title(&self) -> Option<&str> {
        self.metadata.get(keys::TITLE).and_then(Value::as_str)
    }
}

/// Chapter attribution stamped on chunks produced from a chapter body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub id: String,
    pub title: String,
    pub index: usize,
    /// 0-based ordinal of the chunk within its chapter.
    pub chunk_index: usize,
}

/// A contiguous slice of the document between two chapter split points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub position: Position,
    pub content: String,
}

impl Chapter {
    pub fn info(&self, index: usize, chunk_index: usize) -> ChapterInfo {
        ChapterInfo {
            id: self.id.clone(),
            title: self.title.clone(),
            index,
            chunk_index,
        }
    }
}

/// A bounded, position-addressable slice of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<ChapterInfo>,
}

impl TextChunk {
    pub fn new(content: impl Into<String>, position: Position) -> Self {
        Self {
            content: content.into(),
            position,
            metadata: Metadata::new(),
            chapter: None,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn with_chapter(mut self, chapter: ChapterInfo) -> Self {
        self.chapter = Some(chapter);
        self
    }

    /// Content length in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// True when a boolean metadata flag is set.
    pub fn flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn chapter_id(&self) -> Option<&str> {
        self.chapter.as_ref().map(|c| c.id.as_str())
    }
}
