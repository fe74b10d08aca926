//! Split-point detector implementations

pub mod chapter;
pub mod punctuation;

pub use chapter::{ChapterConfig, ChapterDetector, MatchType};
pub use punctuation::{PunctuationConfig, PunctuationDetector, PunctuationPattern};
