//! Chapter-aware text segmentation for narration synthesis
//!
//! Turns long (Hebrew-oriented) prose into bounded chunks addressed by character offsets
//! into the original text:
//! - split-point detectors (punctuation, chapter titles) propose boundaries
//! - the segmenter cuts chunks greedily within size bounds, per chapter or per document
//! - chunk processors (size optimizer, speech-markup wrapper) refine the sequence
//! - the chapter analyzer reports word counts and narration time

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod detectors;
pub mod error;
pub mod output;
pub mod presets;
pub mod processor;
pub mod processors;
pub mod segmenter;
pub mod text;
pub mod types;

pub use analyzer::{ChapterAnalysis, ChapterAnalyzer, ChapterReport};
pub use config::SegmenterConfig;
pub use detector::SplitPointDetector;
pub use detectors::{ChapterDetector, PunctuationDetector};
pub use error::{Result, SegmentError};
pub use output::OutputFormat;
pub use presets::Preset;
pub use processor::ChunkProcessor;
pub use processors::{MarkupWrapper, SizeOptimizer};
pub use segmenter::{SegmentationResult, Segmenter};
pub use types::{Chapter, ChapterInfo, Position, SplitContext, SplitPoint, SplitPriority, TextChunk};
