//! Named bundles of detectors and processors with tuned parameters.

use serde::{Deserialize, Serialize};

use crate::config::SegmenterConfig;
use crate::detectors::{ChapterConfig, ChapterDetector, PunctuationDetector};
use crate::error::{Result, SegmentError};
use crate::processors::{MarkupConfig, MarkupWrapper, SizeOptimizer, SizeOptimizerConfig};
use crate::segmenter::Segmenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Default,
    Narrative,
    Dialogue,
    Technical,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Default,
        Preset::Narrative,
        Preset::Dialogue,
        Preset::Technical,
    ];

    /// Parse a preset name (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "narrative" => Ok(Self::Narrative),
            "dialogue" | "dialog" => Ok(Self::Dialogue),
            "technical" => Ok(Self::Technical),
            _ => Err(SegmentError::UnknownPreset(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Narrative => "narrative",
            Self::Dialogue => "dialogue",
            Self::Technical => "technical",
        }
    }

    /// `(min, max, target)` chunk sizes in characters
    fn sizes(&self) -> (usize, usize, usize) {
        match self {
            Self::Default => (100, 500, 300),
            Self::Narrative => (200, 800, 500),
            Self::Dialogue => (50, 300, 150),
            Self::Technical => (150, 600, 400),
        }
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        let (min, max, _) = self.sizes();
        SegmenterConfig {
            min_chunk_size: min,
            max_chunk_size: max,
            process_chapters_separately: true,
            debug: false,
        }
    }

    pub fn optimizer_config(&self) -> SizeOptimizerConfig {
        let (min, max, target) = self.sizes();
        SizeOptimizerConfig {
            min_size: min,
            max_size: max,
            target_size: target,
            ..Default::default()
        }
    }

    pub fn chapter_config(&self) -> ChapterConfig {
        match self {
            Self::Technical => ChapterConfig {
                fuzzy_threshold: 0.9,
                ..Default::default()
            },
            _ => ChapterConfig::default(),
        }
    }

    pub fn markup_config(&self) -> MarkupConfig {
        let base = MarkupConfig::default();
        match self {
            Self::Default => MarkupConfig {
                enabled: false,
                ..base
            },
            Self::Narrative => MarkupConfig {
                rate: "slow".to_string(),
                wrap_sentences: true,
                pause_ms: 700,
                ..base
            },
            Self::Dialogue => MarkupConfig {
                pitch: "+5%".to_string(),
                pause_ms: 300,
                ..base
            },
            Self::Technical => MarkupConfig {
                enabled: false,
                rate: "slow".to_string(),
                pause_ms: 600,
                ..base
            },
        }
    }

    /// Build a segmenter: chapter detector, punctuation detector, size optimizer, markup.
    pub fn build(&self) -> Result<Segmenter> {
        Ok(Segmenter::new(self.segmenter_config())
            .with_chapter_detector(ChapterDetector::new(self.chapter_config())?)
            .with_detector(PunctuationDetector::default())
            .with_processor(SizeOptimizer::new(self.optimizer_config()))
            .with_processor(MarkupWrapper::new(self.markup_config())))
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
