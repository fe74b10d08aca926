//! gen-chunks configuration management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use text_segmenter::OutputFormat;
use text_segmenter::analyzer::DEFAULT_WORDS_PER_MINUTE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenChunksConfig {
    /// Preset used when --preset is not given
    #[serde(default = "default_preset")]
    pub default_preset: String,

    /// Output format used when --format is not given
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Narration speed for duration estimates
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: f64,

    /// Override the preset's minimum chunk size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chunk_size: Option<usize>,

    /// Override the preset's maximum chunk size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size: Option<usize>,
}

fn default_preset() -> String {
    "default".to_string()
}

fn default_words_per_minute() -> f64 {
    DEFAULT_WORDS_PER_MINUTE
}

impl Default for GenChunksConfig {
    fn default() -> Self {
        Self {
            default_preset: default_preset(),
            output_format: OutputFormat::default(),
            words_per_minute: default_words_per_minute(),
            min_chunk_size: None,
            max_chunk_size: None,
        }
    }
}

impl GenChunksConfig {
    /// Get the config file path: ~/.config/cli-programs/gen-chunks.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("gen-chunks.toml"))
    }

    /// Load config from the default location, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: GenChunksConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
