use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Detector '{name}' failed: {message}")]
    Detector { name: String, message: String },

    #[error("Processor '{name}' failed: {message}")]
    Processor { name: String, message: String },

    #[error("Invalid configuration for '{plugin}': {message}")]
    InvalidConfig { plugin: String, message: String },

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Plugin panicked: {0}")]
    Panicked(String),

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SegmentError {
    /// Build a detector failure for a custom plugin.
    pub fn detector(name: &str, message: impl Into<String>) -> Self {
        Self::Detector {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Build a processor failure for a custom plugin.
    pub fn processor(name: &str, message: impl Into<String>) -> Self {
        Self::Processor {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SegmentError>;
