use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SegmentError};

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Smallest span the chunk builder cuts at a split point
    pub min_chunk_size: usize,
    /// Largest span before the chunk builder force-splits
    pub max_chunk_size: usize,
    /// Segment each located chapter independently
    pub process_chapters_separately: bool,
    /// Log the per-call segmentation summary at info instead of debug
    pub debug: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 100,
            max_chunk_size: 500,
            process_chapters_separately: true,
            debug: false,
        }
    }
}

/// Shallow-merge a JSON object over a serializable config and read it back.
///
/// Fields absent from the patch keep their current values. Unknown fields and type
/// mismatches are reported as `InvalidConfig` for `plugin`.
pub fn apply_patch<T>(plugin: &str, current: &T, patch: &Value) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let invalid = |message: String| SegmentError::InvalidConfig {
        plugin: plugin.to_string(),
        message,
    };

    let Value::Object(fields) = patch else {
        return Err(invalid(format!("expected an object, got {}", patch)));
    };

    let mut merged = serde_json::to_value(current)?;
    let Value::Object(target) = &mut merged else {
        return Err(invalid("config is not a struct".to_string()));
    };

    for (key, value) in fields {
        if !target.contains_key(key) {
            return Err(invalid(format!("unknown field '{}'", key)));
        }
        target.insert(key.clone(), value.clone());
    }

    serde_json::from_value(merged).map_err(|e| invalid(e.to_string()))
}
