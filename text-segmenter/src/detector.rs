use serde_json::Value;

use crate::error::Result;
use crate::types::SplitPoint;

/// Trait for split-point detectors
///
/// A detector scans a text and returns candidate boundaries. Positions are character
/// offsets into the text it was given.
pub trait SplitPointDetector: Send + Sync {
    /// Name used to address the detector when reconfiguring
    fn name(&self) -> &'static str;

    /// Disabled detectors are skipped by the orchestrator
    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Merge a partial JSON config over the current one
    fn configure(&mut self, patch: &Value) -> Result<()>;

    /// Scan `text` for candidate split points
    fn detect(&self, text: &str) -> Result<Vec<SplitPoint>>;
}
