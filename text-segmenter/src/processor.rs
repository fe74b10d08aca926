use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::TextChunk;

/// Trait for chunk processors
///
/// Processors run in registration order. Each one receives the current chunk list and the
/// original text the chunks were cut from, and returns the next chunk list.
#[async_trait]
pub trait ChunkProcessor: Send + Sync {
    /// Name used to address the processor when reconfiguring
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Merge a partial JSON config over the current one
    fn configure(&mut self, patch: &Value) -> Result<()>;

    /// Transform an ordered chunk list
    async fn process(&self, chunks: Vec<TextChunk>, text: &str) -> Result<Vec<TextChunk>>;
}
