//! Chunk processor implementations

pub mod markup;
pub mod size_optimizer;

pub use markup::{MarkupConfig, MarkupWrapper, unwrap_chunk};
pub use size_optimizer::{SizeOptimizer, SizeOptimizerConfig};
