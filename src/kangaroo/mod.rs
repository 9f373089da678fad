//! Kangaroo module: the parallel walk itself.
//!
//! Contains the orchestrating engine, the per-worker walker state machine,
//! and the deterministic jump table.

pub mod engine;
pub mod jumps;
pub mod walker;

// Re-export main types
pub use engine::{EngineConfig, EngineContext, KangarooEngine};
pub use jumps::JumpTable;
pub use walker::Walker;
