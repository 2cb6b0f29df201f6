//! Application layer: turn orchestration.

pub mod pipeline;

pub use pipeline::{Evaluation, JudgeTrace, PipelineService, PolicyEngine};
