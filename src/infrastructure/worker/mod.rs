//! Worker Layer - 流水线阶段 worker 与编排

mod pipeline_orchestrator;

pub use pipeline_orchestrator::{PipelineConfig, PipelineOrchestrator};
