//! Tapescan runner — configuration and pipeline orchestration.

pub mod config;
pub mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{run_pipeline, PipelineReport};
