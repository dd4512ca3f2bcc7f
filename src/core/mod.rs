//! Orchestration logic: batching, the stage chain, fan-out publication,
//! and the shared model loader.

pub mod batcher;
pub mod loader;
pub mod orchestrator;
pub mod outcome;

pub use batcher::{combine_messages, resolve_work_unit, should_combine};
pub use loader::{run_generation, LoadError, ModelSource, ResourceLoader, GENERATION_TIMEOUT};
pub use orchestrator::{shared_pipeline, Pipeline};
pub use outcome::{settle, StageOutcome};
