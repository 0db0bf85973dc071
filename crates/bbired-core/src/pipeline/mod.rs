pub mod config;
mod context;
mod orchestrator;
mod types;

pub use context::{PipelineContext, ReductionState};
pub use orchestrator::{run_reduction, run_reduction_reported};
pub use types::{PipelineWarning, ProgressReporter, ReductionReport, ReductionStage};
