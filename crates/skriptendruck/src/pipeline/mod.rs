pub mod batch;
pub mod config;
pub mod error;
pub mod progress;
pub mod runner;
pub mod sink;

pub use batch::{BatchReport, BatchRunner, BatchSummary};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter, Stage, TracingProgress};
pub use runner::Pipeline;
pub use sink::{JsonLinesSink, NoopSink, ResultSink};
