use tracing::{debug, info};

use crate::order::OrderStatus;

/// Pipeline stage an order is entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Identity,
    Inspect,
    Price,
    Render,
    Merge,
    Route,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Identity => "identity",
            Self::Inspect => "inspect",
            Self::Price => "price",
            Self::Render => "render",
            Self::Merge => "merge",
            Self::Route => "route",
        }
    }
}

/// Events emitted by the pipeline while an order moves through it.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Stage { order_id: u32, stage: Stage },
    Finished { order_id: u32, status: OrderStatus },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards progress to the log.
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Stage { order_id, stage } => {
                debug!(order_id, stage = stage.as_str(), "Entering stage");
            }
            ProgressEvent::Finished { order_id, status } => {
                info!(order_id, status = status.as_str(), "Order finished");
            }
        }
    }
}
