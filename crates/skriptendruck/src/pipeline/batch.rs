use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::config::Config;
use crate::error::{ConfigError, SkriptendruckError, WorkerError};
use crate::order::{Order, OrderStatus};
use crate::pricing::format_cents;
use crate::worker::{DirectoryScanner, WorkerPool};

use super::config::PipelineConfig;
use super::progress::{NoopProgress, ProgressReporter};
use super::runner::Pipeline;
use super::sink::{JsonLinesSink, NoopSink, ResultSink};

/// Totals over one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub discovered: usize,
    pub finished: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    /// Sum of amounts due (after deposit) over processed orders.
    pub revenue_cents: u64,
    /// A shutdown request left orders untouched in the input directory.
    pub interrupted: bool,
}

impl BatchSummary {
    fn record(&mut self, order: &Order) {
        self.finished += 1;
        *self.by_status.entry(order.status.as_str()).or_insert(0) += 1;
        if order.status == OrderStatus::Processed {
            if let Some(price) = &order.price_calculation {
                self.revenue_cents = self.revenue_cents.saturating_add(price.price_after_deposit);
            }
        }
    }

    pub fn count(&self, status: OrderStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }

    pub fn errors(&self) -> usize {
        OrderStatus::ALL
            .into_iter()
            .filter(|status| status.is_error())
            .map(|status| self.count(status))
            .sum()
    }

    pub fn revenue_formatted(&self) -> String {
        format_cents(self.revenue_cents)
    }
}

/// Outcome of a batch: the summary plus every finished order.
#[derive(Debug)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub orders: Vec<Order>,
}

/// Scans the input directory once and drives every order to a terminal
/// status, sequentially or on a worker pool.
pub struct BatchRunner {
    config: Arc<PipelineConfig>,
    parallel: bool,
    worker_count: usize,
    progress: Arc<dyn ProgressReporter>,
    sink: Arc<dyn ResultSink>,
    shutdown: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(config: PipelineConfig, parallel: bool, worker_count: usize) -> Self {
        Self {
            config: Arc::new(config),
            parallel,
            worker_count: worker_count.max(1),
            progress: Arc::new(NoopProgress),
            sink: Arc::new(NoopSink),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Loads all shared resources. Fails before any order is touched.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let pipeline_config = PipelineConfig::build(config)?;
        let mut runner = Self::new(
            pipeline_config,
            config.processing.parallel,
            config.processing.worker_count,
        );
        if let Some(path) = &config.processing.results_file {
            runner.sink = Arc::new(JsonLinesSink::create(path)?);
        }
        Ok(runner)
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Setting the flag stops the batch from starting further orders.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn run(&self) -> Result<BatchReport, SkriptendruckError> {
        let _span = info_span!("batch", parallel = self.parallel).entered();

        self.preflight()?;

        let orders = DirectoryScanner::new(&self.config.input_directory).scan()?;
        let mut summary = BatchSummary {
            discovered: orders.len(),
            ..BatchSummary::default()
        };

        let finished = if self.parallel && orders.len() > 1 {
            self.run_parallel(orders, &mut summary)?
        } else {
            self.run_sequential(orders, &mut summary)
        };

        if let Err(e) = self.sink.flush() {
            warn!("Failed to flush results: {}", e);
        }
        summary.interrupted = finished.len() < summary.discovered;

        info!(
            "Batch finished: {} of {} orders, {} processed, {} errors, {} due",
            summary.finished,
            summary.discovered,
            summary.count(OrderStatus::Processed),
            summary.errors(),
            summary.revenue_formatted()
        );

        Ok(BatchReport {
            summary,
            orders: finished,
        })
    }

    fn preflight(&self) -> Result<(), SkriptendruckError> {
        let input = &self.config.input_directory;
        match std::fs::metadata(input) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(ConfigError::InputDirectory {
                    path: input.clone(),
                    reason: "not a directory".to_string(),
                }
                .into());
            }
            Err(e) => {
                return Err(ConfigError::InputDirectory {
                    path: input.clone(),
                    reason: e.to_string(),
                }
                .into());
            }
        }

        self.config.prepare()?;
        Ok(())
    }

    fn finish(&self, order: Order, summary: &mut BatchSummary, finished: &mut Vec<Order>) {
        if let Err(e) = self.sink.record(&order) {
            warn!("Failed to record order {}: {}", order.order_id, e);
        }
        summary.record(&order);
        finished.push(order);
    }

    fn run_sequential(&self, orders: Vec<Order>, summary: &mut BatchSummary) -> Vec<Order> {
        let pipeline = Pipeline::from_config(Arc::clone(&self.config));
        let mut finished = Vec::with_capacity(orders.len());

        for order in orders {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown requested, leaving remaining orders in place");
                break;
            }
            let done = pipeline.run(order, self.progress.as_ref());
            self.finish(done, summary, &mut finished);
        }

        finished
    }

    fn run_parallel(
        &self,
        orders: Vec<Order>,
        summary: &mut BatchSummary,
    ) -> Result<Vec<Order>, SkriptendruckError> {
        let worker_count = self.worker_count.min(orders.len());
        let pool = WorkerPool::new(
            Arc::clone(&self.config),
            Arc::clone(&self.progress),
            worker_count,
            Arc::clone(&self.shutdown),
        );
        let mut finished = Vec::with_capacity(orders.len());

        for order in orders {
            match pool.submit(order) {
                Ok(()) => {}
                Err(WorkerError::ShutdownRequested) => {
                    info!("Shutdown requested, leaving remaining orders in place");
                    break;
                }
                Err(e) => {
                    pool.shutdown();
                    for done in pool.finish() {
                        self.finish(done, summary, &mut finished);
                    }
                    return Err(e.into());
                }
            }
            while let Some(done) = pool.try_recv_result() {
                self.finish(done, summary, &mut finished);
            }
        }

        for done in pool.finish() {
            self.finish(done, summary, &mut finished);
        }

        Ok(finished)
    }
}
