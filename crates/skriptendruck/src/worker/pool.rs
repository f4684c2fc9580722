use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::order::Order;
use crate::pipeline::{Pipeline, PipelineConfig, ProgressReporter};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fixed set of threads running orders through the pipeline.
///
/// Orders are handed out over a bounded channel; finished orders come back
/// over an unbounded one so workers never block on the caller.
pub struct WorkerPool {
    order_sender: Sender<Order>,
    result_receiver: Receiver<Order>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn new(
        config: Arc<PipelineConfig>,
        progress: Arc<dyn ProgressReporter>,
        worker_count: usize,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (order_sender, order_receiver) = bounded::<Order>(worker_count * 2);
        let (result_sender, result_receiver) = unbounded::<Order>();

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let order_rx = order_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_config = Arc::clone(&config);
            let worker_progress = Arc::clone(&progress);

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    order_rx,
                    result_tx,
                    shutdown_flag,
                    worker_config,
                    worker_progress,
                );
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            order_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    /// Queues an order, waiting while the queue is full. Gives up once a
    /// shutdown is requested; the order is then left untouched.
    pub fn submit(&self, order: Order) -> Result<(), WorkerError> {
        let mut order = order;
        loop {
            if self.is_shutdown() {
                return Err(WorkerError::ShutdownRequested);
            }

            match self.order_sender.send_timeout(order, POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => order = returned,
                Err(SendTimeoutError::Disconnected(_)) => return Err(WorkerError::ChannelClosed),
            }
        }
    }

    pub fn try_recv_result(&self) -> Option<Order> {
        self.result_receiver.try_recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Closes the queue, waits for all workers and returns every order they
    /// finished that was not yet received.
    pub fn finish(self) -> Vec<Order> {
        // Drop sender to signal workers to exit
        drop(self.order_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
        self.result_receiver.try_iter().collect()
    }
}

fn run_worker(
    worker_id: usize,
    order_receiver: Receiver<Order>,
    result_sender: Sender<Order>,
    shutdown: Arc<AtomicBool>,
    config: Arc<PipelineConfig>,
    progress: Arc<dyn ProgressReporter>,
) {
    debug!("Worker {} started", worker_id);

    let pipeline = Pipeline::from_config(config);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match order_receiver.recv_timeout(POLL_INTERVAL) {
            Ok(order) => {
                debug!("Worker {} processing order {}", worker_id, order.order_id);

                let finished = pipeline.run(order, progress.as_ref());

                if let Err(e) = result_sender.send(finished) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} order channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::order::OrderStatus;
    use crate::pipeline::NoopProgress;
    use crate::processor::testing::write_pdf;
    use tempfile::TempDir;

    fn create_test_config(base: &std::path::Path) -> Arc<PipelineConfig> {
        let mut config = Config::with_base_directory(base);
        config.coversheet.thumbnails = false;
        let pipeline_config = PipelineConfig::build(&config).unwrap();
        pipeline_config.prepare().unwrap();
        Arc::new(pipeline_config)
    }

    #[test]
    fn test_worker_pool_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(temp_dir.path());
        let pool = WorkerPool::new(
            config,
            Arc::new(NoopProgress),
            2,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(!pool.is_shutdown());

        pool.shutdown();
        assert!(pool.is_shutdown());
        assert!(pool.finish().is_empty());
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(temp_dir.path());
        let pool = WorkerPool::new(
            config,
            Arc::new(NoopProgress),
            1,
            Arc::new(AtomicBool::new(false)),
        );
        let path = write_pdf(temp_dir.path(), "ab12345_bw_none_001.pdf", 1);

        pool.shutdown();
        let result = pool.submit(Order::from_path(1, &path).unwrap());

        assert!(matches!(result, Err(WorkerError::ShutdownRequested)));
        pool.finish();
        assert!(path.exists());
    }

    #[test]
    fn test_submit_and_process_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(temp_dir.path());
        let incoming = temp_dir.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        let pool = WorkerPool::new(
            config,
            Arc::new(NoopProgress),
            2,
            Arc::new(AtomicBool::new(false)),
        );

        let good = write_pdf(&incoming, "ab12345_bw_none_001.pdf", 3);
        let bad = write_pdf(&incoming, "no_convention.pdf", 3);
        pool.submit(Order::from_path(1, &good).unwrap()).unwrap();
        pool.submit(Order::from_path(2, &bad).unwrap()).unwrap();

        let mut finished = pool.finish();
        finished.sort_by_key(|order| order.order_id);

        assert_eq!(finished.len(), 2);
        // No registry configured, so the well-formed name has no user.
        assert_eq!(finished[0].status, OrderStatus::ErrorUserNotFound);
        assert_eq!(finished[1].status, OrderStatus::ErrorInvalidFilename);
        assert!(!good.exists());
        assert!(!bad.exists());
    }
}
