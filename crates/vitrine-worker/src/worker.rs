//! Shutdown: [`PipelineWorker::shutdown`] stops every polling loop after its current
//! batch and waits for the loops to exit.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use vitrine_bus::DeliverySource;
use vitrine_core::Config;
use vitrine_services::{process_batch, BatchReport, DeliveryOutcome, DeliveryResult, EventConsumer};

/// Maximum delay in seconds before a retried delivery becomes visible again.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Backoff in seconds after the `attempt`-th failed delivery (exponential with cap).
#[inline]
pub fn compute_retry_backoff_seconds(attempt: u32) -> u64 {
    2_u64.saturating_pow(attempt).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Debug, Clone)]
pub struct PipelineWorkerConfig {
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    /// Redeliver retried messages without backoff.
    pub immediate_retry: bool,
}

impl Default for PipelineWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            batch_size: 10,
            immediate_retry: false,
        }
    }
}

impl PipelineWorkerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval_ms: config.worker_poll_interval_ms(),
            batch_size: config.worker_batch_size(),
            immediate_retry: false,
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        if self.immediate_retry {
            Duration::ZERO
        } else {
            Duration::from_secs(compute_retry_backoff_seconds(attempt))
        }
    }
}

/// One spawned polling loop per consumer.
pub struct PipelineWorker {
    shutdown_txs: Vec<mpsc::Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl PipelineWorker {
    pub fn start(
        source: Arc<dyn DeliverySource>,
        consumers: Vec<Arc<dyn EventConsumer>>,
        config: PipelineWorkerConfig,
    ) -> Self {
        tracing::info!(
            consumers = consumers.len(),
            poll_interval_ms = config.poll_interval_ms,
            batch_size = config.batch_size,
            "Pipeline worker started"
        );

        let mut shutdown_txs = Vec::with_capacity(consumers.len());
        let mut handles = Vec::with_capacity(consumers.len());
        for consumer in consumers {
            let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
            let source = source.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                Self::poll_loop(source, consumer, config, shutdown_rx).await;
            }));
            shutdown_txs.push(shutdown_tx);
        }

        Self {
            shutdown_txs,
            handles,
        }
    }

    async fn poll_loop(
        source: Arc<dyn DeliverySource>,
        consumer: Arc<dyn EventConsumer>,
        config: PipelineWorkerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        tracing::debug!(subscription = consumer.name(), "Subscription polling loop started");

        loop {
            let report = poll_once(source.as_ref(), consumer.as_ref(), &config).await;
            // Keep draining while batches come back non-empty.
            let pause = if report.is_empty() {
                poll_interval
            } else {
                Duration::ZERO
            };

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = sleep(pause) => {}
            }
        }

        tracing::info!(subscription = consumer.name(), "Subscription polling loop stopped");
    }

    /// Signal every loop to stop and wait for them to finish their current batch.
    pub async fn shutdown(self) {
        tracing::info!("Initiating pipeline worker shutdown");
        for tx in &self.shutdown_txs {
            let _ = tx.send(()).await;
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Polling loop terminated abnormally");
            }
        }
        tracing::info!("Pipeline worker stopped");
    }
}

/// Receive one batch for `consumer`, process it and settle every delivery.
async fn poll_once(
    source: &dyn DeliverySource,
    consumer: &dyn EventConsumer,
    config: &PipelineWorkerConfig,
) -> BatchReport {
    let subscription = consumer.name();
    let deliveries = match source.receive(subscription, config.batch_size).await {
        Ok(deliveries) => deliveries,
        Err(e) => {
            tracing::error!(error = %e, subscription, "Failed to receive deliveries");
            return BatchReport::default();
        }
    };
    if deliveries.is_empty() {
        return BatchReport::default();
    }

    let report = process_batch(consumer, &deliveries).await;
    for result in &report.results {
        settle(source, subscription, result, config).await;
    }
    report
}

async fn settle(
    source: &dyn DeliverySource,
    subscription: &str,
    result: &DeliveryResult,
    config: &PipelineWorkerConfig,
) {
    let settled = match &result.outcome {
        DeliveryOutcome::Completed | DeliveryOutcome::Discard(_) => {
            source.ack(subscription, &result.receipt).await
        }
        DeliveryOutcome::Retry(reason) => {
            let delay = config.retry_delay(result.attempt);
            tracing::info!(
                subscription,
                message_id = %result.message_id,
                attempt = result.attempt,
                backoff_seconds = delay.as_secs(),
                reason = %reason,
                "Scheduling redelivery"
            );
            source.nack(subscription, &result.receipt, delay).await
        }
    };

    if let Err(e) = settled {
        tracing::error!(
            error = %e,
            subscription,
            message_id = %result.message_id,
            "Failed to settle delivery"
        );
    }
}

/// Totals of a [`drain_until_idle`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub rounds: usize,
    pub deliveries: usize,
    pub completed: usize,
    pub retried: usize,
    pub discarded: usize,
}

/// Poll every consumer in turn, with immediate redelivery, until a full round receives
/// nothing or `max_rounds` is reached. Deterministic counterpart of the spawned loops.
pub async fn drain_until_idle(
    source: &dyn DeliverySource,
    consumers: &[Arc<dyn EventConsumer>],
    batch_size: usize,
    max_rounds: usize,
) -> DrainReport {
    let config = PipelineWorkerConfig {
        batch_size,
        immediate_retry: true,
        ..PipelineWorkerConfig::default()
    };
    let mut drain = DrainReport::default();

    while drain.rounds < max_rounds {
        drain.rounds += 1;
        let mut received = 0;
        for consumer in consumers {
            let report = poll_once(source, consumer.as_ref(), &config).await;
            received += report.len();
            drain.completed += report.completed();
            drain.retried += report.retried();
            drain.discarded += report.discarded();
        }
        drain.deliveries += received;
        if received == 0 {
            break;
        }
    }

    tracing::debug!(?drain, "Drain finished");
    drain
}
