// Queue Pipeline - producers -> shared queue -> consumers, joined and cancelled

mod cancel;
mod config;
pub mod constants;
mod consumer;
mod delay;
mod producer;
mod queue;

pub use cancel::{cancel_channel, CancelSender, CancelToken};
pub use config::PipelineConfig;
pub use consumer::{Consumer, ConsumerReport, ConsumerState};
pub use delay::RandomDelay;
pub use producer::Producer;
pub use queue::{QueueError, WorkQueue};

use crate::error::{AppError, Result};
use crate::port::TokenSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{info, info_span, warn, Instrument};

/// Outcome of a completed pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub produced: usize,
    pub consumed: usize,
    /// Unfinished count observed after consumers were cancelled (always 0 on success)
    pub unfinished: usize,
    /// One entry per consumer, ordered by id
    pub consumers: Vec<ConsumerReport>,
}

/// Join/cancel coordinator
///
/// Spawns P producers and C consumers over one queue, gathers the producers,
/// waits for the queue to drain, then cancels every consumer.
pub struct Pipeline {
    config: PipelineConfig,
    tokens: Arc<dyn TokenSource>,
}

impl Pipeline {
    /// Create a pipeline, validating its configuration
    pub fn new(config: PipelineConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tokens })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline to completion
    ///
    /// # Errors
    /// - AppError::Task if a producer or consumer panics, or a consumer exits
    ///   before the queue drained
    /// - AppError::Queue if a consumer over-acknowledges
    pub async fn run(&self) -> Result<PipelineReport> {
        let queue = Arc::new(WorkQueue::with_capacity(self.config.capacity));
        let mut seeds = self.config.root_rng();

        info!(
            producers = self.config.producers,
            consumers = self.config.consumers,
            capacity = ?queue.capacity(),
            "Pipeline starting"
        );

        let mut producers = Vec::with_capacity(self.config.producers);
        for id in 0..self.config.producers {
            let producer = Producer::new(
                id,
                Arc::clone(&queue),
                Arc::clone(&self.tokens),
                self.config.delay,
                self.config.max_items_per_producer,
                StdRng::seed_from_u64(seeds.gen()),
            );
            producers.push(tokio::spawn(
                producer.run().instrument(info_span!("producer", id)),
            ));
        }

        let mut consumers = JoinSet::new();
        let mut cancels = Vec::with_capacity(self.config.consumers);
        for id in 0..self.config.consumers {
            let (cancel_tx, cancel) = cancel_channel();
            let consumer = Consumer::new(
                id,
                Arc::clone(&queue),
                self.config.delay,
                StdRng::seed_from_u64(seeds.gen()),
            );
            consumers.spawn(consumer.run(cancel).instrument(info_span!("consumer", id)));
            cancels.push(cancel_tx);
        }

        // Returning early drops `consumers`, which aborts every consumer task
        let produced = gather_or_early_exit(producers, &mut consumers).await?;
        info!(produced, "All producers finished");

        tokio::select! {
            _ = queue.join() => {}
            Some(joined) = consumers.join_next() => {
                // A consumer only returns after cancellation, and none was sent yet
                return Err(early_exit(joined));
            }
        }

        info!(produced, "Queue drained; cancelling consumers");
        for cancel in &cancels {
            cancel.cancel();
        }

        let mut reports = Vec::with_capacity(self.config.consumers);
        while let Some(joined) = consumers.join_next().await {
            reports.push(joined??);
        }
        reports.sort_by_key(|r| r.id);

        let consumed = reports.iter().map(|r| r.consumed).sum();
        let report = PipelineReport {
            produced,
            consumed,
            unfinished: queue.unfinished(),
            consumers: reports,
        };
        info!(
            produced = report.produced,
            consumed = report.consumed,
            unfinished = report.unfinished,
            "Pipeline finished"
        );
        Ok(report)
    }
}

/// Await every producer in spawn order and total their batches
async fn gather_producers(producers: Vec<JoinHandle<usize>>) -> Result<usize> {
    let mut total = 0;
    let mut pending = producers.into_iter();
    while let Some(handle) = pending.next() {
        match handle.await {
            Ok(count) => total += count,
            Err(e) => {
                warn!(error = %e, "Producer failed; aborting remaining producers");
                for rest in pending {
                    rest.abort();
                }
                return Err(e.into());
            }
        }
    }
    Ok(total)
}

/// Gather the producers while watching for a consumer that exits early
///
/// Producers blocked on a full queue would otherwise wait forever for a
/// consumer that is gone, so they are aborted.
async fn gather_or_early_exit(
    producers: Vec<JoinHandle<usize>>,
    consumers: &mut JoinSet<Result<ConsumerReport>>,
) -> Result<usize> {
    let aborts: Vec<AbortHandle> = producers.iter().map(JoinHandle::abort_handle).collect();
    tokio::select! {
        gathered = gather_producers(producers) => gathered,
        Some(joined) = consumers.join_next() => {
            warn!("Consumer exited while producers were running; aborting producers");
            for abort in &aborts {
                abort.abort();
            }
            Err(early_exit(joined))
        }
    }
}

fn early_exit(
    joined: std::result::Result<Result<ConsumerReport>, tokio::task::JoinError>,
) -> AppError {
    match joined {
        Ok(Ok(report)) => AppError::Task(format!(
            "consumer {} stopped before the queue drained",
            report.id
        )),
        Ok(Err(e)) => e,
        Err(e) => e.into(),
    }
}
