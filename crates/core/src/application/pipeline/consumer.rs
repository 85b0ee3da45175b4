// Consumer - drains the queue until cancelled

use super::cancel::CancelToken;
use super::delay::RandomDelay;
use super::queue::WorkQueue;
use crate::domain::WorkItem;
use crate::error::Result;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};

/// Consumer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    CancelRequested,
    Stopped,
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumerState::Running => write!(f, "RUNNING"),
            ConsumerState::CancelRequested => write!(f, "CANCEL_REQUESTED"),
            ConsumerState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Summary returned once a consumer has stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    pub id: usize,
    pub consumed: usize,
    pub state: ConsumerState,
}

/// Infinite consumer: pause, get, log latency, acknowledge
pub struct Consumer {
    id: usize,
    queue: Arc<WorkQueue<WorkItem>>,
    delay: RandomDelay,
    rng: StdRng,
    state: ConsumerState,
    consumed: usize,
}

impl Consumer {
    pub fn new(
        id: usize,
        queue: Arc<WorkQueue<WorkItem>>,
        delay: RandomDelay,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            queue,
            delay,
            rng,
            state: ConsumerState::Running,
            consumed: 0,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Run until `cancel` fires
    ///
    /// Cancellation is checked at every suspension point (pause and get); the
    /// iteration in progress is abandoned without acknowledging anything.
    ///
    /// # Errors
    /// `QueueError::TaskDoneUnderflow` if the queue rejects an acknowledgement
    pub async fn run(mut self, mut cancel: CancelToken) -> Result<ConsumerReport> {
        debug!(consumer = self.id, "Consumer started");

        while self.state == ConsumerState::Running {
            if cancel.is_cancelled() {
                self.state = ConsumerState::CancelRequested;
                break;
            }

            let (units, pause) = self.delay.sample(&mut self.rng);
            debug!(consumer = self.id, units, "Consumer {} sleeping for {} units", self.id, units);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.state = ConsumerState::CancelRequested;
                    break;
                }
                _ = sleep(pause) => {}
            }

            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.state = ConsumerState::CancelRequested;
                    break;
                }
                item = self.queue.get() => item,
            };

            let latency = item.latency();
            info!(
                consumer = self.id,
                token = %item.token,
                latency_secs = latency.as_secs_f64(),
                "Consumer {} got element <{}> in {:.5} seconds",
                self.id,
                item.token,
                latency.as_secs_f64()
            );
            self.queue.task_done()?;
            self.consumed += 1;
        }

        self.state = ConsumerState::Stopped;
        debug!(consumer = self.id, consumed = self.consumed, "Consumer stopped");
        Ok(ConsumerReport {
            id: self.id,
            consumed: self.consumed,
            state: self.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::cancel::cancel_channel;
    use super::*;
    use rand::SeedableRng;
    use std::time::Duration;

    fn consumer(queue: &Arc<WorkQueue<WorkItem>>) -> Consumer {
        Consumer::new(
            0,
            Arc::clone(queue),
            RandomDelay::new(1, Duration::from_millis(1)),
            StdRng::seed_from_u64(11),
        )
    }

    #[tokio::test]
    async fn test_consumer_drains_and_acknowledges() {
        let queue = Arc::new(WorkQueue::unbounded());
        for token in ["a", "b", "c"] {
            queue.put(WorkItem::stamped_now(token)).await;
        }
        let consumer = consumer(&queue);
        assert_eq!(consumer.state(), ConsumerState::Running);

        let (cancel_tx, cancel) = cancel_channel();
        let handle = tokio::spawn(consumer.run(cancel));

        queue.join().await;
        cancel_tx.cancel();

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.consumed, 3);
        assert_eq!(report.state, ConsumerState::Stopped);
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_on_empty_queue() {
        let queue = Arc::new(WorkQueue::unbounded());
        let (cancel_tx, cancel) = cancel_channel();
        let handle = tokio::spawn(consumer(&queue).run(cancel));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished(), "consumer must not return on its own");

        cancel_tx.cancel();
        let report = tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("cancel must stop a suspended consumer")
            .unwrap()
            .unwrap();
        assert_eq!(report.consumed, 0);
        assert_eq!(report.state, ConsumerState::Stopped);
    }

    #[tokio::test]
    async fn test_already_cancelled_consumer_never_dequeues() {
        let queue = Arc::new(WorkQueue::unbounded());
        queue.put(WorkItem::stamped_now("left-alone")).await;

        let (cancel_tx, cancel) = cancel_channel();
        cancel_tx.cancel();
        let report = consumer(&queue).run(cancel).await.unwrap();

        assert_eq!(report.consumed, 0);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.unfinished(), 1);
    }
}
