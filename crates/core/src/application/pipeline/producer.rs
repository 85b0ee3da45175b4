// Producer - puts a random-sized batch of work items on the queue

use super::delay::RandomDelay;
use super::queue::WorkQueue;
use crate::domain::WorkItem;
use crate::port::TokenSource;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};

/// Finite producer: `0..=max_items` items, each after a random pause
pub struct Producer {
    id: usize,
    queue: Arc<WorkQueue<WorkItem>>,
    tokens: Arc<dyn TokenSource>,
    delay: RandomDelay,
    max_items: u32,
    rng: StdRng,
}

impl Producer {
    pub fn new(
        id: usize,
        queue: Arc<WorkQueue<WorkItem>>,
        tokens: Arc<dyn TokenSource>,
        delay: RandomDelay,
        max_items: u32,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            queue,
            tokens,
            delay,
            max_items,
            rng,
        }
    }

    /// Produce the whole batch and return how many items were put
    ///
    /// Items are put in generation order.
    pub async fn run(mut self) -> usize {
        let batch = self.rng.gen_range(0..=self.max_items);
        debug!(producer = self.id, batch, "Producer batch chosen");

        for k in 1..=batch {
            let (units, pause) = self.delay.sample(&mut self.rng);
            debug!(producer = self.id, units, "Producer {} sleeping for {} units", self.id, units);
            sleep(pause).await;

            let item = WorkItem::stamped_now(self.tokens.next_token());
            let token = item.token.clone();
            self.queue.put(item).await;

            let remaining = batch - k;
            info!(
                producer = self.id,
                token = %token,
                remaining,
                "Producer {} added <{}> to queue; {} more items to go",
                self.id,
                token,
                remaining
            );
        }

        batch as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::token_source::SequentialTokens;
    use rand::SeedableRng;
    use std::time::Duration;

    #[tokio::test]
    async fn test_producer_puts_batch_in_order() {
        let queue = Arc::new(WorkQueue::unbounded());
        let producer = Producer::new(
            0,
            Arc::clone(&queue),
            Arc::new(SequentialTokens::default()),
            RandomDelay::new(2, Duration::from_millis(1)),
            10,
            StdRng::seed_from_u64(3),
        );

        let produced = producer.run().await;
        assert_eq!(queue.len(), produced);
        assert_eq!(queue.unfinished(), produced);

        for n in 1..=produced {
            assert_eq!(queue.get().await.token, format!("item-{}", n));
        }
    }

    #[tokio::test]
    async fn test_producer_with_zero_max_items_puts_nothing() {
        let queue = Arc::new(WorkQueue::unbounded());
        let producer = Producer::new(
            1,
            Arc::clone(&queue),
            Arc::new(SequentialTokens::default()),
            RandomDelay::new(10, Duration::from_secs(1)),
            0,
            StdRng::seed_from_u64(3),
        );
        assert_eq!(producer.run().await, 0);
        assert_eq!(queue.unfinished(), 0);
    }
}
