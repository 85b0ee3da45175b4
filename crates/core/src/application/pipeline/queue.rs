// Shared work queue with unfinished-task tracking
//
// FIFO buffer + a counter of items put but not yet acknowledged. `join`
// resolves when the counter reaches zero. With a capacity, `put` waits for a
// free slot.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{watch, Notify};

/// Queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("task_done called more times than items were put")]
    TaskDoneUnderflow,
}

/// Multi-producer, multi-consumer FIFO queue
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: Option<usize>,
    item_ready: Notify,
    slot_free: Notify,
    unfinished: watch::Sender<usize>,
}

impl<T> WorkQueue<T> {
    /// Queue without a size bound
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Queue holding at most `capacity` buffered items (0 means unbounded)
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity: capacity.filter(|c| *c > 0),
            item_ready: Notify::new(),
            slot_free: Notify::new(),
            unfinished,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_room(&self, len: usize) -> bool {
        self.capacity.map_or(true, |cap| len < cap)
    }

    /// Append an item and count it as unfinished
    ///
    /// Suspends while a bounded queue is full.
    pub async fn put(&self, item: T) {
        loop {
            {
                let mut items = self.lock();
                if self.has_room(items.len()) {
                    items.push_back(item);
                    // Counted under the lock so join never sees a buffered item at zero
                    self.unfinished.send_modify(|n| *n += 1);
                    drop(items);
                    self.item_ready.notify_one();
                    return;
                }
            }
            self.slot_free.notified().await;
        }
    }

    /// Remove the oldest item, suspending while the queue is empty
    ///
    /// Cancel safe: dropping the future never loses an item.
    pub async fn get(&self) -> T {
        loop {
            let (popped, more) = {
                let mut items = self.lock();
                let popped = items.pop_front();
                (popped, !items.is_empty())
            };
            if let Some(item) = popped {
                if more {
                    // Pass the wakeup on so a second idle getter sees the remaining items
                    self.item_ready.notify_one();
                }
                if self.capacity.is_some() {
                    self.slot_free.notify_one();
                }
                return item;
            }
            self.item_ready.notified().await;
        }
    }

    /// Acknowledge one item previously returned by `get`
    ///
    /// # Errors
    /// `QueueError::TaskDoneUnderflow` if there is nothing left to acknowledge
    pub fn task_done(&self) -> Result<(), QueueError> {
        let mut underflow = false;
        self.unfinished.send_if_modified(|n| {
            if *n == 0 {
                underflow = true;
                false
            } else {
                *n -= 1;
                true
            }
        });
        if underflow {
            Err(QueueError::TaskDoneUnderflow)
        } else {
            Ok(())
        }
    }

    /// Wait until every item put so far has been acknowledged
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // The sender lives in `self`, so the wait cannot fail while borrowed
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Items put but not yet acknowledged
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Items currently buffered
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
