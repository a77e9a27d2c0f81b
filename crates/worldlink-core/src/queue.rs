//! Handoff queue between the socket reader and the session loop
//!
//! The reader task pushes decoded frames from its side of the connection
//! while the session loop drains everything accumulated since its last
//! visit in one swap, so the lock is never held across dispatch.

use std::sync::{Mutex, PoisonError};

pub struct BatchQueue<T> {
    items: Mutex<Vec<T>>,
}

impl<T> BatchQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Append one item, keeping arrival order.
    pub fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    /// Take everything queued so far, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for BatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn drains_in_arrival_order() {
        let queue = BatchQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.drain_all(), vec![1, 2, 3]);
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn items_pushed_after_a_drain_wait_for_the_next_one() {
        let queue = BatchQueue::new();
        queue.push("a");
        assert_eq!(queue.drain_all(), vec!["a"]);
        queue.push("b");
        queue.push("c");
        assert_eq!(queue.drain_all(), vec!["b", "c"]);
    }

    #[test]
    fn keeps_every_item_under_contention() {
        let queue = Arc::new(BatchQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for n in 0..1000 {
                    queue.push(n);
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 1000 {
            seen.extend(queue.drain_all());
        }
        producer.join().unwrap();

        // One producer, so the interleaved drains must still see 0..1000 in
        // order.
        assert_eq!(seen, (0..1000).collect::<Vec<_>>());
    }
}
