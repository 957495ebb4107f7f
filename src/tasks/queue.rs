use std::{collections::VecDeque, sync::Arc};

use crate::domain::Item;

pub type Batch = Vec<Arc<Item>>;

/// FIFO of items awaiting their first (and only) classification attempt.
#[derive(Debug, Default)]
pub struct ReviewQueue {
    pending: VecDeque<Arc<Item>>,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Arc<Item>) {
        self.pending.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Splits the front of the queue into batches of at most `max_batch`.
    ///
    /// At most `ceil(len / max_batch)` rounds run; a round stops the drain
    /// as soon as fewer than `min_batch` items remain, leaving the remainder
    /// for a later tick. Drained items never come back.
    pub fn drain_batches(&mut self, min_batch: usize, max_batch: usize) -> Vec<Batch> {
        let max_batch = max_batch.max(1);
        let rounds = self.pending.len().div_ceil(max_batch);
        let mut batches = Vec::with_capacity(rounds);

        for _ in 0..rounds {
            if self.pending.len() < min_batch || self.pending.is_empty() {
                break;
            }
            let take = max_batch.min(self.pending.len());
            batches.push(self.pending.drain(..take).collect());
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{hash_text, item::testing::RecordingElement, Handle};

    fn queue_with(count: usize) -> (ReviewQueue, Vec<Arc<RecordingElement>>) {
        let mut queue = ReviewQueue::new();
        let mut elements = Vec::new();
        for n in 0..count {
            let element = RecordingElement::new(&format!("p{n}"));
            let text = format!("post number {n}");
            queue.push(Arc::new(Item {
                id: hash_text(&text),
                text,
                handle: Handle::from_arc(&element),
            }));
            elements.push(element);
        }
        (queue, elements)
    }

    fn sizes(batches: &[Batch]) -> Vec<usize> {
        batches.iter().map(Vec::len).collect()
    }

    #[test]
    fn below_min_batch_nothing_is_drained() {
        let (mut queue, _elements) = queue_with(2);
        let batches = queue.drain_batches(3, 30);
        assert!(batches.is_empty());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn small_queue_forms_single_batch() {
        let (mut queue, _elements) = queue_with(5);
        let batches = queue.drain_batches(3, 30);
        assert_eq!(sizes(&batches), vec![5]);
        assert!(queue.is_empty());
    }

    #[test]
    fn exactly_min_batch_forms_one_batch() {
        let (mut queue, _elements) = queue_with(3);
        assert_eq!(sizes(&queue.drain_batches(3, 30)), vec![3]);
    }

    #[test]
    fn large_queue_splits_in_order() {
        let (mut queue, _elements) = queue_with(65);
        let batches = queue.drain_batches(3, 30);
        assert_eq!(sizes(&batches), vec![30, 30, 5]);
        assert_eq!(batches[0][0].text, "post number 0");
        assert_eq!(batches[1][0].text, "post number 30");
        assert_eq!(batches[2][4].text, "post number 64");
        assert!(queue.is_empty());
    }

    #[test]
    fn short_tail_stays_pending() {
        let (mut queue, _elements) = queue_with(62);
        let batches = queue.drain_batches(3, 30);
        assert_eq!(sizes(&batches), vec![30, 30]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn empty_queue_is_a_no_op() {
        let mut queue = ReviewQueue::new();
        assert!(queue.drain_batches(3, 30).is_empty());
    }
}
