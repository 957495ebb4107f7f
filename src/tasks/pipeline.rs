use std::sync::Arc;

use crate::{
    config::BatchConfig,
    domain::{hash_text, normalize_text, Candidate, Item, QueueSnapshot},
};

use super::{
    queue::{Batch, ReviewQueue},
    registry::SeenRegistry,
};

/// Explicit pipeline context: seen registry, review queue, and batch policy.
#[derive(Debug)]
pub struct Pipeline {
    registry: SeenRegistry,
    queue: ReviewQueue,
    policy: BatchConfig,
}

impl Pipeline {
    pub fn new(policy: BatchConfig) -> Self {
        Self {
            registry: SeenRegistry::new(),
            queue: ReviewQueue::new(),
            policy,
        }
    }

    /// Ingestion gate. Returns the new item, or `None` when the candidate is
    /// empty after normalization or its id was admitted before.
    pub fn admit(&mut self, candidate: Candidate) -> Option<Arc<Item>> {
        let text = normalize_text(&candidate.text);
        if text.is_empty() {
            return None;
        }

        let id = hash_text(&text);
        if let Some(existing) = self.registry.get(id) {
            if existing.text != text {
                tracing::warn!(
                    target: "ingest",
                    id = %id,
                    kept = %existing.text,
                    dropped = %text,
                    "identity collision; treating item as already seen"
                );
            }
            return None;
        }

        let item = Arc::new(Item {
            id,
            text,
            handle: candidate.handle,
        });
        self.registry.insert(item.clone());
        self.queue.push(item.clone());
        tracing::debug!(target: "ingest", id = %id, pending = self.queue.len(), "item queued");
        Some(item)
    }

    /// Admits every candidate of one observation event, returning how many were new.
    pub fn admit_all<I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Candidate>,
    {
        candidates
            .into_iter()
            .filter_map(|candidate| self.admit(candidate))
            .count()
    }

    pub fn next_batches(&mut self) -> Vec<Batch> {
        self.queue
            .drain_batches(self.policy.min_batch, self.policy.max_batch)
    }

    pub fn registry(&self) -> &SeenRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.queue.len(),
            seen: self.registry.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::item::testing::{candidate, RecordingElement};

    fn policy() -> BatchConfig {
        BatchConfig {
            min_batch: 3,
            max_batch: 30,
            review_interval: Duration::from_millis(25),
        }
    }

    #[test]
    fn duplicate_observations_are_admitted_once() {
        let mut pipeline = Pipeline::new(policy());
        let first = RecordingElement::new("p1");
        let again = RecordingElement::new("p1-rerender");

        assert!(pipeline.admit(candidate("Same post\n", &first)).is_some());
        for _ in 0..5 {
            assert!(pipeline.admit(candidate("  Same post", &again)).is_none());
        }

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot, QueueSnapshot { pending: 1, seen: 1 });
        let id = hash_text("Same post");
        assert!(pipeline.registry().get(id).unwrap().handle.suppress(0.1));
        assert_eq!(first.write_count(), 1);
        assert_eq!(again.write_count(), 0);
    }

    #[test]
    fn blank_candidates_are_rejected() {
        let mut pipeline = Pipeline::new(policy());
        let element = RecordingElement::new("p1");
        assert!(pipeline.admit(candidate(" \n\r\n ", &element)).is_none());
        assert_eq!(pipeline.snapshot(), QueueSnapshot::default());
    }

    #[test]
    fn drained_items_never_return_to_the_queue() {
        let mut pipeline = Pipeline::new(policy());
        let element = RecordingElement::new("p");
        let admitted = pipeline.admit_all(
            ["one", "two", "three", "four"]
                .iter()
                .map(|text| candidate(text, &element)),
        );
        assert_eq!(admitted, 4);

        let batches = pipeline.next_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 4);

        // Re-observing drained items must not queue them again.
        let readmitted = pipeline.admit_all(
            ["one", "two", "three", "four"]
                .iter()
                .map(|text| candidate(text, &element)),
        );
        assert_eq!(readmitted, 0);
        assert_eq!(pipeline.snapshot(), QueueSnapshot { pending: 0, seen: 4 });
    }
}
