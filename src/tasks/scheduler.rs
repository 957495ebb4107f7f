use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Local;
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
    time::{interval, timeout, MissedTickBehavior},
};

use crate::{
    ai::Classifier,
    domain::{Candidate, Verdict},
    infrastructure::shutdown::ShutdownListener,
};

use super::{
    pipeline::Pipeline,
    processor::{apply_verdicts, ApplyReport},
    queue::Batch,
};

const IN_FLIGHT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub seen: usize,
    pub pending: usize,
    pub dispatched_batches: usize,
    pub failed_batches: usize,
    pub aborted_batches: usize,
    pub reviewed_items: usize,
    pub suppressed: usize,
    pub detached: usize,
    pub missing: usize,
}

struct BatchOutcome {
    batch: Batch,
    result: Result<Vec<Verdict>>,
}

/// Drives the pipeline: admits observation events, drains the queue on
/// every tick, and applies classifier verdicts as their calls complete.
pub struct BatchScheduler {
    pipeline: Pipeline,
    classifier: Arc<dyn Classifier>,
    in_flight: JoinSet<BatchOutcome>,
    review_interval: Duration,
    suppressed_opacity: f32,
    stats: PipelineStats,
}

impl BatchScheduler {
    pub fn new(
        pipeline: Pipeline,
        classifier: Arc<dyn Classifier>,
        review_interval: Duration,
        suppressed_opacity: f32,
    ) -> Self {
        Self {
            pipeline,
            classifier,
            in_flight: JoinSet::new(),
            review_interval,
            suppressed_opacity,
            stats: PipelineStats::default(),
        }
    }

    /// Forms this tick's batches and dispatches each without waiting for it.
    pub fn tick(&mut self) -> usize {
        let batches = self.pipeline.next_batches();
        let dispatched = batches.len();

        for batch in batches {
            tracing::debug!(target: "scheduler", size = batch.len(), "dispatching batch");
            let classifier = self.classifier.clone();
            self.in_flight.spawn(async move {
                let result = classifier.classify(&batch).await;
                BatchOutcome { batch, result }
            });
        }

        self.stats.dispatched_batches += dispatched;
        dispatched
    }

    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Vec<Candidate>>,
        mut shutdown: ShutdownListener,
    ) -> PipelineStats {
        let mut ticker = interval(self.review_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!(target: "scheduler", "shutdown requested; stopping review ticks");
                    break;
                }
                received = events.recv() => match received {
                    Some(candidates) => {
                        let admitted = self.pipeline.admit_all(candidates);
                        if admitted > 0 {
                            tracing::debug!(target: "ingest", admitted, "observation admitted");
                        }
                    }
                    None => {
                        tracing::info!(target: "scheduler", "feed closed; running final review");
                        self.tick();
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.tick();
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.complete(joined);
                }
            }
        }

        self.finish(IN_FLIGHT_GRACE).await
    }

    /// Awaits every in-flight batch, aborting whatever is left after `grace`.
    pub async fn finish(mut self, grace: Duration) -> PipelineStats {
        let waiting = self.in_flight.len();
        if waiting > 0 {
            tracing::info!(target: "scheduler", waiting, "waiting for in-flight batches");
        }

        let drained = timeout(grace, async {
            while let Some(joined) = self.in_flight.join_next().await {
                self.complete(joined);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                target: "scheduler",
                waiting = self.in_flight.len(),
                "in-flight batches did not finish within {:?}; aborting",
                grace
            );
            self.abort_remaining().await;
        }

        let snapshot = self.pipeline.snapshot();
        self.stats.seen = snapshot.seen;
        self.stats.pending = snapshot.pending;
        if snapshot.pending > 0 {
            tracing::info!(
                target: "scheduler",
                pending = snapshot.pending,
                "items left below the minimum batch size stay unreviewed"
            );
        }
        self.stats
    }

    /// Cancels what is still running. Batches that completed before the
    /// abort landed are applied as usual; only cancelled ones count as aborted.
    async fn abort_remaining(&mut self) {
        self.in_flight.abort_all();
        while let Some(joined) = self.in_flight.join_next().await {
            match joined {
                Err(err) if err.is_cancelled() => self.stats.aborted_batches += 1,
                joined => self.complete(joined),
            }
        }
    }

    fn complete(&mut self, joined: Result<BatchOutcome, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_panic() {
                    tracing::error!(target: "scheduler", "classification task panicked");
                }
                self.stats.failed_batches += 1;
                return;
            }
        };

        let size = outcome.batch.len();
        match outcome.result {
            Ok(verdicts) => {
                tracing::info!(
                    target: "scheduler",
                    reviewed = size,
                    flagged = verdicts.len(),
                    at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
                    "batch reviewed"
                );
                self.stats.reviewed_items += size;
                let report =
                    apply_verdicts(self.pipeline.registry(), &verdicts, self.suppressed_opacity);
                self.record(report);
            }
            Err(err) => {
                tracing::error!(
                    target: "scheduler",
                    error = %format!("{err:#}"),
                    dropped = size,
                    "batch classification failed"
                );
                self.stats.failed_batches += 1;
            }
        }
    }

    fn record(&mut self, report: ApplyReport) {
        self.stats.suppressed += report.suppressed;
        self.stats.detached += report.detached;
        self.stats.missing += report.missing;
    }
}
