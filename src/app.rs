use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use tokio::{
    io::BufReader,
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};

use crate::{
    ai::{Classifier, OpenAiClient},
    config::AppConfig,
    domain::Candidate,
    host::{write_style_changes, CandidateSource, JsonLinesFeed},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    tasks::{pipeline::Pipeline, scheduler::BatchScheduler},
};

const EVENT_BUFFER: usize = 256;

pub struct FeedSweeperApp {
    _paths: ResolvedPaths,
    scheduler: BatchScheduler,
    feed: Box<dyn CandidateSource>,
    style_writer: JoinHandle<Result<usize>>,
    shutdown: Shutdown,
}

impl FeedSweeperApp {
    pub fn initialize(config: AppConfig, paths: ResolvedPaths, shutdown: Shutdown) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(format!("feed-sweeper/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let classifier: Arc<dyn Classifier> =
            Arc::new(OpenAiClient::new(http_client, config.classifier.clone()));

        let (style_tx, style_rx) = mpsc::unbounded_channel();
        let style_writer = tokio::spawn(write_style_changes(style_rx, tokio::io::stdout()));
        let feed: Box<dyn CandidateSource> =
            Box::new(JsonLinesFeed::new(BufReader::new(tokio::io::stdin()), style_tx));

        let scheduler = BatchScheduler::new(
            Pipeline::new(config.batching),
            classifier,
            config.batching.review_interval,
            config.suppression.opacity,
        );

        Ok(Self {
            _paths: paths,
            scheduler,
            feed,
            style_writer,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let FeedSweeperApp {
            _paths: _,
            scheduler,
            feed,
            style_writer,
            shutdown,
        } = self;

        tracing::info!(target: "lifecycle", "feed sweeper started; reading observations from stdin");

        let shutdown_timeout = Duration::from_secs(5);
        let (events_tx, events_rx) = mpsc::channel::<Vec<Candidate>>(EVENT_BUFFER);
        let mut feed_handle = tokio::spawn(feed.subscribe(events_tx, shutdown.subscribe()));

        // The scheduler stops on its own once the feed closes, or on shutdown.
        let stats = scheduler.run(events_rx, shutdown.subscribe()).await;
        shutdown.trigger();

        tracing::info!(
            target: "lifecycle",
            seen = stats.seen,
            pending = stats.pending,
            dispatched = stats.dispatched_batches,
            failed = stats.failed_batches,
            aborted = stats.aborted_batches,
            reviewed = stats.reviewed_items,
            suppressed = stats.suppressed,
            detached = stats.detached,
            missing = stats.missing,
            "pipeline stopped"
        );

        let feed_sleep = tokio::time::sleep(shutdown_timeout);
        tokio::pin!(feed_sleep);
        tokio::select! {
            res = &mut feed_handle => match res {
                Ok(Err(err)) => tracing::error!(target: "host", error = %format!("{err:#}"), "feed reader failed"),
                Err(err) if err.is_panic() => tracing::error!(target: "host", "feed reader panicked"),
                _ => {}
            },
            _ = &mut feed_sleep => {
                tracing::warn!(
                    target: "host",
                    "feed reader did not stop within {:?}; aborting",
                    shutdown_timeout
                );
                feed_handle.abort();
            }
        }

        match timeout(shutdown_timeout, style_writer).await {
            Ok(Ok(Ok(written))) => {
                tracing::debug!(target: "host", written, "style writer flushed");
            }
            Ok(Ok(Err(err))) => {
                tracing::error!(target: "host", error = %format!("{err:#}"), "style writer failed");
            }
            Ok(Err(err)) => {
                tracing::error!(target: "host", error = %err, "style writer task failed");
            }
            Err(_) => {
                tracing::warn!(
                    target: "host",
                    "style writer did not flush within {:?}",
                    shutdown_timeout
                );
            }
        }

        tracing::info!(target: "lifecycle", "feed sweeper stopped");
        Ok(())
    }
}
