use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};

use crate::{
    domain::{Candidate, Handle},
    infrastructure::shutdown::ShutdownListener,
};

use super::element::{FeedElement, StyleChange};

/// Anything that can deliver observation events to the pipeline.
pub trait CandidateSource: Send + 'static {
    /// Delivers one `Vec<Candidate>` per observation event until the feed
    /// ends, the receiver goes away, or shutdown is signalled.
    fn subscribe(
        self: Box<Self>,
        events: mpsc::Sender<Vec<Candidate>>,
        shutdown: ShutdownListener,
    ) -> BoxFuture<'static, Result<()>>;
}

#[derive(Debug, Deserialize)]
pub struct ObservationEvent {
    #[serde(default)]
    pub added: Vec<RawElement>,
    #[serde(default)]
    pub removed: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawElement {
    pub key: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Host document fed by JSON lines: `{"added": [...], "removed": [...]}`.
pub struct JsonLinesFeed<R> {
    reader: R,
    document: HashMap<String, Arc<FeedElement>>,
    changes: mpsc::UnboundedSender<StyleChange>,
}

impl<R> JsonLinesFeed<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, changes: mpsc::UnboundedSender<StyleChange>) -> Self {
        Self {
            reader,
            document: HashMap::new(),
            changes,
        }
    }

    /// Applies one event to the document and returns the valid candidates.
    pub fn observe(&mut self, event: ObservationEvent) -> Vec<Candidate> {
        for key in &event.removed {
            if self.document.remove(key).is_some() {
                tracing::debug!(target: "host", key = %key, "element removed");
            }
        }

        event
            .added
            .into_iter()
            .filter_map(|raw| self.extract_candidate(raw))
            .collect()
    }

    /// Elements without text are not posts and never become candidates.
    fn extract_candidate(&mut self, raw: RawElement) -> Option<Candidate> {
        let text = raw.text?;
        let changes = &self.changes;
        let element = self
            .document
            .entry(raw.key)
            .or_insert_with_key(|key| Arc::new(FeedElement::new(key.clone(), changes.clone())));
        Some(Candidate {
            text,
            handle: Handle::from_arc(&*element),
        })
    }

    async fn pump(
        mut self,
        events: mpsc::Sender<Vec<Candidate>>,
        mut shutdown: ShutdownListener,
    ) -> Result<()> {
        let mut line_no = 0usize;
        let mut buf = Vec::new();

        loop {
            if shutdown.is_triggered() {
                break;
            }
            buf.clear();
            let read = tokio::select! {
                _ = shutdown.notified() => break,
                read = self.reader.read_until(b'\n', &mut buf) => read.context("failed to read feed")?,
            };
            if read == 0 {
                tracing::info!(target: "host", lines = line_no, "feed reached end of input");
                break;
            }
            line_no += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(target: "host", line = line_no, error = %err, "skipping non-UTF-8 observation");
                    continue;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event: ObservationEvent = match serde_json::from_str(trimmed) {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(target: "host", line = line_no, error = %err, "skipping malformed observation");
                    continue;
                }
            };

            let candidates = self.observe(event);
            if candidates.is_empty() {
                continue;
            }
            if events.send(candidates).await.is_err() {
                tracing::debug!(target: "host", "pipeline stopped listening; closing feed");
                break;
            }
        }
        Ok(())
    }
}

impl<R> CandidateSource for JsonLinesFeed<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn subscribe(
        self: Box<Self>,
        events: mpsc::Sender<Vec<Candidate>>,
        shutdown: ShutdownListener,
    ) -> BoxFuture<'static, Result<()>> {
        Box::pin((*self).pump(events, shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::shutdown::Shutdown;

    fn feed(input: &'static str) -> (JsonLinesFeed<&'static [u8]>, mpsc::UnboundedReceiver<StyleChange>) {
        raw_feed(input.as_bytes())
    }

    fn raw_feed(
        input: &'static [u8],
    ) -> (JsonLinesFeed<&'static [u8]>, mpsc::UnboundedReceiver<StyleChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (JsonLinesFeed::new(input, tx), rx)
    }

    #[test]
    fn elements_without_text_are_rejected() {
        let (mut feed, _rx) = feed("");
        let event: ObservationEvent = serde_json::from_str(
            r#"{"added":[{"key":"p1","text":"hello"},{"key":"ad"},{"key":"p2","text":null}]}"#,
        )
        .unwrap();

        let candidates = feed.observe(event);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "hello");
        assert!(candidates[0].handle.is_attached());
    }

    #[test]
    fn removed_elements_detach_their_handles() {
        let (mut feed, _rx) = feed("");
        let added: ObservationEvent =
            serde_json::from_str(r#"{"added":[{"key":"p1","text":"hello"}]}"#).unwrap();
        let candidate = feed.observe(added).remove(0);

        let removed: ObservationEvent = serde_json::from_str(r#"{"removed":["p1"]}"#).unwrap();
        assert!(feed.observe(removed).is_empty());
        assert!(!candidate.handle.is_attached());
        assert!(!candidate.handle.suppress(0.1));
    }

    #[tokio::test]
    async fn pump_forwards_one_event_per_line() {
        let input = concat!(
            r#"{"added":[{"key":"p1","text":"first"},{"key":"p2","text":"second"}]}"#,
            "\n",
            "not json at all\n",
            "\n",
            r#"{"added":[{"key":"nav"}]}"#,
            "\n",
            r#"{"added":[{"key":"p3","text":"third"}]}"#,
            "\n",
        );
        let (feed, _rx) = feed(input);
        let (_shutdown, listener) = Shutdown::new();
        let (tx, mut rx) = mpsc::channel(8);

        Box::new(feed).subscribe(tx, listener).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.len(), 2);
        let second = rx.recv().await.unwrap();
        assert_eq!(second[0].text, "third");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_lines_are_skipped() {
        let input: &'static [u8] = b"{\"added\":[{\"key\":\"p1\",\"text\":\"first\"}]}\n\
\xff\xfe bad\n\
{\"added\":[{\"key\":\"p3\",\"text\":\"third\"}]}\n";
        let (feed, _rx) = raw_feed(input);
        let (_shutdown, listener) = Shutdown::new();
        let (tx, mut rx) = mpsc::channel(8);

        Box::new(feed).subscribe(tx, listener).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first[0].text, "first");
        let second = rx.recv().await.unwrap();
        assert_eq!(second[0].text, "third");
        assert!(rx.recv().await.is_none());
    }
}
