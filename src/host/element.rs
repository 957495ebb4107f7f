use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};

use crate::domain::LiveElement;

pub const FULL_OPACITY: f32 = 1.0;

/// A style mutation reported back to the host, one JSON line each.
#[derive(Debug, Clone, Serialize)]
pub struct StyleChange {
    pub key: String,
    pub opacity: f32,
    pub at: DateTime<Utc>,
}

/// One displayed post in the host document.
#[derive(Debug)]
pub struct FeedElement {
    key: String,
    opacity: Mutex<f32>,
    changes: mpsc::UnboundedSender<StyleChange>,
}

impl FeedElement {
    pub fn new(key: impl Into<String>, changes: mpsc::UnboundedSender<StyleChange>) -> Self {
        Self {
            key: key.into(),
            opacity: Mutex::new(FULL_OPACITY),
            changes,
        }
    }
}

impl LiveElement for FeedElement {
    fn key(&self) -> &str {
        &self.key
    }

    fn set_opacity(&self, opacity: f32) {
        {
            let mut current = self.opacity.lock();
            if (*current - opacity).abs() < f32::EPSILON {
                return;
            }
            *current = opacity;
        }

        let change = StyleChange {
            key: self.key.clone(),
            opacity,
            at: Utc::now(),
        };
        if self.changes.send(change).is_err() {
            tracing::debug!(target: "host", key = %self.key, "style writer closed; change not reported");
        }
    }
}

/// Writes style changes as JSON lines until every sender is gone.
pub async fn write_style_changes<W>(
    mut changes: mpsc::UnboundedReceiver<StyleChange>,
    mut out: W,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(change) = changes.recv().await {
        let mut line = serde_json::to_vec(&change).context("failed to encode style change")?;
        line.push(b'\n');
        out.write_all(&line)
            .await
            .context("failed to write style change")?;
        out.flush().await.context("failed to flush style change")?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[tokio::test]
    async fn repeated_suppression_reports_once() {
        let (tx, rx) = mpsc::unbounded_channel();
        let element = FeedElement::new("p1", tx);

        element.set_opacity(0.1);
        element.set_opacity(0.1);
        drop(element);

        let mut out = Vec::new();
        let written = write_style_changes(rx, &mut out).await.unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(out).unwrap();
        let line: Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["key"], "p1");
        assert!((line["opacity"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!(line["at"].is_string());
    }
}
