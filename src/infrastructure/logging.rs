use std::io::{self, IsTerminal};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

const LOG_FILE_PREFIX: &str = "feed-sweeper.log";

static INIT: OnceCell<()> = OnceCell::new();
static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Installs the stderr console layer and the daily rolling file, then logs
/// the pipeline settings this run will use. Safe to call more than once.
pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let (file_writer, guard) = tracing_appender::non_blocking(
            tracing_appender::rolling::daily(&paths.logs_dir, LOG_FILE_PREFIX),
        );
        let _ = GUARD.set(guard);

        // stdout carries the style-change protocol, so the console is stderr.
        let stderr = io::stderr();
        let console_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_ansi(stderr.is_terminal());

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(level_filter(&config.logging.level))
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        log_pipeline_config(config, paths);
        Ok(())
    })?;
    Ok(())
}

/// `RUST_LOG` wins over `LOG_LEVEL`; an unparsable level falls back to info.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn log_pipeline_config(config: &AppConfig, paths: &ResolvedPaths) {
    let classifier = &config.classifier;
    let batching = &config.batching;

    tracing::info!(
        target: "lifecycle",
        logs = %paths.logs_dir.display(),
        level = %config.logging.level,
        "tracing initialized"
    );
    tracing::info!(
        target: "lifecycle",
        endpoint = %endpoint_host(&classifier.api_url),
        model = %classifier.model,
        max_tokens = classifier.max_tokens,
        timeout_ms = classifier.timeout.map(|t| t.as_millis() as u64),
        topics = %classifier.topics.join("; "),
        "classifier configured"
    );
    tracing::info!(
        target: "lifecycle",
        min_batch = batching.min_batch,
        max_batch = batching.max_batch,
        review_interval_ms = batching.review_interval.as_millis() as u64,
        suppressed_opacity = config.suppression.opacity,
        "review pipeline configured"
    );
}

/// Host (and port) of the classifier endpoint; paths and queries stay out of logs.
fn endpoint_host(api_url: &str) -> String {
    Url::parse(api_url)
        .ok()
        .and_then(|url| {
            let host = url.host_str()?.to_string();
            Some(match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host,
            })
        })
        .unwrap_or_else(|| "<invalid>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_host_drops_path_and_query() {
        assert_eq!(
            endpoint_host("https://api.openai.com/v1/chat/completions"),
            "api.openai.com"
        );
        assert_eq!(
            endpoint_host("http://127.0.0.1:8080/v1/chat/completions?key=secret"),
            "127.0.0.1:8080"
        );
        assert_eq!(endpoint_host("not a url"), "<invalid>");
    }
}
