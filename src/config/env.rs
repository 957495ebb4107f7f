use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub batching: BatchConfig,
    pub suppression: SuppressionConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Option<Duration>,
    /// Ordered topic names; the order only drives the numbering in the prompt.
    pub topics: Vec<String>,
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("topics", &self.topics)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub min_batch: usize,
    pub max_batch: usize,
    pub review_interval: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct SuppressionConfig {
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("OPENAI_API_KEY looks invalid (expected at least {min} characters)")]
    InvalidCredential { min: usize },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
