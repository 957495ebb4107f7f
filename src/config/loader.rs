use std::{env, str::FromStr, time::Duration};

use url::Url;

use super::env::{
    AppConfig, BatchConfig, ClassifierConfig, ConfigError, DirectoryConfig, LoggingConfig,
    SuppressionConfig,
};

const MIN_API_KEY_LEN: usize = 40;
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TOPICS: &str = "Politics;Hate speech;Here is why lists;Promoted tweets";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ConfigError::Missing("OPENAI_API_KEY"))?;
        let api_key = validate_api_key(&api_key)?;

        let api_url = env::var("OPENAI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        validate_api_url(&api_url)?;

        let topics = parse_topics(
            &env::var("BLOCKED_TOPICS").unwrap_or_else(|_| DEFAULT_TOPICS.to_string()),
        );
        if topics.is_empty() {
            return Err(ConfigError::Invalid {
                key: "BLOCKED_TOPICS",
                reason: "at least one topic is required".to_string(),
            });
        }

        let classifier = ClassifierConfig {
            api_key,
            api_url,
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            max_tokens: parse_or("CLASSIFIER_MAX_TOKENS", 2_000)?,
            timeout: parse_opt::<u64>("CLASSIFIER_TIMEOUT_MS")?.map(Duration::from_millis),
            topics,
        };

        let batching = BatchConfig {
            min_batch: parse_or("MIN_BATCH", 3)?,
            max_batch: parse_or("MAX_BATCH", 30)?,
            review_interval: Duration::from_millis(parse_or("REVIEW_INTERVAL_MS", 25)?),
        };
        validate_batching(&batching)?;

        let suppression = SuppressionConfig {
            opacity: parse_or("SUPPRESSED_OPACITY", 0.1)?,
        };
        if !(0.0..=1.0).contains(&suppression.opacity) {
            return Err(ConfigError::Invalid {
                key: "SUPPRESSED_OPACITY",
                reason: format!("{} is outside 0.0..=1.0", suppression.opacity),
            });
        }

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            classifier,
            batching,
            suppression,
            directories,
            logging,
        })
    }
}

pub(crate) fn validate_api_key(raw: &str) -> Result<String, ConfigError> {
    let key = raw.trim();
    if key.chars().count() < MIN_API_KEY_LEN {
        return Err(ConfigError::InvalidCredential {
            min: MIN_API_KEY_LEN,
        });
    }
    Ok(key.to_string())
}

fn validate_api_url(raw: &str) -> Result<(), ConfigError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::Invalid {
            key: "OPENAI_API_URL",
            reason: format!("unsupported scheme {}", url.scheme()),
        }),
        Err(err) => Err(ConfigError::Invalid {
            key: "OPENAI_API_URL",
            reason: err.to_string(),
        }),
    }
}

pub(crate) fn validate_batching(cfg: &BatchConfig) -> Result<(), ConfigError> {
    if cfg.min_batch == 0 {
        return Err(ConfigError::Invalid {
            key: "MIN_BATCH",
            reason: "must be at least 1".to_string(),
        });
    }
    if cfg.max_batch < cfg.min_batch {
        return Err(ConfigError::Invalid {
            key: "MAX_BATCH",
            reason: format!("{} is below MIN_BATCH {}", cfg.max_batch, cfg.min_batch),
        });
    }
    if cfg.review_interval.is_zero() {
        return Err(ConfigError::Invalid {
            key: "REVIEW_INTERVAL_MS",
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn parse_topics(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(key)?.unwrap_or(default))
}

fn parse_opt<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            }),
        _ => Ok(None),
    }
}
