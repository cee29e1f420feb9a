use std::time::Duration;

use crate::error::ConfigError;

pub const PUBLISH_TIMEOUT_SECS_VAR: &str = "PUBLISH_TIMEOUT_SECS";
pub const PUBLISH_CONCURRENCY_VAR: &str = "PUBLISH_CONCURRENCY";
pub const REPORT_MARGIN_MS_VAR: &str = "REPORT_MARGIN_MS";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_PUBLISH_CONCURRENCY: usize = 32;
pub const DEFAULT_REPORT_MARGIN: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Process-wide settings, resolved once at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Upper bound on the fetch/filter/publish pipeline of one invocation.
    pub publish_timeout: Duration,
    /// Maximum number of `put_object` calls in flight at once.
    pub publish_concurrency: usize,
    /// Invocation time kept in reserve for delivering the callback.
    pub report_margin: Duration,
    pub log_format: LogFormat,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            publish_concurrency: DEFAULT_PUBLISH_CONCURRENCY,
            report_margin: DEFAULT_REPORT_MARGIN,
            log_format: LogFormat::Json,
        }
    }
}

impl PublisherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let publish_timeout = match lookup(PUBLISH_TIMEOUT_SECS_VAR) {
            Some(raw) => Duration::from_secs(parse_positive(PUBLISH_TIMEOUT_SECS_VAR, &raw)?),
            None => defaults.publish_timeout,
        };

        let publish_concurrency = match lookup(PUBLISH_CONCURRENCY_VAR) {
            Some(raw) => {
                let value = parse_positive(PUBLISH_CONCURRENCY_VAR, &raw)?;
                usize::try_from(value).map_err(|_| ConfigError::InvalidNumber {
                    name: PUBLISH_CONCURRENCY_VAR,
                    expected: "a positive integer",
                    value: raw.clone(),
                })?
            }
            None => defaults.publish_concurrency,
        };

        let report_margin = match lookup(REPORT_MARGIN_MS_VAR) {
            Some(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    name: REPORT_MARGIN_MS_VAR,
                    expected: "a non-negative integer",
                    value: raw.clone(),
                }
            })?),
            None => defaults.report_margin,
        };

        let log_format = match lookup(LOG_FORMAT_VAR) {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                _ => return Err(ConfigError::InvalidLogFormat(raw)),
            },
            None => defaults.log_format,
        };

        Ok(Self {
            publish_timeout,
            publish_concurrency,
            report_margin,
            log_format,
        })
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            name,
            expected: "a positive integer",
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<PublisherConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        PublisherConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).expect("defaults should load");
        assert_eq!(config, PublisherConfig::default());
        assert_eq!(config.publish_timeout, Duration::from_secs(180));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PUBLISH_TIMEOUT_SECS", "90"),
            ("PUBLISH_CONCURRENCY", " 8 "),
            ("REPORT_MARGIN_MS", "0"),
            ("LOG_FORMAT", "Text"),
        ])
        .expect("overrides should load");

        assert_eq!(config.publish_timeout, Duration::from_secs(90));
        assert_eq!(config.publish_concurrency, 8);
        assert_eq!(config.report_margin, Duration::ZERO);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let error = config_from(&[("PUBLISH_CONCURRENCY", "0")]).expect_err("zero should fail");
        assert_eq!(
            error.to_string(),
            "PUBLISH_CONCURRENCY must be a positive integer, got '0'"
        );
    }

    #[test]
    fn rejects_unknown_log_format() {
        let error = config_from(&[("LOG_FORMAT", "yaml")]).expect_err("yaml should fail");
        assert_eq!(error, ConfigError::InvalidLogFormat("yaml".to_string()));
    }
}
