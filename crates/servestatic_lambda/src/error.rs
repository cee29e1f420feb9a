use std::time::Duration;

use servestatic_core::archive::ArchiveError;
use servestatic_core::contract::ValidationError;
use servestatic_core::patterns::PatternError;

/// Failure reported by an object store adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to deliver custom resource response: {message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Run-level failures. Every variant ends the invocation with `FAILED`.
#[derive(Debug, thiserror::Error)]
pub enum PublishRunError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to fetch s3://{bucket}/{key}: {source}")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to decode archive s3://{bucket}/{key}: {source}")]
    Decode {
        bucket: String,
        key: String,
        #[source]
        source: ArchiveError,
    },
    #[error("archive decoder for s3://{bucket}/{key} did not finish: {source}")]
    DecodeAborted {
        bucket: String,
        key: String,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("publish pipeline timed out after {0:?}")]
    DeadlineExceeded(Duration),
}

impl PublishRunError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Fetch { .. } | Self::Decode { .. } | Self::DecodeAborted { .. } => {
                "fetch_error"
            }
            Self::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }
}

impl From<ValidationError> for PublishRunError {
    fn from(error: ValidationError) -> Self {
        Self::Configuration(error.message().to_string())
    }
}

impl From<PatternError> for PublishRunError {
    fn from(error: PatternError) -> Self {
        Self::Configuration(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    InvalidNumber {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("LOG_FORMAT must be 'json' or 'text', got '{0}'")]
    InvalidLogFormat(String),
}
