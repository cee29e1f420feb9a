use std::time::{Duration, Instant};

use serde_json::Value;
use servestatic_core::contract::{
    decode_properties, normalize_properties, CustomResourceEvent, CustomResourceResponse,
    PublishSummary, RequestType, ResponseStatus,
};
use servestatic_core::patterns::PatternFilter;
use tracing::{error, info, instrument, warn};

use crate::adapters::callback::OutcomeReporter;
use crate::config::PublisherConfig;
use crate::error::PublishRunError;
use crate::handlers::publish::Publisher;

/// Terminal result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        reason: String,
        summary: Option<PublishSummary>,
    },
    Failure {
        reason: String,
    },
}

impl Outcome {
    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::Success { .. } => ResponseStatus::Success,
            Self::Failure { .. } => ResponseStatus::Failed,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Success { reason, .. } | Self::Failure { reason } => reason,
        }
    }

    fn data(&self) -> Option<Value> {
        match self {
            Self::Success {
                summary: Some(summary),
                ..
            } => serde_json::to_value(summary).ok(),
            _ => None,
        }
    }

    fn from_run_error(error: &PublishRunError) -> Self {
        Self::Failure {
            reason: error.to_string(),
        }
    }
}

/// What one invocation sent back to CloudFormation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationReport {
    pub response: CustomResourceResponse,
    pub delivered: bool,
}

/// Answers one custom resource event.
///
/// This is the only place a response is sent: whatever path the event takes,
/// the reporter is called exactly once before returning. A failed delivery is
/// logged and returned as `delivered: false`, never as an error, so the
/// platform does not re-run the invocation and report a second time.
#[instrument(
    skip_all,
    fields(
        request_id = %event.request_id,
        request_type = ?event.request_type,
        logical_resource_id = %event.logical_resource_id,
    )
)]
pub async fn run_invocation(
    event: &CustomResourceEvent,
    publisher: &Publisher,
    reporter: &dyn OutcomeReporter,
    budget: Duration,
) -> InvocationReport {
    let started_at = Instant::now();
    let outcome = resolve_outcome(event, publisher, budget).await;

    match &outcome {
        Outcome::Success { summary, .. } => info!(
            status = "SUCCESS",
            duration_ms = millis(started_at.elapsed()),
            summary = ?summary,
            "invocation_completed"
        ),
        Outcome::Failure { reason } => error!(
            status = "FAILED",
            duration_ms = millis(started_at.elapsed()),
            reason = %reason,
            "invocation_completed"
        ),
    }

    let response = CustomResourceResponse::for_event(
        event,
        outcome.status(),
        outcome.reason(),
        outcome.data(),
    );
    let delivered = match reporter.report(&event.response_url, &response).await {
        Ok(()) => true,
        Err(error) => {
            error!(error = %error, "custom resource response was not delivered");
            false
        }
    };
    InvocationReport {
        response,
        delivered,
    }
}

pub async fn resolve_outcome(
    event: &CustomResourceEvent,
    publisher: &Publisher,
    budget: Duration,
) -> Outcome {
    match event.request_type {
        RequestType::Delete => {
            info!("delete requested; published assets follow the bucket retention policy");
            Outcome::Success {
                reason: "Nothing to delete".to_string(),
                summary: None,
            }
        }
        RequestType::Create | RequestType::Update => {
            match publish(event, publisher, budget).await {
                Ok(summary) => Outcome::Success {
                    reason: format!(
                        "Published {} of {} selected entries from {} archive(s)",
                        summary.published, summary.selected, summary.archives
                    ),
                    summary: Some(summary),
                },
                Err(error) => {
                    warn!(kind = error.kind(), error = %error, "publish_run_failed");
                    Outcome::from_run_error(&error)
                }
            }
        }
        RequestType::Unknown => Outcome::Failure {
            reason: "Unsupported RequestType".to_string(),
        },
    }
}

async fn publish(
    event: &CustomResourceEvent,
    publisher: &Publisher,
    budget: Duration,
) -> Result<PublishSummary, PublishRunError> {
    let properties = decode_properties(&event.resource_properties)?;
    let request = normalize_properties(properties)?;
    let filter = PatternFilter::new(&request.include_patterns, &request.exclude_patterns)?;

    info!(
        source_bucket = %request.source_bucket,
        source_keys = request.source_keys.len(),
        destination_bucket = %request.destination_bucket,
        budget_ms = millis(budget),
        "publish_started"
    );
    publisher.publish(&request, &filter, budget).await
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Time the publish pipeline may use: the configured timeout, shortened so the
/// callback can still go out before the function itself is stopped.
pub fn invocation_budget(config: &PublisherConfig, remaining: Option<Duration>) -> Duration {
    match remaining {
        Some(remaining) => config
            .publish_timeout
            .min(remaining.saturating_sub(config.report_margin)),
        None => config.publish_timeout,
    }
}

/// Remaining invocation time from the runtime deadline (epoch milliseconds).
pub fn remaining_time(deadline_ms: u64, now_ms: i64) -> Option<Duration> {
    if deadline_ms == 0 {
        return None;
    }
    let now_ms = u64::try_from(now_ms).unwrap_or(0);
    Some(Duration::from_millis(deadline_ms.saturating_sub(now_ms)))
}
