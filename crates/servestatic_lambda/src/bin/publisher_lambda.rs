use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use servestatic_core::contract::{CustomResourceEvent, CustomResourceResponse};
use servestatic_core::media_types::MediaTypes;
use servestatic_lambda::adapters::callback::OutcomeReporter;
use servestatic_lambda::adapters::object_store::{ObjectStore, StoreProvider};
use servestatic_lambda::config::PublisherConfig;
use servestatic_lambda::error::{CallbackError, StoreError};
use servestatic_lambda::handlers::invocation::{invocation_budget, remaining_time, run_invocation};
use servestatic_lambda::handlers::publish::Publisher;
use servestatic_lambda::logging::init_logging;
use tracing::error;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| {
                StoreError::new(format!(
                    "failed to read object from s3: {}",
                    DisplayErrorContext(&error)
                ))
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|error| StoreError::new(format!("failed to read s3 object body: {error}")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| {
                StoreError::new(format!(
                    "failed to write object to s3: {}",
                    DisplayErrorContext(&error)
                ))
            })
    }
}

struct S3StoreProvider;

#[async_trait]
impl StoreProvider for S3StoreProvider {
    async fn store_for_region(&self, region: Option<&str>) -> Arc<dyn ObjectStore> {
        Arc::new(S3ObjectStore {
            s3_client: build_s3_client(region).await,
        })
    }
}

struct HttpOutcomeReporter {
    http_client: reqwest::Client,
}

#[async_trait]
impl OutcomeReporter for HttpOutcomeReporter {
    async fn report(
        &self,
        response_url: &str,
        response: &CustomResourceResponse,
    ) -> Result<(), CallbackError> {
        let body = serde_json::to_vec(response)
            .map_err(|error| CallbackError::new(format!("failed to serialize response: {error}")))?;

        // The presigned URL is signed without a content type.
        let reply = self
            .http_client
            .put(response_url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .body(body)
            .send()
            .await
            .map_err(|error| CallbackError::new(error.to_string()))?;

        if !reply.status().is_success() {
            return Err(CallbackError::new(format!(
                "response URL answered {}",
                reply.status()
            )));
        }
        Ok(())
    }
}

struct RuntimeDependencies {
    config: PublisherConfig,
    media_types: Arc<MediaTypes>,
    reporter: HttpOutcomeReporter,
}

// Answers `Ok` for every event; the platform redelivers events that fail.
async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<Value, Error> {
    let LambdaEvent { payload, context } = event;
    let event: CustomResourceEvent = match serde_json::from_value(payload) {
        Ok(event) => event,
        Err(error) => {
            error!(error = %error, "unanswerable event: envelope did not decode");
            return Ok(json!({ "Delivered": false }));
        }
    };

    let publisher = Publisher::new(
        Arc::new(S3StoreProvider),
        Arc::clone(&deps.media_types),
        deps.config.publish_concurrency,
    );

    let remaining = remaining_time(context.deadline, Utc::now().timestamp_millis());
    let budget = invocation_budget(&deps.config, remaining);

    let report = run_invocation(&event, &publisher, &deps.reporter, budget).await;
    Ok(json!({
        "Status": report.response.status,
        "PhysicalResourceId": report.response.physical_resource_id,
        "Delivered": report.delivered,
    }))
}

async fn build_s3_client(region: Option<&str>) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    aws_sdk_s3::Client::new(&loader.load().await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = PublisherConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    init_logging(config.log_format).map_err(|error| Error::from(error.to_string()))?;

    let deps = RuntimeDependencies {
        config,
        media_types: Arc::new(MediaTypes::new()),
        reporter: HttpOutcomeReporter {
            http_client: reqwest::Client::builder()
                .timeout(CALLBACK_TIMEOUT)
                .build()?,
        },
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps).await
    }))
    .await
}
