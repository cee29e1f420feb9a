//! Inputs the template generator hands to the publisher.
//!
//! The generator scans the compiled CloudFormation template for Lambda
//! functions packaged into the shared deployment bucket; each of their code
//! archives becomes a source key. The publisher itself never calls this at
//! runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::{dedupe_keys, ResourceProperties};

pub const LAMBDA_FUNCTION_TYPE: &str = "AWS::Lambda::Function";
pub const DEFAULT_DEPLOYMENT_BUCKET_ID: &str = "ServerlessDeploymentBucket";

/// Per-deployment settings supplied by the service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticAssetSettings {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Bucket public-access posture. Consumed by bucket provisioning only.
    #[serde(default)]
    pub public: Option<bool>,
}

pub fn discover_source_keys(template: &Value, deployment_bucket_id: &str) -> Vec<String> {
    let Some(resources) = template.get("Resources").and_then(Value::as_object) else {
        return Vec::new();
    };

    let keys = resources.values().filter_map(|resource| {
        if resource.get("Type").and_then(Value::as_str) != Some(LAMBDA_FUNCTION_TYPE) {
            return None;
        }
        let code = resource.get("Properties")?.get("Code")?;
        let bucket_ref = code.get("S3Bucket")?.get("Ref")?.as_str()?;
        if bucket_ref != deployment_bucket_id {
            return None;
        }
        code.get("S3Key")?.as_str().map(str::to_string)
    });

    dedupe_keys(keys)
}

pub fn build_resource_properties(
    settings: &StaticAssetSettings,
    current_region: &str,
    source_bucket: &str,
    destination_bucket: &str,
    template: &Value,
) -> ResourceProperties {
    ResourceProperties {
        current_region: Some(current_region.to_string()),
        source_bucket: source_bucket.to_string(),
        source_keys: discover_source_keys(template, DEFAULT_DEPLOYMENT_BUCKET_ID),
        destination_bucket: destination_bucket.to_string(),
        include_patterns: settings.include.clone(),
        exclude_patterns: settings.exclude.clone(),
    }
}
