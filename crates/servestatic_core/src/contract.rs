use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const PHYSICAL_RESOURCE_ID_PREFIX: &str = "servestatic";
const PHYSICAL_RESOURCE_ID_HASH_CHARS: usize = 16;

/// Lifecycle action requested by CloudFormation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
    #[serde(other)]
    Unknown,
}

/// Custom resource event envelope.
///
/// `ResourceProperties` stays raw JSON here: a Delete must be answered even
/// when the properties no longer decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_region: Option<String>,
    #[serde(default)]
    pub source_bucket: String,
    #[serde(default)]
    pub source_keys: Vec<String>,
    #[serde(default)]
    pub destination_bucket: String,
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Validated Create/Update work order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Region the object store is built for; `None` leaves it to the platform default.
    pub region: Option<String>,
    pub source_bucket: String,
    pub source_keys: Vec<String>,
    pub destination_bucket: String,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Body PUT to the presigned `ResponseURL`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CustomResourceResponse {
    pub fn for_event(
        event: &CustomResourceEvent,
        status: ResponseStatus,
        reason: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            physical_resource_id: physical_resource_id(event),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }
}

/// Counters reported back as the response `Data` object.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PublishSummary {
    pub archives: usize,
    pub selected: usize,
    pub published: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PublishSummary {
    pub fn merge(self, other: PublishSummary) -> PublishSummary {
        PublishSummary {
            archives: self.archives + other.archives,
            selected: self.selected + other.selected,
            published: self.published + other.published,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn decode_properties(value: &Value) -> Result<ResourceProperties, ValidationError> {
    serde_json::from_value(value.clone())
        .map_err(|error| ValidationError::new(format!("Malformed ResourceProperties: {error}")))
}

pub fn normalize_properties(
    properties: ResourceProperties,
) -> Result<PublishRequest, ValidationError> {
    if properties.include_patterns.is_empty() {
        return Err(ValidationError::new("No include patterns specified"));
    }

    let source_bucket = properties.source_bucket.trim().to_string();
    if source_bucket.is_empty() {
        return Err(ValidationError::new("SourceBucket cannot be empty"));
    }

    let destination_bucket = properties.destination_bucket.trim().to_string();
    if destination_bucket.is_empty() {
        return Err(ValidationError::new("DestinationBucket cannot be empty"));
    }

    if properties.source_keys.iter().any(|key| key.trim().is_empty()) {
        return Err(ValidationError::new(
            "SourceKeys cannot contain blank entries",
        ));
    }

    let region = properties
        .current_region
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Ok(PublishRequest {
        region,
        source_bucket,
        source_keys: dedupe_keys(properties.source_keys),
        destination_bucket,
        include_patterns: properties.include_patterns,
        exclude_patterns: properties.exclude_patterns,
    })
}

/// Drops repeated keys, keeping the first occurrence in its original position.
pub fn dedupe_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for key in keys {
        if !unique.contains(&key) {
            unique.push(key);
        }
    }
    unique
}

pub fn physical_resource_id(event: &CustomResourceEvent) -> String {
    if let Some(existing) = event
        .physical_resource_id
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    {
        return existing.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(event.stack_id.as_bytes());
    hasher.update(b"/");
    hasher.update(event.logical_resource_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!(
        "{PHYSICAL_RESOURCE_ID_PREFIX}-{}",
        &digest[..PHYSICAL_RESOURCE_ID_HASH_CHARS]
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn properties() -> ResourceProperties {
        ResourceProperties {
            current_region: Some("eu-west-1".to_string()),
            source_bucket: "deploy-bucket".to_string(),
            source_keys: vec!["a.zip".to_string()],
            destination_bucket: "assets-bucket".to_string(),
            include_patterns: vec!["public/**".to_string()],
            exclude_patterns: Vec::new(),
        }
    }

    #[test]
    fn decodes_cloudformation_envelope() {
        let event: CustomResourceEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ResponseURL": "https://example.com/response",
            "StackId": "arn:aws:cloudformation:eu-west-1:123:stack/app/1",
            "RequestId": "req-1",
            "LogicalResourceId": "StaticAssetsCustomResource",
            "ResourceType": "Custom::UnzipResource",
            "ResourceProperties": {
                "ServiceToken": "arn:aws:lambda:eu-west-1:123:function:x",
                "CurrentRegion": "eu-west-1",
                "SourceBucket": "deploy-bucket",
                "SourceKeys": ["a.zip"],
                "DestinationBucket": "assets-bucket",
                "IncludePatterns": ["public/**"],
                "ExcludePatterns": []
            }
        }))
        .expect("envelope should parse");

        assert_eq!(event.request_type, RequestType::Create);
        assert_eq!(event.physical_resource_id, None);

        let properties =
            decode_properties(&event.resource_properties).expect("properties should parse");
        assert_eq!(properties.source_keys, vec!["a.zip"]);
        assert_eq!(properties.include_patterns, vec!["public/**"]);
    }

    #[test]
    fn unrecognized_request_type_still_decodes() {
        let event: CustomResourceEvent = serde_json::from_value(json!({
            "RequestType": "Rollback",
            "ResponseURL": "https://example.com/response"
        }))
        .expect("envelope should parse");

        assert_eq!(event.request_type, RequestType::Unknown);
        assert_eq!(event.resource_properties, Value::Null);
    }

    #[test]
    fn malformed_properties_are_a_validation_error() {
        let error = decode_properties(&json!({"SourceKeys": "a.zip"}))
            .expect_err("string SourceKeys should fail");
        assert!(error.message().starts_with("Malformed ResourceProperties"));
    }

    #[test]
    fn normalize_rejects_missing_include_patterns() {
        let mut input = properties();
        input.include_patterns.clear();

        let error = normalize_properties(input).expect_err("request should fail");
        assert_eq!(error.message(), "No include patterns specified");
    }

    #[test]
    fn normalize_rejects_blank_destination() {
        let mut input = properties();
        input.destination_bucket = "  ".to_string();

        let error = normalize_properties(input).expect_err("request should fail");
        assert_eq!(error.message(), "DestinationBucket cannot be empty");
    }

    #[test]
    fn normalize_deduplicates_source_keys_in_discovery_order() {
        let mut input = properties();
        input.source_keys = vec![
            "b.zip".to_string(),
            "a.zip".to_string(),
            "b.zip".to_string(),
            "a.zip".to_string(),
        ];
        input.current_region = Some(" ".to_string());

        let request = normalize_properties(input).expect("request should pass");
        assert_eq!(request.source_keys, vec!["b.zip", "a.zip"]);
        assert_eq!(request.region, None);
    }

    #[test]
    fn response_serializes_with_cloudformation_field_names() {
        let event = CustomResourceEvent {
            request_type: RequestType::Update,
            response_url: "https://example.com/response".to_string(),
            stack_id: "stack".to_string(),
            request_id: "req".to_string(),
            logical_resource_id: "Logical".to_string(),
            resource_type: "Custom::UnzipResource".to_string(),
            physical_resource_id: Some("existing-id".to_string()),
            resource_properties: Value::Null,
        };

        let response = CustomResourceResponse::for_event(
            &event,
            ResponseStatus::Success,
            "ok",
            Some(json!({"Published": 2})),
        );
        let body = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(body["Status"], "SUCCESS");
        assert_eq!(body["PhysicalResourceId"], "existing-id");
        assert_eq!(body["NoEcho"], false);
        assert_eq!(body["Data"]["Published"], 2);
    }

    #[test]
    fn derived_physical_id_is_stable_per_logical_resource() {
        let event = CustomResourceEvent {
            request_type: RequestType::Create,
            response_url: "https://example.com/response".to_string(),
            stack_id: "stack".to_string(),
            request_id: "req-1".to_string(),
            logical_resource_id: "Logical".to_string(),
            resource_type: String::new(),
            physical_resource_id: None,
            resource_properties: Value::Null,
        };
        let mut retried = event.clone();
        retried.request_id = "req-2".to_string();

        let first = physical_resource_id(&event);
        assert_eq!(first, physical_resource_id(&retried));
        assert!(first.starts_with("servestatic-"));
        assert_eq!(first.len(), "servestatic-".len() + 16);
    }

    #[test]
    fn summaries_merge_field_by_field() {
        let merged = PublishSummary {
            archives: 1,
            selected: 3,
            published: 2,
            failed: 1,
            skipped: 0,
        }
        .merge(PublishSummary {
            archives: 1,
            selected: 1,
            published: 1,
            failed: 0,
            skipped: 4,
        });

        assert_eq!(merged.archives, 2);
        assert_eq!(merged.selected, 4);
        assert_eq!(merged.published, 3);
        assert_eq!(merged.failed, 1);
        assert_eq!(merged.skipped, 4);
    }
}
