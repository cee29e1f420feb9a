use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

/// Bucket-addressed blob storage shared by every in-flight fetch and publish.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;
}

/// Hands out the store a request should use, built for the region it names
/// (`None` means the platform default).
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn store_for_region(&self, region: Option<&str>) -> Arc<dyn ObjectStore>;
}
