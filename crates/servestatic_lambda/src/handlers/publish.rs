use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, try_join_all};
use servestatic_core::archive::{decode_archive, ArchiveEntry};
use servestatic_core::contract::{PublishRequest, PublishSummary};
use servestatic_core::media_types::MediaTypes;
use servestatic_core::patterns::PatternFilter;
use servestatic_core::storage_keys::destination_object_key;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::adapters::object_store::{ObjectStore, StoreProvider};
use crate::error::PublishRunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Published,
    Failed,
}

/// Republishes filtered archive entries into the destination bucket.
///
/// One `Publisher` serves one invocation. The permit pool caps concurrent
/// `put_object` calls across every archive of the run. The store itself is
/// resolved per request, for the region the request names.
pub struct Publisher {
    stores: Arc<dyn StoreProvider>,
    media_types: Arc<MediaTypes>,
    permits: Arc<Semaphore>,
}

impl Publisher {
    pub fn new(
        stores: Arc<dyn StoreProvider>,
        media_types: Arc<MediaTypes>,
        publish_concurrency: usize,
    ) -> Self {
        Self {
            stores,
            media_types,
            permits: Arc::new(Semaphore::new(
                publish_concurrency.clamp(1, Semaphore::MAX_PERMITS),
            )),
        }
    }

    /// Runs fetch, filter and publish for every source key, racing the whole
    /// pipeline against `timeout`.
    ///
    /// On expiry the pipeline future is dropped; anything already written
    /// stays in the destination bucket. A pipeline that only finishes after
    /// the deadline is still reported as timed out.
    pub async fn publish(
        &self,
        request: &PublishRequest,
        filter: &PatternFilter,
        timeout: Duration,
    ) -> Result<PublishSummary, PublishRunError> {
        let deadline = Instant::now() + timeout;
        match tokio::time::timeout_at(deadline, self.publish_all(request, filter)).await {
            Ok(_) if Instant::now() > deadline => Err(PublishRunError::DeadlineExceeded(timeout)),
            Ok(result) => result,
            Err(_) => Err(PublishRunError::DeadlineExceeded(timeout)),
        }
    }

    async fn publish_all(
        &self,
        request: &PublishRequest,
        filter: &PatternFilter,
    ) -> Result<PublishSummary, PublishRunError> {
        let store = self.stores.store_for_region(request.region.as_deref()).await;
        let summaries = try_join_all(
            request
                .source_keys
                .iter()
                .map(|key| self.publish_archive(store.as_ref(), request, filter, key)),
        )
        .await?;

        Ok(summaries
            .into_iter()
            .fold(PublishSummary::default(), PublishSummary::merge))
    }

    async fn publish_archive(
        &self,
        store: &dyn ObjectStore,
        request: &PublishRequest,
        filter: &PatternFilter,
        source_key: &str,
    ) -> Result<PublishSummary, PublishRunError> {
        let started_at = Instant::now();
        info!(
            source_bucket = %request.source_bucket,
            source_key,
            "archive_fetch_started"
        );

        let bytes = store
            .get_object(&request.source_bucket, source_key)
            .await
            .map_err(|source| PublishRunError::Fetch {
                bucket: request.source_bucket.clone(),
                key: source_key.to_string(),
                source,
            })?;
        let archive_bytes = bytes.len();

        // Inflating is CPU-bound.
        let entries = tokio::task::spawn_blocking(move || decode_archive(&bytes))
            .await
            .map_err(|source| PublishRunError::DecodeAborted {
                bucket: request.source_bucket.clone(),
                key: source_key.to_string(),
                source,
            })?
            .map_err(|source| PublishRunError::Decode {
                bucket: request.source_bucket.clone(),
                key: source_key.to_string(),
                source,
            })?;

        info!(
            source_key,
            archive_bytes,
            entries = entries.len(),
            "archive_fetched"
        );

        let mut skipped = 0usize;
        let mut uploads = Vec::new();
        for entry in entries {
            if !filter.is_selected(&entry.name) {
                debug!(entry = %entry.name, "entry_not_selected");
                continue;
            }
            match destination_object_key(&entry.name) {
                Some(destination_key) => uploads.push(self.publish_entry(
                    store,
                    &request.destination_bucket,
                    entry,
                    destination_key,
                )),
                None => {
                    skipped += 1;
                    warn!(
                        entry = %entry.name,
                        reason = "no path below the unit segment",
                        "entry_skipped"
                    );
                }
            }
        }

        let outcomes = join_all(uploads).await;
        let published = outcomes
            .iter()
            .filter(|outcome| **outcome == EntryOutcome::Published)
            .count();
        let summary = PublishSummary {
            archives: 1,
            selected: outcomes.len() + skipped,
            published,
            failed: outcomes.len() - published,
            skipped,
        };

        info!(
            source_key,
            selected = summary.selected,
            published = summary.published,
            failed = summary.failed,
            skipped = summary.skipped,
            duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "archive_completed"
        );
        Ok(summary)
    }

    async fn publish_entry(
        &self,
        store: &dyn ObjectStore,
        destination_bucket: &str,
        entry: ArchiveEntry,
        destination_key: String,
    ) -> EntryOutcome {
        let content_type = self.media_types.content_type_for(&entry.name);
        let Ok(_permit) = self.permits.acquire().await else {
            error!(entry = %entry.name, "publish permit pool closed");
            return EntryOutcome::Failed;
        };

        let size_bytes = entry.payload.len();
        let destination = format!("s3://{destination_bucket}/{destination_key}");
        match store
            .put_object(destination_bucket, &destination_key, entry.payload, &content_type)
            .await
        {
            Ok(()) => {
                info!(
                    entry = %entry.name,
                    destination = %destination,
                    content_type = %content_type,
                    size_bytes,
                    "entry_published"
                );
                EntryOutcome::Published
            }
            Err(error) => {
                warn!(
                    entry = %entry.name,
                    destination = %destination,
                    error = %error,
                    "entry_publish_failed"
                );
                EntryOutcome::Failed
            }
        }
    }
}
