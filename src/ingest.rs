use crate::detection::LabelDetector;
use crate::document::{identity_key, PhotoDocument};
use crate::error::AppError;
use crate::indexer;
use crate::labels;
use crate::provisioner;
use crate::search::Searcher;
use crate::storage::ObjectStore;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_RECORD_TIMEOUT: Duration = Duration::from_secs(90);

/// Upload notification batch as delivered by the storage service.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UploadEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<UploadRecord>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadRecord {
    pub s3: StorageEntity,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObjectRef {
    /// URL-encoded, with `+` standing for a space.
    pub key: String,
}

/// Notification keys encode spaces as `+` and everything else with percent escapes.
pub fn decode_object_key(raw: &str) -> Result<String, AppError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|_| AppError::InvalidObjectKey(raw.to_string()))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub indexed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestionAck {
    pub status_code: u16,
    pub message: String,
}

impl IngestionAck {
    pub fn ok() -> Self {
        Self { status_code: 200, message: "ingestion batch processed".to_string() }
    }
}

pub struct IngestionPipeline {
    store: Arc<dyn ObjectStore>,
    detector: Arc<dyn LabelDetector>,
    searcher: Arc<dyn Searcher>,
    concurrency: usize,
    record_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        detector: Arc<dyn LabelDetector>,
        searcher: Arc<dyn Searcher>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            detector,
            searcher,
            concurrency: concurrency.max(1),
            record_timeout: DEFAULT_RECORD_TIMEOUT,
        }
    }

    /// Upper bound on one object's processing; a stuck object is reported as failed.
    pub fn with_record_timeout(mut self, record_timeout: Duration) -> Self {
        self.record_timeout = record_timeout;
        self
    }

    /// Indexes every notified object. A failing object is logged and skipped;
    /// it never stops its siblings.
    pub async fn ingest(&self, event: &UploadEvent) -> IngestionReport {
        log::info!("Received upload notification with {} records", event.records.len());

        if let Err(e) = provisioner::ensure_index(self.searcher.as_ref()).await {
            log::error!("Error ensuring index: {}", e);
        }

        let outcomes: Vec<(String, Result<PhotoDocument, AppError>)> = stream::iter(&event.records)
            .map(|record| async move {
                let source = identity_key(&record.s3.bucket.name, &record.s3.object.key);
                let outcome = tokio::time::timeout(self.record_timeout, self.ingest_record(record))
                    .await
                    .unwrap_or(Err(AppError::Timeout(self.record_timeout)));
                (source, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = IngestionReport::default();
        for (source, outcome) in outcomes {
            match outcome {
                Ok(document) => {
                    log::info!("Indexed successfully: {}", document.identity());
                    report.indexed.push(document.identity());
                }
                Err(e) => {
                    log::error!("Error processing record {}: {}", source, e);
                    report.failed.push((source, e.to_string()));
                }
            }
        }

        log::info!(
            "Ingestion batch finished: {} indexed, {} failed",
            report.indexed.len(),
            report.failed.len()
        );
        report
    }

    async fn ingest_record(&self, record: &UploadRecord) -> Result<PhotoDocument, AppError> {
        let bucket = record.s3.bucket.name.as_str();
        let key = decode_object_key(&record.s3.object.key)?;
        log::info!("Processing: {}/{}", bucket, key);

        let (metadata, detected) = futures::try_join!(
            self.store.object_metadata(bucket, &key),
            labels::detected_labels(self.detector.as_ref(), bucket, &key),
        )?;

        let custom = labels::custom_labels(&metadata);
        log::debug!("Custom labels for {}/{}: {:?}", bucket, key, custom);
        log::debug!("Detected labels for {}/{}: {:?}", bucket, key, detected);

        indexer::index_photo(self.searcher.as_ref(), bucket, &key, labels::merge(&custom, &detected)).await
    }
}
