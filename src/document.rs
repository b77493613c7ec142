// src/document.rs

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lower-cased, de-duplicated labels. Ordering carries no meaning.
pub type LabelSet = BTreeSet<String>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDocument {
    pub object_key: String,
    pub bucket: String,
    pub labels: LabelSet,
    pub created_timestamp: String,
}

impl PhotoDocument {
    /// Builds a document stamped with the current indexing time.
    pub fn new(bucket: &str, object_key: &str, labels: LabelSet) -> Self {
        Self {
            object_key: object_key.to_string(),
            bucket: bucket.to_string(),
            labels,
            created_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn identity(&self) -> String {
        identity_key(&self.bucket, &self.object_key)
    }
}

/// Index identifier of a photo: `bucket/objectKey`.
pub fn identity_key(bucket: &str, object_key: &str) -> String {
    format!("{}/{}", bucket, object_key)
}
