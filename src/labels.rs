use crate::detection::LabelDetector;
use crate::document::LabelSet;
use crate::error::AppError;
use crate::storage::ObjectMetadata;

/// Metadata keys that may carry operator labels, checked in order.
pub const CUSTOM_LABEL_KEYS: &[&str] = &["customlabels", "custom-labels"];

pub const MAX_DETECTED_LABELS: u32 = 50;
pub const MIN_DETECTION_CONFIDENCE: f32 = 60.0;

/// Operator labels from a comma separated metadata value.
pub fn custom_labels(metadata: &ObjectMetadata) -> LabelSet {
    let raw = CUSTOM_LABEL_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find(|value| !value.is_empty());

    match raw {
        Some(raw) => raw
            .split(',')
            .map(|label| label.trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect(),
        None => LabelSet::new(),
    }
}

/// Machine labels for a stored object. Failures propagate to the caller.
pub async fn detected_labels(
    detector: &dyn LabelDetector,
    bucket: &str,
    key: &str,
) -> Result<LabelSet, AppError> {
    let detected = detector
        .detect_labels(bucket, key, MAX_DETECTED_LABELS, MIN_DETECTION_CONFIDENCE)
        .await?;

    Ok(detected
        .into_iter()
        .inspect(|label| log::trace!("Detected {} ({:.1}%) in {}/{}", label.name, label.confidence, bucket, key))
        .map(|label| label.name.trim().to_lowercase())
        .filter(|label| !label.is_empty())
        .collect())
}

pub fn merge(custom: &LabelSet, detected: &LabelSet) -> LabelSet {
    custom.union(detected).cloned().collect()
}
