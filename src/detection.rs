use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedLabel {
    pub name: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Machine label detection over a stored image.
#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect_labels(
        &self,
        bucket: &str,
        key: &str,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>, AppError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsRequest<'a> {
    image: ImageRef<'a>,
    max_labels: u32,
    min_confidence: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImageRef<'a> {
    #[serde(rename = "S3Object")]
    s3_object: StoredObject<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StoredObject<'a> {
    bucket: &'a str,
    name: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsResponse {
    #[serde(default)]
    labels: Vec<DetectedLabel>,
}

pub struct HttpLabelDetector {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLabelDetector {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        log::debug!("Creating label detection client for endpoint: {}", endpoint);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.to_string() })
    }
}

#[async_trait]
impl LabelDetector for HttpLabelDetector {
    async fn detect_labels(
        &self,
        bucket: &str,
        key: &str,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>, AppError> {
        let request = DetectLabelsRequest {
            image: ImageRef { s3_object: StoredObject { bucket, name: key } },
            max_labels,
            min_confidence,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::collaborator(
                "Label detection",
                format!("{} for {}/{}: {}", status, bucket, key, body),
            ));
        }

        let body = response.json::<DetectLabelsResponse>().await?;
        log::trace!("Detection returned {} labels for {}/{}", body.labels.len(), bucket, key);
        Ok(body.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = DetectLabelsRequest {
            image: ImageRef { s3_object: StoredObject { bucket: "b", name: "photos/img1.jpg" } },
            max_labels: 50,
            min_confidence: 60.0,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "Image": { "S3Object": { "Bucket": "b", "Name": "photos/img1.jpg" } },
                "MaxLabels": 50,
                "MinConfidence": 60.0
            })
        );
    }

    #[test]
    fn test_response_without_labels_is_empty() {
        let body: DetectLabelsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.labels.is_empty());

        let body: DetectLabelsResponse =
            serde_json::from_value(json!({ "Labels": [{ "Name": "Beach", "Confidence": 98.5 }] })).unwrap();
        assert_eq!(body.labels[0].name, "Beach");
    }
}
