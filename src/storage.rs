use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// Object metadata as user-defined key/value strings.
pub type ObjectMetadata = HashMap<String, String>;

/// Storage service holding the original photo objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, AppError>;
}

/// S3-compatible store queried with `HEAD` requests; user metadata travels in
/// `x-amz-meta-*` headers.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        log::debug!("Creating storage client for endpoint: {}", endpoint);
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::Generic(format!("invalid storage endpoint {}: {}", endpoint, e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, AppError> {
        // URL path normalisation would collapse `.`/`..` segments onto another object.
        if key.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(AppError::InvalidObjectKey(key.to_string()));
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Generic(format!("storage endpoint {} cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, AppError> {
        let url = self.object_url(bucket, key)?;
        log::trace!("HEAD {}", url);

        let response = self.client.head(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::collaborator(
                "Storage",
                format!("HEAD {}/{} returned {}", bucket, key, status),
            ));
        }

        Ok(user_metadata(response.headers()))
    }
}

fn user_metadata(headers: &reqwest::header::HeaderMap) -> ObjectMetadata {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(USER_METADATA_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((key.to_lowercase(), value.to_string()))
        })
        .collect()
}
