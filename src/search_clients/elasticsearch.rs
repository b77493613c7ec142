use crate::config::AppConfig;
use crate::document::PhotoDocument;
use crate::error::AppError;
use crate::query::LabelQuery;
use crate::search::{FieldKind, IndexSchema, Searcher, INDEX_NAME};
use async_trait::async_trait;
use elasticsearch::{
    auth::Credentials,
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    Elasticsearch, IndexParts, SearchParts,
};
use serde_json::{json, Map, Value};
use url::Url;

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

pub struct ElasticsearchSearcher {
    client: Elasticsearch,
}

impl ElasticsearchSearcher {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        log::debug!("Creating Elasticsearch client for URL: {}", config.elasticsearch_url);
        let url = Url::parse(&config.elasticsearch_url)
            .map_err(|e| AppError::Generic(format!("invalid Elasticsearch URL: {}", e)))?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let (Some(username), Some(password)) =
            (&config.elasticsearch_username, &config.elasticsearch_password)
        {
            log::debug!("Using basic auth for Elasticsearch user: {}", username);
            builder = builder.auth(Credentials::Basic(username.clone(), password.clone()));
        }
        let transport = builder
            .build()
            .map_err(|e| AppError::Generic(format!("Elasticsearch transport: {}", e)))?;
        let client = Elasticsearch::new(transport);
        log::trace!("Elasticsearch client created successfully.");
        Ok(Self { client })
    }
}

async fn failure(action: &str, response: Response) -> AppError {
    let status = response.status_code();
    let body = response.text().await.unwrap_or_default();
    log::error!("Elasticsearch {} failed with status {}: {}", action, status, body);
    AppError::SearchEngine(format!("{} failed with status {}: {}", action, status, body))
}

fn mappings(schema: &IndexSchema) -> Value {
    let properties: Map<String, Value> = schema
        .fields
        .iter()
        .map(|field| {
            let kind = match field.kind {
                FieldKind::Keyword => "keyword",
                FieldKind::Date => "date",
            };
            (field.name.to_string(), json!({ "type": kind }))
        })
        .collect();

    json!({ "mappings": { "properties": properties } })
}

fn is_already_exists(body: &Value) -> bool {
    body["error"]["type"] == ALREADY_EXISTS
}

fn unwrap_hits(body: &Value) -> Result<Vec<PhotoDocument>, AppError> {
    let mut photos = Vec::new();
    if let Some(hits) = body["hits"]["hits"].as_array() {
        for hit in hits {
            if let Some(source) = hit.get("_source") {
                photos.push(serde_json::from_value(source.clone())?);
            }
        }
    }
    Ok(photos)
}

#[async_trait]
impl Searcher for ElasticsearchSearcher {
    async fn index_exists(&self) -> Result<bool, AppError> {
        log::debug!("Checking if Elasticsearch index '{}' exists.", INDEX_NAME);
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[INDEX_NAME]))
            .send()
            .await?;

        match response.status_code() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(failure("index existence check", response).await),
        }
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), AppError> {
        log::info!("Creating Elasticsearch index '{}'.", INDEX_NAME);
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(INDEX_NAME))
            .body(mappings(schema))
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            log::info!("Elasticsearch index '{}' created successfully.", INDEX_NAME);
            return Ok(());
        }

        if status == StatusCode::BAD_REQUEST {
            let body = response.json::<Value>().await?;
            if is_already_exists(&body) {
                return Err(AppError::IndexAlreadyExists(INDEX_NAME.to_string()));
            }
            return Err(AppError::SearchEngine(format!("index creation rejected: {}", body)));
        }

        Err(failure("index creation", response).await)
    }

    async fn upsert_document(&self, document: &PhotoDocument) -> Result<(), AppError> {
        let id = document.identity();
        log::debug!("Indexing document: {}", id);

        let response = self
            .client
            .index(IndexParts::IndexId(INDEX_NAME, &id))
            .refresh(Refresh::True)
            .body(document)
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(failure("document index", response).await);
        }

        log::debug!("Document indexed: {}", id);
        Ok(())
    }

    async fn search(&self, query: &LabelQuery) -> Result<Vec<PhotoDocument>, AppError> {
        log::debug!("Searching Elasticsearch for labels: {:?}", query.keywords);

        let response = self
            .client
            .search(SearchParts::Index(&[INDEX_NAME]))
            .body(query.to_dsl())
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(failure("search", response).await);
        }

        let body = response.json::<Value>().await?;
        log::trace!("Elasticsearch search response: {:?}", body);

        let photos = unwrap_hits(&body)?;
        log::debug!("Found {} photos in Elasticsearch for labels: {:?}", photos.len(), query.keywords);
        Ok(photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mappings_follow_schema() {
        let body = mappings(&IndexSchema::photos());
        let properties = &body["mappings"]["properties"];

        assert_eq!(properties["objectKey"]["type"], "keyword");
        assert_eq!(properties["bucket"]["type"], "keyword");
        assert_eq!(properties["labels"]["type"], "keyword");
        assert_eq!(properties["createdTimestamp"]["type"], "date");
    }

    #[test]
    fn test_already_exists_detection() {
        let race = json!({
            "error": { "type": "resource_already_exists_exception", "reason": "index [photos/abc] already exists" },
            "status": 400
        });
        let other = json!({ "error": { "type": "mapper_parsing_exception" }, "status": 400 });

        assert!(is_already_exists(&race));
        assert!(!is_already_exists(&other));
    }

    #[test]
    fn test_hits_are_unwrapped_in_engine_order() {
        let body = json!({
            "hits": {
                "total": { "value": 2 },
                "hits": [
                    { "_id": "b/dog.jpg", "_score": 2.0, "_source": {
                        "objectKey": "dog.jpg", "bucket": "b", "labels": ["dogs"],
                        "createdTimestamp": "2024-01-01T00:00:00.000Z" } },
                    { "_id": "b/cat.jpg", "_score": 1.0, "_source": {
                        "objectKey": "cat.jpg", "bucket": "b", "labels": ["cats", "sofa"],
                        "createdTimestamp": "2024-01-02T00:00:00.000Z" } }
                ]
            }
        });

        let photos = unwrap_hits(&body).unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].object_key, "dog.jpg");
        assert_eq!(photos[1].identity(), "b/cat.jpg");
        assert!(photos[1].labels.contains("sofa"));
    }

    #[test]
    fn test_missing_hits_is_empty() {
        assert!(unwrap_hits(&json!({})).unwrap().is_empty());
    }
}
