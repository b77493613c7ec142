//! In-memory collaborators for unit tests.

use crate::detection::{DetectedLabel, LabelDetector};
use crate::document::PhotoDocument;
use crate::error::AppError;
use crate::nlu::{IntentRecognizer, RecognizeTextRequest, RecognizeTextResponse};
use crate::query::LabelQuery;
use crate::search::{IndexSchema, Searcher};
use crate::storage::{ObjectMetadata, ObjectStore};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateOutcome {
    #[default]
    Created,
    /// Another invocation created the index first.
    LostRace,
    Unavailable,
}

#[derive(Default)]
pub struct MemoryState {
    pub exists: bool,
    pub documents: Vec<PhotoDocument>,
    pub create_outcome: CreateOutcome,
    pub exists_fails: bool,
    pub search_fails: bool,
    pub failing_identities: HashSet<String>,
    pub create_calls: usize,
    pub search_calls: usize,
    pub last_query: Option<LabelQuery>,
}

/// Search index double with overwrite-on-identity semantics.
#[derive(Default)]
pub struct MemorySearcher {
    pub state: Mutex<MemoryState>,
}

impl MemorySearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index() -> Self {
        let searcher = Self::default();
        searcher.state.try_lock().unwrap().exists = true;
        searcher
    }

    pub fn configure(self, f: impl FnOnce(&mut MemoryState)) -> Self {
        f(&mut self.state.try_lock().unwrap());
        self
    }

    pub async fn documents(&self) -> Vec<PhotoDocument> {
        self.state.lock().await.documents.clone()
    }
}

#[async_trait]
impl Searcher for MemorySearcher {
    async fn index_exists(&self) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        if state.exists_fails {
            return Err(AppError::SearchEngine("cluster unavailable".into()));
        }
        Ok(state.exists)
    }

    async fn create_index(&self, _schema: &IndexSchema) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        state.create_calls += 1;
        match state.create_outcome {
            CreateOutcome::Created => {
                state.exists = true;
                Ok(())
            }
            CreateOutcome::LostRace => {
                state.exists = true;
                Err(AppError::IndexAlreadyExists("photos".into()))
            }
            CreateOutcome::Unavailable => Err(AppError::SearchEngine("cluster unavailable".into())),
        }
    }

    async fn upsert_document(&self, document: &PhotoDocument) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let id = document.identity();
        if state.failing_identities.contains(&id) {
            return Err(AppError::SearchEngine(format!("write rejected for {}", id)));
        }
        state.documents.retain(|doc| doc.identity() != id);
        state.documents.push(document.clone());
        Ok(())
    }

    async fn search(&self, query: &LabelQuery) -> Result<Vec<PhotoDocument>, AppError> {
        let mut state = self.state.lock().await;
        state.search_calls += 1;
        state.last_query = Some(query.clone());
        if state.search_fails {
            return Err(AppError::SearchEngine("search_phase_execution_exception".into()));
        }
        Ok(state
            .documents
            .iter()
            .filter(|doc| query.keywords.iter().any(|k| doc.labels.contains(k)))
            .take(query.size)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct StubStore {
    metadata: HashMap<String, ObjectMetadata>,
    failing_keys: HashSet<String>,
    hanging_keys: HashSet<String>,
    pub lookups: Mutex<Vec<(String, String)>>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: &str, pairs: &[(&str, &str)]) -> Self {
        let metadata = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.metadata.insert(key.to_string(), metadata);
        self
    }

    pub fn failing_for(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    /// Lookups for `key` never complete.
    pub fn hanging_for(mut self, key: &str) -> Self {
        self.hanging_keys.insert(key.to_string());
        self
    }
}

#[async_trait]
impl ObjectStore for StubStore {
    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, AppError> {
        self.lookups.lock().await.push((bucket.to_string(), key.to_string()));
        if self.hanging_keys.contains(key) {
            futures::future::pending::<()>().await;
        }
        if self.failing_keys.contains(key) {
            return Err(AppError::collaborator("Storage", format!("HEAD {}/{} returned 404", bucket, key)));
        }
        Ok(self.metadata.get(key).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct StubDetector {
    labels: Vec<String>,
    per_key: HashMap<String, Vec<String>>,
    failing_keys: HashSet<String>,
    fail_all: bool,
    pub calls: Mutex<Vec<(String, String, u32, f32)>>,
}

impl StubDetector {
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self { fail_all: true, ..Self::default() }
    }

    pub fn for_key(mut self, key: &str, labels: &[&str]) -> Self {
        self.per_key.insert(key.to_string(), labels.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn failing_for(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }
}

#[async_trait]
impl LabelDetector for StubDetector {
    async fn detect_labels(
        &self,
        bucket: &str,
        key: &str,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>, AppError> {
        self.calls
            .lock()
            .await
            .push((bucket.to_string(), key.to_string(), max_labels, min_confidence));
        if self.fail_all || self.failing_keys.contains(key) {
            return Err(AppError::collaborator("Label detection", "503 Service Unavailable"));
        }
        let names = self.per_key.get(key).unwrap_or(&self.labels);
        Ok(names
            .iter()
            .map(|name| DetectedLabel { name: name.clone(), confidence: 90.0 })
            .collect())
    }
}

/// NLU double; `None` simulates an unreachable service.
pub struct StubRecognizer {
    response: Option<RecognizeTextResponse>,
    pub requests: Mutex<Vec<RecognizeTextRequest>>,
}

impl StubRecognizer {
    pub fn with_slots(slots: &[(&str, &str)]) -> Self {
        let slots: serde_json::Map<String, serde_json::Value> = slots
            .iter()
            .map(|(name, value)| (name.to_string(), json!({ "value": { "interpretedValue": value } })))
            .collect();
        let response = serde_json::from_value(json!({
            "sessionState": { "intent": { "name": "SearchIntent", "slots": slots } }
        }))
        .unwrap();
        Self { response: Some(response), requests: Mutex::new(Vec::new()) }
    }

    pub fn empty() -> Self {
        Self { response: Some(RecognizeTextResponse::default()), requests: Mutex::new(Vec::new()) }
    }

    pub fn unavailable() -> Self {
        Self { response: None, requests: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl IntentRecognizer for StubRecognizer {
    async fn recognize_text(&self, request: &RecognizeTextRequest) -> Result<RecognizeTextResponse, AppError> {
        self.requests.lock().await.push(request.clone());
        self.response
            .clone()
            .ok_or_else(|| AppError::collaborator("NLU", "connection refused"))
    }
}
