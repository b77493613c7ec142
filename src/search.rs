use crate::document::PhotoDocument;
use crate::error::AppError;
use crate::query::LabelQuery;
use async_trait::async_trait;

pub const INDEX_NAME: &str = "photos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Exact-match string; multi-valued fields are arrays of keywords.
    Keyword,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub fields: Vec<FieldMapping>,
}

impl IndexSchema {
    pub fn photos() -> Self {
        Self {
            fields: vec![
                FieldMapping { name: "objectKey", kind: FieldKind::Keyword },
                FieldMapping { name: "bucket", kind: FieldKind::Keyword },
                FieldMapping { name: "labels", kind: FieldKind::Keyword },
                FieldMapping { name: "createdTimestamp", kind: FieldKind::Date },
            ],
        }
    }
}

/// Search index holding photo documents.
///
/// `create_index` reports a lost creation race as `AppError::IndexAlreadyExists`;
/// `upsert_document` returns once the document is visible to `search`.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn index_exists(&self) -> Result<bool, AppError>;
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), AppError>;
    async fn upsert_document(&self, document: &PhotoDocument) -> Result<(), AppError>;
    async fn search(&self, query: &LabelQuery) -> Result<Vec<PhotoDocument>, AppError>;
}
