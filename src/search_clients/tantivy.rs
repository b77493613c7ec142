use crate::config::AppConfig;
use crate::document::{LabelSet, PhotoDocument};
use crate::error::AppError;
use crate::query::{LabelQuery, LABELS_FIELD};
use crate::search::{FieldKind, IndexSchema, Searcher, INDEX_NAME};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Document, Field, IndexRecordOption, Schema, Term, STORED, STRING};
use tantivy::{Index, IndexWriter, TantivyError};
use tokio::sync::Mutex;

/// Hidden field carrying the `bucket/objectKey` identity.
const ID_FIELD: &str = "photoId";
const WRITER_MEMORY_BYTES: usize = 15_000_000;

pub struct TantivySearcher {
    index_path: PathBuf,
    // Tantivy allows a single writer per index.
    write_lock: Mutex<()>,
}

impl TantivySearcher {
    pub fn new(config: &AppConfig) -> Self {
        Self::open(&config.tantivy_index_path)
    }

    pub fn open(index_path: impl AsRef<Path>) -> Self {
        let index_path = index_path.as_ref().to_path_buf();
        log::debug!("Initializing Tantivy searcher with index path: {:?}", index_path);
        Self { index_path, write_lock: Mutex::new(()) }
    }
}

fn build_schema(schema: &IndexSchema) -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field(ID_FIELD, STRING | STORED);
    for field in &schema.fields {
        match field.kind {
            // ISO-8601 instants sort lexically, so they are kept as raw strings.
            FieldKind::Keyword | FieldKind::Date => {
                schema_builder.add_text_field(field.name, STRING | STORED);
            }
        }
    }
    schema_builder.build()
}

fn field(schema: &Schema, name: &str) -> Result<Field, AppError> {
    schema
        .fields()
        .find(|(_, entry)| entry.name() == name)
        .map(|(field, _)| field)
        .ok_or_else(|| AppError::SearchEngine(format!("field '{}' missing from Tantivy schema", name)))
}

struct PhotoFields {
    id: Field,
    object_key: Field,
    bucket: Field,
    labels: Field,
    created_timestamp: Field,
}

impl PhotoFields {
    fn resolve(schema: &Schema) -> Result<Self, AppError> {
        Ok(Self {
            id: field(schema, ID_FIELD)?,
            object_key: field(schema, "objectKey")?,
            bucket: field(schema, "bucket")?,
            labels: field(schema, LABELS_FIELD)?,
            created_timestamp: field(schema, "createdTimestamp")?,
        })
    }

    fn to_document(&self, photo: &PhotoDocument) -> Document {
        let mut doc = Document::default();
        doc.add_text(self.id, &photo.identity());
        doc.add_text(self.object_key, &photo.object_key);
        doc.add_text(self.bucket, &photo.bucket);
        for label in &photo.labels {
            doc.add_text(self.labels, label);
        }
        doc.add_text(self.created_timestamp, &photo.created_timestamp);
        doc
    }

    fn to_photo(&self, doc: &Document) -> PhotoDocument {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_text())
                .unwrap_or("")
                .to_string()
        };
        let labels: LabelSet = doc
            .get_all(self.labels)
            .filter_map(|v| v.as_text())
            .map(|s| s.to_string())
            .collect();

        PhotoDocument {
            object_key: text(self.object_key),
            bucket: text(self.bucket),
            labels,
            created_timestamp: text(self.created_timestamp),
        }
    }
}

#[async_trait]
impl Searcher for TantivySearcher {
    async fn index_exists(&self) -> Result<bool, AppError> {
        let index_path = self.index_path.clone();

        tokio::task::spawn_blocking(move || {
            if !index_path.is_dir() {
                return Ok(false);
            }
            let directory = MmapDirectory::open(&index_path).map_err(TantivyError::from)?;
            let exists = Index::exists(&directory).map_err(TantivyError::from)?;
            log::debug!("Tantivy index at {:?} exists: {}", index_path, exists);
            Ok::<bool, AppError>(exists)
        })
        .await?
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), AppError> {
        let index_path = self.index_path.clone();
        let tantivy_schema = build_schema(schema);
        let _guard = self.write_lock.lock().await;

        tokio::task::spawn_blocking(move || {
            log::info!("Creating Tantivy index '{}' at {:?}", INDEX_NAME, index_path);
            std::fs::create_dir_all(&index_path)?;
            match Index::create_in_dir(&index_path, tantivy_schema) {
                Ok(_) => Ok::<(), AppError>(()),
                Err(TantivyError::IndexAlreadyExists) => {
                    Err(AppError::IndexAlreadyExists(INDEX_NAME.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn upsert_document(&self, document: &PhotoDocument) -> Result<(), AppError> {
        let index_path = self.index_path.clone();
        let photo = document.clone();
        let _guard = self.write_lock.lock().await;

        tokio::task::spawn_blocking(move || {
            let index = Index::open_in_dir(&index_path)?;
            let fields = PhotoFields::resolve(&index.schema())?;
            let id = photo.identity();
            log::debug!("Indexing document: {}", id);

            let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
            index_writer.delete_term(Term::from_field_text(fields.id, &id));
            index_writer.add_document(fields.to_document(&photo))?;
            index_writer.commit()?;
            log::trace!("Tantivy index writer committed document: {}", id);
            Ok::<(), AppError>(())
        })
        .await?
    }

    async fn search(&self, query: &LabelQuery) -> Result<Vec<PhotoDocument>, AppError> {
        let index_path = self.index_path.clone();
        let query = query.clone();

        tokio::task::spawn_blocking(move || {
            log::debug!("Searching Tantivy for labels: {:?}", query.keywords);
            let index = Index::open_in_dir(&index_path)?;
            let fields = PhotoFields::resolve(&index.schema())?;
            let searcher = index.reader()?.searcher();

            // A boolean query made only of `Should` clauses needs one of them to match.
            let clauses: Vec<(Occur, Box<dyn Query>)> = query
                .keywords
                .iter()
                .map(|keyword| {
                    let term = Term::from_field_text(fields.labels, keyword);
                    let clause: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                    (Occur::Should, clause)
                })
                .collect();
            let top_docs = searcher.search(&BooleanQuery::new(clauses), &TopDocs::with_limit(query.size))?;

            let mut photos = Vec::with_capacity(top_docs.len());
            for (_score, doc_address) in top_docs {
                let retrieved = searcher.doc(doc_address)?;
                photos.push(fields.to_photo(&retrieved));
            }
            log::debug!("Found {} photos in Tantivy for labels: {:?}", photos.len(), query.keywords);
            Ok::<Vec<PhotoDocument>, AppError>(photos)
        })
        .await?
    }
}
