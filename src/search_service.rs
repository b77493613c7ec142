use crate::document::PhotoDocument;
use crate::error::AppError;
use crate::keywords::KeywordExtractor;
use crate::query::LabelQuery;
use crate::search::Searcher;
use std::sync::Arc;

/// Free-text photo search over indexed labels.
pub struct PhotoSearch {
    extractor: KeywordExtractor,
    searcher: Arc<dyn Searcher>,
}

impl PhotoSearch {
    pub fn new(extractor: KeywordExtractor, searcher: Arc<dyn Searcher>) -> Self {
        Self { extractor, searcher }
    }

    /// Empty queries and queries without usable keywords return no photos
    /// without touching the index. Engine failures are returned as errors.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<PhotoDocument>, AppError> {
        let query = match query {
            Some(q) if !q.is_empty() => q,
            _ => {
                log::debug!("Empty search query");
                return Ok(Vec::new());
            }
        };

        let keywords = self.extractor.extract(query).await;
        log::info!("Extracted keywords for {:?}: {:?}", query, keywords);

        let label_query = match LabelQuery::from_keywords(&keywords) {
            Some(label_query) => label_query,
            None => return Ok(Vec::new()),
        };

        self.searcher.search(&label_query).await
    }
}
