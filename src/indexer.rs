use crate::document::{LabelSet, PhotoDocument};
use crate::error::AppError;
use crate::search::Searcher;

/// Writes the photo under its `bucket/objectKey` identity, replacing any
/// earlier version. Returns once the document is searchable.
pub async fn index_photo(
    searcher: &dyn Searcher,
    bucket: &str,
    object_key: &str,
    labels: LabelSet,
) -> Result<PhotoDocument, AppError> {
    let document = PhotoDocument::new(bucket, object_key, labels);
    log::debug!("Final labels for {}: {:?}", document.identity(), document.labels);

    searcher.upsert_document(&document).await?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySearcher;

    fn set(labels: &[&str]) -> LabelSet {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reindexing_overwrites() {
        let searcher = MemorySearcher::with_index();

        index_photo(&searcher, "b", "photos/img1.jpg", set(&["beach"])).await.unwrap();
        index_photo(&searcher, "b", "photos/img1.jpg", set(&["mountain", "snow"])).await.unwrap();
        index_photo(&searcher, "other", "photos/img1.jpg", set(&["beach"])).await.unwrap();

        let docs = searcher.documents().await;
        assert_eq!(docs.len(), 2);
        let img1 = docs.iter().find(|d| d.identity() == "b/photos/img1.jpg").unwrap();
        assert_eq!(img1.labels, set(&["mountain", "snow"]));
    }

    #[tokio::test]
    async fn test_write_failure_is_returned() {
        let searcher = MemorySearcher::with_index()
            .configure(|s| { s.failing_identities.insert("b/k.jpg".to_string()); });

        let result = index_photo(&searcher, "b", "k.jpg", set(&["cat"])).await;
        assert!(matches!(result, Err(AppError::SearchEngine(_))));
        assert!(searcher.documents().await.is_empty());
    }
}
