use crate::error::AppError;
use crate::search::{IndexSchema, Searcher, INDEX_NAME};

/// Creates the photo index when it is missing.
///
/// Existence check and creation are not atomic: a concurrent invocation may
/// create the index in between, which counts as success.
pub async fn ensure_index(searcher: &dyn Searcher) -> Result<(), AppError> {
    if searcher.index_exists().await? {
        log::debug!("Index '{}' exists", INDEX_NAME);
        return Ok(());
    }

    log::info!("Index '{}' missing. Creating...", INDEX_NAME);
    match searcher.create_index(&IndexSchema::photos()).await {
        Ok(()) => {
            log::info!("Index '{}' created", INDEX_NAME);
            Ok(())
        }
        Err(AppError::IndexAlreadyExists(name)) => {
            log::info!("Index '{}' was created by a concurrent invocation", name);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
