//! Sample data loaded into empty collections on first startup.
//!
//! The sample records are embedded at compile time using `include_str!`.
//! A collection that already holds any record is left untouched, so running
//! the bootstrap on every start is safe.

use stockpile_core::{CREATED_AT_FIELD, Product, Resource, Task, Validate};
use stockpile_storage::{DynDocumentStore, StorageError};
use thiserror::Error;
use tracing::info;

use crate::repository::{CachedRepository, RepositoryError, stamped_fields};
use crate::server::AppState;

const SAMPLE_PRODUCTS: (&str, &str) = ("products.json", include_str!("../seed/products.json"));
const SAMPLE_TASKS: (&str, &str) = ("tasks.json", include_str!("../seed/tasks.json"));

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to parse embedded {file}: {source}")]
    Parse {
        file: &'static str,
        source: serde_json::Error,
    },
    #[error("invalid record in embedded {file}: {source}")]
    Invalid {
        file: &'static str,
        source: RepositoryError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Number of records inserted per collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapStats {
    pub products: usize,
    pub tasks: usize,
}

pub async fn seed_sample_data(state: &AppState) -> Result<BootstrapStats, BootstrapError> {
    Ok(BootstrapStats {
        products: seed_collection::<Product>(&state.store, &state.products, SAMPLE_PRODUCTS)
            .await?,
        tasks: seed_collection::<Task>(&state.store, &state.tasks, SAMPLE_TASKS).await?,
    })
}

async fn seed_collection<R: Resource>(
    store: &DynDocumentStore,
    repository: &CachedRepository<R>,
    (file, content): (&'static str, &'static str),
) -> Result<usize, BootstrapError> {
    if store.count(R::COLLECTION).await? > 0 {
        info!(collection = R::COLLECTION, "collection not empty, skipping sample data");
        return Ok(0);
    }

    let inputs: Vec<R::Input> =
        serde_json::from_str(content).map_err(|source| BootstrapError::Parse { file, source })?;

    for input in &inputs {
        input
            .validate()
            .map_err(|e| BootstrapError::Invalid {
                file,
                source: e.into(),
            })?;
        let fields = stamped_fields(input, CREATED_AT_FIELD)
            .map_err(|source| BootstrapError::Invalid { file, source })?;
        store.insert(R::COLLECTION, &fields).await?;
    }

    // Records were written behind the coordinator's back.
    repository.invalidate_collection().await;
    info!(
        collection = R::COLLECTION,
        count = inputs.len(),
        "loaded sample data"
    );
    Ok(inputs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_core::{ProductInput, TaskInput};

    #[test]
    fn embedded_samples_parse_and_validate() {
        let products: Vec<ProductInput> = serde_json::from_str(SAMPLE_PRODUCTS.1).unwrap();
        assert_eq!(products.len(), 5);
        assert!(products.iter().all(|p| p.validate().is_ok()));

        let tasks: Vec<TaskInput> = serde_json::from_str(SAMPLE_TASKS.1).unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.validate().is_ok()));
        assert_eq!(tasks.iter().filter(|t| t.completed).count(), 1);
    }
}
