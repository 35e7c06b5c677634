use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::{BulkWriteOutcome, ScoredDocument, UpsertBatch, VectorIndexSpec, VectorQuery};

/// Document store operations the sync pipeline relies on
///
/// Implementations own persisted identity and index state. The collection is
/// fixed when the store is constructed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of the search indexes defined on the collection.
    ///
    /// A collection that does not exist yet has no indexes and is not an error.
    async fn list_search_indexes(&self) -> VectorResult<Vec<String>>;

    /// Create a vector search index.
    ///
    /// Returns [`crate::VectorError::IndexAlreadyExists`] when the store reports a
    /// duplicate name.
    async fn create_vector_index(&self, spec: VectorIndexSpec) -> VectorResult<()>;

    /// Upsert every document of the batch in one bulk write, keyed by
    /// `batch.key_field`. Fails with [`crate::VectorError::StoreWrite`].
    async fn bulk_upsert(&self, batch: UpsertBatch) -> VectorResult<BulkWriteOutcome>;

    /// Nearest-neighbour search. Fails with [`crate::VectorError::IndexQuery`].
    async fn vector_search(&self, query: VectorQuery) -> VectorResult<Vec<ScoredDocument>>;
}
