use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::context::VectorContext;
use crate::embedding::EmbeddingClient;
use crate::error::{VectorError, VectorResult};
use crate::events::{EventSink, SyncEvent};
use crate::models::{SearchHit, VectorQuery};
use crate::repository::DocumentStore;

pub const DEFAULT_TOP_K: u32 = 3;
pub const DEFAULT_NUM_CANDIDATES: u32 = 100;

/// Free-text nearest-neighbour search over the stored embeddings
pub struct SimilaritySearcher {
    store: Arc<dyn DocumentStore>,
    embeddings: EmbeddingClient,
    events: Arc<dyn EventSink>,
    index_name: String,
    embedding_field: String,
}

impl SimilaritySearcher {
    pub fn new(
        context: &VectorContext,
        index_name: impl Into<String>,
        embedding_field: impl Into<String>,
    ) -> Self {
        Self {
            store: Arc::clone(&context.store),
            embeddings: context.embeddings.clone(),
            events: Arc::clone(&context.events),
            index_name: index_name.into(),
            embedding_field: embedding_field.into(),
        }
    }

    /// Up to `top_k` hits, best first.
    ///
    /// Hits never carry the embedding field. `label` holds `projected_field`
    /// when the matched document has it as a string.
    #[instrument(skip(self), fields(index = %self.index_name))]
    pub async fn search(
        &self,
        query_text: &str,
        projected_field: &str,
        top_k: u32,
        num_candidates: u32,
    ) -> VectorResult<Vec<SearchHit>> {
        if query_text.trim().is_empty() {
            return Err(VectorError::Validation(
                "search text must not be empty".to_string(),
            ));
        }
        if top_k == 0 {
            return Err(VectorError::Validation(
                "top_k must be at least 1".to_string(),
            ));
        }
        if num_candidates < top_k {
            return Err(VectorError::Validation(format!(
                "num_candidates ({}) must be at least top_k ({})",
                num_candidates, top_k
            )));
        }

        let vector = self.embeddings.embed_one(query_text).await?;

        let mut documents = self
            .store
            .vector_search(VectorQuery {
                index_name: self.index_name.clone(),
                path: self.embedding_field.clone(),
                vector,
                num_candidates,
                limit: top_k,
            })
            .await?;

        // Stable: equal scores keep the store's order
        documents.sort_by(|a, b| b.score.total_cmp(&a.score));
        documents.truncate(top_k as usize);

        let hits: Vec<SearchHit> = documents
            .into_iter()
            .map(|mut document| {
                document.fields.remove(&self.embedding_field);
                let label = match document.fields.get(projected_field) {
                    Some(Value::String(s)) => Some(s.clone()),
                    _ => None,
                };
                SearchHit {
                    score: document.score,
                    label,
                    fields: document.fields,
                }
            })
            .collect();

        self.events.emit(SyncEvent::SearchCompleted {
            query: query_text.to_string(),
            hits: hits.len(),
        });

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::events::MemoryEventSink;
    use crate::models::{EmbeddingModel, EmbeddingResult, ScoredDocument};
    use crate::repository::MockDocumentStore;
    use serde_json::{Map, json};

    fn provider() -> MockEmbeddingProvider {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed().returning(|_, _, _| {
            Ok(EmbeddingResult {
                values: vec![0.6, 0.8],
                dimension: 2,
                tokens_used: 2,
            })
        });
        provider
    }

    fn searcher(
        store: MockDocumentStore,
        provider: MockEmbeddingProvider,
        sink: Arc<MemoryEventSink>,
    ) -> SimilaritySearcher {
        let embeddings = EmbeddingClient::new(Arc::new(provider), EmbeddingModel::default())
            .with_dimensions(2);
        let context = VectorContext::new(Arc::new(store), embeddings).with_events(sink);
        SimilaritySearcher::new(&context, "vector_index", "embedding")
    }

    fn scored(score: f64, fields: Value) -> ScoredDocument {
        let fields: Map<String, Value> = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ScoredDocument { score, fields }
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected_before_embedding() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed().times(0);
        let mut store = MockDocumentStore::new();
        store.expect_vector_search().times(0);

        let sink = Arc::new(MemoryEventSink::new());
        let err = searcher(store, provider, sink)
            .search("   ", "name", DEFAULT_TOP_K, DEFAULT_NUM_CANDIDATES)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_limits_are_rejected() {
        let sink = Arc::new(MemoryEventSink::new());
        let searcher = searcher(MockDocumentStore::new(), MockEmbeddingProvider::new(), sink);

        assert!(matches!(
            searcher.search("ana", "name", 0, 100).await,
            Err(VectorError::Validation(_))
        ));
        assert!(matches!(
            searcher.search("ana", "name", 5, 4).await,
            Err(VectorError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_query_is_built_from_settings() {
        let mut store = MockDocumentStore::new();
        store
            .expect_vector_search()
            .withf(|query| {
                query.index_name == "vector_index"
                    && query.path == "embedding"
                    && query.vector == vec![0.6, 0.8]
                    && query.limit == 3
                    && query.num_candidates == 100
            })
            .times(1)
            .returning(|_| Ok(vec![]));

        let sink = Arc::new(MemoryEventSink::new());
        let hits = searcher(store, provider(), sink.clone())
            .search("ana", "name", DEFAULT_TOP_K, DEFAULT_NUM_CANDIDATES)
            .await
            .unwrap();

        assert!(hits.is_empty());
        assert_eq!(
            sink.events(),
            vec![SyncEvent::SearchCompleted {
                query: "ana".to_string(),
                hits: 0
            }]
        );
    }

    #[tokio::test]
    async fn test_hits_are_sorted_labeled_and_stripped() {
        let mut store = MockDocumentStore::new();
        store.expect_vector_search().returning(|_| {
            Ok(vec![
                scored(0.71, json!({"name": "Bruno", "embedding": [0.1, 0.2]})),
                scored(0.93, json!({"name": "Ana Silva", "email": "ana@x.com"})),
                scored(0.71, json!({"email": "carla@x.com"})),
            ])
        });

        let sink = Arc::new(MemoryEventSink::new());
        let hits = searcher(store, provider(), sink)
            .search("Ana", "name", 3, 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].label.as_deref(), Some("Ana Silva"));
        assert_eq!(hits[1].label.as_deref(), Some("Bruno"));
        assert_eq!(hits[2].label, None);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits.iter().all(|hit| !hit.fields.contains_key("embedding")));
    }

    #[tokio::test]
    async fn test_result_is_capped_at_top_k() {
        let mut store = MockDocumentStore::new();
        store.expect_vector_search().returning(|_| {
            Ok((0..5)
                .map(|i| scored(i as f64 / 10.0, json!({"name": format!("User {}", i)})))
                .collect())
        });

        let sink = Arc::new(MemoryEventSink::new());
        let hits = searcher(store, provider(), sink)
            .search("user", "name", 2, 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].label.as_deref(), Some("User 4"));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockDocumentStore::new();
        store
            .expect_vector_search()
            .returning(|_| Err(VectorError::IndexQuery("index not found".to_string())));

        let sink = Arc::new(MemoryEventSink::new());
        let err = searcher(store, provider(), sink)
            .search("ana", "name", 3, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::IndexQuery(_)));
    }
}
