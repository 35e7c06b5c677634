use std::sync::Arc;

use tokio::time::Instant;
use tracing::instrument;

use crate::context::VectorContext;
use crate::embedding::EmbeddingClient;
use crate::error::{VectorError, VectorResult};
use crate::events::{EventSink, SyncEvent};
use crate::models::{
    BulkWriteOutcome, Record, SkipReason, StoredDocument, UpsertBatch, UpsertSummary,
};
use crate::projector::TextProjector;
use crate::repository::DocumentStore;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Embeds records in bounded batches and upserts them by a unique key.
///
/// Batches run strictly one after another. Within a batch, invalid records are
/// dropped and reported one by one; an embedding or write failure fails only
/// that batch and the run moves on to the next one. Re-running is always safe
/// because writes are keyed, never appended.
pub struct BatchUpsertPipeline {
    store: Arc<dyn DocumentStore>,
    embeddings: EmbeddingClient,
    events: Arc<dyn EventSink>,
    projector: TextProjector,
    embedding_field: String,
    deadline: Option<Instant>,
}

/// Survivors of validation, with their projected texts aligned by index
struct ValidBatch {
    records: Vec<Record>,
    texts: Vec<String>,
}

impl BatchUpsertPipeline {
    pub fn new(context: &VectorContext, projector: TextProjector) -> Self {
        Self {
            store: Arc::clone(&context.store),
            embeddings: context.embeddings.clone(),
            events: Arc::clone(&context.events),
            projector,
            embedding_field: "embedding".to_string(),
            deadline: None,
        }
    }

    pub fn with_embedding_field(mut self, field: impl Into<String>) -> Self {
        self.embedding_field = field.into();
        self
    }

    /// Stop starting new batches once `deadline` has passed.
    ///
    /// A batch already in flight always finishes; committed batches are kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Upsert every record, `batch_size` at a time, in input order.
    ///
    /// Only a `batch_size` of zero is an error; everything else is reported
    /// through the summary and the event sink.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn upsert_all(
        &self,
        records: Vec<Record>,
        unique_key_field: &str,
        batch_size: usize,
    ) -> VectorResult<UpsertSummary> {
        if batch_size == 0 {
            return Err(VectorError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }

        let mut summary = UpsertSummary::default();
        if records.is_empty() {
            self.events.emit(SyncEvent::PipelineFinished { summary });
            return Ok(summary);
        }

        self.events.emit(SyncEvent::PipelineStarted {
            total: records.len(),
            batch_size,
        });

        for (index, chunk) in records.chunks(batch_size).enumerate() {
            let batch = index + 1;

            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                self.events.emit(SyncEvent::PipelineStopped { next_batch: batch });
                summary.stopped_early = true;
                break;
            }

            self.events.emit(SyncEvent::BatchStarted {
                batch,
                size: chunk.len(),
            });

            let valid = self.validate(batch, chunk, unique_key_field);
            summary.skipped += (chunk.len() - valid.records.len()) as u64;

            if valid.records.is_empty() {
                self.events.emit(SyncEvent::BatchEmpty { batch });
                continue;
            }

            let records_in_batch = valid.records.len();
            match self.process_batch(valid, unique_key_field).await {
                Ok(outcome) => {
                    summary.absorb(&outcome);
                    self.events.emit(SyncEvent::BatchCompleted {
                        batch,
                        upserted: outcome.upserted,
                        updated: outcome.matched,
                    });
                }
                Err(e) => {
                    summary.failed_batches += 1;
                    self.events.emit(SyncEvent::BatchFailed {
                        batch,
                        records: records_in_batch,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.events.emit(SyncEvent::PipelineFinished { summary });
        Ok(summary)
    }

    fn validate(&self, batch: usize, chunk: &[Record], unique_key_field: &str) -> ValidBatch {
        let mut valid = ValidBatch {
            records: Vec::with_capacity(chunk.len()),
            texts: Vec::with_capacity(chunk.len()),
        };

        for (position, record) in chunk.iter().enumerate() {
            let reason = if record.key_value(unique_key_field).is_none() {
                Some(SkipReason::MissingKey)
            } else {
                let text = self.projector.project(record);
                if text.trim().is_empty() {
                    Some(SkipReason::EmptyText)
                } else {
                    valid.records.push(record.clone());
                    valid.texts.push(text);
                    None
                }
            };

            if let Some(reason) = reason {
                self.events.emit(SyncEvent::RecordSkipped {
                    batch,
                    position,
                    identity: record.identity(unique_key_field),
                    reason,
                });
            }
        }

        valid
    }

    async fn process_batch(
        &self,
        valid: ValidBatch,
        unique_key_field: &str,
    ) -> VectorResult<BulkWriteOutcome> {
        let embeddings = self.embeddings.embed_many(&valid.texts).await?;

        let documents = valid
            .records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| {
                let key_value = record
                    .key_value(unique_key_field)
                    .cloned()
                    .ok_or_else(|| {
                        VectorError::Internal("validated record lost its key".to_string())
                    })?;
                Ok(StoredDocument {
                    key_value,
                    record,
                    embedding,
                })
            })
            .collect::<VectorResult<Vec<_>>>()?;

        self.store
            .bulk_upsert(UpsertBatch {
                key_field: unique_key_field.to_string(),
                embedding_field: self.embedding_field.clone(),
                documents,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::events::MemoryEventSink;
    use crate::models::{EmbeddingModel, EmbeddingResult};
    use crate::repository::MockDocumentStore;
    use std::time::Duration;

    fn user(name: &str, email: &str) -> Record {
        Record::new().with("name", name).with("email", email)
    }

    fn provider_returning_ones() -> MockEmbeddingProvider {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_name().return_const("mock");
        provider.expect_embed_batch().returning(|_, _, texts| {
            Ok(texts
                .iter()
                .map(|_| EmbeddingResult {
                    values: vec![1.0, 0.0],
                    dimension: 2,
                    tokens_used: 1,
                })
                .collect())
        });
        provider
    }

    fn pipeline(
        store: MockDocumentStore,
        provider: MockEmbeddingProvider,
        sink: Arc<MemoryEventSink>,
    ) -> BatchUpsertPipeline {
        let embeddings = EmbeddingClient::new(Arc::new(provider), EmbeddingModel::default())
            .with_dimensions(2);
        let context = VectorContext::new(Arc::new(store), embeddings).with_events(sink);
        BatchUpsertPipeline::new(&context, TextProjector::default())
    }

    fn inserted_all(batch: &UpsertBatch) -> BulkWriteOutcome {
        BulkWriteOutcome {
            upserted: batch.documents.len() as u64,
            matched: 0,
            modified: 0,
        }
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_config_error() {
        let sink = Arc::new(MemoryEventSink::new());
        let pipeline = pipeline(MockDocumentStore::new(), MockEmbeddingProvider::new(), sink);

        let err = pipeline
            .upsert_all(vec![user("Ana", "ana@x.com")], "email", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let mut store = MockDocumentStore::new();
        store.expect_bulk_upsert().times(0);
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed_batch().times(0);

        let sink = Arc::new(MemoryEventSink::new());
        let summary = pipeline(store, provider, sink)
            .upsert_all(vec![], "email", DEFAULT_BATCH_SIZE)
            .await
            .unwrap();

        assert_eq!(summary, UpsertSummary::default());
    }

    #[tokio::test]
    async fn test_single_record_missing_key_triggers_no_calls() {
        let mut store = MockDocumentStore::new();
        store.expect_bulk_upsert().times(0);
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed_batch().times(0);

        let sink = Arc::new(MemoryEventSink::new());
        let summary = pipeline(store, provider, sink.clone())
            .upsert_all(vec![Record::new().with("name", "No Mail")], "email", 10)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.upserted, 0);
        assert!(sink.events().contains(&SyncEvent::RecordSkipped {
            batch: 1,
            position: 0,
            identity: "No Mail".to_string(),
            reason: SkipReason::MissingKey,
        }));
        assert!(sink.events().contains(&SyncEvent::BatchEmpty { batch: 1 }));
    }

    #[tokio::test]
    async fn test_invalid_records_are_dropped_individually() {
        let mut store = MockDocumentStore::new();
        store
            .expect_bulk_upsert()
            .withf(|batch| {
                batch.key_field == "email"
                    && batch.embedding_field == "embedding"
                    && batch.documents.len() == 1
                    && batch.documents[0].key_value == serde_json::json!("ana@x.com")
            })
            .times(1)
            .returning(|batch| Ok(inserted_all(&batch)));

        let mut provider = MockEmbeddingProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_embed_batch()
            .withf(|_, _, texts| texts.len() == 1 && texts[0] == "Ana Silva. ana@x.com")
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![EmbeddingResult {
                    values: vec![0.6, 0.8],
                    dimension: 2,
                    tokens_used: 3,
                }])
            });

        let records = vec![
            Record::new().with("name", "Sem Email"),
            user("Ana Silva", "ana@x.com"),
            Record::new().with("name", "Blank Key").with("email", "  "),
        ];

        let sink = Arc::new(MemoryEventSink::new());
        let summary = pipeline(store, provider, sink.clone())
            .upsert_all(records, "email", 10)
            .await
            .unwrap();

        assert_eq!(summary.upserted, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(
            sink.count(|e| matches!(e, SyncEvent::RecordSkipped { .. })),
            2
        );
    }

    #[tokio::test]
    async fn test_empty_projection_is_skipped() {
        let mut store = MockDocumentStore::new();
        store.expect_bulk_upsert().times(0);
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed_batch().times(0);

        let projector = TextProjector::new(["name"]);
        let embeddings = EmbeddingClient::new(Arc::new(provider), EmbeddingModel::default());
        let sink = Arc::new(MemoryEventSink::new());
        let context =
            VectorContext::new(Arc::new(store), embeddings).with_events(sink.clone());
        let pipeline = BatchUpsertPipeline::new(&context, projector);

        let summary = pipeline
            .upsert_all(
                vec![Record::new().with("email", "x@x.com").with("name", " ")],
                "email",
                5,
            )
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            SyncEvent::RecordSkipped {
                reason: SkipReason::EmptyText,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_records_are_split_into_bounded_batches() {
        let mut store = MockDocumentStore::new();
        store
            .expect_bulk_upsert()
            .withf(|batch| batch.documents.len() <= 2)
            .times(3)
            .returning(|batch| Ok(inserted_all(&batch)));

        let records = (0..5)
            .map(|i| user(&format!("User {}", i), &format!("user{}@x.com", i)))
            .collect();

        let sink = Arc::new(MemoryEventSink::new());
        let summary = pipeline(store, provider_returning_ones(), sink.clone())
            .upsert_all(records, "email", 2)
            .await
            .unwrap();

        assert_eq!(summary.upserted, 5);
        assert_eq!(
            sink.count(|e| matches!(e, SyncEvent::BatchCompleted { .. })),
            3
        );
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_run() {
        let mut store = MockDocumentStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_bulk_upsert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(VectorError::StoreWrite("E11000 duplicate key".to_string())));
        store
            .expect_bulk_upsert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|batch| {
                Ok(BulkWriteOutcome {
                    upserted: 0,
                    matched: batch.documents.len() as u64,
                    modified: 1,
                })
            });

        let records = vec![
            user("A", "a@x.com"),
            user("B", "b@x.com"),
            user("C", "c@x.com"),
        ];

        let sink = Arc::new(MemoryEventSink::new());
        let summary = pipeline(store, provider_returning_ones(), sink.clone())
            .upsert_all(records, "email", 2)
            .await
            .unwrap();

        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.updated, 1);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            SyncEvent::BatchFailed { batch: 1, records: 2, error } if error.contains("E11000")
        )));
    }

    #[tokio::test]
    async fn test_embedding_failure_fails_only_that_batch() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_name().return_const("mock");
        let mut seq = mockall::Sequence::new();
        provider
            .expect_embed_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(VectorError::EmbeddingProvider("timeout".to_string())));
        provider
            .expect_embed_batch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, texts| {
                Ok(texts
                    .iter()
                    .map(|_| EmbeddingResult {
                        values: vec![0.0, 1.0],
                        dimension: 2,
                        tokens_used: 1,
                    })
                    .collect())
            });

        let mut store = MockDocumentStore::new();
        store
            .expect_bulk_upsert()
            .times(1)
            .returning(|batch| Ok(inserted_all(&batch)));

        let sink = Arc::new(MemoryEventSink::new());
        let summary = pipeline(store, provider, sink)
            .upsert_all(vec![user("A", "a@x.com"), user("B", "b@x.com")], "email", 1)
            .await
            .unwrap();

        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.upserted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_passed_deadline_stops_before_next_batch() {
        let mut store = MockDocumentStore::new();
        store.expect_bulk_upsert().times(0);
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed_batch().times(0);

        let sink = Arc::new(MemoryEventSink::new());
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_millis(1)).await;

        let summary = pipeline(store, provider, sink.clone())
            .with_deadline(deadline)
            .upsert_all(vec![user("A", "a@x.com")], "email", 1)
            .await
            .unwrap();

        assert!(summary.stopped_early);
        assert!(sink
            .events()
            .contains(&SyncEvent::PipelineStopped { next_batch: 1 }));
    }
}
