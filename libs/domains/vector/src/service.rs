use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::{SyncSettings, VectorStoreConfig};
use crate::context::VectorContext;
use crate::error::VectorResult;
use crate::index::IndexProvisioner;
use crate::models::{Record, SearchHit, UpsertSummary};
use crate::pipeline::BatchUpsertPipeline;
use crate::projector::TextProjector;
use crate::search::SimilaritySearcher;

/// The two user-facing flows: sync a record set, search it
///
/// Combines index provisioning, the batch pipeline and the searcher behind the
/// configured key field, batch size and search knobs.
pub struct VectorSyncService {
    provisioner: IndexProvisioner,
    pipeline: BatchUpsertPipeline,
    searcher: SimilaritySearcher,
    store_config: VectorStoreConfig,
    settings: SyncSettings,
}

impl VectorSyncService {
    pub fn new(
        context: &VectorContext,
        store_config: VectorStoreConfig,
        settings: SyncSettings,
    ) -> Self {
        let projector = TextProjector::new(settings.text_fields.iter().cloned());

        Self {
            provisioner: IndexProvisioner::new(context),
            pipeline: BatchUpsertPipeline::new(context, projector)
                .with_embedding_field(&store_config.embedding_field),
            searcher: SimilaritySearcher::new(
                context,
                &store_config.index_name,
                &store_config.embedding_field,
            ),
            store_config,
            settings,
        }
    }

    /// Stop the sync from starting new batches after `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.pipeline = self.pipeline.with_deadline(deadline);
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Ensure the vector index, then upsert every record.
    ///
    /// An index that could not be provisioned is logged and ingestion goes on;
    /// stored documents become searchable once the index exists.
    #[instrument(
        skip(self, records),
        fields(records = records.len(), collection = %self.store_config.collection)
    )]
    pub async fn sync(&self, records: Vec<Record>) -> VectorResult<UpsertSummary> {
        let outcome = self
            .provisioner
            .ensure_index(&self.store_config.index_spec())
            .await;
        if !outcome.is_available() {
            warn!(?outcome, "Continuing without a confirmed vector index");
        }

        let summary = self
            .pipeline
            .upsert_all(records, &self.settings.unique_key, self.settings.batch_size)
            .await?;

        info!(
            upserted = summary.upserted,
            updated = summary.updated,
            "Records synchronized"
        );
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> VectorResult<Vec<SearchHit>> {
        self.searcher
            .search(
                query,
                &self.settings.display_field,
                self.settings.top_k,
                self.settings.num_candidates,
            )
            .await
    }
}
