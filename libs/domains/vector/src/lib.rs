//! Vector Domain Library
//!
//! Embeds directory-style records and keeps them in a MongoDB collection with
//! Atlas vector search, then answers free-text similarity queries against it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ VectorSyncService │  ← sync(records), search(text)
//! └─────────┬─────────┘
//!           │
//!   ┌───────┼──────────────────┬───────────────────┐
//!   │       │                  │                   │
//! ┌─▼───────▼────────┐ ┌───────▼────────┐ ┌────────▼──────────┐
//! │ IndexProvisioner │ │BatchUpsertPipe.│ │ SimilaritySearcher│
//! └────────┬─────────┘ └──┬──────────┬──┘ └──┬─────────────┬──┘
//!          │              │          │       │             │
//! ┌────────▼──────────────▼──┐  ┌────▼───────▼──────┐ ┌────▼──────┐
//! │ DocumentStore (trait)    │  │ EmbeddingClient   │ │ EventSink │
//! │ └ MongoDocumentStore     │  │ └ OpenAIProvider  │ └───────────┘
//! └──────────────────────────┘  └───────────────────┘
//! ```
//!
//! Every component gets its handles from one [`VectorContext`] built at
//! startup and reports progress as [`SyncEvent`]s.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use core_config::FromEnv;
//! use domain_vector::{
//!     EmbeddingClient, MongoDocumentStore, OpenAIProvider, Record, SyncSettings,
//!     VectorContext, VectorStoreConfig, VectorSyncService,
//! };
//!
//! # async fn example(db: mongodb::Database) -> Result<(), Box<dyn std::error::Error>> {
//! let store_config = VectorStoreConfig::from_env()?;
//! let store = MongoDocumentStore::new(&db, &store_config.collection);
//! let embeddings = EmbeddingClient::new(Arc::new(OpenAIProvider::from_env()?), store_config.model)
//!     .with_dimensions(store_config.dimensions);
//!
//! let context = VectorContext::new(Arc::new(store), embeddings);
//! let service = VectorSyncService::new(&context, store_config, SyncSettings::from_env()?);
//!
//! let summary = service
//!     .sync(vec![Record::new().with("name", "Ana Silva").with("email", "ana@x.com")])
//!     .await?;
//! let hits = service.search("Ana").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod events;
pub mod index;
pub mod models;
pub mod mongodb;
pub mod pipeline;
pub mod projector;
pub mod repository;
pub mod search;
pub mod service;

// Re-export commonly used types
pub use config::{SyncSettings, VectorStoreConfig};
pub use context::VectorContext;
pub use embedding::{EmbeddingClient, EmbeddingProvider, OpenAIConfig, OpenAIProvider};
pub use error::{VectorError, VectorResult};
pub use events::{EventSink, MemoryEventSink, SyncEvent, TracingEventSink};
pub use index::IndexProvisioner;
pub use models::{
    BulkWriteOutcome, DistanceMetric, Embedding, EmbeddingModel, EmbeddingResult, IndexOutcome,
    Record, ScoredDocument, SearchHit, SkipReason, StoredDocument, UpsertBatch, UpsertSummary,
    VectorIndexSpec, VectorQuery,
};
pub use self::mongodb::MongoDocumentStore;
pub use pipeline::{BatchUpsertPipeline, DEFAULT_BATCH_SIZE};
pub use projector::TextProjector;
pub use repository::DocumentStore;
pub use search::{DEFAULT_NUM_CANDIDATES, DEFAULT_TOP_K, SimilaritySearcher};
pub use service::VectorSyncService;
