use std::sync::Arc;

use crate::embedding::EmbeddingClient;
use crate::events::{EventSink, TracingEventSink};
use crate::repository::DocumentStore;

/// Long-lived handles shared by every component of a run
///
/// Built once at process start; components clone the `Arc`s they need.
#[derive(Clone)]
pub struct VectorContext {
    pub store: Arc<dyn DocumentStore>,
    pub embeddings: EmbeddingClient,
    pub events: Arc<dyn EventSink>,
}

impl VectorContext {
    /// Context that reports through `tracing`
    pub fn new(store: Arc<dyn DocumentStore>, embeddings: EmbeddingClient) -> Self {
        Self {
            store,
            embeddings,
            events: Arc::new(TracingEventSink),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }
}
