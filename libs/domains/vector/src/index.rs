use std::sync::Arc;

use tracing::instrument;

use crate::context::VectorContext;
use crate::error::VectorError;
use crate::events::{EventSink, SyncEvent};
use crate::models::{IndexOutcome, VectorIndexSpec};
use crate::repository::DocumentStore;

/// Makes sure the vector index exists before anything searches it.
///
/// Check-then-create is not atomic. Two processes may both see the index as
/// missing; the loser's create then fails with "already exists", which is
/// treated as success. No locking is attempted.
pub struct IndexProvisioner {
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventSink>,
}

impl IndexProvisioner {
    pub fn new(context: &VectorContext) -> Self {
        Self {
            store: Arc::clone(&context.store),
            events: Arc::clone(&context.events),
        }
    }

    /// Never fails: every problem is reported and folded into the outcome.
    #[instrument(skip(self), fields(index = %spec.name))]
    pub async fn ensure_index(&self, spec: &VectorIndexSpec) -> IndexOutcome {
        match self.store.list_search_indexes().await {
            Ok(names) if names.iter().any(|name| name == &spec.name) => {
                self.events.emit(SyncEvent::IndexPresent {
                    name: spec.name.clone(),
                });
                return IndexOutcome::AlreadyPresent;
            }
            Ok(_) => {}
            // Optimistic: a redundant create is absorbed below
            Err(e) => self.events.emit(SyncEvent::IndexListFailed {
                name: spec.name.clone(),
                error: e.to_string(),
            }),
        }

        match self.store.create_vector_index(spec.clone()).await {
            Ok(()) => {
                self.events.emit(SyncEvent::IndexCreated {
                    name: spec.name.clone(),
                });
                IndexOutcome::Created
            }
            Err(VectorError::IndexAlreadyExists(_)) => {
                self.events.emit(SyncEvent::IndexAlreadyExists {
                    name: spec.name.clone(),
                });
                IndexOutcome::AlreadyExists
            }
            Err(e) => {
                let error = e.to_string();
                self.events.emit(SyncEvent::IndexCreateFailed {
                    name: spec.name.clone(),
                    error: error.clone(),
                });
                IndexOutcome::Failed(error)
            }
        }
    }
}
