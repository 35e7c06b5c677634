//! Structured progress events
//!
//! Every component reports through an injected [`EventSink`] instead of writing
//! to the console. Production wiring uses [`TracingEventSink`]; tests use
//! [`MemoryEventSink`] and assert on what was emitted.

use std::sync::{Mutex, PoisonError};

use tracing::{error, info, warn};

use crate::models::{SkipReason, UpsertSummary};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    PipelineStarted {
        total: usize,
        batch_size: usize,
    },
    BatchStarted {
        batch: usize,
        size: usize,
    },
    RecordSkipped {
        batch: usize,
        position: usize,
        identity: String,
        reason: SkipReason,
    },
    /// Every record in the batch was invalid; no provider call was made
    BatchEmpty {
        batch: usize,
    },
    BatchCompleted {
        batch: usize,
        upserted: u64,
        updated: u64,
    },
    BatchFailed {
        batch: usize,
        records: usize,
        error: String,
    },
    /// The run deadline passed before `next_batch` started
    PipelineStopped {
        next_batch: usize,
    },
    PipelineFinished {
        summary: UpsertSummary,
    },
    IndexPresent {
        name: String,
    },
    IndexCreated {
        name: String,
    },
    IndexAlreadyExists {
        name: String,
    },
    IndexListFailed {
        name: String,
        error: String,
    },
    IndexCreateFailed {
        name: String,
        error: String,
    },
    SearchCompleted {
        query: String,
        hits: usize,
    },
}

/// Destination for [`SyncEvent`]s
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Forwards events to `tracing` with structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: SyncEvent) {
        match event {
            SyncEvent::PipelineStarted { total, batch_size } => {
                info!(total, batch_size, "Processing records in batches")
            }
            SyncEvent::BatchStarted { batch, size } => info!(batch, size, "Processing batch"),
            SyncEvent::RecordSkipped {
                batch,
                position,
                identity,
                reason,
            } => warn!(batch, position, %identity, %reason, "Record skipped"),
            SyncEvent::BatchEmpty { batch } => info!(batch, "No valid records in batch"),
            SyncEvent::BatchCompleted {
                batch,
                upserted,
                updated,
            } => info!(batch, upserted, updated, "Batch completed"),
            SyncEvent::BatchFailed {
                batch,
                records,
                error,
            } => error!(batch, records, %error, "Batch failed, continuing with next batch"),
            SyncEvent::PipelineStopped { next_batch } => {
                warn!(next_batch, "Deadline reached, remaining batches not processed")
            }
            SyncEvent::PipelineFinished { summary } => info!(
                upserted = summary.upserted,
                updated = summary.updated,
                skipped = summary.skipped,
                failed_batches = summary.failed_batches,
                "Sync finished"
            ),
            SyncEvent::IndexPresent { name } => {
                info!(index = %name, "Vector index already exists, skipping creation")
            }
            SyncEvent::IndexCreated { name } => info!(index = %name, "Vector index created"),
            SyncEvent::IndexAlreadyExists { name } => {
                info!(index = %name, "Vector index was created concurrently")
            }
            SyncEvent::IndexListFailed { name, error } => warn!(
                index = %name,
                %error,
                "Could not list search indexes, assuming the index is absent"
            ),
            SyncEvent::IndexCreateFailed { name, error } => {
                error!(index = %name, %error, "Vector index creation failed")
            }
            SyncEvent::SearchCompleted { query, hits } => {
                info!(%query, hits, "Similarity search completed")
            }
        }
    }
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryEventSink::new();
        sink.emit(SyncEvent::BatchStarted { batch: 1, size: 2 });
        sink.emit(SyncEvent::BatchEmpty { batch: 1 });

        assert_eq!(
            sink.events(),
            vec![
                SyncEvent::BatchStarted { batch: 1, size: 2 },
                SyncEvent::BatchEmpty { batch: 1 },
            ]
        );
        assert_eq!(
            sink.count(|e| matches!(e, SyncEvent::BatchEmpty { .. })),
            1
        );
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingEventSink;
        sink.emit(SyncEvent::PipelineFinished {
            summary: UpsertSummary::default(),
        });
        sink.emit(SyncEvent::IndexListFailed {
            name: "vector_index".to_string(),
            error: "timeout".to_string(),
        });
    }
}
