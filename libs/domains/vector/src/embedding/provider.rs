use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::{EmbeddingModel, EmbeddingResult};

/// Trait for embedding generation providers
///
/// `embed_batch` must return one result per input text, in input order.
/// `dimensions` asks for shortened vectors; `None` means the model's native size.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Generate embedding for a single text
    async fn embed(
        &self,
        model: EmbeddingModel,
        dimensions: Option<u32>,
        text: &str,
    ) -> VectorResult<EmbeddingResult>;

    /// Generate embeddings for multiple texts in one request
    async fn embed_batch(
        &self,
        model: EmbeddingModel,
        dimensions: Option<u32>,
        texts: &[String],
    ) -> VectorResult<Vec<EmbeddingResult>>;
}
