use std::sync::Arc;

use tracing::debug;

use super::EmbeddingProvider;
use crate::error::{VectorError, VectorResult};
use crate::models::{Embedding, EmbeddingModel, EmbeddingResult};

/// Turns texts into fixed-length embeddings through an [`EmbeddingProvider`].
///
/// A call either returns one embedding per input, in input order, or fails as a
/// whole with [`VectorError::EmbeddingProvider`]; partial results are never returned.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    model: EmbeddingModel,
    dimensions: u32,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, model: EmbeddingModel) -> Self {
        Self {
            provider,
            model,
            dimensions: model.dimension(),
        }
    }

    /// Ask for shortened vectors; the provider is told the same length it is checked against
    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn model(&self) -> EmbeddingModel {
        self.model
    }

    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    pub async fn embed_one(&self, text: &str) -> VectorResult<Embedding> {
        let result = self
            .provider
            .embed(self.model, self.requested_dimensions(), text)
            .await
            .map_err(as_provider_error)?;
        self.check_dimension(result, 0)
    }

    pub async fn embed_many(&self, texts: &[String]) -> VectorResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let results = self
            .provider
            .embed_batch(self.model, self.requested_dimensions(), texts)
            .await
            .map_err(as_provider_error)?;

        if results.len() != texts.len() {
            return Err(VectorError::EmbeddingProvider(format!(
                "{} returned {} embeddings for {} texts",
                self.provider.name(),
                results.len(),
                texts.len()
            )));
        }

        debug!(
            provider = self.provider.name(),
            count = results.len(),
            "Embeddings generated"
        );

        results
            .into_iter()
            .enumerate()
            .map(|(position, result)| self.check_dimension(result, position))
            .collect()
    }

    fn requested_dimensions(&self) -> Option<u32> {
        (self.dimensions != self.model.dimension()).then_some(self.dimensions)
    }

    fn check_dimension(&self, result: EmbeddingResult, position: usize) -> VectorResult<Embedding> {
        if result.values.len() != self.dimensions as usize {
            return Err(VectorError::EmbeddingProvider(format!(
                "embedding {} has {} dimensions, expected {}",
                position,
                result.values.len(),
                self.dimensions
            )));
        }
        Ok(result.values)
    }
}

fn as_provider_error(err: VectorError) -> VectorError {
    match err {
        VectorError::EmbeddingProvider(_) => err,
        other => VectorError::EmbeddingProvider(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;

    fn result(values: Vec<f32>) -> EmbeddingResult {
        EmbeddingResult {
            dimension: values.len() as u32,
            values,
            tokens_used: 1,
        }
    }

    fn client(mock: MockEmbeddingProvider) -> EmbeddingClient {
        EmbeddingClient::new(Arc::new(mock), EmbeddingModel::TextEmbeddingAda002).with_dimensions(2)
    }

    #[tokio::test]
    async fn test_embed_many_empty_makes_no_call() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed_batch().times(0);

        let embeddings = client(mock).embed_many(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }

    #[tokio::test]
    async fn test_embed_many_keeps_alignment() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_name().return_const("mock");
        mock.expect_embed_batch()
            .times(1)
            .returning(|_, _, texts| {
                Ok(texts
                    .iter()
                    .map(|t| result(vec![t.len() as f32, 0.0]))
                    .collect())
            });

        let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
        let embeddings = client(mock).embed_many(&texts).await.unwrap();

        assert_eq!(
            embeddings,
            vec![vec![1.0, 0.0], vec![3.0, 0.0], vec![2.0, 0.0]]
        );
    }

    #[tokio::test]
    async fn test_embed_many_rejects_count_mismatch() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_name().return_const("mock");
        mock.expect_embed_batch()
            .returning(|_, _, _| Ok(vec![result(vec![0.5, 0.5])]));

        let texts = vec!["a".to_string(), "b".to_string()];
        let err = client(mock).embed_many(&texts).await.unwrap_err();
        assert!(matches!(err, VectorError::EmbeddingProvider(_)));
    }

    #[tokio::test]
    async fn test_embed_one_rejects_wrong_dimension() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .returning(|_, _, _| Ok(result(vec![0.1, 0.2, 0.3])));

        let err = client(mock).embed_one("Radiante").await.unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[tokio::test]
    async fn test_non_provider_errors_are_normalized() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .returning(|_, _, _| Err(VectorError::Internal("JSON error: eof".to_string())));

        let err = client(mock).embed_one("Radiante").await.unwrap_err();
        assert!(matches!(err, VectorError::EmbeddingProvider(ref msg) if msg.contains("eof")));
    }

    #[tokio::test]
    async fn test_requested_dimensions_reach_provider() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .withf(|model, dimensions, _| {
                *model == EmbeddingModel::TextEmbedding3Small && *dimensions == Some(2)
            })
            .returning(|_, _, _| Ok(result(vec![0.6, 0.8])));

        let client = EmbeddingClient::new(Arc::new(mock), EmbeddingModel::TextEmbedding3Small)
            .with_dimensions(2);
        assert_eq!(client.embed_one("Radiante").await.unwrap(), vec![0.6, 0.8]);
    }

    #[tokio::test]
    async fn test_native_dimensions_are_not_requested() {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_embed()
            .withf(|_, dimensions, _| dimensions.is_none())
            .returning(|_, _, _| Ok(result(vec![0.0; 1536])));

        let client = EmbeddingClient::new(Arc::new(mock), EmbeddingModel::TextEmbedding3Small);
        assert_eq!(client.embed_one("Radiante").await.unwrap().len(), 1536);
    }
}
