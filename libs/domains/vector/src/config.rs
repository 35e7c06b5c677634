use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};

use crate::models::{DistanceMetric, EmbeddingModel, VectorIndexSpec};
use crate::pipeline::DEFAULT_BATCH_SIZE;
use crate::search::{DEFAULT_NUM_CANDIDATES, DEFAULT_TOP_K};

/// Where and how embeddings are stored
///
/// Environment variables:
/// - `MONGO_COLLECTION` (default: `documents`)
/// - `MONGO_VECTOR_NAME` (default: `vector_index`)
/// - `EMBEDDING_FIELD` (default: `embedding`)
/// - `EMBEDDING_MODEL` (default: `text-embedding-ada-002`)
/// - `EMBEDDING_DIMENSIONS` (default: the model's native size)
/// - `VECTOR_SIMILARITY` (default: `cosine`)
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStoreConfig {
    pub collection: String,
    pub index_name: String,
    pub embedding_field: String,
    pub model: EmbeddingModel,
    pub dimensions: u32,
    pub metric: DistanceMetric,
}

impl VectorStoreConfig {
    pub fn index_spec(&self) -> VectorIndexSpec {
        VectorIndexSpec::new(&self.index_name, &self.embedding_field, self.dimensions)
            .with_metric(self.metric)
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        let model = EmbeddingModel::default();
        Self {
            collection: "documents".to_string(),
            index_name: "vector_index".to_string(),
            embedding_field: "embedding".to_string(),
            model,
            dimensions: model.dimension(),
            metric: DistanceMetric::Cosine,
        }
    }
}

impl FromEnv for VectorStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let model: EmbeddingModel = env_parse("EMBEDDING_MODEL", EmbeddingModel::default())?;
        let dimensions = env_parse("EMBEDDING_DIMENSIONS", model.dimension())?;
        if dimensions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "EMBEDDING_DIMENSIONS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }
        if dimensions != model.dimension() && !model.supports_shortening() {
            return Err(ConfigError::InvalidValue {
                key: "EMBEDDING_DIMENSIONS".to_string(),
                details: format!(
                    "{} always returns {} dimensions",
                    model.model_name(),
                    model.dimension()
                ),
            });
        }

        Ok(Self {
            collection: env_or_default("MONGO_COLLECTION", "documents"),
            index_name: env_or_default("MONGO_VECTOR_NAME", "vector_index"),
            embedding_field: env_or_default("EMBEDDING_FIELD", "embedding"),
            model,
            dimensions,
            metric: env_parse("VECTOR_SIMILARITY", DistanceMetric::Cosine)?,
        })
    }
}

/// Knobs for the sync and search flows
///
/// Environment variables:
/// - `SYNC_UNIQUE_KEY` (default: `email`)
/// - `SYNC_BATCH_SIZE` (default: 1000, must be at least 1)
/// - `SYNC_TEXT_FIELDS` (default: `name,email`) - comma separated, in order
/// - `SEARCH_DISPLAY_FIELD` (default: `name`)
/// - `SEARCH_TOP_K` (default: 3)
/// - `SEARCH_NUM_CANDIDATES` (default: 100)
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub unique_key: String,
    pub batch_size: usize,
    pub text_fields: Vec<String>,
    pub display_field: String,
    pub top_k: u32,
    pub num_candidates: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            unique_key: "email".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            text_fields: vec!["name".to_string(), "email".to_string()],
            display_field: "name".to_string(),
            top_k: DEFAULT_TOP_K,
            num_candidates: DEFAULT_NUM_CANDIDATES,
        }
    }
}

impl FromEnv for SyncSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let batch_size = env_parse("SYNC_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SYNC_BATCH_SIZE".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        let text_fields = match env_optional("SYNC_TEXT_FIELDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(String::from)
                .collect(),
            None => SyncSettings::default().text_fields,
        };

        Ok(Self {
            unique_key: env_or_default("SYNC_UNIQUE_KEY", "email"),
            batch_size,
            text_fields,
            display_field: env_or_default("SEARCH_DISPLAY_FIELD", "name"),
            top_k: env_parse("SEARCH_TOP_K", DEFAULT_TOP_K)?,
            num_candidates: env_parse("SEARCH_NUM_CANDIDATES", DEFAULT_NUM_CANDIDATES)?,
        })
    }
}
