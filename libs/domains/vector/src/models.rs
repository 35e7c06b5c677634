use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A vector embedding as returned by the provider
pub type Embedding = Vec<f32>;

/// One source record: field name to scalar/simple JSON value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// The value of `field` when it can serve as an upsert key.
    ///
    /// Only non-blank strings and numbers qualify; null, booleans and
    /// nested values do not.
    pub fn key_value(&self, field: &str) -> Option<&Value> {
        let value = self.0.get(field)?;
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(value),
            Value::Number(_) => Some(value),
            _ => None,
        }
    }

    /// Short human identity for log lines: the key value, else `name`, else `<unknown>`
    pub fn identity(&self, key_field: &str) -> String {
        self.key_value(key_field)
            .or_else(|| self.key_value("name"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Similarity metric declared on the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl DistanceMetric {
    /// Name as understood by Atlas vector search
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dotProduct",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "dotproduct" | "dot_product" | "dot" => Ok(DistanceMetric::DotProduct),
            other => Err(format!("unknown similarity metric '{}'", other)),
        }
    }
}

/// Embedding model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// OpenAI text-embedding-ada-002 (1536 dimensions)
    #[default]
    TextEmbeddingAda002,
    /// OpenAI text-embedding-3-small (1536 dimensions)
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
}

impl EmbeddingModel {
    pub fn dimension(&self) -> u32 {
        match self {
            EmbeddingModel::TextEmbeddingAda002 => 1536,
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
        }
    }

    /// Whether the model can return vectors shorter than [`Self::dimension`]
    pub fn supports_shortening(&self) -> bool {
        !matches!(self, EmbeddingModel::TextEmbeddingAda002)
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            EmbeddingModel::TextEmbeddingAda002 => "text-embedding-ada-002",
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
        }
    }
}

impl FromStr for EmbeddingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text-embedding-ada-002" => Ok(EmbeddingModel::TextEmbeddingAda002),
            "text-embedding-3-small" => Ok(EmbeddingModel::TextEmbedding3Small),
            "text-embedding-3-large" => Ok(EmbeddingModel::TextEmbedding3Large),
            other => Err(format!("unsupported embedding model '{}'", other)),
        }
    }
}

/// Embedding result
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub values: Embedding,
    pub dimension: u32,
    pub tokens_used: u32,
}

/// Definition of the store-side vector index
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndexSpec {
    pub name: String,
    pub field_path: String,
    pub dimensions: u32,
    pub metric: DistanceMetric,
}

impl VectorIndexSpec {
    pub fn new(name: impl Into<String>, field_path: impl Into<String>, dimensions: u32) -> Self {
        Self {
            name: name.into(),
            field_path: field_path.into(),
            dimensions,
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

/// Result of [`crate::IndexProvisioner::ensure_index`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Listed as present; nothing was created
    AlreadyPresent,
    Created,
    /// Creation raced with another writer and the store reported a duplicate
    AlreadyExists,
    /// Creation failed; vector search may not work
    Failed(String),
}

impl IndexOutcome {
    pub fn is_available(&self) -> bool {
        !matches!(self, IndexOutcome::Failed(_))
    }
}

/// A record ready to be written, with its embedding attached
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub key_value: Value,
    pub record: Record,
    pub embedding: Embedding,
}

/// One bulk write: every document is upserted by `{key_field: key_value}`
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertBatch {
    pub key_field: String,
    pub embedding_field: String,
    pub documents: Vec<StoredDocument>,
}

/// Counts reported by the store for one bulk write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteOutcome {
    pub upserted: u64,
    /// Existing documents matched by key
    pub matched: u64,
    /// Matched documents whose stored bytes changed
    pub modified: u64,
}

/// Why a record was left out of its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingKey,
    EmptyText,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingKey => f.write_str("missing unique key"),
            SkipReason::EmptyText => f.write_str("no embeddable text"),
        }
    }
}

/// Totals for one `upsert_all` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub upserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed_batches: u64,
    /// The deadline passed before every batch ran
    pub stopped_early: bool,
}

impl UpsertSummary {
    pub fn absorb(&mut self, outcome: &BulkWriteOutcome) {
        self.upserted += outcome.upserted;
        self.updated += outcome.matched;
    }
}

/// Nearest-neighbour query sent to the store
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub index_name: String,
    pub path: String,
    pub vector: Embedding,
    pub num_candidates: u32,
    pub limit: u32,
}

/// Store-side match: the document without its embedding, plus the score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub score: f64,
    pub fields: Map<String, Value>,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: f64,
    /// Value of the requested display field, when it is a string
    pub label: Option<String>,
    pub fields: Map<String, Value>,
}
