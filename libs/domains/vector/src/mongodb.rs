//! MongoDB implementation of DocumentStore
//!
//! Search index management and bulk upserts go through database commands so the
//! adapter works against any Atlas tier that supports vector search.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{Bson, Document, doc, to_bson, to_document},
    error::ErrorKind,
};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::{VectorError, VectorResult};
use crate::models::{BulkWriteOutcome, ScoredDocument, UpsertBatch, VectorIndexSpec, VectorQuery};
use crate::repository::DocumentStore;

/// Server error code for a collection that does not exist
const NAMESPACE_NOT_FOUND: i32 = 26;
/// Server error code for a duplicate index name
const INDEX_ALREADY_EXISTS: i32 = 68;

/// Field carrying the similarity score in search results; kept out of the
/// record namespace so a stored `score` field survives the projection
const SCORE_FIELD: &str = "_vectorSearchScore";

pub struct MongoDocumentStore {
    db: Database,
    collection: Collection<Document>,
}

impl MongoDocumentStore {
    /// # Example
    /// ```ignore
    /// let client = database::mongodb::connect(&config).await?;
    /// let store = MongoDocumentStore::new(&client.database("vector_db"), "documents");
    /// ```
    pub fn new(db: &Database, collection_name: &str) -> Self {
        Self {
            db: db.clone(),
            collection: db.collection::<Document>(collection_name),
        }
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn create_index_command(&self, spec: &VectorIndexSpec) -> Document {
        doc! {
            "createSearchIndexes": self.collection.name(),
            "indexes": [{
                "name": &spec.name,
                "type": "vectorSearch",
                "definition": {
                    "fields": [{
                        "type": "vector",
                        "path": &spec.field_path,
                        "numDimensions": spec.dimensions as i32,
                        "similarity": spec.metric.as_str(),
                    }]
                }
            }]
        }
    }

    fn update_command(&self, batch: &UpsertBatch) -> VectorResult<Document> {
        let mut statements = Vec::with_capacity(batch.documents.len());

        for document in &batch.documents {
            let mut set = to_document(document.record.fields())?;
            set.insert(&batch.embedding_field, to_bson(&document.embedding)?);

            let mut filter = Document::new();
            filter.insert(&batch.key_field, to_bson(&document.key_value)?);

            statements.push(doc! {
                "q": filter,
                "u": { "$set": set },
                "upsert": true,
            });
        }

        Ok(doc! {
            "update": self.collection.name(),
            "updates": statements,
            "ordered": false,
        })
    }
}

fn search_pipeline(query: &VectorQuery) -> VectorResult<Vec<Document>> {
    let mut projection = Document::new();
    projection.insert(SCORE_FIELD, doc! { "$meta": "vectorSearchScore" });
    projection.insert(&query.path, 0);

    Ok(vec![
        doc! {
            "$vectorSearch": {
                "index": &query.index_name,
                "path": &query.path,
                "queryVector": to_bson(&query.vector)?,
                "numCandidates": query.num_candidates as i64,
                "limit": query.limit as i64,
            }
        },
        doc! { "$project": projection },
    ])
}

/// Counts from an `update` command reply.
///
/// Any write error fails the whole batch so the run summary never over-reports.
fn parse_update_reply(reply: &Document) -> VectorResult<BulkWriteOutcome> {
    let errors = reply
        .get_array("writeErrors")
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if !errors.is_empty() {
        let first = errors
            .first()
            .and_then(Bson::as_document)
            .and_then(|e| e.get_str("errmsg").ok())
            .unwrap_or("unknown write error");
        return Err(VectorError::StoreWrite(format!(
            "{} of the batch writes failed, first: {}",
            errors.len(),
            first
        )));
    }

    if let Ok(concern) = reply.get_document("writeConcernError") {
        let message = concern.get_str("errmsg").unwrap_or("write concern error");
        return Err(VectorError::StoreWrite(message.to_string()));
    }

    let upserted = reply
        .get_array("upserted")
        .map(|ids| ids.len() as u64)
        .unwrap_or(0);
    let n = read_count(reply, "n");

    Ok(BulkWriteOutcome {
        upserted,
        matched: n.saturating_sub(upserted),
        modified: read_count(reply, "nModified"),
    })
}

fn read_count(reply: &Document, key: &str) -> u64 {
    match reply.get(key) {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

fn into_scored(mut document: Document) -> VectorResult<ScoredDocument> {
    let score = match document.remove(SCORE_FIELD) {
        Some(Bson::Double(score)) => score,
        Some(Bson::Int32(score)) => score as f64,
        Some(Bson::Int64(score)) => score as f64,
        other => {
            return Err(VectorError::IndexQuery(format!(
                "search result without a numeric {} ({:?})",
                SCORE_FIELD, other
            )));
        }
    };

    let fields = match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    Ok(ScoredDocument { score, fields })
}

fn command_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

fn is_index_conflict(code: Option<i32>, message: &str) -> bool {
    code == Some(INDEX_ALREADY_EXISTS) || message.to_ascii_lowercase().contains("already exists")
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    #[instrument(skip(self), fields(collection = %self.collection.name()))]
    async fn list_search_indexes(&self) -> VectorResult<Vec<String>> {
        let cursor = match self
            .collection
            .aggregate(vec![doc! { "$listSearchIndexes": {} }])
            .await
        {
            Ok(cursor) => cursor,
            Err(e) if command_code(&e) == Some(NAMESPACE_NOT_FOUND) => return Ok(vec![]),
            Err(e) => return Err(VectorError::Store(e.to_string())),
        };

        let indexes: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| VectorError::Store(e.to_string()))?;

        Ok(indexes
            .iter()
            .filter_map(|index| index.get_str("name").ok())
            .map(String::from)
            .collect())
    }

    #[instrument(skip(self), fields(collection = %self.collection.name(), index = %spec.name))]
    async fn create_vector_index(&self, spec: VectorIndexSpec) -> VectorResult<()> {
        match self.db.run_command(self.create_index_command(&spec)).await {
            Ok(_) => {
                tracing::info!(
                    dimensions = spec.dimensions,
                    similarity = %spec.metric,
                    "Search index definition accepted"
                );
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                if is_index_conflict(command_code(&e), &message) {
                    Err(VectorError::IndexAlreadyExists(spec.name))
                } else {
                    Err(VectorError::IndexProvision(message))
                }
            }
        }
    }

    #[instrument(
        skip(self, batch),
        fields(collection = %self.collection.name(), documents = batch.documents.len())
    )]
    async fn bulk_upsert(&self, batch: UpsertBatch) -> VectorResult<BulkWriteOutcome> {
        if batch.documents.is_empty() {
            return Ok(BulkWriteOutcome::default());
        }

        let command = self.update_command(&batch)?;
        let reply = self
            .db
            .run_command(command)
            .await
            .map_err(|e| VectorError::StoreWrite(e.to_string()))?;

        let outcome = parse_update_reply(&reply)?;
        tracing::debug!(
            upserted = outcome.upserted,
            matched = outcome.matched,
            modified = outcome.modified,
            "Bulk upsert applied"
        );
        Ok(outcome)
    }

    #[instrument(
        skip(self, query),
        fields(collection = %self.collection.name(), index = %query.index_name)
    )]
    async fn vector_search(&self, query: VectorQuery) -> VectorResult<Vec<ScoredDocument>> {
        let pipeline = search_pipeline(&query)?;

        let cursor = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|e| VectorError::IndexQuery(e.to_string()))?;
        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| VectorError::IndexQuery(e.to_string()))?;

        documents.into_iter().map(into_scored).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceMetric, Record, StoredDocument};
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    // Building a Database handle does not touch the network
    async fn store() -> MongoDocumentStore {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        MongoDocumentStore::new(&client.database("vector_db"), "documents")
    }

    #[tokio::test]
    async fn test_create_index_command_shape() {
        let store = store().await;
        let spec = VectorIndexSpec::new("vector_index", "embedding", 1536)
            .with_metric(DistanceMetric::DotProduct);

        let command = store.create_index_command(&spec);
        assert_eq!(command.get_str("createSearchIndexes").unwrap(), "documents");

        let index = command.get_array("indexes").unwrap()[0]
            .as_document()
            .unwrap();
        assert_eq!(index.get_str("name").unwrap(), "vector_index");
        assert_eq!(index.get_str("type").unwrap(), "vectorSearch");

        let field = index
            .get_document("definition")
            .unwrap()
            .get_array("fields")
            .unwrap()[0]
            .as_document()
            .unwrap();
        assert_eq!(field.get_str("path").unwrap(), "embedding");
        assert_eq!(field.get_i32("numDimensions").unwrap(), 1536);
        assert_eq!(field.get_str("similarity").unwrap(), "dotProduct");
    }

    #[tokio::test]
    async fn test_update_command_upserts_by_key() {
        let store = store().await;
        let batch = UpsertBatch {
            key_field: "email".to_string(),
            embedding_field: "embedding".to_string(),
            documents: vec![StoredDocument {
                key_value: json!("ana@x.com"),
                record: Record::new().with("name", "Ana Silva").with("email", "ana@x.com"),
                embedding: vec![0.5, 0.25],
            }],
        };

        let command = store.update_command(&batch).unwrap();
        assert_eq!(command.get_str("update").unwrap(), "documents");
        assert!(!command.get_bool("ordered").unwrap());

        let statement = command.get_array("updates").unwrap()[0]
            .as_document()
            .unwrap();
        assert!(statement.get_bool("upsert").unwrap());
        assert_eq!(
            statement.get_document("q").unwrap(),
            &doc! { "email": "ana@x.com" }
        );

        let set = statement
            .get_document("u")
            .unwrap()
            .get_document("$set")
            .unwrap();
        assert_eq!(set.get_str("name").unwrap(), "Ana Silva");
        assert_eq!(set.get_array("embedding").unwrap().len(), 2);
    }

    #[test]
    fn test_search_pipeline_shape() {
        let query = VectorQuery {
            index_name: "vector_index".to_string(),
            path: "embedding".to_string(),
            vector: vec![0.1, 0.2, 0.3],
            num_candidates: 100,
            limit: 3,
        };

        let pipeline = search_pipeline(&query).unwrap();
        assert_eq!(pipeline.len(), 2);

        let stage = pipeline[0].get_document("$vectorSearch").unwrap();
        assert_eq!(stage.get_str("index").unwrap(), "vector_index");
        assert_eq!(stage.get_i64("numCandidates").unwrap(), 100);
        assert_eq!(stage.get_i64("limit").unwrap(), 3);
        assert_eq!(stage.get_array("queryVector").unwrap().len(), 3);

        let project = pipeline[1].get_document("$project").unwrap();
        assert_eq!(project.get_i32("embedding").unwrap(), 0);
        assert_eq!(
            project.get_document(SCORE_FIELD).unwrap(),
            &doc! { "$meta": "vectorSearchScore" }
        );
    }

    #[test]
    fn test_update_reply_counts_inserts_and_matches() {
        let reply = doc! {
            "n": 3,
            "nModified": 1,
            "upserted": [{ "index": 0, "_id": ObjectId::new() }],
            "ok": 1.0,
        };

        assert_eq!(
            parse_update_reply(&reply).unwrap(),
            BulkWriteOutcome {
                upserted: 1,
                matched: 2,
                modified: 1,
            }
        );
    }

    #[test]
    fn test_update_reply_without_upserts() {
        let reply = doc! { "n": 2_i64, "nModified": 0, "ok": 1.0 };
        let outcome = parse_update_reply(&reply).unwrap();
        assert_eq!(outcome.upserted, 0);
        assert_eq!(outcome.matched, 2);
    }

    #[test]
    fn test_update_reply_write_errors_fail_the_batch() {
        let reply = doc! {
            "n": 1,
            "nModified": 0,
            "writeErrors": [{ "index": 1, "code": 11000, "errmsg": "E11000 duplicate key" }],
            "ok": 1.0,
        };

        let err = parse_update_reply(&reply).unwrap_err();
        assert!(matches!(err, VectorError::StoreWrite(ref msg) if msg.contains("E11000")));
    }

    #[test]
    fn test_scored_document_takes_score_out() {
        let scored = into_scored(doc! {
            "name": "Ana Silva",
            "email": "ana@x.com",
            "_vectorSearchScore": 0.92,
        })
        .unwrap();

        assert!((scored.score - 0.92).abs() < f64::EPSILON);
        assert_eq!(scored.fields.get("name"), Some(&json!("Ana Silva")));
        assert!(!scored.fields.contains_key(SCORE_FIELD));
    }

    #[test]
    fn test_record_score_field_is_kept() {
        let scored = into_scored(doc! {
            "name": "Ana Silva",
            "score": 7,
            "_vectorSearchScore": 0.5,
        })
        .unwrap();

        assert!((scored.score - 0.5).abs() < f64::EPSILON);
        assert_eq!(scored.fields.get("score"), Some(&json!(7)));
    }

    #[test]
    fn test_missing_score_is_a_query_error() {
        let err = into_scored(doc! { "name": "Ana Silva" }).unwrap_err();
        assert!(matches!(err, VectorError::IndexQuery(ref msg) if msg.contains(SCORE_FIELD)));
    }

    #[test]
    fn test_index_conflict_detection() {
        assert!(is_index_conflict(Some(68), "IndexAlreadyExists"));
        assert!(is_index_conflict(None, "Index vector_index already exists"));
        assert!(!is_index_conflict(Some(8000), "search indexes unsupported"));
    }
}
