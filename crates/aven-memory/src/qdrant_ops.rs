//! Qdrant-backed [`VectorStore`].
//!
//! Record ids are arbitrary strings (`aven-0`, `aven-1`, ...) while Qdrant only
//! accepts unsigned integers or UUIDs, so every id is mapped to a UUID v5 and the
//! original id travels in the payload under [`RECORD_ID_FIELD`].

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, RetrievedPoint, ScoredPoint,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    point_id::PointIdOptions, value::Kind, vectors_config::Config,
};

use crate::vector_store::{
    BoxFuture, CollectionInfo, PayloadPoint, ScoredVectorPoint, VectorPoint, VectorStore,
    VectorStoreError,
};

type QdrantResult<T> = Result<T, Box<qdrant_client::QdrantError>>;

pub const RECORD_ID_FIELD: &str = "record_id";

const POINT_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x6b, 0xa7, 0xb8, 0x11, 0x9d, 0xad, 0x11, 0xd1, 0x80, 0xb4, 0x00, 0xc0, 0x4f, 0xd4, 0x30, 0xc8,
]);

/// Thin wrapper over [`Qdrant`] client encapsulating collection operations.
#[derive(Clone)]
pub struct QdrantOps {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantOps").finish_non_exhaustive()
    }
}

impl QdrantOps {
    /// Create a new `QdrantOps` connected to the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str, api_key: Option<String>) -> QdrantResult<Self> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .map_err(Box::new)?;
        Ok(Self { client })
    }

    /// Deterministic Qdrant point id for a record id.
    #[must_use]
    pub fn point_id(record_id: &str) -> String {
        uuid::Uuid::new_v5(&POINT_NAMESPACE, record_id.as_bytes()).to_string()
    }

    async fn list_names(&self) -> QdrantResult<Vec<String>> {
        let response = self.client.list_collections().await.map_err(Box::new)?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn info(&self, collection: &str) -> QdrantResult<Option<CollectionInfo>> {
        if !self
            .client
            .collection_exists(collection)
            .await
            .map_err(Box::new)?
        {
            return Ok(None);
        }
        let response = self
            .client
            .collection_info(collection)
            .await
            .map_err(Box::new)?;
        let Some(info) = response.result else {
            return Ok(None);
        };
        let dimension = info
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                Config::Params(params) => Some(params.size),
                Config::ParamsMap(_) => None,
            });
        Ok(Some(CollectionInfo {
            dimension,
            points_count: info.points_count.unwrap_or(0),
        }))
    }

    async fn create(&self, collection: &str, vector_size: u64) -> QdrantResult<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn delete(&self, collection: &str) -> QdrantResult<()> {
        self.client
            .delete_collection(collection)
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<PointStruct>) -> QdrantResult<()> {
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn search_points(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> QdrantResult<Vec<ScoredPoint>> {
        let builder = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        let results = self.client.search_points(builder).await.map_err(Box::new)?;
        Ok(results.result)
    }

    async fn scroll_points(&self, collection: &str, limit: u32) -> QdrantResult<Vec<RetrievedPoint>> {
        let builder = ScrollPointsBuilder::new(collection)
            .with_payload(true)
            .with_vectors(false)
            .limit(limit);
        let response = self.client.scroll(builder).await.map_err(Box::new)?;
        Ok(response.result)
    }
}

impl VectorStore for QdrantOps {
    fn list_collections(&self) -> BoxFuture<'_, Result<Vec<String>, VectorStoreError>> {
        Box::pin(async move {
            self.list_names()
                .await
                .map_err(|e| VectorStoreError::Connection(e.to_string()))
        })
    }

    fn collection_info(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Option<CollectionInfo>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.info(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn create_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.create(&collection, vector_size)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.delete(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let qdrant_points = points
                .into_iter()
                .map(vector_point_to_qdrant)
                .collect::<Result<Vec<_>, _>>()?;
            self.upsert_points(&collection, qdrant_points)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let results = self
                .search_points(&collection, vector, limit)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(results.into_iter().map(scored_point_to_vector).collect())
        })
    }

    fn scroll(
        &self,
        collection: &str,
        limit: u32,
    ) -> BoxFuture<'_, Result<Vec<PayloadPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let points = self
                .scroll_points(&collection, limit)
                .await
                .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;
            Ok(points
                .into_iter()
                .map(|p| {
                    let (id, payload) = restore_record(p.id, payload_to_json(p.payload));
                    PayloadPoint { id, payload }
                })
                .collect())
        })
    }
}

fn vector_point_to_qdrant(point: VectorPoint) -> Result<PointStruct, VectorStoreError> {
    let mut payload = point.payload;
    payload.insert(
        RECORD_ID_FIELD.to_owned(),
        serde_json::Value::String(point.id.clone()),
    );
    let payload: HashMap<String, qdrant_client::qdrant::Value> =
        serde_json::from_value(serde_json::Value::Object(payload.into_iter().collect()))
            .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
    Ok(PointStruct::new(
        QdrantOps::point_id(&point.id),
        point.vector,
        payload,
    ))
}

fn payload_to_json(
    payload: HashMap<String, qdrant_client::qdrant::Value>,
) -> HashMap<String, serde_json::Value> {
    payload
        .into_iter()
        .filter_map(|(k, v)| {
            let json_val = match v.kind? {
                Kind::StringValue(s) => serde_json::Value::String(s),
                Kind::IntegerValue(i) => serde_json::Value::Number(i.into()),
                Kind::DoubleValue(d) => {
                    serde_json::Number::from_f64(d).map(serde_json::Value::Number)?
                }
                Kind::BoolValue(b) => serde_json::Value::Bool(b),
                _ => return None,
            };
            Some((k, json_val))
        })
        .collect()
}

/// Take the original record id back out of the payload, falling back to the point id.
fn restore_record(
    point_id: Option<PointId>,
    mut payload: HashMap<String, serde_json::Value>,
) -> (String, HashMap<String, serde_json::Value>) {
    let restored = match payload.remove(RECORD_ID_FIELD) {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    };
    let id = restored.unwrap_or_else(|| match point_id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Uuid(u)) => u,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    });
    (id, payload)
}

fn scored_point_to_vector(point: ScoredPoint) -> ScoredVectorPoint {
    let (id, payload) = restore_record(point.id, payload_to_json(point.payload));
    ScoredVectorPoint {
        id,
        score: point.score,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_valid_url() {
        let ops = QdrantOps::new("http://localhost:6334", None);
        assert!(ops.is_ok());
    }

    #[test]
    fn new_invalid_url() {
        let ops = QdrantOps::new("not a valid url", None);
        assert!(ops.is_err());
    }

    #[test]
    fn debug_format() {
        let ops = QdrantOps::new("http://localhost:6334", None).unwrap();
        let dbg = format!("{ops:?}");
        assert!(dbg.contains("QdrantOps"));
    }

    #[test]
    fn point_id_is_deterministic_uuid() {
        let a = QdrantOps::point_id("aven-0");
        let b = QdrantOps::point_id("aven-0");
        let c = QdrantOps::point_id("aven-1");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn record_id_round_trips_through_payload() {
        let mut payload = HashMap::new();
        payload.insert("url".to_owned(), serde_json::json!("https://example.com"));
        payload.insert("chunk_index".to_owned(), serde_json::json!(2));
        let point = vector_point_to_qdrant(VectorPoint {
            id: "aven-7".into(),
            vector: vec![0.1, 0.2],
            payload,
        })
        .unwrap();

        let json = payload_to_json(point.payload);
        assert_eq!(json[RECORD_ID_FIELD], "aven-7");

        let (id, rest) = restore_record(point.id, json);
        assert_eq!(id, "aven-7");
        assert!(!rest.contains_key(RECORD_ID_FIELD));
        assert_eq!(rest["url"], "https://example.com");
        assert_eq!(rest["chunk_index"], 2);
    }

    #[test]
    fn restore_falls_back_to_point_uuid() {
        let uuid = QdrantOps::point_id("x");
        let (id, _) = restore_record(Some(PointId::from(uuid.clone())), HashMap::new());
        assert_eq!(id, uuid);
    }
}
