//! Lifecycle of the single named vector index.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::vector_store::{VectorPoint, VectorStore, VectorStoreError};

pub const DEFAULT_INDEX_NAME: &str = "aven-content";

/// Identifies one generation of the index.
///
/// Every [`VectorIndex::recreate`] destroys the previous collection and yields
/// a handle with a higher `generation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    pub name: String,
    pub dimension: u64,
    pub generation: u64,
}

/// Slot shared by the ingestion write path and the query read path.
pub type SharedIndexHandle = Arc<RwLock<Option<IndexHandle>>>;

#[must_use]
pub fn shared_handle() -> SharedIndexHandle {
    Arc::new(RwLock::new(None))
}

#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SearchResult {
    /// Stored chunk text, if present and not blank.
    #[must_use]
    pub fn chunk_text(&self) -> Option<&str> {
        self.metadata
            .get("chunk")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("url").and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub dimension: Option<u64>,
    pub record_count: u64,
}

/// A stored record without its vector.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    name: String,
    generation: AtomicU64,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("name", &self.name)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drop the index if it exists and create it empty with `dimension`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot list, delete or create collections.
    pub async fn recreate(&self, dimension: u64) -> Result<IndexHandle, VectorStoreError> {
        let existing = self.store.list_collections().await?;
        if existing.iter().any(|n| n == &self.name) {
            tracing::info!(index = %self.name, "deleting existing index");
            self.store.delete_collection(&self.name).await?;
        }
        self.store.create_collection(&self.name, dimension).await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(index = %self.name, dimension, generation, "index created");
        Ok(IndexHandle {
            name: self.name.clone(),
            dimension,
            generation,
        })
    }

    /// Insert or replace records by id.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::DimensionMismatch`] before touching the store if
    /// any vector length differs from the handle, or the store error on failure.
    pub async fn upsert(
        &self,
        handle: &IndexHandle,
        records: Vec<IndexRecord>,
    ) -> Result<(), VectorStoreError> {
        if let Some(bad) = records
            .iter()
            .find(|r| r.vector.len() as u64 != handle.dimension)
        {
            return Err(VectorStoreError::DimensionMismatch {
                expected: handle.dimension,
                actual: bad.vector.len() as u64,
            });
        }
        if records.is_empty() {
            return Ok(());
        }
        let points = records
            .into_iter()
            .map(|r| VectorPoint {
                id: r.id,
                vector: r.vector,
                payload: r.metadata,
            })
            .collect();
        self.store.upsert(&handle.name, points).await
    }

    /// Nearest neighbours of `vector`, most similar first.
    ///
    /// Resolves to an empty list when there is no handle, `top_k` is zero, or
    /// the index is missing or empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails or `vector` has the wrong length.
    pub async fn query(
        &self,
        handle: Option<&IndexHandle>,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        let Some(handle) = handle else {
            return Ok(Vec::new());
        };
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() as u64 != handle.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: handle.dimension,
                actual: vector.len() as u64,
            });
        }
        match self.store.collection_info(&handle.name).await? {
            Some(info) if info.points_count > 0 => {}
            _ => return Ok(Vec::new()),
        }

        let mut results: Vec<SearchResult> = self
            .store
            .search(&handle.name, vector, top_k as u64)
            .await?
            .into_iter()
            .map(|p| SearchResult {
                id: p.id,
                score: p.score,
                metadata: p.payload,
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    /// Handle for an index that already exists in the store, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn attach(&self) -> Result<Option<IndexHandle>, VectorStoreError> {
        let Some(info) = self.store.collection_info(&self.name).await? else {
            return Ok(None);
        };
        let Some(dimension) = info.dimension else {
            tracing::warn!(index = %self.name, "index has no single vector config, not attaching");
            return Ok(None);
        };
        Ok(Some(IndexHandle {
            name: self.name.clone(),
            dimension,
            generation: self.generation.load(Ordering::SeqCst),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn stats(&self) -> Result<Option<IndexStats>, VectorStoreError> {
        Ok(self
            .store
            .collection_info(&self.name)
            .await?
            .map(|info| IndexStats {
                dimension: info.dimension,
                record_count: info.points_count,
            }))
    }

    /// Up to `limit` stored records, for inspection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn sample(&self, limit: u32) -> Result<Vec<StoredRecord>, VectorStoreError> {
        if self.store.collection_info(&self.name).await?.is_none() {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .scroll(&self.name, limit)
            .await?
            .into_iter()
            .map(|p| StoredRecord {
                id: p.id,
                metadata: p.payload,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_store::InMemoryVectorStore;

    fn index() -> VectorIndex {
        VectorIndex::new(Arc::new(InMemoryVectorStore::new()), "test-index")
    }

    fn record(id: &str, vector: Vec<f32>, chunk: &str) -> IndexRecord {
        let mut metadata = HashMap::new();
        metadata.insert("url".into(), serde_json::json!("https://example.com"));
        metadata.insert("chunk".into(), serde_json::json!(chunk));
        IndexRecord {
            id: id.into(),
            vector,
            metadata,
        }
    }

    #[tokio::test]
    async fn recreate_bumps_generation_and_clears_records() {
        let idx = index();
        let h1 = idx.recreate(2).await.unwrap();
        idx.upsert(&h1, vec![record("a", vec![1.0, 0.0], "x")])
            .await
            .unwrap();
        assert_eq!(idx.stats().await.unwrap().unwrap().record_count, 1);

        let h2 = idx.recreate(3).await.unwrap();
        assert!(h2.generation > h1.generation);
        let stats = idx.stats().await.unwrap().unwrap();
        assert_eq!(stats.record_count, 0);
        assert_eq!(stats.dimension, Some(3));
    }

    #[tokio::test]
    async fn upsert_rejects_dimension_mismatch() {
        let idx = index();
        let h = idx.recreate(2).await.unwrap();
        let err = idx
            .upsert(&h, vec![record("a", vec![1.0], "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn query_without_handle_is_empty() {
        let idx = index();
        let results = idx.query(None, vec![1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn query_empty_or_missing_index_is_empty() {
        let idx = index();
        let h = idx.recreate(2).await.unwrap();
        assert!(idx.query(Some(&h), vec![1.0, 0.0], 5).await.unwrap().is_empty());

        let stale = IndexHandle {
            name: "gone".into(),
            dimension: 2,
            generation: 9,
        };
        assert!(
            idx.query(Some(&stale), vec![1.0, 0.0], 5)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn query_returns_top_k_descending() {
        let idx = index();
        let h = idx.recreate(2).await.unwrap();
        idx.upsert(
            &h,
            vec![
                record("a", vec![1.0, 0.0], "exact"),
                record("b", vec![0.7, 0.7], "diagonal"),
                record("c", vec![0.0, 1.0], "orthogonal"),
            ],
        )
        .await
        .unwrap();

        let results = idx.query(Some(&h), vec![1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_text(), Some("exact"));
        assert_eq!(results[1].id, "b");
        assert!(idx.query(Some(&h), vec![1.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn attach_uses_stored_dimension() {
        let idx = index();
        assert!(idx.attach().await.unwrap().is_none());
        idx.recreate(4).await.unwrap();
        let h = idx.attach().await.unwrap().unwrap();
        assert_eq!(h.dimension, 4);
        assert_eq!(h.name, "test-index");
    }

    #[tokio::test]
    async fn sample_lists_records() {
        let idx = index();
        assert!(idx.sample(3).await.unwrap().is_empty());
        let h = idx.recreate(1).await.unwrap();
        idx.upsert(&h, vec![record("a", vec![1.0], "x"), record("b", vec![1.0], "y")])
            .await
            .unwrap();
        let sample = idx.sample(1).await.unwrap();
        assert_eq!(sample.len(), 1);
    }

    #[test]
    fn chunk_text_ignores_blank_and_non_string() {
        let mut r = SearchResult {
            id: "x".into(),
            score: 1.0,
            metadata: HashMap::new(),
        };
        assert!(r.chunk_text().is_none());
        r.metadata.insert("chunk".into(), serde_json::json!("   "));
        assert!(r.chunk_text().is_none());
        r.metadata.insert("chunk".into(), serde_json::json!(42));
        assert!(r.chunk_text().is_none());
        r.metadata.insert("chunk".into(), serde_json::json!("text"));
        assert_eq!(r.chunk_text(), Some("text"));
    }
}
