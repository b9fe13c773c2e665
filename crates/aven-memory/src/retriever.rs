//! Query-time semantic retrieval.

use std::sync::Arc;
use std::time::Duration;

use aven_llm::EmbeddingProvider;

use crate::index::{SearchResult, SharedIndexHandle, VectorIndex};

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Upper bound on the query embedding call.
    pub embed_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            embed_timeout: Duration::from_secs(30),
        }
    }
}

/// Embeds a query and reads the nearest records from the current index.
///
/// Never fails: a missing index, a remote error or a timeout all resolve to an
/// empty result set.
pub struct Retriever<E> {
    embedder: Arc<E>,
    index: Arc<VectorIndex>,
    handle: SharedIndexHandle,
    config: RetrievalConfig,
}

impl<E> std::fmt::Debug for Retriever<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("index", &self.index)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: EmbeddingProvider> Retriever<E> {
    #[must_use]
    pub fn new(
        embedder: Arc<E>,
        index: Arc<VectorIndex>,
        handle: SharedIndexHandle,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            handle,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve with the configured `top_k`.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.retrieve(query, self.config.top_k).await
    }

    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        if top_k == 0 || query.trim().is_empty() {
            return Vec::new();
        }
        let Some(handle) = self.handle.read().await.clone() else {
            tracing::debug!("no index attached, skipping retrieval");
            return Vec::new();
        };

        let vector =
            match tokio::time::timeout(self.config.embed_timeout, self.embedder.embed(query)).await
            {
                Ok(Ok(v)) => v,
                Ok(Err(e)) => {
                    tracing::warn!("query embedding failed: {e}");
                    return Vec::new();
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = self.config.embed_timeout.as_secs(),
                        "query embedding timed out"
                    );
                    return Vec::new();
                }
            };

        match self.index.query(Some(&handle), vector, top_k).await {
            Ok(results) => {
                tracing::debug!(count = results.len(), "retrieved");
                results
            }
            Err(e) => {
                tracing::warn!(index = %handle.name, "index query failed: {e}");
                Vec::new()
            }
        }
    }
}
