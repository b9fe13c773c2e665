//! The two entry points of the system: rebuild the index, answer a query.

use std::sync::Arc;
use std::time::Duration;

use aven_llm::{EmbeddingProvider, GenerationProvider};
use aven_memory::{
    ContentSource, DocumentError, IndexHandle, IndexStats, IngestionPipeline, IngestionReport,
    Retriever, SearchResult, SharedIndexHandle, StoredRecord, TextSplitter, VectorIndex,
    VectorStore, VectorStoreError, shared_handle,
};

use crate::composer::AnswerComposer;
use crate::config::Config;

/// Query used by [`RagService::status`] to smoke-test retrieval.
pub const STATUS_TEST_QUERY: &str = "What is Aven?";

/// Snapshot of the index for operators.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub index_name: String,
    pub handle: Option<IndexHandle>,
    pub stats: Option<IndexStats>,
    pub sample: Vec<StoredRecord>,
    pub test_query: &'static str,
    pub test_results: Vec<SearchResult>,
}

/// Ingestion and query paths wired to one shared index handle.
pub struct RagService<E, G> {
    pipeline: IngestionPipeline<E>,
    retriever: Retriever<E>,
    composer: AnswerComposer<G>,
    index: Arc<VectorIndex>,
    handle: SharedIndexHandle,
    sources: Vec<String>,
}

impl<E, G> std::fmt::Debug for RagService<E, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagService")
            .field("index", &self.index)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl<E: EmbeddingProvider, G: GenerationProvider> RagService<E, G> {
    /// Wire the collaborators together using the settings in `config`.
    #[must_use]
    pub fn new(
        embedder: Arc<E>,
        generator: Arc<G>,
        store: Arc<dyn VectorStore>,
        source: Arc<dyn ContentSource>,
        splitter: TextSplitter,
        config: &Config,
    ) -> Self {
        let index = Arc::new(VectorIndex::new(store, config.index.name.as_str()));
        let handle = shared_handle();

        let pipeline = IngestionPipeline::new(
            splitter,
            Arc::clone(&embedder),
            source,
            Arc::clone(&index),
            Arc::clone(&handle),
            config.ingestion_config(),
        );
        let retriever = Retriever::new(
            embedder,
            Arc::clone(&index),
            Arc::clone(&handle),
            config.retrieval_config(),
        );
        let composer = AnswerComposer::new(
            generator,
            config.answer.clone(),
            Duration::from_secs(config.timeouts.llm_seconds),
        );

        Self {
            pipeline,
            retriever,
            composer,
            index,
            handle,
            sources: config.ingest.sources.clone(),
        }
    }

    /// Attach to an index left by a previous run. Never ingests.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store cannot be reached.
    pub async fn initialize(&self) -> Result<Option<IndexHandle>, VectorStoreError> {
        let attached = self.index.attach().await?;
        match &attached {
            Some(handle) => tracing::info!(
                index = %handle.name,
                dimension = handle.dimension,
                "attached to existing index"
            ),
            None => tracing::warn!(
                index = self.index.name(),
                "no index yet, queries return the no-information answer until ingestion runs"
            ),
        }
        *self.handle.write().await = attached.clone();
        Ok(attached)
    }

    /// Rebuild the index from the configured sources; returns the record count.
    ///
    /// # Errors
    ///
    /// See [`IngestionPipeline::run`].
    pub async fn run_ingestion(&self) -> Result<usize, DocumentError> {
        self.ingest_with_report()
            .await
            .map(|report| report.record_count)
    }

    /// # Errors
    ///
    /// See [`IngestionPipeline::run`].
    pub async fn ingest_with_report(&self) -> Result<IngestionReport, DocumentError> {
        self.pipeline.run(&self.sources).await
    }

    /// Retrieve and compose. Always produces an answer.
    pub async fn answer_query(&self, query: &str) -> String {
        let results = self.retriever.search(query).await;
        tracing::debug!(results = results.len(), "answering query");
        self.composer.compose(query, &results).await
    }

    /// Index statistics, one sample record and a test search.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store cannot be reached.
    pub async fn status(&self) -> Result<StatusReport, VectorStoreError> {
        let stats = self.index.stats().await?;
        let sample = if stats.is_some() {
            self.index.sample(1).await?
        } else {
            Vec::new()
        };
        let handle = self.handle.read().await.clone();
        let test_results = self
            .retriever
            .retrieve(STATUS_TEST_QUERY, self.retriever.config().top_k)
            .await;

        Ok(StatusReport {
            index_name: self.index.name().to_owned(),
            handle,
            stats,
            sample,
            test_query: STATUS_TEST_QUERY,
            test_results,
        })
    }

    #[must_use]
    pub fn handle(&self) -> SharedIndexHandle {
        Arc::clone(&self.handle)
    }
}
