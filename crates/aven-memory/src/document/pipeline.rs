use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aven_llm::EmbeddingProvider;
use serde_json::json;

use super::{Chunk, ContentSource, Document, DocumentError, PlaceholderRecord, TextSplitter};
use crate::index::{IndexRecord, SharedIndexHandle, VectorIndex};

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub embed_batch_size: usize,
    pub upsert_batch_size: usize,
    /// Extra attempts per failed batch.
    pub max_retries: u32,
    /// Base delay, doubled on every retry.
    pub retry_backoff: Duration,
    pub id_prefix: String,
    /// Characters of chunk text kept in record metadata.
    pub metadata_chunk_chars: usize,
    /// Indexed instead of scraped content when no source yields any chunk.
    pub placeholders: Vec<PlaceholderRecord>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            embed_batch_size: 50,
            upsert_batch_size: 100,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            id_prefix: "aven".into(),
            metadata_chunk_chars: 1000,
            placeholders: PlaceholderRecord::defaults(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub record_count: usize,
    /// Set when the index holds placeholder records instead of scraped content.
    pub placeholder: bool,
    pub sources_fetched: usize,
    pub sources_unavailable: usize,
    pub sources_empty: usize,
    pub chunk_count: usize,
    pub skipped_embeddings: usize,
    pub dimension: u64,
    pub generation: u64,
}

/// Full rebuild of the index: fetch, chunk, embed, recreate, upsert.
pub struct IngestionPipeline<E> {
    splitter: TextSplitter,
    embedder: Arc<E>,
    source: Arc<dyn ContentSource>,
    index: Arc<VectorIndex>,
    handle: SharedIndexHandle,
    config: IngestionConfig,
    running: tokio::sync::Mutex<()>,
}

impl<E> std::fmt::Debug for IngestionPipeline<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("splitter", &self.splitter)
            .field("source", &self.source.name())
            .field("index", &self.index)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: EmbeddingProvider> IngestionPipeline<E> {
    #[must_use]
    pub fn new(
        splitter: TextSplitter,
        embedder: Arc<E>,
        source: Arc<dyn ContentSource>,
        index: Arc<VectorIndex>,
        handle: SharedIndexHandle,
        config: IngestionConfig,
    ) -> Self {
        Self {
            splitter,
            embedder,
            source,
            index,
            handle,
            config,
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Rebuild the index from `urls`, in order.
    ///
    /// Unreachable or empty sources are skipped. The previous index generation
    /// survives any failure that happens before the index is recreated.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::IngestionInProgress`] if another run is active,
    /// [`DocumentError::NoEmbeddings`] if nothing could be embedded, or the
    /// embedding/storage error once retries are exhausted.
    pub async fn run(&self, urls: &[String]) -> Result<IngestionReport, DocumentError> {
        let Ok(_guard) = self.running.try_lock() else {
            return Err(DocumentError::IngestionInProgress);
        };

        let mut report = IngestionReport::default();
        let mut chunks = self.collect_chunks(urls, &mut report).await?;

        if chunks.is_empty() {
            tracing::warn!(
                count = self.config.placeholders.len(),
                "no content scraped from any source, indexing placeholder records"
            );
            chunks = self.placeholder_chunks();
            report.placeholder = true;
        }
        report.chunk_count = chunks.len();

        let vectors = self.embed_all(&chunks).await?;

        let mut dimension: Option<usize> = None;
        let mut records = Vec::with_capacity(chunks.len());
        for (seq, (chunk, vector)) in chunks.iter().zip(vectors).enumerate() {
            if vector.is_empty() {
                tracing::warn!(seq, source = %chunk.source, "empty embedding, skipping chunk");
                report.skipped_embeddings += 1;
                continue;
            }
            let expected = *dimension.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(DocumentError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            records.push(self.record(seq, chunk, vector, report.placeholder));
        }

        let Some(dimension) = dimension else {
            return Err(DocumentError::NoEmbeddings);
        };

        let handle = self.index.recreate(dimension as u64).await?;
        *self.handle.write().await = Some(handle.clone());

        let batches = records.chunks(self.config.upsert_batch_size.max(1));
        let batch_total = batches.len();
        for (i, batch) in batches.enumerate() {
            tracing::debug!(batch = i + 1, of = batch_total, size = batch.len(), "upserting");
            self.with_retries("upsert", || self.index.upsert(&handle, batch.to_vec()))
                .await?;
        }

        report.record_count = records.len();
        report.dimension = handle.dimension;
        report.generation = handle.generation;
        tracing::info!(
            records = report.record_count,
            placeholder = report.placeholder,
            generation = report.generation,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn collect_chunks(
        &self,
        urls: &[String],
        report: &mut IngestionReport,
    ) -> Result<Vec<Chunk>, DocumentError> {
        let mut chunks = Vec::new();
        for url in urls {
            let document: Document = match self.source.fetch(url).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(%url, source = self.source.name(), "source unavailable: {e}");
                    report.sources_unavailable += 1;
                    continue;
                }
            };
            report.sources_fetched += 1;

            let doc_chunks = self.splitter.split(&document)?;
            if doc_chunks.is_empty() {
                tracing::warn!(%url, "no content, skipping");
                report.sources_empty += 1;
                continue;
            }
            tracing::info!(%url, chunks = doc_chunks.len(), "chunked source");
            chunks.extend(doc_chunks);
        }
        Ok(chunks)
    }

    fn placeholder_chunks(&self) -> Vec<Chunk> {
        self.config
            .placeholders
            .iter()
            .filter(|p| !p.text.trim().is_empty())
            .map(|p| Chunk {
                source: p.url.clone(),
                text: p.text.trim().to_owned(),
                chunk_index: 0,
                token_start: 0,
                token_end: 0,
            })
            .collect()
    }

    async fn embed_all(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, DocumentError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        let batches = chunks.chunks(self.config.embed_batch_size.max(1));
        let batch_total = batches.len();
        for (i, batch) in batches.enumerate() {
            tracing::debug!(batch = i + 1, of = batch_total, size = batch.len(), "embedding");
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self
                .with_retries("embedding", || self.embedder.embed_batch(&texts))
                .await?;
            if embedded.len() != texts.len() {
                return Err(DocumentError::Embedding(aven_llm::LlmError::EmbeddingCount {
                    provider: "embedding",
                    expected: texts.len(),
                    actual: embedded.len(),
                }));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    fn record(&self, seq: usize, chunk: &Chunk, vector: Vec<f32>, placeholder: bool) -> IndexRecord {
        let stored: String = chunk
            .text
            .chars()
            .take(self.config.metadata_chunk_chars)
            .collect();
        let metadata: HashMap<String, serde_json::Value> = [
            ("url".to_owned(), json!(chunk.source)),
            ("chunk".to_owned(), json!(stored)),
            ("chunk_index".to_owned(), json!(chunk.chunk_index)),
            ("placeholder".to_owned(), json!(placeholder)),
        ]
        .into_iter()
        .collect();
        IndexRecord {
            id: format!("{}-{seq}", self.config.id_prefix),
            vector,
            metadata,
        }
    }

    async fn with_retries<T, Err, F, Fut>(&self, what: &str, mut op: F) -> Result<T, Err>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Err>>,
        Err: Display,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "{what} failed, retrying in {}ms ({attempt}/{}): {e}",
                        delay.as_millis(),
                        self.config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!("{what} failed after {attempt} retries: {e}");
                    return Err(e);
                }
            }
        }
    }
}
