//! Build concrete collaborators from [`Config`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use aven_llm::openai::OpenAiProvider;
use aven_memory::{
    ContentSource, InMemoryVectorStore, QdrantOps, TextSplitter, VectorStore,
};
use aven_sources::{FirecrawlSource, WebSource};

use crate::config::{Config, IndexBackend, SourceKind};
use crate::service::RagService;

/// Production service: one OpenAI-compatible client for embeddings and chat.
pub type AppService = RagService<OpenAiProvider, OpenAiProvider>;

/// # Errors
///
/// Returns an error if the configuration is invalid, the API key is missing,
/// or a backend cannot be constructed.
pub fn build_service(config: &Config) -> anyhow::Result<AppService> {
    config.validate().context("invalid configuration")?;

    let provider = Arc::new(build_provider(config)?);
    let store = build_store(config)?;
    let source = build_source(config);
    let splitter = build_splitter(config)?;

    tracing::info!(
        model = provider.model(),
        backend = config.index.backend.as_str(),
        index = %config.index.name,
        source = source.name(),
        "service configured"
    );

    Ok(RagService::new(
        Arc::clone(&provider),
        provider,
        store,
        source,
        splitter,
        config,
    ))
}

/// # Errors
///
/// Returns an error if no OpenAI API key was resolved.
pub fn build_provider(config: &Config) -> anyhow::Result<OpenAiProvider> {
    let api_key = config
        .secrets
        .openai_api_key
        .as_ref()
        .context("OpenAI API key not found: set AVEN_OPENAI_API_KEY or OPENAI_API_KEY")?;

    let client = aven_llm::http::client_with_timeout(Duration::from_secs(
        config.timeouts.llm_seconds,
    ));

    Ok(OpenAiProvider::new(
        api_key.expose().to_owned(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
        Some(config.llm.embedding_model.clone()),
    )
    .with_client(client)
    .with_temperature(config.llm.temperature)
    .with_max_retries(config.llm.max_retries))
}

/// # Errors
///
/// Returns an error if the Qdrant client cannot be created.
pub fn build_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.index.backend {
        IndexBackend::Qdrant => {
            let api_key = config
                .secrets
                .qdrant_api_key
                .as_ref()
                .map(|s| s.expose().to_owned());
            let ops = QdrantOps::new(&config.index.qdrant_url, api_key).map_err(|e| {
                anyhow::anyhow!("failed to create Qdrant client for {}: {e}", config.index.qdrant_url)
            })?;
            Ok(Arc::new(ops))
        }
        IndexBackend::Memory => {
            tracing::warn!("using the in-memory vector store, the index is lost on exit");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

/// Firecrawl when configured with a key, otherwise direct page fetches.
#[must_use]
pub fn build_source(config: &Config) -> Arc<dyn ContentSource> {
    let web = || {
        Arc::new(WebSource::new(
            Duration::from_secs(config.sources.web_timeout_seconds),
            config.sources.web_max_body_bytes,
        )) as Arc<dyn ContentSource>
    };

    match (config.sources.kind, &config.secrets.firecrawl_api_key) {
        (SourceKind::Firecrawl, Some(key)) => Arc::new(FirecrawlSource::new(
            key.expose().to_owned(),
            config.sources.firecrawl_base_url.clone(),
        )),
        (SourceKind::Firecrawl, None) => {
            tracing::warn!("Firecrawl API key not found, fetching pages directly");
            web()
        }
        (SourceKind::Web, _) => web(),
    }
}

/// # Errors
///
/// Returns an error if the chunking settings are invalid or the tokenizer file
/// cannot be loaded.
pub fn build_splitter(config: &Config) -> anyhow::Result<TextSplitter> {
    let splitter_config = config.splitter_config();

    if let Some(path) = config.chunking.tokenizer_path.as_deref() {
        #[cfg(feature = "hf-tokenizer")]
        {
            let codec = aven_memory::document::HfCodec::from_file(path)
                .with_context(|| format!("failed to load tokenizer from {path}"))?;
            return TextSplitter::with_codec(splitter_config, Arc::new(codec))
                .context("invalid chunking configuration");
        }
        #[cfg(not(feature = "hf-tokenizer"))]
        tracing::warn!(
            path,
            "tokenizer_path set but the hf-tokenizer feature is disabled, using word tokens"
        );
    }

    TextSplitter::new(splitter_config).context("invalid chunking configuration")
}
