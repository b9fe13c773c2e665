mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use aven_memory::{IngestionConfig, RetrievalConfig, SplitterConfig};

use crate::vault::{Secret, VaultProvider};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("chunking.overlap ({overlap}) must be smaller than chunking.max_tokens ({max_tokens})")]
    Overlap { max_tokens: usize, overlap: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("answer.prompt_template must contain {{query}}")]
    Template,
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve API keys through the vault. `AVEN_*` names win over the bare
    /// provider names.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = first_secret(vault, &["AVEN_OPENAI_API_KEY", "OPENAI_API_KEY"]).await? {
            self.secrets.openai_api_key = Some(Secret::new(val));
        }
        if let Some(val) =
            first_secret(vault, &["AVEN_FIRECRAWL_API_KEY", "FIRECRAWL_API_KEY"]).await?
        {
            self.secrets.firecrawl_api_key = Some(Secret::new(val));
        }
        if let Some(val) = first_secret(vault, &["AVEN_QDRANT_API_KEY", "QDRANT_API_KEY"]).await? {
            self.secrets.qdrant_api_key = Some(Secret::new(val));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_tokens == 0 {
            return Err(ConfigError::Zero("chunking.max_tokens"));
        }
        if self.chunking.overlap >= self.chunking.max_tokens {
            return Err(ConfigError::Overlap {
                max_tokens: self.chunking.max_tokens,
                overlap: self.chunking.overlap,
            });
        }
        if self.ingest.embed_batch_size == 0 {
            return Err(ConfigError::Zero("ingest.embed_batch_size"));
        }
        if self.ingest.upsert_batch_size == 0 {
            return Err(ConfigError::Zero("ingest.upsert_batch_size"));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Zero("retrieval.top_k"));
        }
        if self.answer.max_context_chunks == 0 {
            return Err(ConfigError::Zero("answer.max_context_chunks"));
        }
        if self.timeouts.llm_seconds == 0 {
            return Err(ConfigError::Zero("timeouts.llm_seconds"));
        }
        if self.timeouts.embedding_seconds == 0 {
            return Err(ConfigError::Zero("timeouts.embedding_seconds"));
        }
        if self.index.name.trim().is_empty() {
            return Err(ConfigError::Empty("index.name"));
        }
        if self.ingest.id_prefix.is_empty() {
            return Err(ConfigError::Empty("ingest.id_prefix"));
        }
        if self.ingest.metadata_chunk_chars == 0 {
            return Err(ConfigError::Zero("ingest.metadata_chunk_chars"));
        }
        if self.ingest.placeholders.is_empty() {
            return Err(ConfigError::Empty("ingest.placeholders"));
        }
        if self
            .ingest
            .placeholders
            .iter()
            .any(|p| p.text.trim().is_empty())
        {
            return Err(ConfigError::Empty("ingest.placeholders.text"));
        }
        if !self.answer.prompt_template.contains("{query}") {
            return Err(ConfigError::Template);
        }
        Ok(())
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            max_tokens: self.chunking.max_tokens,
            overlap: self.chunking.overlap,
        }
    }

    #[must_use]
    pub fn ingestion_config(&self) -> IngestionConfig {
        IngestionConfig {
            embed_batch_size: self.ingest.embed_batch_size,
            upsert_batch_size: self.ingest.upsert_batch_size,
            max_retries: self.ingest.max_retries,
            retry_backoff: Duration::from_millis(self.ingest.retry_backoff_ms),
            id_prefix: self.ingest.id_prefix.clone(),
            metadata_chunk_chars: self.ingest.metadata_chunk_chars,
            placeholders: self.ingest.placeholders.clone(),
        }
    }

    #[must_use]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            top_k: self.retrieval.top_k,
            embed_timeout: Duration::from_secs(self.timeouts.embedding_seconds),
        }
    }
}

async fn first_secret(vault: &dyn VaultProvider, keys: &[&str]) -> anyhow::Result<Option<String>> {
    for key in keys {
        if let Some(val) = vault.get_secret(key).await?
            && !val.trim().is_empty()
        {
            return Ok(Some(val));
        }
    }
    Ok(None)
}
