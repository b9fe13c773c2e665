use super::{Config, IndexBackend, SourceKind};

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_pipeline();
        self.apply_env_overrides_serving();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("AVEN_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("AVEN_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("AVEN_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("AVEN_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("AVEN_LLM_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.llm.temperature = t;
        }
        if let Ok(v) = std::env::var("AVEN_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
        if let Ok(v) = std::env::var("AVEN_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
    }

    fn apply_env_overrides_pipeline(&mut self) {
        if let Ok(v) = std::env::var("AVEN_INDEX_BACKEND") {
            match v.parse::<IndexBackend>() {
                Ok(backend) => self.index.backend = backend,
                Err(e) => tracing::warn!("ignoring invalid AVEN_INDEX_BACKEND value: {e}"),
            }
        }
        if let Ok(v) = std::env::var("AVEN_INDEX_NAME") {
            self.index.name = v;
        }
        if let Ok(v) = std::env::var("AVEN_QDRANT_URL") {
            self.index.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("AVEN_CHUNK_MAX_TOKENS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.max_tokens = n;
        }
        if let Ok(v) = std::env::var("AVEN_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.overlap = n;
        }
        if let Ok(v) = std::env::var("AVEN_TOKENIZER_PATH") {
            self.chunking.tokenizer_path = Some(v).filter(|p| !p.trim().is_empty());
        }
        if let Ok(v) = std::env::var("AVEN_INGEST_SOURCES") {
            self.ingest.sources = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = std::env::var("AVEN_INGEST_EMBED_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.embed_batch_size = n;
        }
        if let Ok(v) = std::env::var("AVEN_INGEST_UPSERT_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.ingest.upsert_batch_size = n;
        }
        if let Ok(v) = std::env::var("AVEN_SOURCES_KIND") {
            match v.parse::<SourceKind>() {
                Ok(kind) => self.sources.kind = kind,
                Err(e) => tracing::warn!("ignoring invalid AVEN_SOURCES_KIND value: {e}"),
            }
        }
        if let Ok(v) = std::env::var("AVEN_FIRECRAWL_BASE_URL") {
            self.sources.firecrawl_base_url = v;
        }
    }

    fn apply_env_overrides_serving(&mut self) {
        if let Ok(v) = std::env::var("AVEN_RETRIEVAL_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k = k;
        }
        if let Ok(v) = std::env::var("AVEN_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("AVEN_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("AVEN_GATEWAY_RATE_LIMIT")
            && let Ok(rate) = v.parse::<u32>()
        {
            self.gateway.rate_limit = rate;
        }
    }
}
