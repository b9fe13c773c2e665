use serde::{Deserialize, Serialize};

use aven_memory::{DEFAULT_INDEX_NAME, PlaceholderRecord};

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Retries on HTTP 429 before giving up.
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}

fn default_max_tokens() -> u32 {
    400
}

fn default_temperature() -> f32 {
    0.7
}

fn default_llm_max_retries() -> u32 {
    3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_llm_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Qdrant,
    Memory,
}

impl IndexBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qdrant => "qdrant",
            Self::Memory => "memory",
        }
    }
}

impl std::str::FromStr for IndexBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown index backend: {other}")),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: IndexBackend,
    #[serde(default = "default_index_name")]
    pub name: String,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.into()
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            name: default_index_name(),
            qdrant_url: default_qdrant_url(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
    /// `tokenizer.json` for the Hugging Face codec; word tokens when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<String>,
}

fn default_chunk_max_tokens() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_chunk_max_tokens(),
            overlap: default_chunk_overlap(),
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_ingest_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
    #[serde(default = "default_ingest_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    #[serde(default = "default_metadata_chunk_chars")]
    pub metadata_chunk_chars: usize,
    #[serde(default = "PlaceholderRecord::defaults")]
    pub placeholders: Vec<PlaceholderRecord>,
}

fn default_ingest_sources() -> Vec<String> {
    [
        "https://www.aven.com/support",
        "https://www.aven.com/about",
        "https://www.aven.com/education",
        "https://www.trustpilot.com/review/aven.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_embed_batch_size() -> usize {
    50
}

fn default_upsert_batch_size() -> usize {
    100
}

fn default_ingest_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_id_prefix() -> String {
    "aven".into()
}

fn default_metadata_chunk_chars() -> usize {
    1000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sources: default_ingest_sources(),
            embed_batch_size: default_embed_batch_size(),
            upsert_batch_size: default_upsert_batch_size(),
            max_retries: default_ingest_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            id_prefix: default_id_prefix(),
            metadata_chunk_chars: default_metadata_chunk_chars(),
            placeholders: PlaceholderRecord::defaults(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Firecrawl,
    Web,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firecrawl" => Ok(Self::Firecrawl),
            "web" => Ok(Self::Web),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_firecrawl_base_url")]
    pub firecrawl_base_url: String,
    #[serde(default = "default_web_timeout_seconds")]
    pub web_timeout_seconds: u64,
    #[serde(default = "default_web_max_body_bytes")]
    pub web_max_body_bytes: usize,
}

fn default_firecrawl_base_url() -> String {
    aven_sources::firecrawl::DEFAULT_BASE_URL.into()
}

fn default_web_timeout_seconds() -> u64 {
    30
}

fn default_web_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            firecrawl_base_url: default_firecrawl_base_url(),
            web_timeout_seconds: default_web_timeout_seconds(),
            web_max_body_bytes: default_web_max_body_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// Prompt wording and fallback texts of the answer composer.
///
/// `prompt_template` substitutes `{context}` and `{query}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnswerConfig {
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,
    #[serde(default = "default_fallback_context_chars")]
    pub fallback_context_chars: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
    #[serde(default = "default_no_results_message")]
    pub no_results_message: String,
    #[serde(default = "default_no_content_message")]
    pub no_content_message: String,
    #[serde(default = "default_fallback_prefix")]
    pub fallback_prefix: String,
    #[serde(default = "default_fallback_suffix")]
    pub fallback_suffix: String,
}

fn default_max_context_chunks() -> usize {
    3
}

fn default_fallback_context_chars() -> usize {
    300
}

fn default_system_prompt() -> String {
    "You are a helpful Aven customer service assistant. Be helpful and informative while \
     being honest about what information is and isn't available."
        .into()
}

fn default_prompt_template() -> String {
    "You are a helpful assistant for Aven, a financial technology company. Based on the \
     following information from Aven's website, please answer the user's question. If the \
     exact information isn't available, provide what relevant information you can and suggest \
     they contact Aven directly for specific details.\n\n\
     Context from Aven website:\n{context}\n\n\
     User question: {query}\n\n\
     Please provide a helpful response. If specific details aren't mentioned (like exact \
     credit score requirements), explain what general information is available and suggest \
     contacting Aven for precise details."
        .into()
}

fn default_no_results_message() -> String {
    "I don't have specific information about that topic. For detailed information about Aven \
     credit cards, requirements, and services, I recommend visiting aven.com or contacting \
     customer support at 1-800-AVEN-HELP."
        .into()
}

fn default_no_content_message() -> String {
    "I found some results but couldn't extract the content. Please try rephrasing your \
     question or contact Aven support for specific details."
        .into()
}

fn default_fallback_prefix() -> String {
    "Based on Aven's information: ".into()
}

fn default_fallback_suffix() -> String {
    "... For specific details about your question, please contact Aven support for \
     personalized assistance."
        .into()
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            max_context_chunks: default_max_context_chunks(),
            fallback_context_chars: default_fallback_context_chars(),
            system_prompt: default_system_prompt(),
            prompt_template: default_prompt_template(),
            no_results_message: default_no_results_message(),
            no_content_message: default_no_content_message(),
            fallback_prefix: default_fallback_prefix(),
            fallback_suffix: default_fallback_suffix(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Requests per minute per client IP; 0 disables the limit.
    #[serde(default = "default_gateway_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_gateway_max_body")]
    pub max_body_size: usize,
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_rate_limit() -> u32 {
    120
}

fn default_gateway_max_body() -> usize {
    65_536
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            rate_limit: default_gateway_rate_limit(),
            max_body_size: default_gateway_max_body(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_llm_timeout")]
    pub llm_seconds: u64,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_seconds: u64,
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_embedding_timeout() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_seconds: default_llm_timeout(),
            embedding_seconds: default_embedding_timeout(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
    pub firecrawl_api_key: Option<Secret>,
    pub qdrant_api_key: Option<Secret>,
}
