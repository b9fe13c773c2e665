#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] aven_llm::LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] crate::vector_store::VectorStoreError),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no embeddable chunks produced; index left untouched")]
    NoEmbeddings,

    #[error("an ingestion run is already in progress")]
    IngestionInProgress,
}

/// Failure fetching a single source. Never fatal for an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("blocked host: {0}")]
    Blocked(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("{source_name} returned status {status} for {url}")]
    Status {
        source_name: String,
        url: String,
        status: u16,
    },

    #[error("response too large: {0} bytes")]
    TooLarge(usize),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no content configured for {0}")]
    NotFound(String),
}
