#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("{provider} API request failed (status {status})")]
    Status { provider: &'static str, status: u16 },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} returned {actual} embeddings for {expected} inputs")]
    EmbeddingCount {
        provider: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: &'static str },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Whether the failure is transient and worth retrying at a higher layer.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient() {
        assert!(LlmError::RateLimited.is_transient());
        assert!(LlmError::Timeout(5).is_transient());
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let server = LlmError::Status {
            provider: "openai",
            status: 503,
        };
        let client = LlmError::Status {
            provider: "openai",
            status: 401,
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
    }

    #[test]
    fn embedding_count_message() {
        let err = LlmError::EmbeddingCount {
            provider: "openai",
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "openai returned 2 embeddings for 3 inputs");
    }
}
