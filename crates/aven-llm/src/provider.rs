use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
}

/// Remote service turning text into fixed-dimension vectors.
pub trait EmbeddingProvider: Provider {
    /// Embed a batch of texts, returning one vector per input in input order.
    ///
    /// An empty batch resolves to an empty result without any network call.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails or the response is malformed.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Same as [`EmbeddingProvider::embed_batch`].
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send {
        let batch = vec![text.to_owned()];
        async move {
            let mut vectors = self.embed_batch(&batch).await?;
            vectors.pop().ok_or(LlmError::EmptyResponse {
                provider: "embedding",
            })
        }
    }
}

/// Remote service turning a chat prompt into generated text.
pub trait GenerationProvider: Provider {
    /// Send messages to the model and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn generate(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn message_constructors() {
        let sys = Message::system("be brief");
        let user = Message::user("hi");
        assert_eq!(sys.role, Role::System);
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "hi");
    }

    struct FixedEmbedder;

    impl Provider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }
    }

    impl EmbeddingProvider for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            #[allow(clippy::cast_precision_loss)]
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    #[tokio::test]
    async fn embed_delegates_to_batch() {
        let v = FixedEmbedder.embed("abcd").await.unwrap();
        assert_eq!(v, vec![4.0]);
    }
}
