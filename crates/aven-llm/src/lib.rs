//! Embedding and text-generation providers for the Aven pipeline.

pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;
mod retry;

pub use error::LlmError;
pub use provider::{EmbeddingProvider, GenerationProvider, Message, Provider, Role};
