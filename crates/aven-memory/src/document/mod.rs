pub mod codec;
pub mod error;
pub mod pipeline;
pub mod splitter;
pub mod types;

pub use codec::{TokenCodec, WordCodec};
#[cfg(feature = "hf-tokenizer")]
pub use codec::HfCodec;
pub use error::{DocumentError, SourceError};
pub use pipeline::{IngestionConfig, IngestionPipeline, IngestionReport};
pub use splitter::{SplitterConfig, TextSplitter, chunk};
pub use types::{Chunk, Document, PlaceholderRecord};

/// Yields the raw text behind a source identifier (a URL).
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        url: &str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Document, SourceError>> + Send + '_>,
    >;
}
