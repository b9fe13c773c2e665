//! Chunking, vector indexing and semantic retrieval for the Aven RAG pipeline.

pub mod document;
pub mod in_memory_store;
pub mod index;
pub mod qdrant_ops;
pub mod retriever;
pub mod vector_store;

pub use document::{
    Chunk, ContentSource, Document, DocumentError, IngestionConfig, IngestionPipeline,
    IngestionReport, PlaceholderRecord, SourceError, SplitterConfig, TextSplitter,
};
pub use in_memory_store::InMemoryVectorStore;
pub use index::{
    DEFAULT_INDEX_NAME, IndexHandle, IndexRecord, IndexStats, SearchResult, SharedIndexHandle,
    StoredRecord, VectorIndex, shared_handle,
};
pub use qdrant_ops::QdrantOps;
pub use retriever::{RetrievalConfig, Retriever};
pub use vector_store::{
    CollectionInfo, PayloadPoint, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};
