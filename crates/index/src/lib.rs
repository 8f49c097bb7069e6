pub mod builder;
pub mod embeddings;
pub mod mapping;
pub mod memory_store;
pub mod pacing;
pub mod qdrant_store;
pub mod retry;
pub mod vector_store;

pub use builder::{IndexStats, ResumeIndexBuilder};
pub use embeddings::{EmbeddingProvider, OllamaEmbedder};
pub use mapping::CollectionMapping;
pub use memory_store::InMemoryVectorStore;
pub use pacing::Pacing;
pub use qdrant_store::QdrantStore;
pub use retry::{RetryConfig, RetryPolicy};
pub use vector_store::{CollectionHandle, Metadata, VectorMatch, VectorStore};
