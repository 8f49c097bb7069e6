pub mod chunk;
pub mod chunker;
pub mod normalizer;
pub mod reader;
pub mod tokenizer;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig, DEFAULT_OVERLAP_TOKENS};
pub use normalizer::{COLLECTION_PREFIX, collection_id, normalize};
pub use reader::{ResumeReader, ResumeRecord};
pub use tokenizer::{CharTokenizer, HfTokenizer, Tokenizer};

use anyhow::Result;
use std::path::Path;

/// Read every résumé in a CSV file
pub async fn ingest_file(file_path: &Path) -> Result<Vec<ResumeRecord>> {
    let records = ResumeReader::read_file(file_path).await?;
    tracing::info!(path = ?file_path, resumes = records.len(), "Read résumé file");
    Ok(records)
}
