use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub collection: String,
    pub chunk_id: String,
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(collection: &str, index: usize, text: String) -> Self {
        Self {
            collection: collection.to_string(),
            chunk_id: Self::generate_chunk_id(collection, index),
            index,
            text,
        }
    }

    /// `<collection>_chunk<index>`, unique within a collection
    pub fn generate_chunk_id(collection: &str, index: usize) -> String {
        format!("{}_chunk{}", collection, index)
    }
}
