use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Metadata = HashMap<String, serde_json::Value>;

/// A collection that is known to exist in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionHandle {
    pub name: String,
}

impl CollectionHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Metadata,
}

impl VectorMatch {
    /// Stored chunk text, empty when the payload has none.
    pub fn text(&self) -> &str {
        self.metadata
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_or_get_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<CollectionHandle>;

    async fn upsert(
        &self,
        collection: &CollectionHandle,
        id: &str,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<()>;

    /// Nearest neighbours, best first.
    async fn query(
        &self,
        collection: &CollectionHandle,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn delete_collection(&self, name: &str) -> Result<()>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
