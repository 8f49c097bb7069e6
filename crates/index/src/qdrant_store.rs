use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::vector_store::{CollectionHandle, Metadata, VectorMatch, VectorStore};

/// Payload key holding the caller's string id; Qdrant itself only takes u64/uuid ids.
const ID_KEY: &str = "chunk_id";

/// Qdrant over its REST API.
#[derive(Clone)]
pub struct QdrantStore {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: Metadata,
}

#[derive(Deserialize)]
struct CollectionInfo {
    result: CollectionResult,
}

#[derive(Deserialize)]
struct CollectionResult {
    collections: Vec<Collection>,
}

#[derive(Deserialize)]
struct Collection {
    name: String,
}

impl QdrantStore {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Stable u64 point id derived from a string id
    pub fn point_id(id: &str) -> u64 {
        let digest = Sha256::digest(id.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        anyhow::bail!("Failed to {} ({}): {}", what, status, error_text)
    }
}

/// Turn a `/points/search` response body into matches.
pub(crate) fn parse_search_response(body: &serde_json::Value) -> Result<Vec<VectorMatch>> {
    let points = body["result"]
        .as_array()
        .context("Invalid Qdrant response format")?;

    let mut matches = Vec::with_capacity(points.len());
    for point in points {
        let score = point["score"].as_f64().unwrap_or(0.0) as f32;
        let metadata: Metadata = point["payload"]
            .as_object()
            .context("Missing payload")?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let id = metadata
            .get(ID_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| point["id"].to_string());

        matches.push(VectorMatch {
            id,
            score,
            metadata,
        });
    }

    Ok(matches)
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_or_get_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<CollectionHandle> {
        let existing = self.list_collections().await?;
        if existing.iter().any(|c| c == name) {
            info!(collection = name, "Collection already exists");
            return Ok(CollectionHandle::new(name));
        }

        let url = format!("{}/collections/{}", self.base_url, name);
        let create_req = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self
            .client
            .put(&url)
            .json(&create_req)
            .send()
            .await
            .context("Failed to send create collection request")?;
        Self::check(response, "create collection").await?;

        info!(collection = name, dimension, "Collection created");
        Ok(CollectionHandle::new(name))
    }

    async fn upsert(
        &self,
        collection: &CollectionHandle,
        id: &str,
        vector: Vec<f32>,
        mut metadata: Metadata,
    ) -> Result<()> {
        metadata.insert(ID_KEY.to_string(), json!(id));

        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.base_url, collection.name
        );
        let upsert_req = UpsertPoints {
            points: vec![Point {
                id: Self::point_id(id),
                vector,
                payload: metadata,
            }],
        };

        let response = self
            .client
            .put(&url)
            .json(&upsert_req)
            .send()
            .await
            .context("Failed to send upsert request")?;
        Self::check(response, "upsert point").await?;

        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, collection.name
        );
        let body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send search request to Qdrant")?;
        let response = Self::check(response, "search").await?;

        let result: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Qdrant response")?;

        parse_search_response(&result)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to list collections")?;
        let response = Self::check(response, "list collections").await?;

        let info: CollectionInfo = response
            .json()
            .await
            .context("Failed to parse collection list")?;
        Ok(info.result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context("Failed to send delete collection request")?;
        Self::check(response, "delete collection").await?;

        info!(collection = name, "Collection deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_stable() {
        let a = QdrantStore::point_id("cv-emma-johnson_chunk0");
        assert_eq!(a, QdrantStore::point_id("cv-emma-johnson_chunk0"));
        assert_ne!(a, QdrantStore::point_id("cv-emma-johnson_chunk1"));
    }

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "result": [
                {"id": 11, "score": 0.91, "payload": {"chunk_id": "cv-ana_chunk1", "text": "Python"}},
                {"id": 12, "score": 0.40, "payload": {"text": "SQL"}}
            ],
            "status": "ok"
        });

        let matches = parse_search_response(&body).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "cv-ana_chunk1");
        assert_eq!(matches[0].text(), "Python");
        assert!((matches[0].score - 0.91).abs() < 1e-6);
        assert_eq!(matches[1].id, "12");
    }

    #[test]
    fn test_parse_search_response_rejects_garbage() {
        assert!(parse_search_response(&json!({"status": "error"})).is_err());
        assert!(parse_search_response(&json!({"result": [{"id": 1, "score": 0.1}]})).is_err());
    }
}
