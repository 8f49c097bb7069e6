use agent::AgentReply;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use index::VectorStore;
use ingest::COLLECTION_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Serialize, Deserialize)]
pub struct AskResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub reply: AgentReply,
}

#[derive(Deserialize)]
pub struct IndexRequest {
    pub csv_path: String,
    /// Drop existing résumé collections first
    #[serde(default)]
    pub reset: bool,
}

#[derive(Serialize, Deserialize)]
pub struct IndexResponse {
    pub stats: index::IndexStats,
    pub deleted_collections: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CollectionsResponse {
    pub collections: Vec<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    ollama: String,
    qdrant: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ask", post(ask))
        .route("/index", post(build_index))
        .route("/collections", get(list_collections).delete(purge_collections))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> AppResult<Json<AskResponse>> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("question must not be empty".to_string()));
    }

    let session_id = Uuid::new_v4();
    let reply = state
        .agent
        .ask(question)
        .instrument(info_span!("session", id = %session_id))
        .await?;

    Ok(Json(AskResponse { session_id, reply }))
}

async fn build_index(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> AppResult<Json<IndexResponse>> {
    let path = PathBuf::from(&req.csv_path);
    if !path.is_file() {
        return Err(AppError::NotFound(format!("no such file: {}", req.csv_path)));
    }

    let _maintenance = state.maintenance.lock().await;
    let deleted_collections = if req.reset {
        state.builder.purge_collections(COLLECTION_PREFIX).await?
    } else {
        Vec::new()
    };

    let records = ingest::ingest_file(&path).await?;
    let stats = state
        .builder
        .build_and_save(&records, &state.mapping_path)
        .await?;

    info!(resumes = stats.num_resumes, chunks = stats.num_chunks, "Index rebuilt");
    Ok(Json(IndexResponse {
        stats,
        deleted_collections,
    }))
}

async fn list_collections(State(state): State<AppState>) -> AppResult<Json<CollectionsResponse>> {
    let collections = state.store.list_collections().await?;
    Ok(Json(CollectionsResponse { collections }))
}

async fn purge_collections(State(state): State<AppState>) -> AppResult<Json<CollectionsResponse>> {
    let _maintenance = state.maintenance.lock().await;
    let collections = state.builder.purge_collections(COLLECTION_PREFIX).await?;
    Ok(Json(CollectionsResponse { collections }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ollama: probe(&format!("{}/api/tags", state.health.ollama_url)).await,
        qdrant: probe(&format!("{}/", state.health.qdrant_url)).await,
    })
}

async fn probe(url: &str) -> String {
    match reqwest::get(url).await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HealthTargets;
    use agent::{Agent, AgentConfig, Completion, CompletionService, Message, SessionStatus, TokenUsage};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use index::{EmbeddingProvider, InMemoryVectorStore, Pacing, ResumeIndexBuilder, VectorStore};
    use ingest::{CharTokenizer, Tokenizer};
    use query::Retriever;
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Looks up whoever the question names, then answers with what it observed.
    struct EchoModel;

    #[async_trait]
    impl CompletionService for EchoModel {
        async fn complete(&self, messages: &[Message]) -> anyhow::Result<Completion> {
            let last = &messages[messages.len() - 1].content;
            let text = match last.strip_prefix("Observación: ") {
                Some(observation) => format!("Respuesta: {}", observation.replace('\n', " | ")),
                None => format!("Pensamiento: busco\nAcción: buscar_cv: {}\nPAUSA", last),
            };
            Ok(Completion {
                text,
                usage: TokenUsage::new(3, 2),
            })
        }
    }

    struct LengthEmbedder {
        tokenizer: CharTokenizer,
    }

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![1.0, text.len() as f32])
        }

        fn tokenizer(&self) -> &dyn Tokenizer {
            &self.tokenizer
        }
    }

    fn test_state(dir: &Path) -> AppState {
        let embedder = Arc::new(LengthEmbedder {
            tokenizer: CharTokenizer::new(64),
        });
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let mapping_path = dir.join("mapping.json");

        let retriever = Retriever::new(embedder.clone(), store.clone(), mapping_path.clone());
        let agent = Agent::new(
            Arc::new(EchoModel),
            Arc::new(retriever),
            AgentConfig {
                action_pacing: Pacing::Disabled,
                ..AgentConfig::default()
            },
        );

        AppState {
            agent: Arc::new(agent),
            builder: Arc::new(ResumeIndexBuilder::new(
                embedder,
                store.clone(),
                4,
                Pacing::Disabled,
            )),
            store,
            mapping_path,
            health: HealthTargets {
                ollama_url: "http://127.0.0.1:9".to_string(),
                qdrant_url: "http://127.0.0.1:9".to_string(),
            },
            maintenance: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_then_ask() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("resumes.csv");
        tokio::fs::write(&csv_path, "Name,Resume\nJosé Pérez,Backend en Rust\n")
            .await
            .unwrap();
        let app = router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(post_json(
                "/index",
                serde_json::json!({ "csv_path": csv_path.to_string_lossy() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let indexed: IndexResponse = body_json(response).await;
        assert_eq!(indexed.stats.num_resumes, 1);
        assert_eq!(indexed.stats.num_chunks, 1);

        let response = app
            .oneshot(post_json("/ask", serde_json::json!({ "question": "jose perez" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let asked: AskResponse = body_json(response).await;
        assert_eq!(asked.reply.status, SessionStatus::Answered);
        assert_eq!(asked.reply.answer, "Backend en Rust");
        assert_eq!(asked.reply.total_tokens, 10);
        assert_eq!(asked.reply.transcript.len(), 5);
    }

    #[tokio::test]
    async fn test_ask_unknown_person_gets_not_found_observation() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        index::CollectionMapping::new()
            .save(&state.mapping_path)
            .await
            .unwrap();

        let response = router(state)
            .oneshot(post_json("/ask", serde_json::json!({ "question": "Nadie" })))
            .await
            .unwrap();

        let asked: AskResponse = body_json(response).await;
        assert_eq!(asked.reply.answer, query::not_found_message("Nadie"));
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_question() {
        let dir = tempfile::tempdir().unwrap();

        let response = router(test_state(dir.path()))
            .oneshot(post_json("/ask", serde_json::json!({ "question": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_internal_errors_are_generic() {
        // No mapping file yet: the lookup fails inside the session
        let dir = tempfile::tempdir().unwrap();

        let response = router(test_state(dir.path()))
            .oneshot(post_json("/ask", serde_json::json!({ "question": "Ana" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["message"], "The request could not be completed");
    }

    #[tokio::test]
    async fn test_collections_list_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.store.create_or_get_collection("cv-ana", 2).await.unwrap();
        state.store.create_or_get_collection("notes", 2).await.unwrap();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(Request::get("/collections").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed: CollectionsResponse = body_json(response).await;
        assert_eq!(listed.collections, vec!["cv-ana", "notes"]);

        let response = app
            .clone()
            .oneshot(Request::delete("/collections").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let purged: CollectionsResponse = body_json(response).await;
        assert_eq!(purged.collections, vec!["cv-ana"]);
    }

    #[tokio::test]
    async fn test_purge_waits_for_running_maintenance() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.store.create_or_get_collection("cv-ana", 2).await.unwrap();
        let maintenance = state.maintenance.clone();
        let app = router(state);

        let build = maintenance.lock().await;
        let purge = tokio::spawn(
            app.oneshot(Request::delete("/collections").body(Body::empty()).unwrap()),
        );

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!purge.is_finished());

        drop(build);
        let response = purge.await.unwrap().unwrap();
        let purged: CollectionsResponse = body_json(response).await;
        assert_eq!(purged.collections, vec!["cv-ana"]);
    }

    #[tokio::test]
    async fn test_index_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let response = router(test_state(dir.path()))
            .oneshot(post_json("/index", serde_json::json!({ "csv_path": "/no/such.csv" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
