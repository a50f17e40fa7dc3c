//! HTTP front end: a health probe and a `/process` endpoint running one
//! pipeline per request on a blocking worker.
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::Config;
use crate::embedder::cache::ModelCache;
use crate::output::{DOCX_FILE, STORIES_FILE, TABLE_FILE};
use crate::pipeline::{Pipeline, RunReport};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ModelCache>,
    /// Used when a request does not name a config file.
    pub default_config: String,
}

fn default_input_dir() -> String {
    "data/docs".to_string()
}

fn default_out_dir() -> String {
    "out".to_string()
}

fn default_query() -> String {
    "Project requirements".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default)]
    pub config_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Artifacts {
    pub docx: String,
    pub excel: String,
    pub stories: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub result: RunReport,
    pub artifacts: Artifacts,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    error!("Request failed: {err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: format!("{err:#}"),
        }),
    )
}

fn artifact_path(out_dir: &str, file: &str) -> String {
    Path::new(out_dir)
        .join(file)
        .to_string_lossy()
        .replace('\\', "/")
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/process", post(process))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid bind address {addr}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let config_path = request
        .config_path
        .clone()
        .unwrap_or_else(|| state.default_config.clone());
    let cache = Arc::clone(&state.cache);
    let (input_dir, out_dir, query) = (
        request.input_dir.clone(),
        request.out_dir.clone(),
        request.query.clone(),
    );
    // Config loading and the pipeline both block
    let result = tokio::task::spawn_blocking(move || -> Result<RunReport, ApiError> {
        let config = Config::load(&config_path).map_err(|e| bad_request(format!("{e:#}")))?;
        Pipeline::new(config)
            .with_cache(cache)
            .run(&input_dir, &out_dir, &query)
            .map_err(internal_error)
    })
    .await
    .map_err(|e| internal_error(anyhow::anyhow!("pipeline worker failed: {e}")))??;

    Ok(Json(ProcessResponse {
        result,
        artifacts: Artifacts {
            docx: artifact_path(&request.out_dir, DOCX_FILE),
            excel: artifact_path(&request.out_dir, TABLE_FILE),
            stories: artifact_path(&request.out_dir, STORIES_FILE),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState {
            cache: Arc::new(ModelCache::new()),
            default_config: "/nonexistent/config.yaml".into(),
        }
    }

    #[test]
    fn test_request_defaults() {
        let request: ProcessRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.input_dir, "data/docs");
        assert_eq!(request.out_dir, "out");
        assert_eq!(request.query, "Project requirements");
        assert!(request.config_path.is_none());
    }

    #[test]
    fn test_artifact_paths() {
        assert_eq!(artifact_path("out", DOCX_FILE), "out/requirements.docx");
        assert_eq!(artifact_path("out/run1", TABLE_FILE), "out/run1/requirements.csv");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_config_is_bad_request() {
        let request: ProcessRequest = serde_json::from_str(r#"{"input_dir": "docs"}"#).unwrap();
        let (status, Json(body)) = process(State(state()), Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("config"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_bad_request() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("config.yaml");
        std::fs::write(&config, "chunking:\n  size: 10\n").unwrap();
        let request = ProcessRequest {
            input_dir: temp.path().to_string_lossy().into_owned(),
            out_dir: temp.path().join("out").to_string_lossy().into_owned(),
            query: default_query(),
            config_path: Some(config.to_string_lossy().into_owned()),
        };
        let (status, _) = process(State(state()), Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!temp.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_process_runs_pipeline() {
        let temp = tempfile::tempdir().unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "The service must respond within two seconds").unwrap();
        let config = temp.path().join("config.yaml");
        std::fs::write(
            &config,
            "chunking:\n  size: 0\n  overlap: 0\nembedding:\n  model: hash\n  dimensions: 16\noutput:\n  generate_docx: false\n  generate_excel: true\nsectioning:\n  allow_api: false\nloader:\n  extensions: [\".txt\"]\n",
        )
        .unwrap();
        let out = temp.path().join("out");

        let request = ProcessRequest {
            input_dir: docs.to_string_lossy().into_owned(),
            out_dir: out.to_string_lossy().into_owned(),
            query: default_query(),
            config_path: Some(config.to_string_lossy().into_owned()),
        };
        let Json(response) = process(State(state()), Json(request)).await.unwrap();
        assert!(response.result.message.is_none());
        assert_eq!(response.result.prioritized.len(), 1);
        assert!(response.artifacts.excel.ends_with("requirements.csv"));
        assert!(out.join(TABLE_FILE).exists());
        assert!(out.join(STORIES_FILE).exists());
    }
}
