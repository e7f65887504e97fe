pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/start-job",
            post(handlers::handle_start_job).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// CORS restricted to the configured origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::extraction::TextExtractor;
    use crate::llm_client::LlmError;
    use crate::screening::{
        BatchOptions, BatchProcessor, JudgmentService, ScoringEngine, ScoringLimits,
    };

    const BOUNDARY: &str = "screener-test-boundary";
    const JD: &str = "Looking for Python developer with SQL experience.";

    /// Text keyed by the client-side upload name (saved files carry a job prefix).
    struct SuffixExtractor;

    #[async_trait]
    impl TextExtractor for SuffixExtractor {
        async fn extract_text(&self, path: &Path) -> String {
            let name = path.to_string_lossy();
            if name.ends_with("john.pdf") {
                "John Doe\nPython developer with SQL knowledge.".to_string()
            } else if name.ends_with("jane.docx") {
                "Jane Roe\nPastry chef and baker".to_string()
            } else {
                String::new()
            }
        }
    }

    struct OfflineService;

    #[async_trait]
    impl JudgmentService for OfflineService {
        async fn judge(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Api {
                status: 503,
                message: "offline".to_string(),
            })
        }
    }

    fn test_config(upload_dir: PathBuf) -> Config {
        Config {
            port: 0,
            rust_log: "info".to_string(),
            ollama_host: "http://127.0.0.1:9".to_string(),
            ollama_model: "test".to_string(),
            ollama_api_key: None,
            cors_origins: vec!["http://localhost:3000".to_string()],
            upload_dir,
            max_upload_files: 3,
            max_upload_bytes: 1024 * 1024,
            max_jd_chars: 1500,
            max_resume_chars: 3000,
            judgment_timeout: Duration::from_secs(5),
            file_timeout: Duration::from_secs(30),
            max_concurrent_files: 2,
        }
    }

    fn app(dir: &TempDir) -> Router {
        let config = test_config(dir.path().to_path_buf());
        let engine = ScoringEngine::new(Arc::new(OfflineService), ScoringLimits::default());
        let processor =
            BatchProcessor::new(Arc::new(SuffixExtractor), engine, BatchOptions::default());
        build_router(AppState { config, processor }).layer(cors_layer(&[
            "http://localhost:3000".to_string(),
        ]))
    }

    fn multipart_body(jd: Option<&str>, files: &[&str]) -> Body {
        let mut body = String::new();
        if let Some(jd) = jd {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"jd\"\r\n\r\n{jd}\r\n"
            ));
        }
        for name in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\nfile bytes\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn start_job_request(jd: Option<&str>, files: &[&str]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/start-job")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(jd, files))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "HR Resume Analyzer API");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "screener-api");
    }

    #[tokio::test]
    async fn test_start_job_ranks_candidates_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(start_job_request(Some(JD), &["jane.docx", "john.pdf"]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;

        assert!(body["job_id"].as_str().is_some());
        assert_eq!(body["message"], "Processing complete");
        assert_eq!(body["total_files"], 2);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["processed"], 2);
        assert_eq!(body["total"], 2);

        let candidates = body["candidates"].as_array().unwrap();
        assert_eq!(candidates[0]["name"], "John Doe");
        assert_eq!(candidates[0]["score"], 75.0);
        assert_eq!(candidates[0]["classification"], "Strong");
        assert_eq!(candidates[0]["match_ratio"], 0.75);
        assert_eq!(candidates[1]["name"], "Jane Roe");
        assert_eq!(candidates[1]["score"], 50.0);
        assert_eq!(candidates[1]["classification"], "Weak");

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_start_job_without_jd_is_rejected() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(start_job_request(None, &["john.pdf"]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_start_job_rejects_unsupported_files_and_excess_count() {
        let dir = TempDir::new().unwrap();

        let response = app(&dir)
            .oneshot(start_job_request(Some(JD), &["john.pdf", "notes.txt"]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(&dir)
            .oneshot(start_job_request(
                Some(JD),
                &["a.pdf", "b.pdf", "c.pdf", "d.pdf"],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Maximum 3 files allowed");
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin_only() {
        let dir = TempDir::new().unwrap();
        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/start-job")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap()
        };

        let allowed = app(&dir)
            .oneshot(preflight("http://localhost:3000"))
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );

        let denied = app(&dir)
            .oneshot(preflight("http://evil.example"))
            .await
            .unwrap();
        assert!(denied
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
