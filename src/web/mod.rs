//! # Módulo Web — Servidor HTTP do Pipeline
//!
//! Camada fina sobre o pipeline, construída com **Axum** + **Maud** + **SSE**.
//!
//! ## Rotas
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Browser (fetch + EventSource)                           │
//! ├─────────────────────────────────────────────────────────┤
//! │ Axum Router (este módulo)                               │
//! │  ├── GET  /             → página com os dois formulários│
//! │  ├── GET  /status       → JSON: anotador, modo de saída │
//! │  ├── GET  /events       → SSE stream (progresso de lote)│
//! │  ├── POST /work/single  → JSON: resultados de 1 review  │
//! │  └── POST /work/csv     → CSV processado (50MB, anexo)  │
//! ├─────────────────────────────────────────────────────────┤
//! │ CORS permissivo em /work/*                              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Submódulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`, `ServerConfig`) |
//! | [`events`] | Enum de eventos SSE do lote |
//! | [`handlers`] | Handlers Axum para cada rota |
//! | [`templates`] | Template Maud da página principal |

pub mod events;
pub mod handlers;
pub mod state;
pub mod templates;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

/// Limite de tamanho do upload de CSV.
pub const UPLOAD_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Cria o router Axum com todas as rotas da aplicação.
pub fn create_router(state: AppState) -> Router {
    let work = Router::new()
        .route("/work/single", post(handlers::work_single))
        .route(
            "/work/csv",
            post(handlers::work_csv).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .layer(CorsLayer::permissive());

    Router::new()
        // ── Página HTML ───────────────────────────────────────
        .route("/", get(handlers::index))
        // ── API JSON / SSE ────────────────────────────────────
        .route("/status", get(handlers::status))
        .route("/events", get(handlers::sse_events))
        // ── Processamento ─────────────────────────────────────
        .merge(work)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::state::ServerConfig;
    use super::*;
    use crate::batch::BatchOptions;
    use crate::nlu::scorer::VaderScorer;
    use crate::nlu::testing::FakeAnnotator;
    use crate::nlu::AbsaPipeline;

    const BOUNDARY: &str = "absa-test-boundary";

    fn app() -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = AbsaPipeline::new(
            Arc::new(FakeAnnotator::reviews()),
            Arc::new(VaderScorer::new()),
        );
        let config = ServerConfig {
            annotator_url: "http://annotator.test/annotate".into(),
            batch: BatchOptions::default(),
            upload_dir: dir.path().join("uploads"),
            output_dir: dir.path().join("outputs"),
        };
        let router = create_router(AppState::new(Arc::new(pipeline), config));
        (router, dir)
    }

    fn form(review: &str) -> Request<Body> {
        Request::post("/work/single")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("review={}", review.replace(' ', "+"))))
            .unwrap()
    }

    fn upload(filename: &str, csv: &str, column: Option<&str>) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"input_csv\"; filename=\"{filename}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n"
        );
        if let Some(column) = column {
            body.push_str(&format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"review_column\"\r\n\r\n\
                 {column}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::post("/work/csv")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn json(resp: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    #[tokio::test]
    async fn index_renders_page() {
        let (app, _dir) = app();
        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(html.contains("single-form"));
    }

    #[tokio::test]
    async fn status_reports_configuration() {
        let (app, _dir) = app();
        let resp = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["ready"], true);
        assert_eq!(body["annotator_url"], "http://annotator.test/annotate");
        assert_eq!(body["output_mode"], "json-column");
    }

    #[tokio::test]
    async fn single_review_returns_results() {
        let (app, _dir) = app();
        let resp = app.oneshot(form("The food was not good.")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json(resp).await;
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["aspect"], "food");
        assert_eq!(results[0]["opinion"], "good");
        assert_eq!(results[0]["sentiment"], "Negative");
    }

    #[tokio::test]
    async fn neutral_review_returns_empty_list() {
        let (app, _dir) = app();
        let resp = app.oneshot(form("It arrived on Tuesday.")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn blank_review_is_bad_request() {
        let (app, _dir) = app();
        let resp = app.oneshot(form("   ")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn missing_review_field_is_bad_request() {
        let (app, _dir) = app();
        let req = Request::post("/work/single")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("other=1"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn annotator_failure_is_internal_error() {
        let (app, _dir) = app();
        let resp = app.oneshot(form("Unknown review text.")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json(resp).await["error"],
            "An internal server error occurred."
        );
    }

    #[tokio::test]
    async fn work_routes_allow_cross_origin() {
        let (app, _dir) = app();
        let mut req = form("The food was not good.");
        req.headers_mut()
            .insert(header::ORIGIN, "http://example.org".parse().unwrap());
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn csv_upload_returns_processed_attachment() {
        let (app, dir) = app();
        let csv = "id,review\n1,The food was not good.\n2,\n";
        let resp = app
            .oneshot(upload("reviews.csv", csv, Some("review")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let disposition = resp.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"processed_reviews_"));
        let stamp = &disposition["attachment; filename=\"processed_reviews_".len()..];
        assert!(stamp[..8].bytes().all(|b| b.is_ascii_digit()), "{disposition}");
        assert_eq!(&stamp[8..9], "_");

        let body = String::from_utf8(body_bytes(resp).await).unwrap();
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some("id,review,aspect_sentiments"));
        assert!(lines.next().unwrap().contains(r#""aspect"":""food"""#));
        assert_eq!(lines.next(), Some("2,,[]"));

        let uploads: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .collect();
        assert_eq!(uploads.len(), 1);
        assert_eq!(
            std::fs::read_dir(dir.path().join("outputs")).unwrap().count(),
            1
        );
    }

    #[tokio::test]
    async fn truncated_multipart_body_is_bad_request() {
        let (app, dir) = app();
        // field closed, next part cut inside its headers, no closing boundary
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"review_column\"\r\n\r\n\
             review\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-da"
        );
        let req = Request::post("/work/csv")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let error = json(resp).await["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Invalid multipart body: "), "{error}");
        assert!(error.len() > "Invalid multipart body: ".len());
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn csv_upload_rejects_other_extensions() {
        let (app, _dir) = app();
        let resp = app
            .oneshot(upload("reviews.txt", "review\nGood\n", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn csv_upload_reports_available_columns() {
        let (app, _dir) = app();
        let resp = app
            .oneshot(upload("reviews.csv", "id,text\n1,Good\n", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json(resp).await;
        assert_eq!(body["available_columns"], serde_json::json!(["id", "text"]));
    }
}
