//! # Handlers HTTP — Os Endpoints da Aplicação
//!
//! Cada função pública neste módulo é um handler Axum, mapeado a uma
//! rota em [`super::create_router()`].
//!
//! | Handler | Método | Retorno | Uso |
//! |---------|--------|---------|-----|
//! | `index` | GET | HTML completo | Página principal (Maud) |
//! | `status` | GET | JSON | Anotador configurado, modo de saída |
//! | `sse_events` | GET | SSE stream | Progresso dos lotes |
//! | `work_single` | POST | JSON | Resultados de uma review |
//! | `work_csv` | POST | `text/csv` (anexo) | Dataset processado |
//!
//! ## Erros
//!
//! Falhas voltam como JSON `{"error": "..."}`:
//!
//! | Situação | Status |
//! |----------|--------|
//! | Review ausente ou vazia | 400 |
//! | Upload sem arquivo `.csv` | 400 |
//! | Corpo multipart inválido ou truncado | 400 (com a causa) |
//! | Coluna de reviews ausente | 400 (com as colunas disponíveis) |
//! | Falha do anotador/scorer | 500 (mensagem genérica) |
//!
//! O pipeline é síncrono (anotador HTTP bloqueante), então toda chamada
//! a ele passa por `spawn_blocking`.

use std::convert::Infallible;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use chrono::{DateTime, Local};
use futures_util::stream::StreamExt;
use maud::Markup;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;

use super::state::AppState;
use super::templates;
use crate::batch::BatchProcessor;
use crate::core::AspectOpinion;
use crate::error::AbsaError;

/// Mensagem devolvida quando um colaborador falha.
pub const INTERNAL_ERROR: &str = "An internal server error occurred.";

/// Converte um `Markup` Maud em `Html<String>` para o Axum.
fn markup_to_html(markup: Markup) -> Html<String> {
    Html(markup.into_string())
}

/// Erro HTTP com corpo `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    available_columns: Option<Vec<String>>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            available_columns: None,
        }
    }

    /// Corpo multipart malformado: status do axum (400, ou 413 no limite)
    /// e a causa do parser na mensagem.
    fn multipart(err: MultipartError) -> Self {
        tracing::warn!(error = %err.body_text(), "Upload multipart inválido");
        Self {
            status: err.status(),
            message: format!("Invalid multipart body: {}", err.body_text()),
            available_columns: None,
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR.to_string(),
            available_columns: None,
        }
    }
}

impl From<AbsaError> for ApiError {
    fn from(err: AbsaError) -> Self {
        match err {
            AbsaError::MissingColumn { ref available, .. } => Self {
                status: StatusCode::BAD_REQUEST,
                available_columns: Some(available.clone()),
                message: err.to_string(),
            },
            AbsaError::EmptyInput => Self::bad_request(err.to_string()),
            other => {
                tracing::error!(error = %other, "Falha no pipeline");
                Self::internal()
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_columns: Option<&'a [String]>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            available_columns: self.available_columns.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// GET `/` — Página principal.
pub async fn index() -> Html<String> {
    markup_to_html(templates::index_page())
}

/// Resposta do endpoint `/status`.
#[derive(Serialize)]
pub struct StatusResponse {
    pub ready: bool,
    pub annotator_url: String,
    pub output_mode: String,
}

/// GET `/status` — Configuração ativa do servidor.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ready: true,
        annotator_url: state.config.annotator_url.clone(),
        output_mode: state.config.batch.output_mode.to_string(),
    })
}

/// GET `/events` — Stream SSE de [`BatchEvent`](crate::web::events::BatchEvent)s.
///
/// Keep-alive a cada 15s. Assinantes atrasados perdem mensagens
/// silenciosamente (`filter_map` descarta `Lagged`).
pub async fn sse_events(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(SseEvent::default().data(data)))
            }
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Formulário do `/work/single`.
#[derive(Deserialize)]
pub struct SingleForm {
    #[serde(default)]
    pub review: Option<String>,
}

/// POST `/work/single` — Analisa uma review.
///
/// ```text
/// review ausente/vazia → 400
/// spawn_blocking(analyze_single)
///   ├── Ok(results) → 200 [ {aspect, opinion, context, sentiment, score}, ... ]
///   └── Err         → 500 {"error": "An internal server error occurred."}
/// ```
pub async fn work_single(
    State(state): State<AppState>,
    Form(form): Form<SingleForm>,
) -> Result<Json<Vec<AspectOpinion>>, ApiError> {
    let review = form.review.unwrap_or_default();
    if review.trim().is_empty() {
        return Err(ApiError::bad_request(
            "Invalid input. Please provide a non-empty 'review' field.",
        ));
    }

    let start = Instant::now();
    let pipeline = state.pipeline.clone();
    let results = tokio::task::spawn_blocking(move || pipeline.analyze_single(&review))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Task de análise abortada");
            ApiError::internal()
        })??;

    tracing::info!(
        results = results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Review analisada"
    );
    Ok(Json(results))
}

/// POST `/work/csv` — Processa um dataset enviado por upload.
///
/// ## Fluxo
///
/// ```text
/// 1. Lê os campos "input_csv" (arquivo) e "review_column" (opcional)
/// 2. Valida a extensão .csv
/// 3. Grava em <upload_dir>/<nome>_<AAAAMMDD_HHMMSS>_<micros>-<seq>.csv
/// 4. spawn_blocking: BatchProcessor → <output_dir>/processed_<mesmo nome>
///    (progresso via SSE em /events)
/// 5. Devolve o CSV processado como anexo
/// ```
pub async fn work_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<(String, axum::body::Bytes)> = None;
    let mut review_column: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "input_csv" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(ApiError::multipart)?;
                upload = Some((filename, bytes));
            }
            "review_column" => {
                let value = field.text().await.map_err(ApiError::multipart)?;
                if !value.trim().is_empty() {
                    review_column = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let Some((filename, bytes)) = upload else {
        tracing::warn!("Nenhum campo input_csv no upload multipart");
        return Err(ApiError::bad_request("No file part named 'input_csv'."));
    };
    let Some(stem) = csv_stem(&filename) else {
        return Err(ApiError::bad_request(
            "Invalid file type. Please upload a .csv file.",
        ));
    };

    let config = state.config.clone();
    let stored_name = stored_upload_name(&stem, Local::now());
    let input_path = config.upload_dir.join(&stored_name);
    let output_name = format!("processed_{stored_name}");
    let output_path = config.output_dir.join(&output_name);

    save_upload(&input_path, &bytes, &config.output_dir).await?;
    tracing::info!(
        size_bytes = bytes.len(),
        filename = %filename,
        stored = %input_path.display(),
        "CSV upload recebido"
    );

    let mut options = config.batch.clone();
    if let Some(column) = review_column {
        options.review_column = column;
    }
    let processor = BatchProcessor::new(state.pipeline.clone(), options)
        .with_events((*state.events_tx).clone());

    let out = output_path.clone();
    let summary = tokio::task::spawn_blocking(move || processor.process_path(&input_path, &out))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Task de lote abortada");
            ApiError::internal()
        })??;

    let body = tokio::fs::read(&output_path).await.map_err(|e| {
        tracing::error!(error = %e, path = %output_path.display(), "Falha ao ler saída");
        ApiError::internal()
    })?;
    tracing::info!(rows = summary.rows, output = %output_name, "CSV processado");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{output_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Nome-base seguro de um upload `.csv` (sem diretórios), ou `None`.
fn csv_stem(filename: &str) -> Option<String> {
    let path = Path::new(filename);
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return None;
    }
    let stem: String = path
        .file_stem()?
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    (!stem.is_empty()).then_some(stem)
}

/// Sequência do processo; desempata uploads no mesmo microssegundo.
static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// `<stem>_<AAAAMMDD_HHMMSS>_<micros>-<seq>.csv`, único por processo.
fn stored_upload_name(stem: &str, now: DateTime<Local>) -> String {
    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{stem}_{}-{seq}.csv", now.format("%Y%m%d_%H%M%S_%6f"))
}

async fn save_upload(path: &Path, bytes: &[u8], output_dir: &Path) -> Result<(), ApiError> {
    let io = |e: std::io::Error| {
        tracing::error!(error = %e, "Falha ao gravar upload");
        ApiError::internal()
    };
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(io)?;
    }
    tokio::fs::create_dir_all(output_dir).await.map_err(io)?;
    tokio::fs::write(path, bytes).await.map_err(io)
}
