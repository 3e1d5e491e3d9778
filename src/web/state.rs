//! # Estado da Aplicação Web
//!
//! Estruturas compartilhadas entre todos os handlers Axum.
//!
//! ```text
//! ┌──────────────────────────┐
//! │ AppState (Clone)         │
//! │  ├── pipeline   ─────────┼──→ AbsaPipeline (anotador + extrator)
//! │  ├── events_tx  ─────────┼──→ broadcast<BatchEvent> → /events (SSE)
//! │  └── config     ─────────┼──→ ServerConfig (diretórios, opções do lote)
//! └──────────────────────────┘
//! ```
//!
//! O pipeline é imutável após a criação; cada requisição o usa via `Arc`
//! dentro de `spawn_blocking` (o anotador HTTP é bloqueante).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::batch::BatchOptions;
use crate::nlu::AbsaPipeline;
use crate::web::events::BatchEvent;

/// Configuração estática do servidor.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Endpoint do anotador, exposto em `/status`.
    pub annotator_url: String,
    /// Opções padrão dos lotes enviados por upload.
    pub batch: BatchOptions,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AbsaPipeline>,
    /// Canal broadcast para eventos SSE de lotes.
    pub events_tx: Arc<broadcast::Sender<BatchEvent>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pipeline: Arc<AbsaPipeline>, config: ServerConfig) -> Self {
        // Capacidade de 256 eventos; assinantes lentos perdem os mais antigos
        let (events_tx, _) = broadcast::channel(256);
        Self {
            pipeline,
            events_tx: Arc::new(events_tx),
            config: Arc::new(config),
        }
    }
}
