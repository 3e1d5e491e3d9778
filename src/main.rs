#![allow(rustdoc::broken_intra_doc_links)]
//! # Aspect Opinion — Extração Aspecto-Opinião de Reviews
//!
//! **Ponto de entrada** da aplicação. Três modos de uso, todos sobre o
//! mesmo pipeline:
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG)
//!   ├── Lê CLI + variáveis ABSA_*
//!   ├── Cria HttpAnnotator (cliente bloqueante) + VaderScorer
//!   ├── Monta AbsaPipeline
//!   └── Subcomando:
//!       ├── analyze <TEXT>  → JSON no stdout
//!       ├── batch           → CSV processado em chunks (Ctrl-C cancela)
//!       └── serve           → runtime tokio + servidor axum
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! # Anotador rodando em http://127.0.0.1:8000/annotate
//! cargo run -- analyze "The food was not good."
//! cargo run -- batch -i reviews.csv -o processed.csv --chunk-size 1000
//! RUST_LOG=debug cargo run -- serve --bind 127.0.0.1:8080
//! ```
//!
//! ## Runtime
//!
//! O cliente HTTP do anotador é bloqueante e não pode ser criado dentro
//! de um runtime async. Por isso `main` é síncrona e o runtime tokio só
//! existe no modo `serve`.

/// Módulo `batch` — processamento de CSV em chunks com cancelamento.
mod batch;

/// Módulo `config` — CLI (clap) com fallback para variáveis de ambiente.
mod config;

/// Módulo `core` — documento anotado, resultados aspecto-opinião, rótulos.
mod core;

/// Módulo `error` — taxonomia de erros do pipeline.
mod error;

/// Módulo `metrics` — métricas do processo (CPU, RAM) ao fim de cada lote.
mod metrics;

/// Módulo `nlu` — normalização, anotador, scorer e regras de extração.
mod nlu;

/// Módulo `sink` — formatos de saída e escrita incremental do CSV.
mod sink;

/// Módulo `web` — servidor axum, handlers HTTP, template e SSE.
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::batch::{BatchProcessor, CancellationToken};
use crate::config::{BatchCommand, Cli, Command, ServeArgs};
use crate::nlu::scorer::VaderScorer;
use crate::nlu::AbsaPipeline;
use crate::web::state::{AppState, ServerConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let annotator = cli
        .annotator
        .build()
        .context("falha ao criar o cliente do anotador")?;
    tracing::info!(url = %annotator.url(), "Anotador configurado");

    let pipeline = Arc::new(AbsaPipeline::new(
        Arc::new(annotator),
        Arc::new(VaderScorer::new()),
    ));

    match cli.command {
        Command::Analyze { text } => analyze(&pipeline, &text),
        Command::Batch(cmd) => run_batch(pipeline, cmd),
        Command::Serve(args) => {
            let runtime = tokio::runtime::Runtime::new().context("falha ao criar runtime tokio")?;
            runtime.block_on(serve(pipeline, cli.annotator.annotator_url, args))
        }
    }
}

/// Analisa um texto e imprime os resultados em JSON.
fn analyze(pipeline: &AbsaPipeline, text: &str) -> Result<()> {
    let results = pipeline.analyze_single(text).context("análise falhou")?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Processa um CSV; Ctrl-C interrompe entre chunks.
fn run_batch(pipeline: Arc<AbsaPipeline>, cmd: BatchCommand) -> Result<()> {
    let token = CancellationToken::new();
    install_ctrl_c(token.clone());

    let processor = BatchProcessor::new(pipeline, cmd.batch.options()).with_cancellation(token);
    let summary = processor
        .process_path(&cmd.input, &cmd.output)
        .with_context(|| format!("falha ao processar {}", cmd.input.display()))?;

    tracing::info!(
        output = %cmd.output.display(),
        rows = summary.rows,
        output_rows = summary.output_rows,
        results = summary.results,
        skipped_rows = summary.skipped_rows,
        elapsed_ms = summary.elapsed_ms,
        "✅ Lote concluído"
    );
    Ok(())
}

/// Escuta Ctrl-C numa thread própria e aciona o token.
fn install_ctrl_c(token: CancellationToken) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!(error = %e, "Handler de Ctrl-C indisponível");
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            tracing::warn!("Ctrl-C recebido, parando após o chunk atual...");
            token.cancel();
        }
    });
}

/// Sobe o servidor axum.
async fn serve(pipeline: Arc<AbsaPipeline>, annotator_url: String, args: ServeArgs) -> Result<()> {
    let config = ServerConfig {
        annotator_url,
        batch: args.batch.options(),
        upload_dir: args.upload_dir,
        output_dir: args.output_dir,
    };
    let app = web::create_router(AppState::new(pipeline, config));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("bind em {} falhou", args.bind))?;
    tracing::info!("🚀 Server running at http://{}", args.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
