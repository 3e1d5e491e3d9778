//! # Processamento em Lote — Do CSV de Reviews ao CSV Anotado
//!
//! Aplica o pipeline ABSA a um dataset inteiro em **chunks** de tamanho
//! fixo, com memória limitada a um chunk por vez.
//!
//! ## Pipeline do Lote
//!
//! ```text
//! CSV de entrada
//!   ├── 1. Ler cabeçalho e validar a coluna de reviews  (falha → nada é escrito)
//!   └── para cada chunk de até `chunk_size` linhas:
//!       ├── 2. Pular linhas malformadas (contadas)
//!       ├── 3. Células vazias → ""
//!       ├── 4. normalize + anotar (uma chamada por chunk) + extrair
//!       ├── 5. Formatar conforme OutputMode
//!       ├── 6. Acrescentar ao CSV de saída + flush
//!       └── 7. Checar o token de cancelamento
//! ```
//!
//! ## Server-Sent Events (SSE)
//!
//! Com um canal broadcast anexado, o lote emite [`BatchEvent`]s:
//!
//! | Evento | Quando | Dados |
//! |--------|--------|-------|
//! | `Started` | Cabeçalho validado | arquivo, coluna, chunk_size, modo |
//! | `ChunkStarted` | Início de cada chunk | chunk, linhas |
//! | `ChunkCompleted` | Chunk gravado | linhas, resultados, puladas |
//! | `Completed` | Tudo processado | sumário + métricas do processo |
//! | `Error` | Falha ou cancelamento | mensagem |
//!
//! ## Falhas
//!
//! | Situação | Comportamento |
//! |----------|---------------|
//! | Coluna ausente | [`AbsaError::MissingColumn`], nenhum arquivo criado |
//! | Linha malformada (nº de campos, UTF-8) | pulada e contada |
//! | Falha do anotador/scorer | aborta; chunks anteriores ficam no disco |
//! | Cancelamento | para antes do próximo chunk, [`AbsaError::Cancelled`] |

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::{AbsaError, AbsaResult};
use crate::nlu::AbsaPipeline;
use crate::sink::{CsvSink, OutputMode};
use crate::web::events::BatchEvent;

/// Tamanho padrão do chunk (linhas).
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Nome padrão da coluna de reviews.
pub const DEFAULT_REVIEW_COLUMN: &str = "review";

/// Parâmetros de um processamento em lote.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub review_column: String,
    pub chunk_size: usize,
    pub output_mode: OutputMode,
    /// Extração paralela (rayon) dentro de cada chunk.
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            review_column: DEFAULT_REVIEW_COLUMN.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_mode: OutputMode::default(),
            parallel: false,
        }
    }
}

/// Token de cancelamento cooperativo, checado entre chunks.
///
/// Clones compartilham o mesmo estado.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sumário de um lote concluído.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub chunks: usize,
    /// Linhas de entrada processadas.
    pub rows: usize,
    /// Linhas malformadas puladas.
    pub skipped_rows: usize,
    /// Pares aspecto-opinião emitidos.
    pub results: usize,
    /// Linhas gravadas no CSV de saída (sem o cabeçalho).
    pub output_rows: usize,
    pub elapsed_ms: u64,
}

/// Processador de datasets CSV em chunks.
pub struct BatchProcessor {
    pipeline: Arc<AbsaPipeline>,
    options: BatchOptions,
    events: Option<broadcast::Sender<BatchEvent>>,
    cancel: CancellationToken,
}

impl BatchProcessor {
    pub fn new(pipeline: Arc<AbsaPipeline>, options: BatchOptions) -> Self {
        Self {
            pipeline,
            options,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Anexa um canal para eventos de progresso (SSE).
    pub fn with_events(mut self, tx: broadcast::Sender<BatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            // Sem assinantes não é erro
            let _ = tx.send(event);
        }
    }

    /// Processa um arquivo CSV do disco.
    pub fn process_path(&self, input: &Path, output: &Path) -> AbsaResult<BatchSummary> {
        let file = File::open(input)?;
        let source = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        self.process(file, &source, output)
    }

    /// Processa um CSV vindo de qualquer leitor.
    ///
    /// Em caso de erro, um evento `Error` é emitido antes do retorno.
    pub fn process<R: Read>(&self, input: R, source: &str, output: &Path) -> AbsaResult<BatchSummary> {
        let span = tracing::info_span!("batch", source = %source);
        let _guard = span.enter();

        self.run(input, source, output).inspect_err(|e| {
            tracing::error!(error = %e, "Lote interrompido");
            self.emit(BatchEvent::Error {
                message: e.to_string(),
            });
        })
    }

    fn run<R: Read>(&self, input: R, source: &str, output: &Path) -> AbsaResult<BatchSummary> {
        let started = Instant::now();
        let opts = &self.options;
        let chunk_size = opts.chunk_size.max(1);

        let mut reader = ReaderBuilder::new().from_reader(input);
        let header = reader.headers()?.clone();
        let column = header
            .iter()
            .position(|h| h == opts.review_column)
            .ok_or_else(|| AbsaError::MissingColumn {
                column: opts.review_column.clone(),
                available: header.iter().map(str::to_string).collect(),
            })?;
        let out_header = opts.output_mode.header(&header);

        tracing::info!(
            column = %opts.review_column,
            chunk_size,
            mode = %opts.output_mode,
            parallel = opts.parallel,
            "Lote iniciado"
        );
        self.emit(BatchEvent::Started {
            source: source.to_string(),
            review_column: opts.review_column.clone(),
            chunk_size,
            output_mode: opts.output_mode.to_string(),
        });

        let mut sink = CsvSink::new(output);
        let mut records = reader.into_records();
        let mut summary = BatchSummary::default();

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(chunks = summary.chunks, "Lote cancelado");
                return Err(AbsaError::Cancelled {
                    chunks_written: summary.chunks,
                });
            }

            let (rows, skipped) = read_chunk(&mut records, chunk_size)?;
            summary.skipped_rows += skipped;
            if rows.is_empty() {
                break;
            }

            summary.chunks += 1;
            let chunk = summary.chunks;
            tracing::info!(chunk, rows = rows.len(), "Processando chunk");
            self.emit(BatchEvent::ChunkStarted {
                chunk,
                rows: rows.len(),
            });

            let texts: Vec<String> = rows
                .iter()
                .map(|row| row.get(column).unwrap_or_default().to_string())
                .collect();
            let results = self.pipeline.analyze_batch(&texts, opts.parallel)?;

            let mut shaped = Vec::with_capacity(rows.len());
            let mut chunk_results = 0;
            for (row, row_results) in rows.iter().zip(&results) {
                chunk_results += row_results.len();
                shaped.extend(opts.output_mode.shape(row, row_results)?);
            }
            sink.write_chunk(&out_header, &shaped)?;

            summary.rows += rows.len();
            summary.results += chunk_results;
            tracing::info!(chunk, results = chunk_results, skipped, "Chunk processado");
            self.emit(BatchEvent::ChunkCompleted {
                chunk,
                rows: rows.len(),
                results: chunk_results,
                skipped_rows: skipped,
            });
        }

        // Dataset sem linhas: saída só com cabeçalho
        if summary.chunks == 0 {
            sink.write_chunk(&out_header, &[])?;
        }
        summary.output_rows = sink.rows_written();
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        let throughput = if summary.elapsed_ms > 0 {
            format!("{:.0} rows/s", summary.rows as f64 / (summary.elapsed_ms as f64 / 1000.0))
        } else {
            "N/A".into()
        };
        let pm = crate::metrics::collect_metrics(Some(output), Some(throughput.clone()));

        tracing::info!(
            chunks = summary.chunks,
            rows = summary.rows,
            results = summary.results,
            skipped_rows = summary.skipped_rows,
            "Lote completo | {}",
            pm.summary_line(summary.elapsed_ms)
        );
        self.emit(BatchEvent::Completed {
            chunks: summary.chunks,
            rows: summary.rows,
            results: summary.results,
            skipped_rows: summary.skipped_rows,
            total_ms: summary.elapsed_ms,
            output: output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            memory_used_mb: pm.memory_used_mb,
            cpu_active_cores: pm.cpu_active_cores,
            cpu_max_core_percent: pm.cpu_max_core_percent,
            cpu_total_cores: pm.cpu_total_cores,
            throughput,
        });

        Ok(summary)
    }
}

/// Lê até `size` linhas válidas, pulando as malformadas.
///
/// Devolve as linhas e quantas foram puladas. Erros de I/O são fatais.
fn read_chunk<R: Read>(
    records: &mut StringRecordsIntoIter<R>,
    size: usize,
) -> AbsaResult<(Vec<StringRecord>, usize)> {
    let mut rows = Vec::with_capacity(size);
    let mut skipped = 0;

    while rows.len() < size {
        match records.next() {
            None => break,
            Some(Ok(row)) => rows.push(row),
            Some(Err(e)) if is_row_error(&e) => {
                tracing::debug!(error = %e, "Linha malformada pulada");
                skipped += 1;
            }
            Some(Err(e)) => return Err(e.into()),
        }
    }
    Ok((rows, skipped))
}

/// Erros que afetam só a linha atual.
fn is_row_error(e: &csv::Error) -> bool {
    matches!(
        e.kind(),
        csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. }
    )
}
