//! # Erros do Pipeline
//!
//! Taxonomia de falhas do núcleo de extração. Erros estruturais (coluna
//! ausente) abortam a operação inteira; falhas dos colaboradores externos
//! (anotador, scorer) são propagadas sem retry; linhas malformadas do CSV
//! **não** viram erro; são puladas e contadas pelo processador em lote.
//!
//! A camada de aplicação (CLI, handlers) converte tudo em `anyhow::Error`.

use std::io;

use thiserror::Error;

/// Erro do pipeline de extração aspecto-opinião.
#[derive(Debug, Error)]
pub enum AbsaError {
    /// A coluna de reviews não existe no cabeçalho do dataset.
    #[error("column '{column}' not found; available columns: {}", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// Documento vazio (ou só espaços) no caminho de documento único.
    #[error("input must be a non-empty string")]
    EmptyInput,

    /// Falha do anotador linguístico (rede, payload inválido, grafo inconsistente).
    #[error("annotation failed: {0}")]
    Annotation(String),

    /// Falha do scorer de sentimento.
    #[error("sentiment scoring failed: {0}")]
    Scoring(String),

    /// Processamento interrompido pelo token de cancelamento.
    #[error("batch cancelled after {chunks_written} chunk(s)")]
    Cancelled { chunks_written: usize },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Atalho para `Result<T, AbsaError>`.
pub type AbsaResult<T> = Result<T, AbsaError>;
