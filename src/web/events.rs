//! # Eventos SSE de Processamento em Lote
//!
//! Define o enum [`BatchEvent`], os eventos emitidos enquanto um CSV é
//! processado, enviados em tempo real ao frontend via Server-Sent Events.
//!
//! ## Ciclo de Vida dos Eventos
//!
//! ```text
//! Started → [ChunkStarted → ChunkCompleted]×N → Completed
//!                                          ou → Error
//! ```
//!
//! ## Serialização
//!
//! Usa `#[serde(tag = "type")]` para produzir JSON com discriminador:
//!
//! ```json
//! { "type": "ChunkCompleted", "chunk": 3, "rows": 500, "results": 812, "skipped_rows": 0 }
//! ```

use serde::Serialize;

/// Evento emitido durante o processamento de um CSV.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum BatchEvent {
    /// Cabeçalho validado; o processamento vai começar.
    Started {
        /// Nome do arquivo de entrada (ou `"stdin"`).
        source: String,
        review_column: String,
        chunk_size: usize,
        /// `"json-column"` ou `"exploded"`.
        output_mode: String,
    },

    /// Início de um chunk (1-indexed).
    ChunkStarted { chunk: usize, rows: usize },

    /// Chunk anotado, extraído e gravado em disco.
    ChunkCompleted {
        chunk: usize,
        /// Linhas de entrada do chunk.
        rows: usize,
        /// Resultados aspecto-opinião emitidos no chunk.
        results: usize,
        /// Linhas malformadas puladas desde o chunk anterior.
        skipped_rows: usize,
    },

    /// Lote completo: sumário final com métricas do processo.
    Completed {
        chunks: usize,
        rows: usize,
        results: usize,
        skipped_rows: usize,
        total_ms: u64,
        /// Nome do arquivo de saída.
        output: String,
        // ── Métricas do sistema ──
        /// RAM usada pelo processo (MB).
        memory_used_mb: f64,
        /// Cores CPU ativos (uso > 1%).
        cpu_active_cores: usize,
        /// Pico de uso de CPU por core (%).
        cpu_max_core_percent: f32,
        cpu_total_cores: usize,
        /// Throughput (ex: "1500 rows/s").
        throughput: String,
    },

    /// Falha ou cancelamento; encerra o rastreamento de progresso.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let ev = BatchEvent::ChunkStarted { chunk: 2, rows: 500 };
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(json, r#"{"type":"ChunkStarted","chunk":2,"rows":500}"#);
    }

    #[test]
    fn error_event_carries_message() {
        let ev = BatchEvent::Error {
            message: "column 'review' not found".into(),
        };
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["type"], "Error");
        assert_eq!(value["message"], "column 'review' not found");
    }
}
