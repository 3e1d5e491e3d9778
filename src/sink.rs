//! # Saída do Lote — Formato e Escrita Incremental do CSV
//!
//! Duas convenções de saída coexistem por configuração ([`OutputMode`]):
//!
//! | Modo | Colunas derivadas | Linhas por review |
//! |------|-------------------|-------------------|
//! | `JsonColumn` (padrão) | `aspect_sentiments` (lista JSON) | exatamente 1 |
//! | `Exploded` | `aspect`, `sentiment`, `score` | 1 por resultado (ou 1 linha `N/A`) |
//!
//! Colunas de saída = colunas de entrada seguidas das derivadas, nessa
//! ordem.
//!
//! ## Escrita
//!
//! O [`CsvSink`] é o **único** escritor do arquivo. O primeiro chunk cria
//! (ou trunca) o arquivo e grava o cabeçalho; os seguintes só acrescentam
//! linhas. Cada chunk é descarregado em disco (`flush`) antes do próximo
//! ser lido.
//!
//! ## ⚠️ Durabilidade
//!
//! Não é transacional: uma falha no meio do lote deixa no disco os chunks
//! já gravados, com cabeçalho consistente.

use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use csv::{StringRecord, Writer};
use serde::{Deserialize, Serialize};

use crate::core::{AspectOpinion, NO_OPINION};
use crate::error::AbsaResult;

/// Coluna derivada do modo `JsonColumn`.
pub const JSON_COLUMN: &str = "aspect_sentiments";

/// Colunas derivadas do modo `Exploded`.
pub const EXPLODED_COLUMNS: [&str; 3] = ["aspect", "sentiment", "score"];

/// Convenção de saída do lote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Uma coluna com a lista de resultados em JSON.
    #[default]
    JsonColumn,
    /// Uma linha por resultado, com aspecto, sentimento e score.
    Exploded,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::JsonColumn => "json-column",
            OutputMode::Exploded => "exploded",
        }
    }

    /// Cabeçalho de saída: colunas de entrada + derivadas.
    pub fn header(&self, input: &StringRecord) -> StringRecord {
        let mut header = input.clone();
        match self {
            OutputMode::JsonColumn => header.push_field(JSON_COLUMN),
            OutputMode::Exploded => EXPLODED_COLUMNS.iter().for_each(|c| header.push_field(c)),
        }
        header
    }

    /// Linhas de saída para uma linha de entrada e seus resultados.
    pub fn shape(
        &self,
        row: &StringRecord,
        results: &[AspectOpinion],
    ) -> AbsaResult<Vec<StringRecord>> {
        match self {
            OutputMode::JsonColumn => {
                let mut out = row.clone();
                out.push_field(&serde_json::to_string(results)?);
                Ok(vec![out])
            }
            OutputMode::Exploded if results.is_empty() => {
                let mut out = row.clone();
                out.push_field(NO_OPINION);
                out.push_field(NO_OPINION);
                out.push_field("0.0");
                Ok(vec![out])
            }
            OutputMode::Exploded => Ok(results
                .iter()
                .map(|r| {
                    let mut out = row.clone();
                    out.push_field(&r.aspect);
                    out.push_field(r.sentiment.label());
                    out.push_field(&r.score.to_string());
                    out
                })
                .collect()),
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json-column" | "json" => Ok(OutputMode::JsonColumn),
            "exploded" => Ok(OutputMode::Exploded),
            other => Err(format!(
                "unknown output mode '{other}' (expected 'json-column' or 'exploded')"
            )),
        }
    }
}

/// Escritor único, append-only, do CSV de saída.
///
/// O arquivo só é criado na primeira escrita: uma validação que falha
/// antes disso não deixa nenhum arquivo para trás.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<Writer<File>>,
    rows_written: usize,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Cria o arquivo e grava o cabeçalho, se ainda não existe.
    fn open(&mut self, header: &StringRecord) -> AbsaResult<&mut Writer<File>> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                let mut writer = Writer::from_path(&self.path)?;
                writer.write_record(header)?;
                tracing::debug!(path = %self.path.display(), "Arquivo de saída criado");
                writer
            }
        };
        Ok(self.writer.insert(writer))
    }

    /// Acrescenta um chunk de linhas e descarrega em disco.
    ///
    /// Um chunk vazio ainda garante o cabeçalho (dataset sem linhas gera
    /// um arquivo só com cabeçalho).
    pub fn write_chunk(&mut self, header: &StringRecord, rows: &[StringRecord]) -> AbsaResult<()> {
        let writer = self.open(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        self.rows_written += rows.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn header_appends_derived_columns() {
        let input = record(&["id", "review"]);
        assert_eq!(
            OutputMode::JsonColumn.header(&input),
            record(&["id", "review", "aspect_sentiments"])
        );
        assert_eq!(
            OutputMode::Exploded.header(&input),
            record(&["id", "review", "aspect", "sentiment", "score"])
        );
    }

    #[test]
    fn json_column_keeps_one_row() {
        let row = record(&["1", "The food was not good."]);
        let results = vec![AspectOpinion::new("food", "good", "The food was not good.", -0.3412)];
        let rows = OutputMode::JsonColumn.shape(&row, &results).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            &rows[0][2],
            r#"[{"aspect":"food","opinion":"good","context":"The food was not good.","sentiment":"Negative","score":-0.3412}]"#
        );

        let empty = OutputMode::JsonColumn.shape(&row, &[]).unwrap();
        assert_eq!(&empty[0][2], "[]");
    }

    #[test]
    fn exploded_emits_one_row_per_result() {
        let row = record(&["1", "x"]);
        let results = vec![
            AspectOpinion::new("food", "good", "x", 0.44),
            AspectOpinion::new("food", "cheap", "x", 0.44),
        ];
        let rows = OutputMode::Exploded.shape(&row, &results).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], record(&["1", "x", "food", "Positive", "0.44"]));
    }

    #[test]
    fn exploded_without_results_is_a_placeholder_row() {
        let rows = OutputMode::Exploded.shape(&record(&["1", ""]), &[]).unwrap();
        assert_eq!(rows, vec![record(&["1", "", "N/A", "N/A", "0.0"])]);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("exploded".parse::<OutputMode>().unwrap(), OutputMode::Exploded);
        assert_eq!("JSON-COLUMN".parse::<OutputMode>().unwrap(), OutputMode::JsonColumn);
        assert!("xml".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::default().to_string(), "json-column");
    }

    #[test]
    fn sink_writes_header_once_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let header = record(&["review", "aspect_sentiments"]);

        let mut sink = CsvSink::new(&path);
        assert!(!path.exists());
        sink.write_chunk(&header, &[record(&["a", "[]"])]).unwrap();
        sink.write_chunk(&header, &[record(&["b", "[]"]), record(&["c", "[]"])]).unwrap();

        assert_eq!(sink.rows_written(), 3);
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "review,aspect_sentiments\na,[]\nb,[]\nc,[]\n");
    }

    #[test]
    fn empty_chunk_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);
        sink.write_chunk(&record(&["review", "aspect_sentiments"]), &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "review,aspect_sentiments\n");
    }
}
