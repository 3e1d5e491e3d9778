//! # Configuração — CLI e Variáveis de Ambiente
//!
//! Toda a configuração chega pela linha de comando (`clap`), com fallback
//! para variáveis `ABSA_*`:
//!
//! | Flag | Variável | Padrão |
//! |------|----------|--------|
//! | `--annotator-url` | `ABSA_ANNOTATOR_URL` | `http://127.0.0.1:8000/annotate` |
//! | `--annotator-timeout-secs` | `ABSA_ANNOTATOR_TIMEOUT_SECS` | `30` |
//! | `--annotator-retries` | `ABSA_ANNOTATOR_RETRIES` | `0` |
//! | `--column` | `ABSA_REVIEW_COLUMN` | `review` |
//! | `--chunk-size` | `ABSA_CHUNK_SIZE` | `500` |
//! | `--mode` | `ABSA_OUTPUT_MODE` | `json-column` |
//! | `--parallel` | `ABSA_PARALLEL` | `false` |
//! | `--bind` | `ABSA_BIND` | `0.0.0.0:8080` |
//! | `--upload-dir` | `ABSA_UPLOAD_DIR` | `uploads` |
//! | `--output-dir` | `ABSA_OUTPUT_DIR` | `outputs` |
//!
//! ## Subcomandos
//!
//! ```bash
//! aspect-opinion serve
//! aspect-opinion analyze "The food was not good."
//! aspect-opinion batch --input reviews.csv --output processed.csv --mode exploded
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::batch::{BatchOptions, DEFAULT_CHUNK_SIZE, DEFAULT_REVIEW_COLUMN};
use crate::error::AbsaResult;
use crate::nlu::annotator::HttpAnnotator;
use crate::sink::OutputMode;

#[derive(Debug, Parser)]
#[command(
    name = "aspect-opinion",
    version,
    about = "Aspect-opinion extraction and per-aspect sentiment for product reviews"
)]
pub struct Cli {
    #[command(flatten)]
    pub annotator: AnnotatorArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sobe o servidor web (formulário, upload de CSV, SSE).
    Serve(ServeArgs),
    /// Analisa uma única review e imprime o JSON.
    Analyze {
        /// Texto da review.
        text: String,
    },
    /// Processa um CSV inteiro.
    Batch(BatchCommand),
}

/// Conexão com o anotador linguístico.
#[derive(Debug, Clone, Args)]
pub struct AnnotatorArgs {
    #[arg(
        long,
        env = "ABSA_ANNOTATOR_URL",
        default_value = "http://127.0.0.1:8000/annotate",
        global = true
    )]
    pub annotator_url: String,

    #[arg(long, env = "ABSA_ANNOTATOR_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub annotator_timeout_secs: u64,

    /// Tentativas extras com backoff exponencial (0 = sem retry).
    #[arg(long, env = "ABSA_ANNOTATOR_RETRIES", default_value_t = 0, global = true)]
    pub annotator_retries: u32,
}

impl AnnotatorArgs {
    /// Cria o adaptador HTTP. Precisa rodar fora do runtime tokio.
    pub fn build(&self) -> AbsaResult<HttpAnnotator> {
        HttpAnnotator::new(
            self.annotator_url.clone(),
            Duration::from_secs(self.annotator_timeout_secs),
            self.annotator_retries,
        )
    }
}

/// Parâmetros do processamento em lote (CLI e servidor).
#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// Coluna com o texto das reviews.
    #[arg(long = "column", env = "ABSA_REVIEW_COLUMN", default_value = DEFAULT_REVIEW_COLUMN)]
    pub review_column: String,

    #[arg(long, env = "ABSA_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// `json-column` (uma coluna JSON) ou `exploded` (uma linha por aspecto).
    #[arg(long = "mode", env = "ABSA_OUTPUT_MODE", default_value_t = OutputMode::JsonColumn)]
    pub output_mode: OutputMode,

    /// Extração paralela dentro de cada chunk.
    #[arg(long, env = "ABSA_PARALLEL")]
    pub parallel: bool,
}

impl BatchArgs {
    pub fn options(&self) -> BatchOptions {
        BatchOptions {
            review_column: self.review_column.clone(),
            chunk_size: self.chunk_size,
            output_mode: self.output_mode,
            parallel: self.parallel,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "ABSA_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Onde os CSVs enviados são guardados.
    #[arg(long, env = "ABSA_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Onde os CSVs processados são gravados.
    #[arg(long, env = "ABSA_OUTPUT_DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Debug, Clone, Args)]
pub struct BatchCommand {
    #[arg(long, short)]
    pub input: PathBuf,

    #[arg(long, short)]
    pub output: PathBuf,

    #[command(flatten)]
    pub batch: BatchArgs,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn batch_defaults() {
        let cli = Cli::try_parse_from(["aspect-opinion", "batch", "-i", "in.csv", "-o", "out.csv"])
            .unwrap();
        let Command::Batch(cmd) = cli.command else {
            panic!("expected batch command");
        };
        let options = cmd.batch.options();
        assert_eq!(cmd.input, PathBuf::from("in.csv"));
        assert_eq!(options.review_column, "review");
        assert_eq!(options.chunk_size, 500);
        assert_eq!(options.output_mode, OutputMode::JsonColumn);
        assert!(!options.parallel);
        assert_eq!(cli.annotator.annotator_retries, 0);
    }

    #[test]
    fn batch_overrides() {
        let cli = Cli::try_parse_from([
            "aspect-opinion",
            "batch",
            "--input",
            "in.csv",
            "--output",
            "out.csv",
            "--column",
            "Review",
            "--chunk-size",
            "50",
            "--mode",
            "exploded",
            "--parallel",
            "--annotator-retries",
            "3",
        ])
        .unwrap();
        let Command::Batch(cmd) = cli.command else {
            panic!("expected batch command");
        };
        assert_eq!(cmd.batch.review_column, "Review");
        assert_eq!(cmd.batch.chunk_size, 50);
        assert_eq!(cmd.batch.output_mode, OutputMode::Exploded);
        assert!(cmd.batch.parallel);
        assert_eq!(cli.annotator.annotator_retries, 3);
    }

    #[test]
    fn rejects_unknown_mode() {
        let result = Cli::try_parse_from([
            "aspect-opinion", "batch", "-i", "a.csv", "-o", "b.csv", "--mode", "xml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn analyze_takes_text() {
        let cli = Cli::try_parse_from(["aspect-opinion", "analyze", "Great pasta."]).unwrap();
        assert!(matches!(cli.command, Command::Analyze { text } if text == "Great pasta."));
    }
}
