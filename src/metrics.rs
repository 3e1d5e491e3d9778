//! # Métricas do Processo — Snapshot ao Fim de um Lote
//!
//! Coletadas ao término de cada processamento em lote e enviadas no
//! evento `Completed` (SSE) e na linha de sumário da CLI.
//!
//! | Categoria | Métrica | Fonte |
//! |-----------|---------|-------|
//! | RAM | Processo (MB) / Total (MB) | `sysinfo` |
//! | CPU | Cores ativos / Total / Pico por core | `sysinfo` |
//! | Disco | Tamanho do CSV de saída | `std::fs::metadata` |
//! | Throughput | linhas/s (opcional) | calculado pelo lote |
//!
//! ## Estado Persistente (System singleton)
//!
//! A lib `sysinfo` precisa de um baseline anterior para calcular
//! deltas de CPU. Por isso, mantemos uma única instância [`System`]
//! via [`OnceLock`] + [`Mutex`], reutilizada em todas as coletas.

use std::path::Path;
use std::sync::OnceLock;

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};

static SYS: OnceLock<Mutex<System>> = OnceLock::new();

fn system() -> &'static Mutex<System> {
    SYS.get_or_init(|| {
        let mut s = System::new();
        s.refresh_cpu_usage(); // baseline para deltas futuros
        Mutex::new(s)
    })
}

/// Snapshot de métricas do processo.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessMetrics {
    /// Memória RSS do processo em MB.
    pub memory_used_mb: f64,
    /// Memória total do sistema em MB.
    pub memory_total_mb: f64,
    /// Número de cores CPU com uso > 1%.
    pub cpu_active_cores: usize,
    /// Maior uso individual de CPU entre todos os cores (%).
    pub cpu_max_core_percent: f32,
    pub cpu_total_cores: usize,
    /// Tamanho do arquivo de saída em bytes (0 se não existir).
    pub output_size_bytes: u64,
    /// Throughput (ex: "1500 rows/s"), se disponível.
    pub throughput: Option<String>,
}

/// Coleta um snapshot de métricas do sistema e do processo.
///
/// - `output` — arquivo cujo tamanho entra no snapshot
/// - `throughput` — calculado por quem chama; `None` fora de lotes
pub fn collect_metrics(output: Option<&Path>, throughput: Option<String>) -> ProcessMetrics {
    let pid = Pid::from_u32(std::process::id());

    let mut sys = system().lock();
    sys.refresh_memory();
    sys.refresh_cpu_usage();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);

    let memory_used_mb = sys
        .process(pid)
        .map(|p| p.memory() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0);
    let memory_total_mb = sys.total_memory() as f64 / (1024.0 * 1024.0);

    let cpus = sys.cpus();
    let cpu_total_cores = cpus.len();
    let cpu_active_cores = cpus.iter().filter(|c| c.cpu_usage() > 1.0).count();
    let cpu_max_core_percent = cpus
        .iter()
        .map(|c| c.cpu_usage())
        .fold(0.0f32, f32::max);

    drop(sys);

    let output_size_bytes = output
        .and_then(|p| p.metadata().ok())
        .map(|m| m.len())
        .unwrap_or(0);

    ProcessMetrics {
        memory_used_mb,
        memory_total_mb,
        cpu_active_cores,
        cpu_max_core_percent,
        cpu_total_cores,
        output_size_bytes,
        throughput,
    }
}

/// Formata bytes em B, KB ou MB.
fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

impl ProcessMetrics {
    /// Linha de sumário para logs.
    ///
    /// Formato: `"42ms | RAM 150.3 MB | CPU 4/8 cores peak 85.2% | out 1.2 MB | 1500 rows/s"`
    pub fn summary_line(&self, elapsed_ms: u64) -> String {
        let throughput_part = match &self.throughput {
            Some(t) => format!(" | {}", t),
            None => String::new(),
        };

        format!(
            "{}ms | RAM {:.1} MB | CPU {}/{} cores peak {:.1}% | out {}{}",
            elapsed_ms,
            self.memory_used_mb,
            self.cpu_active_cores,
            self.cpu_total_cores,
            self.cpu_max_core_percent,
            human_size(self.output_size_bytes),
            throughput_part,
        )
    }
}
