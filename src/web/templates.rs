//! # Templates Maud — Página de Análise
//!
//! Uma única página, renderizada no servidor com [`maud`]:
//!
//! ```text
//! ┌──────────────── header ─────────────────────┐
//! │ Aspect Opinion │ anotador: http://…  │ ●    │
//! ├─────────────────────────────────────────────┤
//! │ Review única                                │
//! │ [_____________________________] [Analisar]  │
//! │ ┌ tabela aspecto / opinião / sentimento ┐   │
//! ├─────────────────────────────────────────────┤
//! │ Dataset CSV                                 │
//! │ [arquivo.csv] [coluna: review] [Processar]  │
//! │ progresso (SSE /events)                     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! O JavaScript inline chama `/work/single` e `/work/csv` via `fetch` e
//! escuta `/events` para mostrar o progresso do lote.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::batch::DEFAULT_REVIEW_COLUMN;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 900px; margin: 2rem auto; color: #222; }
header { display: flex; justify-content: space-between; align-items: baseline; }
section { border: 1px solid #ddd; border-radius: 8px; padding: 1rem 1.5rem; margin-top: 1.5rem; }
textarea { width: 100%; min-height: 5rem; }
table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
td, th { border-bottom: 1px solid #eee; padding: .35rem .5rem; text-align: left; }
.Positive { color: #1a7f37; } .Negative { color: #cf222e; } .Neutral { color: #6e7781; }
.error { color: #cf222e; }
#progress { font-family: monospace; white-space: pre-wrap; margin-top: 1rem; }
"#;

const SCRIPT: &str = r#"<script>
const esc = (s) => String(s).replace(/[&<>"]/g, (c) => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c]));

document.getElementById('single-form').addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const out = document.getElementById('single-result');
  const resp = await fetch('/work/single', { method: 'POST', body: new URLSearchParams(new FormData(ev.target)) });
  const body = await resp.json();
  if (!resp.ok) { out.innerHTML = `<p class="error">${esc(body.error)}</p>`; return; }
  if (body.length === 0) { out.innerHTML = '<p>Nenhum aspecto encontrado.</p>'; return; }
  out.innerHTML = '<table><tr><th>Aspecto</th><th>Opinião</th><th>Sentimento</th><th>Score</th></tr>' +
    body.map((r) => `<tr><td>${esc(r.aspect)}</td><td>${esc(r.opinion)}</td>` +
      `<td class="${r.sentiment}">${r.sentiment}</td><td>${r.score.toFixed(4)}</td></tr>`).join('') +
    '</table>';
});

document.getElementById('csv-form').addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const status = document.getElementById('csv-status');
  status.textContent = 'Enviando...';
  const resp = await fetch('/work/csv', { method: 'POST', body: new FormData(ev.target) });
  if (!resp.ok) {
    const body = await resp.json().catch(() => ({ error: resp.statusText }));
    status.innerHTML = `<span class="error">${esc(body.error)}</span>`;
    return;
  }
  const name = (resp.headers.get('Content-Disposition') || '').match(/filename="(.+)"/);
  const link = document.createElement('a');
  link.href = URL.createObjectURL(await resp.blob());
  link.download = name ? name[1] : 'processed.csv';
  link.textContent = `Baixar ${link.download}`;
  status.replaceChildren(link);
});

const progress = document.getElementById('progress');
const source = new EventSource('/events');
source.onmessage = (msg) => {
  const ev = JSON.parse(msg.data);
  let line = '';
  switch (ev.type) {
    case 'Started': progress.textContent = ''; line = `▶ ${ev.source} (coluna ${ev.review_column}, ${ev.output_mode})`; break;
    case 'ChunkStarted': line = `  chunk ${ev.chunk}: ${ev.rows} linhas...`; break;
    case 'ChunkCompleted': line = `  chunk ${ev.chunk}: ${ev.results} resultados, ${ev.skipped_rows} puladas`; break;
    case 'Completed': line = `✔ ${ev.rows} linhas em ${ev.total_ms}ms (${ev.throughput}) → ${ev.output}`; break;
    case 'Error': line = `✖ ${ev.message}`; break;
  }
  progress.textContent += line + '\n';
};

fetch('/status').then((r) => r.json()).then((s) => {
  document.getElementById('annotator').textContent = s.annotator_url;
  document.getElementById('ready').textContent = s.ready ? '●' : '○';
});
</script>"#;

/// Página principal: formulário de review única e upload de CSV.
pub fn index_page() -> Markup {
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Aspect Opinion — Análise de Reviews" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    h1 { "Aspect Opinion" }
                    small {
                        "anotador: " code id="annotator" { "…" }
                        " " span id="ready" { "○" }
                    }
                }

                section {
                    h2 { "Review única" }
                    form id="single-form" {
                        textarea name="review" placeholder="The food was not good." {}
                        button type="submit" { "Analisar" }
                    }
                    div id="single-result" {}
                }

                section {
                    h2 { "Dataset CSV" }
                    form id="csv-form" enctype="multipart/form-data" {
                        input type="file" name="input_csv" accept=".csv" required;
                        " "
                        label {
                            "coluna: "
                            input type="text" name="review_column" value=(DEFAULT_REVIEW_COLUMN);
                        }
                        " "
                        button type="submit" { "Processar" }
                    }
                    div id="csv-status" {}
                    div id="progress" {}
                }

                (PreEscaped(SCRIPT))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_has_both_forms() {
        let page = index_page().into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(r#"id="single-form""#));
        assert!(page.contains(r#"name="input_csv""#));
        assert!(page.contains(r#"value="review""#));
        assert!(page.contains("new EventSource('/events')"));
    }
}
