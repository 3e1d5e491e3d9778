//! # Anotador Linguístico — Adaptador
//!
//! Tokenização, POS tagging e parsing de dependências ficam **fora** do
//! núcleo. Este módulo define o contrato ([`Annotator`]) e o adaptador que
//! traduz a saída de um serviço de anotação para o [`Document`] da crate.
//!
//! ## Formato de Fio (compatível com `Doc.to_json()` do spaCy)
//!
//! ```json
//! { "text": "The food was good.",
//!   "sents":  [ {"start": 0, "end": 18} ],
//!   "tokens": [ {"id": 0, "start": 0, "end": 3, "pos": "DET",
//!                "lemma": "the", "dep": "det", "head": 1}, ... ],
//!   "noun_chunks": [ {"start": 0, "end": 8} ] }
//! ```
//!
//! - Offsets em **caracteres** (code points), convertidos aqui para bytes
//! - `head` é o índice absoluto do token; a raiz aponta para si mesma
//! - `sents` e `noun_chunks` são opcionais (derivados do grafo se ausentes)
//!
//! ## Serviço HTTP
//!
//! O [`HttpAnnotator`] envia um lote por chamada:
//!
//! ```text
//! POST {url}   {"texts": ["...", "..."]}
//!   → 200      {"docs":  [ {doc}, {doc} ]}     (mesma ordem)
//! ```
//!
//! Cada documento é anotado de forma independente; nenhum estado vaza
//! entre documentos do mesmo lote.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::core::{Document, RawToken, TokenId};
use crate::error::{AbsaError, AbsaResult};

/// Contrato do anotador linguístico.
pub trait Annotator: Send + Sync {
    /// Anota um documento.
    fn annotate(&self, text: &str) -> AbsaResult<Document>;

    /// Anota um lote de documentos, devolvendo-os na mesma ordem.
    fn annotate_batch(&self, texts: &[String]) -> AbsaResult<Vec<Document>> {
        texts.iter().map(|t| self.annotate(t)).collect()
    }
}

// ─── Formato de fio ──────────────────────────────────────────────

/// Documento no formato `Doc.to_json()`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireDoc {
    pub text: String,
    #[serde(default)]
    pub sents: Vec<WireSpan>,
    pub tokens: Vec<WireToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noun_chunks: Option<Vec<WireSpan>>,
}

/// Faixa em offsets de caractere `[start, end)`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WireSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireToken {
    #[serde(default)]
    pub id: Option<usize>,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub lemma: Option<String>,
    #[serde(default)]
    pub dep: String,
    pub head: usize,
}

impl WireDoc {
    /// Converte para a arena validada.
    ///
    /// # Erros
    ///
    /// [`AbsaError::Annotation`] para ids fora de ordem, offsets além do
    /// texto, sentenças/chunks que não contêm nenhum token, ou qualquer
    /// inconsistência detectada por [`Document::from_parts`].
    pub fn into_document(self) -> AbsaResult<Document> {
        let WireDoc {
            text,
            sents,
            tokens,
            noun_chunks,
        } = self;

        // Tabela caractere → byte (com sentinela no fim do texto)
        let byte_at: Vec<usize> = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        let to_byte = |c: usize| {
            byte_at.get(c).copied().ok_or_else(|| {
                AbsaError::Annotation(format!("character offset {c} is past the end of the text"))
            })
        };

        let mut raw = Vec::with_capacity(tokens.len());
        for (position, token) in tokens.iter().enumerate() {
            if token.id.is_some_and(|id| id != position) {
                return Err(AbsaError::Annotation(format!(
                    "token id {:?} found at position {position}",
                    token.id
                )));
            }
            raw.push(RawToken {
                start: to_byte(token.start)?,
                end: to_byte(token.end)?,
                lemma: token.lemma.clone(),
                pos: token.pos.clone(),
                dep: token.dep.clone(),
                head: token.head,
            });
        }

        let sentence_bounds = sents
            .iter()
            .map(|s| token_range(&tokens, *s, |t, s| t.start >= s.start && t.start < s.end))
            .collect::<AbsaResult<Vec<_>>>()?;
        let chunk_bounds = noun_chunks
            .map(|chunks| {
                chunks
                    .iter()
                    .map(|c| token_range(&tokens, *c, |t, c| t.start >= c.start && t.end <= c.end))
                    .collect::<AbsaResult<Vec<_>>>()
            })
            .transpose()?;

        Document::from_parts(text, raw, sentence_bounds, chunk_bounds)
    }
}

/// Faixa de tokens `[first, last + 1)` cujos offsets satisfazem `inside`.
fn token_range(
    tokens: &[WireToken],
    span: WireSpan,
    inside: impl Fn(&WireToken, &WireSpan) -> bool,
) -> AbsaResult<(TokenId, TokenId)> {
    let mut matching = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| inside(t, &span))
        .map(|(i, _)| i);
    let first = matching.next().ok_or_else(|| {
        AbsaError::Annotation(format!("span {}..{} contains no tokens", span.start, span.end))
    })?;
    let last = matching.last().unwrap_or(first);
    Ok((first, last + 1))
}

// ─── Adaptador HTTP ──────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct AnnotateResponse {
    docs: Vec<WireDoc>,
}

/// Base do backoff exponencial entre tentativas.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Anotador remoto que fala o formato de fio acima.
///
/// Usa o cliente **bloqueante** do reqwest: o pipeline é síncrono e, no
/// servidor web, roda dentro de `spawn_blocking`.
pub struct HttpAnnotator {
    client: Client,
    url: String,
    /// Tentativas extras após a primeira falha (0 = sem retry).
    retries: u32,
}

impl HttpAnnotator {
    /// Cria o adaptador. Deve ser chamado fora de um contexto async.
    pub fn new(url: impl Into<String>, timeout: Duration, retries: u32) -> AbsaResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AbsaError::Annotation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, texts: &[String]) -> AbsaResult<Vec<WireDoc>> {
        let response = self
            .client
            .post(&self.url)
            .json(&AnnotateRequest { texts })
            .send()
            .map_err(|e| AbsaError::Annotation(format!("request to {} failed: {e}", self.url)))?;

        if !response.status().is_success() {
            return Err(AbsaError::Annotation(format!(
                "annotator returned {}",
                response.status()
            )));
        }

        let body: AnnotateResponse = response
            .json()
            .map_err(|e| AbsaError::Annotation(format!("invalid annotator payload: {e}")))?;
        if body.docs.len() != texts.len() {
            return Err(AbsaError::Annotation(format!(
                "annotator returned {} docs for {} texts",
                body.docs.len(),
                texts.len()
            )));
        }
        Ok(body.docs)
    }

    /// Chamada com retry limitado e backoff exponencial.
    fn request_with_retry(&self, texts: &[String]) -> AbsaResult<Vec<WireDoc>> {
        let mut attempt = 0;
        loop {
            match self.request(texts) {
                Ok(docs) => return Ok(docs),
                Err(e) if attempt < self.retries => {
                    let wait = RETRY_BACKOFF * 2u32.pow(attempt);
                    tracing::warn!(error = %e, attempt = attempt + 1, wait_ms = wait.as_millis() as u64, "Anotador falhou, tentando novamente");
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Annotator for HttpAnnotator {
    fn annotate(&self, text: &str) -> AbsaResult<Document> {
        let mut docs = self.annotate_batch(&[text.to_string()])?;
        docs.pop()
            .ok_or_else(|| AbsaError::Annotation("annotator returned no document".into()))
    }

    fn annotate_batch(&self, texts: &[String]) -> AbsaResult<Vec<Document>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(docs = texts.len(), url = %self.url, "Anotando lote");
        self.request_with_retry(texts)?
            .into_iter()
            .map(WireDoc::into_document)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DepLabel;

    fn wire(json: &str) -> WireDoc {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn decodes_spacy_json() {
        let doc = wire(
            r#"{"text": "The food was good. Loved it!",
                "sents": [{"start": 0, "end": 18}, {"start": 19, "end": 28}],
                "tokens": [
                  {"id": 0, "start": 0, "end": 3, "pos": "DET", "tag": "DT", "lemma": "the", "dep": "det", "head": 1},
                  {"id": 1, "start": 4, "end": 8, "pos": "NOUN", "lemma": "food", "dep": "nsubj", "head": 2},
                  {"id": 2, "start": 9, "end": 12, "pos": "AUX", "lemma": "be", "dep": "ROOT", "head": 2},
                  {"id": 3, "start": 13, "end": 17, "pos": "ADJ", "lemma": "good", "dep": "acomp", "head": 2},
                  {"id": 4, "start": 17, "end": 18, "pos": "PUNCT", "dep": "punct", "head": 2},
                  {"id": 5, "start": 19, "end": 24, "pos": "VERB", "lemma": "love", "dep": "ROOT", "head": 5},
                  {"id": 6, "start": 25, "end": 27, "pos": "PRON", "dep": "dobj", "head": 5},
                  {"id": 7, "start": 27, "end": 28, "pos": "PUNCT", "dep": "punct", "head": 5}
                ]}"#,
        )
        .into_document()
        .unwrap();

        assert_eq!(doc.len(), 8);
        assert_eq!(doc.sentences().len(), 2);
        assert_eq!(doc.sentence_text(0), "The food was good.");
        assert_eq!(doc.sentence_text(1), "Loved it!");
        assert_eq!(doc.token(2).lemma, "be");
        assert_eq!(doc.token(4).lemma, ".");
        assert_eq!(doc.token(1).dep, DepLabel::Nsubj);
        assert_eq!(doc.token(6).sentence, 1);
    }

    #[test]
    fn converts_character_offsets_to_bytes() {
        let doc = wire(
            r#"{"text": "Café ótimo",
                "tokens": [
                  {"start": 0, "end": 4, "pos": "NOUN", "dep": "ROOT", "head": 0},
                  {"start": 5, "end": 10, "pos": "ADJ", "dep": "amod", "head": 0}
                ]}"#,
        )
        .into_document()
        .unwrap();
        assert_eq!(doc.token(0).text, "Café");
        assert_eq!(doc.token(1).text, "ótimo");
        assert_eq!(doc.sentences().len(), 1);
    }

    #[test]
    fn explicit_noun_chunks_are_kept() {
        let doc = wire(
            r#"{"text": "Great quality",
                "tokens": [
                  {"start": 0, "end": 5, "pos": "ADJ", "dep": "amod", "head": 1},
                  {"start": 6, "end": 13, "pos": "NOUN", "dep": "ROOT", "head": 1}
                ],
                "noun_chunks": [{"start": 0, "end": 13}]}"#,
        )
        .into_document()
        .unwrap();
        assert_eq!(doc.noun_chunks().len(), 1);
        assert_eq!(doc.chunk_text(&doc.noun_chunks()[0]), "Great quality");
    }

    #[test]
    fn rejects_offsets_past_the_text() {
        let result = wire(
            r#"{"text": "ok", "tokens": [{"start": 0, "end": 9, "pos": "X", "dep": "ROOT", "head": 0}]}"#,
        )
        .into_document();
        assert!(matches!(result, Err(AbsaError::Annotation(_))));
    }

    #[test]
    fn rejects_out_of_order_ids() {
        let result = wire(
            r#"{"text": "ok", "tokens": [{"id": 3, "start": 0, "end": 2, "pos": "X", "dep": "ROOT", "head": 0}]}"#,
        )
        .into_document();
        assert!(result.is_err());
    }

    #[test]
    fn empty_token_list_is_an_empty_document() {
        let doc = wire(r#"{"text": "", "tokens": []}"#).into_document().unwrap();
        assert!(doc.is_empty());
        assert!(doc.sentences().is_empty());
    }

    #[test]
    fn unreachable_service_is_an_annotation_failure() {
        let annotator =
            HttpAnnotator::new("http://127.0.0.1:9/annotate", Duration::from_millis(200), 0)
                .unwrap();
        let result = annotator.annotate("The food was good.");
        assert!(matches!(result, Err(AbsaError::Annotation(_))));
    }
}
