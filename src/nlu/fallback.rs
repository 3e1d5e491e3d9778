//! # Fallback — Sentimento Grosso por Documento
//!
//! Quando nenhum padrão sintático casa, o documento ainda pode carregar
//! sentimento ("I recommend this seller."). O [`FallbackResolver`] escolhe
//! uma frase nominal representativa como aspecto e pontua o documento
//! inteiro:
//!
//! 1. primeiro noun chunk cuja raiz é sujeito (`nsubj`/`nsubjpass`) ou
//!    objeto direto (`dobj`)
//! 2. senão, o primeiro noun chunk disponível
//! 3. senão, o aspecto `"general"`
//!
//! Chunks com raiz pronominal ("I", "it") nunca são escolhidos.
//!
//! O resultado só é emitido se o compound for **diferente de zero**: um
//! documento neutro exato não gera nada (ausência de sinal, não erro).

use std::sync::Arc;

use crate::core::{AspectOpinion, DepLabel, Document, NounChunk, PosTag, NO_OPINION};
use crate::error::AbsaResult;

use super::scorer::SentimentScorer;

/// Aspecto usado quando o documento não tem frase nominal elegível.
pub const GENERAL_ASPECT: &str = "general";

pub struct FallbackResolver {
    scorer: Arc<dyn SentimentScorer>,
}

impl FallbackResolver {
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self { scorer }
    }

    /// Texto (lowercase) da frase nominal representativa do documento.
    pub fn select_aspect(&self, doc: &Document) -> String {
        let eligible: Vec<&NounChunk> = doc
            .noun_chunks()
            .iter()
            .filter(|chunk| doc.token(chunk.root).pos != PosTag::Pron)
            .collect();

        eligible
            .iter()
            .find(|chunk| {
                let dep = doc.token(chunk.root).dep;
                dep.is_subject() || dep == DepLabel::Dobj
            })
            .or_else(|| eligible.first())
            .map(|chunk| doc.chunk_text(chunk).to_lowercase())
            .unwrap_or_else(|| GENERAL_ASPECT.to_string())
    }

    /// Resultado único com opinião `N/A`, ou `None` se o score for zero.
    ///
    /// O texto do documento é pontuado e devolvido como contexto sem
    /// nenhum recorte; só o teste de vazio ignora espaços.
    pub fn resolve(&self, doc: &Document) -> AbsaResult<Option<AspectOpinion>> {
        let context = doc.text();
        if context.trim().is_empty() {
            return Ok(None);
        }

        let score = self.scorer.score(context)?;
        if score == 0.0 {
            tracing::debug!("Fallback sem sinal (score 0)");
            return Ok(None);
        }

        let aspect = self.select_aspect(doc);
        tracing::debug!(aspect = %aspect, score, "Fallback aplicado");
        Ok(Some(AspectOpinion::new(aspect, NO_OPINION, context, score)))
    }
}
