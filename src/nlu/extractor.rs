//! # Extrator Aspecto-Opinião — Cascata de Padrões Sintáticos
//!
//! O [`AspectExtractor`] percorre o grafo de dependências de um
//! [`Document`] e localiza pares (aspecto, opinião). Cada par é pontuado
//! sobre a **sentença inteira** que o contém.
//!
//! ## Cascata (ordem de prioridade)
//!
//! | # | Padrão | Exemplo | Aspecto | Opinião |
//! |---|--------|---------|---------|---------|
//! | 1 | Predicado negado | "The food was **not** good." | sujeito | complemento |
//! | 2 | Adjetivo modifica nome | "**Great** pasta." | nome | `amod` |
//! | 3 | Sujeito-complemento | "The food was good and cheap." | `nsubj` | `acomp` (+ conjuntos) |
//!
//! O padrão 1 atua no nível da **sentença**: quando casa, a sentença é
//! marcada como processada e os padrões 2–3 não a visitam mais. Os padrões
//! 2–3 são avaliados numa única passada pelos tokens, em ordem de
//! documento, com deduplicação no nível do **token**: um token que já foi
//! aspecto ou opinião não vira opinião de novo, e um sujeito já usado não
//! abre o padrão 3. O nome modificado no padrão 2 pode ser repetido:
//! "**Great cheap** pasta." rende (pasta, great) e (pasta, cheap).
//!
//! ```text
//! "The food was not good."          "The food was good and cheap."
//!
//!        was                                 was
//!   ┌────┼────┐                        ┌─────┴─────┐
//! food  not  good                     food        good ── conj ── cheap
//! nsubj neg  acomp                    nsubj       acomp
//!
//! → (food, good, Negative)          → (food, good), (food, cheap)
//! ```
//!
//! Sem nenhum resultado no documento, o [`FallbackResolver`] assume.
//!
//! ## Estado por Chamada
//!
//! Marcadores de sentença e de token são vetores de `bool` indexados por
//! posição na arena, criados a cada chamada e descartados no fim. O
//! extrator em si é imutável e pode ser compartilhado entre threads.

use std::sync::Arc;

use crate::core::{dedup_results, AspectOpinion, DepLabel, Document, PosTag, Token, TokenId};
use crate::error::AbsaResult;

use super::fallback::FallbackResolver;
use super::scorer::SentimentScorer;

/// Motor de extração aspecto-opinião.
pub struct AspectExtractor {
    scorer: Arc<dyn SentimentScorer>,
    fallback: FallbackResolver,
}

impl AspectExtractor {
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        let fallback = FallbackResolver::new(Arc::clone(&scorer));
        Self { scorer, fallback }
    }

    /// Extrai os pares do documento, com fallback quando nada casa.
    ///
    /// A ordem é a ordem de emissão (determinística para a mesma entrada),
    /// já sem duplicatas estruturais.
    ///
    /// # Erros
    ///
    /// Propaga falhas do [`SentimentScorer`].
    pub fn extract(&self, doc: &Document) -> AbsaResult<Vec<AspectOpinion>> {
        let results = self.extract_patterns(doc)?;
        if !results.is_empty() {
            return Ok(results);
        }
        Ok(self.fallback.resolve(doc)?.into_iter().collect())
    }

    /// Só a cascata de padrões, sem fallback.
    pub fn extract_patterns(&self, doc: &Document) -> AbsaResult<Vec<AspectOpinion>> {
        let mut pass = Extraction::new(doc, self.scorer.as_ref());
        pass.negated_predicates()?;
        pass.modifiers_and_complements()?;

        let results = dedup_results(pass.results);
        tracing::trace!(tokens = doc.len(), results = results.len(), "Cascata aplicada");
        Ok(results)
    }
}

/// Estado de uma única extração.
struct Extraction<'a> {
    doc: &'a Document,
    scorer: &'a dyn SentimentScorer,
    /// Sentenças já resolvidas pelo padrão 1.
    processed: Vec<bool>,
    /// Tokens que já serviram de aspecto ou opinião.
    used: Vec<bool>,
    /// Score memoizado por sentença.
    scores: Vec<Option<f64>>,
    results: Vec<AspectOpinion>,
}

impl<'a> Extraction<'a> {
    fn new(doc: &'a Document, scorer: &'a dyn SentimentScorer) -> Self {
        Self {
            doc,
            scorer,
            processed: vec![false; doc.sentences().len()],
            used: vec![false; doc.len()],
            scores: vec![None; doc.sentences().len()],
            results: Vec::new(),
        }
    }

    fn sentence_score(&mut self, sentence: usize) -> AbsaResult<f64> {
        if let Some(score) = self.scores[sentence] {
            return Ok(score);
        }
        let score = self.scorer.score(self.doc.sentence_text(sentence))?;
        self.scores[sentence] = Some(score);
        Ok(score)
    }

    fn emit(&mut self, aspect: TokenId, opinion: TokenId) -> AbsaResult<()> {
        let doc = self.doc;
        let sentence = doc.token(aspect).sentence;
        let score = self.sentence_score(sentence)?;
        self.results.push(AspectOpinion::new(
            doc.token(aspect).lower.as_str(),
            doc.token(opinion).lower.as_str(),
            doc.sentence_text(sentence),
            score,
        ));
        self.used[aspect] = true;
        self.used[opinion] = true;
        Ok(())
    }

    // ─── Padrão 1 ────────────────────────────────────────────────

    fn negated_predicates(&mut self) -> AbsaResult<()> {
        let doc = self.doc;
        for neg in doc.tokens().iter().filter(|t| t.dep == DepLabel::Neg) {
            let predicate = doc.head(neg.index);
            if predicate.index == neg.index || self.processed[predicate.sentence] {
                continue;
            }
            let subject = doc.children(predicate.index).find(|c| c.dep.is_subject());
            let complement = doc.children(predicate.index).find(|c| c.dep == DepLabel::Acomp);

            if let (Some(subject), Some(complement)) = (subject, complement) {
                tracing::trace!(aspect = %subject.lower, opinion = %complement.lower, "Predicado negado");
                self.emit(subject.index, complement.index)?;
                self.processed[predicate.sentence] = true;
            }
        }
        Ok(())
    }

    // ─── Padrões 2 e 3 ───────────────────────────────────────────

    fn modifiers_and_complements(&mut self) -> AbsaResult<()> {
        let doc = self.doc;
        for token in doc.tokens() {
            if self.processed[token.sentence] || token.is_root() {
                continue;
            }
            let head = doc.head(token.index);

            if token.dep == DepLabel::Amod && head.pos == PosTag::Noun {
                if !self.used[token.index] {
                    self.emit(head.index, token.index)?;
                }
            } else if token.dep == DepLabel::Nsubj && head.pos.is_predicate() {
                self.subject_complement(token, head)?;
            }
        }
        Ok(())
    }

    fn subject_complement(&mut self, subject: &Token, predicate: &Token) -> AbsaResult<()> {
        if self.used[subject.index] {
            return Ok(());
        }
        let doc = self.doc;
        for complement in doc.children(predicate.index).filter(|c| c.dep == DepLabel::Acomp) {
            if self.used[complement.index] {
                continue;
            }
            self.emit(subject.index, complement.index)?;

            for conj in doc.conjuncts(complement.index) {
                if conj.index != subject.index && !self.used[conj.index] && is_complement_like(conj) {
                    self.emit(subject.index, conj.index)?;
                }
            }
        }
        Ok(())
    }
}

/// Conjunto que faz papel de complemento adjetival: `acomp` explícito ou
/// adjetivo ligado por `conj` (como o parser costuma rotular "cheap" em
/// "good and cheap").
fn is_complement_like(token: &Token) -> bool {
    token.dep == DepLabel::Acomp || (token.dep == DepLabel::Conj && token.pos == PosTag::Adj)
}
