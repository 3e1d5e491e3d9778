//! # Pipeline ABSA — Análise de Sentimento Baseada em Aspectos
//!
//! O [`AbsaPipeline`] liga os componentes do núcleo aos dois colaboradores
//! externos (anotador linguístico e scorer de sentimento):
//!
//! ```text
//! review bruta
//!   ├── 1. normalize()          — repara fronteiras de sentença
//!   ├── 2. Annotator            — sentenças, tokens, POS, dependências
//!   ├── 3. AspectExtractor      — cascata de padrões (+ scorer por sentença)
//!   │      └── FallbackResolver — se nada casou
//!   └── 4. Vec<AspectOpinion>   — resultado deduplicado
//! ```
//!
//! ## Injeção de Dependências
//!
//! Nada é global: anotador e scorer chegam como `Arc<dyn …>` no
//! construtor, são criados uma vez no início do processo e repassados
//! para quem precisa (servidor web, processador em lote, CLI).
//!
//! ## Sub-módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|-----------------|
//! | [`normalizer`] | Espaço após `.`/`!`/`?` colado a uma letra |
//! | [`annotator`] | Contrato do anotador + adaptador HTTP (formato spaCy) |
//! | [`scorer`] | Contrato do scorer + scorer léxico embutido |
//! | [`extractor`] | Cascata de padrões aspecto-opinião |
//! | [`fallback`] | Frase nominal representativa + sentimento do documento |

/// Sub-módulo do contrato do anotador e do adaptador HTTP.
pub mod annotator;

/// Sub-módulo da cascata de padrões.
pub mod extractor;

/// Sub-módulo do fallback por documento.
pub mod fallback;

/// Sub-módulo do normalizador de texto.
pub mod normalizer;

/// Sub-módulo do scorer de sentimento.
pub mod scorer;

use std::sync::Arc;

use rayon::prelude::*;

use crate::core::{AspectOpinion, Document};
use crate::error::{AbsaError, AbsaResult};

use annotator::Annotator;
use extractor::AspectExtractor;
use scorer::SentimentScorer;

/// Pipeline completo: normalização → anotação → extração.
///
/// Imutável após a criação (`&self` em tudo), portanto seguro para uso
/// concorrente por várias requisições e pelas threads do rayon.
pub struct AbsaPipeline {
    annotator: Arc<dyn Annotator>,
    extractor: AspectExtractor,
}

impl AbsaPipeline {
    pub fn new(annotator: Arc<dyn Annotator>, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            annotator,
            extractor: AspectExtractor::new(scorer),
        }
    }

    /// Analisa uma única review.
    ///
    /// # Erros
    ///
    /// - [`AbsaError::EmptyInput`] para texto vazio ou só espaços, antes de
    ///   qualquer chamada ao anotador
    /// - falhas do anotador ou do scorer, sem resultado parcial
    pub fn analyze_single(&self, text: &str) -> AbsaResult<Vec<AspectOpinion>> {
        if text.trim().is_empty() {
            return Err(AbsaError::EmptyInput);
        }
        let doc = self.annotator.annotate(&normalizer::normalize(text))?;
        self.extractor.extract(&doc)
    }

    /// Analisa um lote de reviews, na ordem de entrada.
    ///
    /// Células vazias não são enviadas ao anotador e resultam em lista
    /// vazia. O anotador recebe **uma** chamada para o lote inteiro; com
    /// `parallel`, a extração roda no pool do rayon (a ordem é mantida).
    pub fn analyze_batch(
        &self,
        texts: &[String],
        parallel: bool,
    ) -> AbsaResult<Vec<Vec<AspectOpinion>>> {
        let normalized: Vec<String> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| normalizer::normalize(t))
            .collect();
        let mut docs = self.annotator.annotate_batch(&normalized)?.into_iter();
        if docs.len() != normalized.len() {
            return Err(AbsaError::Annotation(format!(
                "annotator returned {} documents for {} texts",
                docs.len(),
                normalized.len()
            )));
        }

        // Reinsere documentos vazios nas posições puladas
        let aligned: Vec<Document> = texts
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    Some(Document::empty(t.as_str()))
                } else {
                    docs.next()
                }
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AbsaError::Annotation("annotator returned too few documents".into()))?;

        if parallel {
            aligned.par_iter().map(|doc| self.extract(doc)).collect()
        } else {
            aligned.iter().map(|doc| self.extract(doc)).collect()
        }
    }

    /// Extração sobre um documento já anotado.
    pub fn extract(&self, doc: &Document) -> AbsaResult<Vec<AspectOpinion>> {
        if doc.is_empty() {
            return Ok(Vec::new());
        }
        self.extractor.extract(doc)
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::FakeAnnotator;
    use super::*;
    use crate::core::Sentiment;
    use crate::nlu::scorer::VaderScorer;

    fn pipeline(annotator: FakeAnnotator) -> (AbsaPipeline, Arc<FakeAnnotator>) {
        let annotator = Arc::new(annotator);
        let pipeline = AbsaPipeline::new(annotator.clone(), Arc::new(VaderScorer::new()));
        (pipeline, annotator)
    }

    #[test]
    fn single_review_end_to_end() {
        let (pipeline, _) = pipeline(FakeAnnotator::reviews());
        let results = pipeline.analyze_single("The food was not good.").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].aspect, "food");
        assert_eq!(results[0].opinion, "good");
        assert_eq!(results[0].sentiment, Sentiment::Negative);
    }

    #[test]
    fn single_review_is_normalized_before_annotation() {
        let (pipeline, _) = pipeline(FakeAnnotator::reviews());
        let results = pipeline.analyze_single("Great pasta.Loved it!").unwrap();
        assert_eq!(results[0].aspect, "pasta");
        assert_eq!(results[0].context, "Great pasta.");
    }

    #[test]
    fn blank_review_is_rejected_before_annotation() {
        let (pipeline, annotator) = pipeline(FakeAnnotator::reviews());
        assert!(matches!(pipeline.analyze_single("   \n"), Err(AbsaError::EmptyInput)));
        assert_eq!(annotator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn annotator_failure_surfaces() {
        let (pipeline, _) =
            pipeline(FakeAnnotator::reviews().failing_on("The food was not good."));
        assert!(matches!(
            pipeline.analyze_single("The food was not good."),
            Err(AbsaError::Annotation(_))
        ));
    }

    #[test]
    fn batch_keeps_order_and_skips_blank_cells() {
        let (pipeline, annotator) = pipeline(FakeAnnotator::reviews());
        let texts = vec![
            "The food was good and cheap.".to_string(),
            String::new(),
            "The food was not good.".to_string(),
        ];
        for parallel in [false, true] {
            let results = pipeline.analyze_batch(&texts, parallel).unwrap();
            assert_eq!(results.len(), 3);
            assert_eq!(results[0].len(), 2);
            assert!(results[1].is_empty());
            assert_eq!(results[2][0].sentiment, Sentiment::Negative);
        }
        assert_eq!(annotator.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn batch_of_documents_shares_no_state() {
        let (pipeline, _) = pipeline(FakeAnnotator::reviews());
        let texts = vec!["The food was not good.".to_string(); 2];
        let results = pipeline.analyze_batch(&texts, false).unwrap();
        assert_eq!(results[0], results[1]);
        assert_eq!(results[1].len(), 1);
    }
}
