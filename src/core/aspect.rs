//! # AspectOpinion — O Resultado da Extração
//!
//! Cada resultado liga um **aspecto** (sobre o que se fala) a uma
//! **opinião** (o que se diz), junto com a sentença que sustenta o
//! julgamento e o sentimento dessa sentença.
//!
//! ```json
//! { "aspect": "food", "opinion": "good",
//!   "context": "The food was not good.",
//!   "sentiment": "Negative", "score": -0.3412 }
//! ```
//!
//! A ordem dos campos acima é a ordem serializada; o JSON gravado na
//! coluna `aspect_sentiments` depende dela.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::sentiment::Sentiment;

/// Sentinela de opinião para resultados do fallback (só sentimento grosso).
pub const NO_OPINION: &str = "N/A";

/// Par aspecto-opinião com sentimento. Objeto de valor, imutável.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AspectOpinion {
    /// Texto do aspecto em lowercase.
    pub aspect: String,
    /// Texto da opinião em lowercase, ou [`NO_OPINION`].
    pub opinion: String,
    /// Sentença (ou documento) completa usada para pontuar.
    pub context: String,
    pub sentiment: Sentiment,
    /// Compound score em `[-1, 1]`.
    pub score: f64,
}

impl AspectOpinion {
    /// Cria um resultado rotulando o score com [`Sentiment::from_score`].
    pub fn new(
        aspect: impl Into<String>,
        opinion: impl Into<String>,
        context: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            aspect: aspect.into(),
            opinion: opinion.into(),
            context: context.into(),
            sentiment: Sentiment::from_score(score),
            score,
        }
    }

    /// `false` para resultados do fallback (opinião `N/A`).
    pub fn has_opinion(&self) -> bool {
        self.opinion != NO_OPINION
    }

    /// Chave estrutural (todos os campos; o score por bits).
    fn key(&self) -> (String, String, String, Sentiment, u64) {
        (
            self.aspect.clone(),
            self.opinion.clone(),
            self.context.clone(),
            self.sentiment,
            self.score.to_bits(),
        )
    }
}

/// Remove duplicatas estruturais mantendo a primeira ocorrência.
///
/// Idempotente: aplicar duas vezes devolve a mesma lista.
pub fn dedup_results(results: Vec<AspectOpinion>) -> Vec<AspectOpinion> {
    let mut seen = HashSet::with_capacity(results.len());
    let mut unique = Vec::with_capacity(results.len());
    for result in results {
        if seen.insert(result.key()) {
            unique.push(result);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<AspectOpinion> {
        vec![
            AspectOpinion::new("food", "good", "The food was good.", 0.44),
            AspectOpinion::new("food", "good", "The food was good.", 0.44),
            AspectOpinion::new("food", "cheap", "The food was good.", 0.44),
            AspectOpinion::new("food", "good", "Food was good!", 0.49),
        ]
    }

    #[test]
    fn dedup_removes_exact_duplicates_only() {
        let unique = dedup_results(sample());
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].opinion, "good");
        assert_eq!(unique[1].opinion, "cheap");
        assert_eq!(unique[2].context, "Food was good!");
    }

    #[test]
    fn dedup_is_idempotent() {
        let once = dedup_results(sample());
        let twice = dedup_results(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn new_labels_score() {
        let r = AspectOpinion::new("service", NO_OPINION, "Slow service.", -0.2);
        assert_eq!(r.sentiment, Sentiment::Negative);
        assert!(!r.has_opinion());
    }

    #[test]
    fn serializes_fields_in_order() {
        let r = AspectOpinion::new("food", "good", "The food was good.", 0.4404);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"aspect":"food","opinion":"good","context":"The food was good.","sentiment":"Positive","score":0.4404}"#
        );
    }
}
