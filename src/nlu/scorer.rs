//! # Scorer de Sentimento — Polaridade Compound
//!
//! O motor de extração nunca interpreta polaridade por conta própria: ele
//! pede a um [`SentimentScorer`] o **compound score** da sentença inteira
//! e só rotula o número. O scorer é uma função pura, sem noção de aspecto,
//! e sempre recebe o texto completo da sentença (ou do documento, no
//! fallback), nunca um pedaço isolado.
//!
//! ## VaderScorer
//!
//! Implementação padrão sobre o crate [`vader_sentiment`], que embute o
//! léxico VADER completo (~7.500 entradas + emojis) e as regras
//! heurísticas do modelo:
//!
//! | Regra | Efeito |
//! |-------|--------|
//! | Valência | cada palavra do léxico contribui com seu peso (-4..+4) |
//! | Intensificadores | "very", "slightly"… somam ±0.293 (decai com a distância) |
//! | Negação | "not", "never", "…n't" até 3 palavras antes → ×-0.74 |
//! | CAIXA ALTA | palavra toda em maiúsculas num texto misto → +0.733 |
//! | "but" | antes ×0.5, depois ×1.5 |
//! | `!` / `?` | ênfase somada na direção do total |
//!
//! A soma é normalizada para `[-1, 1]` e arredondada em 4 casas:
//!
//! ```text
//! compound = s / sqrt(s² + 15)
//! ```
//!
//! Exemplo: `"The food was not good."` → good (1.9) negado → -1.406 →
//! compound ≈ -0.3412 → Negative.

use unicode_normalization::UnicodeNormalization;
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::error::{AbsaError, AbsaResult};

/// Fonte de polaridade compound para um texto.
///
/// Implementações devem ser puras e thread-safe: o processador em lote
/// pode chamar `score` de várias threads (rayon) ao mesmo tempo.
pub trait SentimentScorer: Send + Sync {
    /// Compound score em `[-1, 1]` para o texto inteiro.
    fn score(&self, text: &str) -> AbsaResult<f64>;
}

/// Casas decimais mantidas no compound.
const COMPOUND_PRECISION: f64 = 10_000.0;

/// Scorer VADER. O léxico é estático no crate, então criar vários é barato.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, text: &str) -> AbsaResult<f64> {
        let text: String = text.nfc().collect();
        let scores = self.analyzer.polarity_scores(&text);
        let compound = scores
            .get("compound")
            .copied()
            .ok_or_else(|| AbsaError::Scoring("VADER não devolveu 'compound'".into()))?;
        Ok((compound * COMPOUND_PRECISION).round() / COMPOUND_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> f64 {
        VaderScorer::new().score(text).unwrap()
    }

    #[test]
    fn plain_positive_sentence() {
        assert_eq!(score("The food was good."), 0.4404);
    }

    #[test]
    fn negation_flips_polarity() {
        assert_eq!(score("The food was not good."), -0.3412);
    }

    #[test]
    fn empty_and_neutral_text_score_zero() {
        assert_eq!(score(""), 0.0);
        assert_eq!(score("   "), 0.0);
        assert_eq!(score("The table is wooden."), 0.0);
    }

    #[test]
    fn covers_vocabulary_beyond_common_adjectives() {
        assert!(score("Terrific service.") >= 0.05);
        assert!(score("The staff was pathetic.") <= -0.05);
        assert!(score("Thrilled with it.") >= 0.05);
        assert!(score("A total disaster.") <= -0.05);
    }

    #[test]
    fn boosters_and_dampeners() {
        assert!(score("The food was very good.") > score("The food was good."));
        assert!(score("The food was slightly good.") < score("The food was good."));
        assert!(score("The food was very bad.") < score("The food was bad."));
    }

    #[test]
    fn but_shifts_weight_to_second_clause() {
        assert!(score("The food was good but the service was terrible.") < 0.0);
    }

    #[test]
    fn exclamations_amplify() {
        assert!(score("The food was good!!!") > score("The food was good."));
    }

    #[test]
    fn compound_is_bounded() {
        let s = score("great great great great great great great great amazing awesome!!!!");
        assert!(s <= 1.0 && s > 0.9);
    }
}
