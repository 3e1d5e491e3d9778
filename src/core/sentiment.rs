//! # Sentiment — Rótulo Categórico de Polaridade
//!
//! Converte o **compound score** (um único valor em `[-1, 1]` produzido
//! pelo scorer) em um rótulo de três vias.
//!
//! ## Faixa Neutra
//!
//! ```text
//!   -1.0        -0.05   0   +0.05        +1.0
//!    ├───────────┤ ░░░░░░░░░ ├────────────┤
//!      Negative     Neutral     Positive
//! ```
//!
//! Os limites são **inclusivos** nas pontas polarizadas: `0.05` já é
//! `Positive` e `-0.05` já é `Negative`. A faixa é fixa.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Meia-largura da faixa neutra.
pub const NEUTRAL_BAND: f64 = 0.05;

/// Rótulo de sentimento associado a um par aspecto-opinião.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Rotula um compound score.
    ///
    /// # Exemplo
    ///
    /// ```rust
    /// assert_eq!(Sentiment::from_score(0.05), Sentiment::Positive);
    /// assert_eq!(Sentiment::from_score(0.049999), Sentiment::Neutral);
    /// ```
    pub fn from_score(score: f64) -> Self {
        if score >= NEUTRAL_BAND {
            Sentiment::Positive
        } else if score <= -NEUTRAL_BAND {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Label textual, igual ao valor serializado.
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive_on_polar_side() {
        assert_eq!(Sentiment::from_score(0.05), Sentiment::Positive);
        assert_eq!(Sentiment::from_score(0.049999), Sentiment::Neutral);
        assert_eq!(Sentiment::from_score(-0.05), Sentiment::Negative);
        assert_eq!(Sentiment::from_score(-0.049999), Sentiment::Neutral);
    }

    #[test]
    fn extremes_and_zero() {
        assert_eq!(Sentiment::from_score(1.0), Sentiment::Positive);
        assert_eq!(Sentiment::from_score(-1.0), Sentiment::Negative);
        assert_eq!(Sentiment::from_score(0.0), Sentiment::Neutral);
    }

    #[test]
    fn serializes_as_plain_label() {
        let json = serde_json::to_string(&Sentiment::Negative).unwrap();
        assert_eq!(json, "\"Negative\"");
        assert_eq!(Sentiment::Positive.to_string(), "Positive");
    }
}
