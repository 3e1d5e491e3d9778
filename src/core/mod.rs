//! # Módulo Core — Tipos Fundamentais do Domínio
//!
//! Tipos sobre os quais todo o pipeline opera:
//!
//! - [`Document`] — grafo de dependências imutável produzido pelo anotador
//! - [`Token`], [`Sentence`], [`NounChunk`] — nós e faixas da arena
//! - [`PosTag`], [`DepLabel`] — classes gramaticais e rótulos de dependência
//! - [`AspectOpinion`] — par aspecto-opinião com sentimento (resultado)
//! - [`Sentiment`] — rótulo categórico de polaridade
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use crate::core::{AspectOpinion, Sentiment};
//!
//! let r = AspectOpinion::new("food", "good", "The food was good.", 0.44);
//! assert_eq!(r.sentiment, Sentiment::Positive);
//! ```

/// Sub-módulo com o grafo de dependências ([`Document`]).
pub mod document;

/// Sub-módulo com o resultado da extração ([`AspectOpinion`]).
pub mod aspect;

/// Sub-módulo com o rótulo de sentimento ([`Sentiment`]).
pub mod sentiment;

pub use aspect::{dedup_results, AspectOpinion, NO_OPINION};
pub use document::{DepLabel, Document, NounChunk, PosTag, RawToken, Sentence, Token, TokenId};
pub use sentiment::Sentiment;
