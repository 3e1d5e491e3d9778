//! # Normalizador de Texto — Reparo de Fronteiras de Sentença
//!
//! Texto raspado ou colado costuma perder o espaço depois da pontuação
//! final (`"Great.Loved it!Nice"`). Sem o espaço, o segmentador do
//! anotador junta as sentenças e o escopo de cada padrão fica errado.
//!
//! A única transformação é inserir **um** espaço entre `.`, `!` ou `?` e
//! uma letra ASCII imediatamente seguinte. Caixa e espaços existentes são
//! preservados.

use std::sync::OnceLock;

use regex::Regex;

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([.!?])([A-Za-z])").expect("invalid regex"))
}

/// Insere espaço após pontuação final colada a uma letra.
///
/// ```text
/// "Great.Loved it!Nice"  → "Great. Loved it! Nice"
/// ```
pub fn normalize(text: &str) -> String {
    boundary_re().replace_all(text, "$1 $2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_space_after_terminal_punctuation() {
        assert_eq!(normalize("Great.Loved it!Nice"), "Great. Loved it! Nice");
        assert_eq!(normalize("Why?Because"), "Why? Because");
    }

    #[test]
    fn idempotent() {
        let inputs = ["Great.Loved it!Nice", "a.b.c", "ok. fine", "", "3.5 stars.Meh"];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn leaves_everything_else_untouched() {
        assert_eq!(normalize("Price was 3.5 dollars"), "Price was 3.5 dollars");
        assert_eq!(normalize("Wait...  what"), "Wait...  what");
        assert_eq!(normalize("LOUD.quiet"), "LOUD. quiet");
        assert_eq!(normalize("fim.Ótimo"), "fim.Ótimo");
    }

    #[test]
    fn consecutive_boundaries() {
        assert_eq!(normalize("a.b.c"), "a. b. c");
    }
}
