//! # Document — Grafo de Dependências Imutável
//!
//! Representação própria da saída do anotador linguístico. O motor de
//! extração **só** enxerga este modelo, nunca o formato nativo do
//! anotador (ver [`crate::nlu::annotator`]).
//!
//! ## Arena
//!
//! ```text
//! Document
//!  ├── text        "The food was good and cheap."
//!  ├── tokens      [The, food, was, good, and, cheap, .]   (índice = TokenId)
//!  ├── sentences   [0..7]                                   (índice = identidade)
//!  ├── noun_chunks [The food]
//!  ├── children    was → [food, good, .]   good → [and, cheap]
//!  └── conjuncts   good ↔ cheap
//! ```
//!
//! Tudo é referenciado por índice. A identidade de uma sentença é a sua
//! **posição** na arena: duas sentenças com o mesmo texto em offsets
//! diferentes continuam sendo unidades distintas.
//!
//! Offsets são sempre em **bytes** (já convertidos pelo adaptador).

use crate::error::{AbsaError, AbsaResult};

/// Índice de um token dentro do documento.
pub type TokenId = usize;

/// Classe gramatical grossa (Universal POS).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PosTag {
    Noun,
    Propn,
    Verb,
    Aux,
    Pron,
    Adj,
    Adv,
    Adp,
    Det,
    Part,
    Cconj,
    Sconj,
    Num,
    Punct,
    Intj,
    Sym,
    Other,
}

impl PosTag {
    /// Converte a tag textual do anotador (case-insensitive).
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "NOUN" => PosTag::Noun,
            "PROPN" => PosTag::Propn,
            "VERB" => PosTag::Verb,
            "AUX" => PosTag::Aux,
            "PRON" => PosTag::Pron,
            "ADJ" => PosTag::Adj,
            "ADV" => PosTag::Adv,
            "ADP" => PosTag::Adp,
            "DET" => PosTag::Det,
            "PART" => PosTag::Part,
            "CCONJ" | "CONJ" => PosTag::Cconj,
            "SCONJ" => PosTag::Sconj,
            "NUM" => PosTag::Num,
            "PUNCT" => PosTag::Punct,
            "INTJ" => PosTag::Intj,
            "SYM" => PosTag::Sym,
            _ => PosTag::Other,
        }
    }

    /// Núcleos possíveis de noun chunk.
    pub fn is_nominal(&self) -> bool {
        matches!(self, PosTag::Noun | PosTag::Propn | PosTag::Pron)
    }

    pub fn is_predicate(&self) -> bool {
        matches!(self, PosTag::Verb | PosTag::Aux)
    }
}

/// Rótulo de dependência (esquema ClearNLP do spaCy, com aliases UD).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepLabel {
    Nsubj,
    NsubjPass,
    Dobj,
    Pobj,
    Pcomp,
    Dative,
    Appos,
    Attr,
    Root,
    Amod,
    Acomp,
    Neg,
    Conj,
    Cc,
    Other,
}

impl DepLabel {
    /// Converte o rótulo textual do anotador (case-insensitive).
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "nsubj" => DepLabel::Nsubj,
            "nsubjpass" | "nsubj:pass" => DepLabel::NsubjPass,
            "dobj" | "obj" => DepLabel::Dobj,
            "pobj" => DepLabel::Pobj,
            "pcomp" => DepLabel::Pcomp,
            "dative" => DepLabel::Dative,
            "appos" => DepLabel::Appos,
            "attr" => DepLabel::Attr,
            "root" => DepLabel::Root,
            "amod" => DepLabel::Amod,
            "acomp" => DepLabel::Acomp,
            "neg" => DepLabel::Neg,
            "conj" => DepLabel::Conj,
            "cc" => DepLabel::Cc,
            _ => DepLabel::Other,
        }
    }

    /// Sujeito nominal, ativo ou passivo.
    pub fn is_subject(&self) -> bool {
        matches!(self, DepLabel::Nsubj | DepLabel::NsubjPass)
    }

    /// Dependências que podem encabeçar um noun chunk.
    fn is_np_bearing(&self) -> bool {
        matches!(
            self,
            DepLabel::Nsubj
                | DepLabel::Dobj
                | DepLabel::NsubjPass
                | DepLabel::Pcomp
                | DepLabel::Pobj
                | DepLabel::Dative
                | DepLabel::Appos
                | DepLabel::Attr
                | DepLabel::Root
        )
    }
}

/// Token anotado. Imutável depois de construído.
#[derive(Clone, Debug)]
pub struct Token {
    /// Texto de superfície.
    pub text: String,
    pub lemma: String,
    /// Forma em lowercase (usada nos resultados).
    pub lower: String,
    pub pos: PosTag,
    pub dep: DepLabel,
    /// Posição no documento.
    pub index: TokenId,
    /// Índice do head; a raiz aponta para si mesma.
    pub head: TokenId,
    /// Índice da sentença que contém o token.
    pub sentence: usize,
    /// Offset em bytes no texto do documento.
    pub offset: usize,
}

impl Token {
    pub fn is_root(&self) -> bool {
        self.head == self.index
    }

    /// Offset (exclusivo) do fim do token.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Sentença: faixa contígua de tokens `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentence {
    pub index: usize,
    pub start: TokenId,
    pub end: TokenId,
}

/// Frase nominal `[start, end)` com seu token raiz.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NounChunk {
    pub start: TokenId,
    pub end: TokenId,
    pub root: TokenId,
}

/// Token cru recebido do adaptador, antes da validação.
#[derive(Clone, Debug)]
pub struct RawToken {
    /// Offset inicial em bytes.
    pub start: usize,
    /// Offset final (exclusivo) em bytes.
    pub end: usize,
    pub lemma: Option<String>,
    pub pos: String,
    pub dep: String,
    /// Índice absoluto do head.
    pub head: usize,
}

/// Documento anotado: arena de tokens, sentenças e noun chunks.
#[derive(Clone, Debug)]
pub struct Document {
    text: String,
    tokens: Vec<Token>,
    sentences: Vec<Sentence>,
    noun_chunks: Vec<NounChunk>,
    children: Vec<Vec<TokenId>>,
    conjuncts: Vec<Vec<TokenId>>,
}

impl Document {
    /// Documento sem tokens (texto vazio ou só espaços).
    pub fn empty(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: Vec::new(),
            sentences: Vec::new(),
            noun_chunks: Vec::new(),
            children: Vec::new(),
            conjuncts: Vec::new(),
        }
    }

    /// Valida e monta a arena.
    ///
    /// - `sentence_bounds` — faixas de tokens `[start, end)`; vazio = uma
    ///   única sentença cobrindo tudo
    /// - `chunk_bounds` — faixas de noun chunks; `None` = derivar do grafo
    ///
    /// # Erros
    ///
    /// [`AbsaError::Annotation`] se um offset cair fora do texto ou fora
    /// de um limite de caractere, se um head apontar para fora do
    /// documento, ou se as sentenças não cobrirem os tokens em ordem.
    pub fn from_parts(
        text: impl Into<String>,
        raw_tokens: Vec<RawToken>,
        sentence_bounds: Vec<(TokenId, TokenId)>,
        chunk_bounds: Option<Vec<(TokenId, TokenId)>>,
    ) -> AbsaResult<Self> {
        let text = text.into();
        let n = raw_tokens.len();
        if n == 0 {
            return Ok(Self::empty(text));
        }

        // Sentenças: cobertura contígua de [0, n)
        let bounds = if sentence_bounds.is_empty() {
            vec![(0, n)]
        } else {
            sentence_bounds
        };
        let mut sentences = Vec::with_capacity(bounds.len());
        let mut expected = 0;
        for (start, end) in bounds {
            if start != expected || end < start || end > n {
                return Err(AbsaError::Annotation(format!(
                    "sentence bounds {start}..{end} do not follow token {expected}"
                )));
            }
            if end > start {
                sentences.push(Sentence {
                    index: sentences.len(),
                    start,
                    end,
                });
            }
            expected = end;
        }
        if expected != n {
            return Err(AbsaError::Annotation(format!(
                "sentences cover {expected} of {n} tokens"
            )));
        }

        let mut tokens = Vec::with_capacity(n);
        for sentence in &sentences {
            for index in sentence.start..sentence.end {
                let raw = &raw_tokens[index];
                if raw.start > raw.end
                    || raw.end > text.len()
                    || !text.is_char_boundary(raw.start)
                    || !text.is_char_boundary(raw.end)
                {
                    return Err(AbsaError::Annotation(format!(
                        "token {index} has invalid span {}..{}",
                        raw.start, raw.end
                    )));
                }
                if raw.head >= n {
                    return Err(AbsaError::Annotation(format!(
                        "token {index} points to head {} outside the document",
                        raw.head
                    )));
                }
                let surface = &text[raw.start..raw.end];
                tokens.push(Token {
                    text: surface.to_string(),
                    lemma: raw.lemma.clone().unwrap_or_else(|| surface.to_lowercase()),
                    lower: surface.to_lowercase(),
                    pos: PosTag::parse(&raw.pos),
                    dep: DepLabel::parse(&raw.dep),
                    index,
                    head: raw.head,
                    sentence: sentence.index,
                    offset: raw.start,
                });
            }
        }

        let mut children = vec![Vec::new(); n];
        for token in &tokens {
            if !token.is_root() {
                children[token.head].push(token.index);
            }
        }

        let mut doc = Self {
            text,
            tokens,
            sentences,
            noun_chunks: Vec::new(),
            children,
            conjuncts: Vec::new(),
        };
        doc.conjuncts = (0..n).map(|i| doc.compute_conjuncts(i)).collect();
        doc.noun_chunks = match chunk_bounds {
            Some(bounds) => doc.chunks_from_bounds(bounds)?,
            None => doc.derive_noun_chunks(),
        };
        Ok(doc)
    }

    // ─── Acessores ───────────────────────────────────────────────

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn noun_chunks(&self) -> &[NounChunk] {
        &self.noun_chunks
    }

    /// Head de um token (a raiz devolve ela mesma).
    pub fn head(&self, id: TokenId) -> &Token {
        &self.tokens[self.tokens[id].head]
    }

    /// Dependentes diretos, em ordem de documento.
    pub fn children(&self, id: TokenId) -> impl Iterator<Item = &Token> + '_ {
        self.children[id].iter().map(move |&c| &self.tokens[c])
    }

    /// Tokens coordenados com `id` (sem incluir o próprio).
    pub fn conjuncts(&self, id: TokenId) -> impl Iterator<Item = &Token> + '_ {
        self.conjuncts[id].iter().map(move |&c| &self.tokens[c])
    }

    /// Texto de uma faixa de tokens `[start, end)`.
    pub fn span_text(&self, start: TokenId, end: TokenId) -> &str {
        if start >= end {
            return "";
        }
        &self.text[self.tokens[start].offset..self.tokens[end - 1].end()]
    }

    pub fn sentence_text(&self, index: usize) -> &str {
        let sentence = &self.sentences[index];
        self.span_text(sentence.start, sentence.end)
    }

    pub fn chunk_text(&self, chunk: &NounChunk) -> &str {
        self.span_text(chunk.start, chunk.end)
    }

    /// Token mais à esquerda da subárvore de `id`.
    pub fn left_edge(&self, id: TokenId) -> TokenId {
        let mut visited = vec![false; self.tokens.len()];
        let mut stack = vec![id];
        let mut edge = id;
        while let Some(current) = stack.pop() {
            if std::mem::replace(&mut visited[current], true) {
                continue;
            }
            edge = edge.min(current);
            stack.extend(self.children[current].iter().copied());
        }
        edge
    }

    /// Raiz sintática de uma faixa: o primeiro token cujo head está fora dela.
    pub fn span_root(&self, start: TokenId, end: TokenId) -> TokenId {
        (start..end)
            .find(|&i| {
                let head = self.tokens[i].head;
                head == i || head < start || head >= end
            })
            .unwrap_or(end.saturating_sub(1))
    }

    // ─── Derivações ──────────────────────────────────────────────

    /// Coordenação transitiva a partir da cabeça da cadeia `conj`.
    fn compute_conjuncts(&self, id: TokenId) -> Vec<TokenId> {
        let mut start = id;
        // limitado por n: heads malformados podem formar ciclo
        for _ in 0..self.tokens.len() {
            let token = &self.tokens[start];
            if token.is_root() || token.dep != DepLabel::Conj {
                break;
            }
            start = token.head;
        }

        let mut output = vec![start];
        let mut cursor = 0;
        while cursor < output.len() {
            let word = output[cursor];
            cursor += 1;
            for &child in &self.children[word] {
                if child > word
                    && self.tokens[child].dep == DepLabel::Conj
                    && !output.contains(&child)
                {
                    output.push(child);
                }
            }
        }
        output.retain(|&t| t != id);
        output
    }

    fn chunks_from_bounds(&self, bounds: Vec<(TokenId, TokenId)>) -> AbsaResult<Vec<NounChunk>> {
        bounds
            .into_iter()
            .map(|(start, end)| {
                if start >= end || end > self.tokens.len() {
                    return Err(AbsaError::Annotation(format!(
                        "noun chunk {start}..{end} is outside the document"
                    )));
                }
                Ok(NounChunk {
                    start,
                    end,
                    root: self.span_root(start, end),
                })
            })
            .collect()
    }

    /// Regra de noun chunks do inglês: núcleo nominal com dependência
    /// nominal (ou conjunto de um), faixa `left_edge ..= núcleo`, sem
    /// sobreposição.
    fn derive_noun_chunks(&self) -> Vec<NounChunk> {
        let mut chunks = Vec::new();
        let mut prev_end: Option<TokenId> = None;

        for token in &self.tokens {
            if !token.pos.is_nominal() {
                continue;
            }
            let left = self.left_edge(token.index);
            if prev_end.is_some_and(|end| left <= end) {
                continue;
            }

            let qualifies = if token.dep.is_np_bearing() {
                true
            } else if token.dep == DepLabel::Conj {
                let mut head = self.head(token.index);
                while head.dep == DepLabel::Conj && head.head < head.index {
                    head = self.head(head.index);
                }
                head.dep.is_np_bearing()
            } else {
                false
            };

            if qualifies {
                prev_end = Some(token.index);
                chunks.push(NounChunk {
                    start: left,
                    end: token.index + 1,
                    root: token.index,
                });
            }
        }
        chunks
    }
}

/// Construtor de documentos a partir de tuplas `(texto, pos, dep, head)`,
/// com head relativo ao início da sentença.
#[cfg(test)]
pub struct DocumentBuilder {
    text: String,
    cursor: usize,
    tokens: Vec<RawToken>,
    sentences: Vec<(TokenId, TokenId)>,
    chunks: Option<Vec<(TokenId, TokenId)>>,
    error: Option<String>,
}

#[cfg(test)]
impl DocumentBuilder {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: 0,
            tokens: Vec::new(),
            sentences: Vec::new(),
            chunks: None,
            error: None,
        }
    }

    pub fn sentence(mut self, tokens: &[(&str, &str, &str, usize)]) -> Self {
        let base = self.tokens.len();
        for &(surface, pos, dep, head) in tokens {
            let Some(found) = self.text[self.cursor..].find(surface) else {
                self.error.get_or_insert(format!("token '{surface}' not found"));
                continue;
            };
            let start = self.cursor + found;
            self.cursor = start + surface.len();
            self.tokens.push(RawToken {
                start,
                end: self.cursor,
                lemma: None,
                pos: pos.to_string(),
                dep: dep.to_string(),
                head: base + head,
            });
        }
        self.sentences.push((base, self.tokens.len()));
        self
    }

    pub fn noun_chunk(mut self, start: TokenId, end: TokenId) -> Self {
        self.chunks.get_or_insert_with(Vec::new).push((start, end));
        self
    }

    pub fn build(self) -> AbsaResult<Document> {
        if let Some(error) = self.error {
            return Err(AbsaError::Annotation(error));
        }
        Document::from_parts(self.text, self.tokens, self.sentences, self.chunks)
    }
}
