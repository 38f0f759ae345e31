// src/task/vocab.rs

use ndarray::Array1;
use rustc_hash::FxHashMap as HashMap;
use serde::Serialize;

use crate::task::grammar::Grammar;
use crate::task::{Code, Error, Result};

/// Dense encoding of a grammar's terminals plus one null/padding symbol.
///
/// Terminals take codes `0..n` in order of first appearance in the grammar and
/// the null symbol takes the last code, `n`. The mapping never changes after
/// construction.
#[derive(Debug, Clone, Serialize)]
pub struct VocabularyEncoder {
    /// Symbols in code order; `words[code]` is the symbol for `code`.
    words: Vec<String>,
    null: String,
    #[serde(skip)]
    code_for: HashMap<String, Code>,
}

impl VocabularyEncoder {
    pub fn build(grammar: &Grammar, null: &str) -> Result<Self> {
        let terminals = grammar.terminals();
        if terminals.contains(&null) {
            return Err(Error::NullCollision(null.to_string()));
        }

        let words: Vec<String> = terminals
            .into_iter()
            .chain(std::iter::once(null))
            .map(str::to_string)
            .collect();
        let code_for = words
            .iter()
            .enumerate()
            .map(|(code, word)| (word.clone(), code))
            .collect();

        Ok(Self {
            words,
            null: null.to_string(),
            code_for,
        })
    }

    /// Number of codes, including the null symbol.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn null(&self) -> &str {
        &self.null
    }

    pub fn null_code(&self) -> Code {
        self.words.len() - 1
    }

    pub fn code_for(&self, word: &str) -> Result<Code> {
        self.code_for
            .get(word)
            .copied()
            .ok_or_else(|| Error::UnknownSymbol(word.to_string()))
    }

    pub fn word_for(&self, code: Code) -> Option<&str> {
        self.words.get(code).map(String::as_str)
    }

    /// Symbols in code order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn words_to_code<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<Code>> {
        words.iter().map(|w| self.code_for(w.as_ref())).collect()
    }

    pub fn words_to_one_hot<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<Array1<f32>>> {
        let size = self.len();
        words
            .iter()
            .map(|w| self.code_for(w.as_ref()).map(|code| one_hot(code, size)))
            .collect()
    }
}

/// `0 -> [1, 0, 0, ...]`, `1 -> [0, 1, 0, ...]` and so on.
pub fn one_hot(code: Code, size: usize) -> Array1<f32> {
    let mut v = Array1::zeros(size);
    if code < size {
        v[code] = 1.0;
    }
    v
}
