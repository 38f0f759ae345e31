// src/task/result.rs

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// A word lookup outside the vocabulary built from the grammar.
    #[error("unknown symbol: {0:?}")]
    UnknownSymbol(String),

    /// Sampling from a grammar/depth combination that produced no strings.
    #[error("cannot sample from an empty pool")]
    EmptyPool,

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The null symbol is already a terminal of the grammar.
    #[error("null symbol {0:?} is already a terminal of the grammar")]
    NullCollision(String),

    #[error("grammar parse error on line {line}: {message}")]
    GrammarParse { line: usize, message: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Error::ShapeMismatch(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
