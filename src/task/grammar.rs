// src/task/grammar.rs

//! Context-free grammars and a small text format for writing them.
//!
//! The text format has one rule per line, with alternatives separated by `|`:
//!
//! ```text
//! S  -> NP VP
//! NP -> 'the' N | 'a' N
//! N  -> 'cat' | 'dog'
//! VP -> 'runs'
//!     | 'sleeps'     # continuation lines start with `|`
//! ```
//!
//! Quoted items (single or double quotes) are terminals, bare identifiers are
//! non-terminals. The left-hand side of the first rule is the start symbol.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};

use crate::task::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Terminal(String),
    NonTerminal(String),
}

impl Symbol {
    pub fn terminal<S: Into<String>>(word: S) -> Self {
        Symbol::Terminal(word.into())
    }

    pub fn non_terminal<S: Into<String>>(name: S) -> Self {
        Symbol::NonTerminal(name.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Symbol::Terminal(s) | Symbol::NonTerminal(s) => s,
        }
    }
}

/// A single rule `lhs -> rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub lhs: String,
    pub rhs: Vec<Symbol>,
}

impl Production {
    pub fn new<S: Into<String>>(lhs: S, rhs: Vec<Symbol>) -> Self {
        Self {
            lhs: lhs.into(),
            rhs,
        }
    }
}

/// An immutable context-free grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    start: String,
    productions: Vec<Production>,
}

impl Grammar {
    pub fn new<S: Into<String>>(start: S, productions: Vec<Production>) -> Self {
        Self {
            start: start.into(),
            productions,
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Productions whose left-hand side is `lhs`, in declaration order.
    pub fn productions_for<'a>(&'a self, lhs: &'a str) -> impl Iterator<Item = &'a Production> + 'a {
        self.productions.iter().filter(move |p| p.lhs == lhs)
    }

    /// Distinct terminals in order of first appearance, scanning productions
    /// in order and each right-hand side left to right.
    pub fn terminals(&self) -> Vec<&str> {
        let mut seen = HashSet::default();
        let mut out = Vec::new();
        for symbol in self.productions.iter().flat_map(|p| p.rhs.iter()) {
            if let Symbol::Terminal(word) = symbol {
                if seen.insert(word.as_str()) {
                    out.push(word.as_str());
                }
            }
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self> {
        GrammarParser::default().parse(text)
    }
}

impl FromStr for Grammar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Grammar::parse(s)
    }
}

// Leftmost-first alternation: the arrow must be tried before identifiers.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^']*)'|"([^"]*)"|(->)|(\|)|(#.*)|([\w/^]+(?:-[\w/^]+)*)|(\S)"#)
        .expect("grammar token pattern is valid")
});

#[derive(Debug, PartialEq)]
enum Token {
    Symbol(Symbol),
    Arrow,
    Bar,
}

#[derive(Default)]
struct GrammarParser {
    start: Option<String>,
    current_lhs: Option<String>,
    productions: Vec<Production>,
}

impl GrammarParser {
    fn parse(mut self, text: &str) -> Result<Grammar> {
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let tokens = tokenize(line, line_no)?;
            if tokens.is_empty() {
                continue;
            }
            self.parse_line(tokens, line_no)?;
        }

        match self.start {
            Some(start) => Ok(Grammar::new(start, self.productions)),
            None => Err(Error::GrammarParse {
                line: 0,
                message: "grammar has no productions".to_string(),
            }),
        }
    }

    fn parse_line(&mut self, tokens: Vec<Token>, line: usize) -> Result<()> {
        let mut iter = tokens.into_iter();

        let lhs = match iter.next() {
            Some(Token::Bar) => self.current_lhs.clone().ok_or_else(|| Error::GrammarParse {
                line,
                message: "continuation line without a preceding rule".to_string(),
            })?,
            Some(Token::Symbol(Symbol::NonTerminal(name))) => {
                if iter.next() != Some(Token::Arrow) {
                    return Err(Error::GrammarParse {
                        line,
                        message: format!("expected `->` after {name:?}"),
                    });
                }
                name
            }
            _ => {
                return Err(Error::GrammarParse {
                    line,
                    message: "a rule must start with a non-terminal".to_string(),
                });
            }
        };

        let mut rhs = Vec::new();
        for token in iter {
            match token {
                Token::Symbol(symbol) => rhs.push(symbol),
                Token::Bar => self.push(&lhs, std::mem::take(&mut rhs)),
                Token::Arrow => {
                    return Err(Error::GrammarParse {
                        line,
                        message: "unexpected `->` in right-hand side".to_string(),
                    });
                }
            }
        }
        self.push(&lhs, rhs);

        if self.start.is_none() {
            self.start = Some(lhs.clone());
        }
        self.current_lhs = Some(lhs);
        Ok(())
    }

    fn push(&mut self, lhs: &str, rhs: Vec<Symbol>) {
        self.productions.push(Production::new(lhs, rhs));
    }
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    for caps in TOKEN_RE.captures_iter(line) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            tokens.push(Token::Symbol(Symbol::terminal(m.as_str())));
        } else if caps.get(3).is_some() {
            tokens.push(Token::Arrow);
        } else if caps.get(4).is_some() {
            tokens.push(Token::Bar);
        } else if caps.get(5).is_some() {
            break;
        } else if let Some(m) = caps.get(6) {
            tokens.push(Token::Symbol(Symbol::non_terminal(m.as_str())));
        } else if let Some(m) = caps.get(7) {
            return Err(Error::GrammarParse {
                line: line_no,
                message: format!("unexpected character {:?}", m.as_str()),
            });
        }
    }
    Ok(tokens)
}
