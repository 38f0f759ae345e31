// src/task/sampler.rs

use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashSet as HashSet;

use crate::task::grammar::{Grammar, Symbol};
use crate::task::{Error, Result};

/// One sentence of the grammar, as a sequence of terminals.
pub type SampleString = Vec<String>;

/// Enumerates every sentence a grammar derives within a bounded depth.
///
/// Depth counts nested expansions: generating a symbol at depth `0` yields
/// nothing, a terminal at any positive depth yields itself, and a non-terminal
/// at depth `d` yields the expansions of each of its productions at `d - 1`.
/// Enumeration starts from the start symbol at `max_depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarSampler {
    max_depth: usize,
    remove_duplicates: bool,
}

impl GrammarSampler {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            remove_duplicates: true,
        }
    }

    #[must_use]
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = remove;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn enumerate(&self, grammar: &Grammar) -> SamplePool {
        let start = [Symbol::non_terminal(grammar.start())];
        let generated = generate_all(grammar, &start, self.max_depth);
        let total = generated.len();

        let samples: Vec<SampleString> = if self.remove_duplicates {
            let mut seen = HashSet::default();
            generated
                .into_iter()
                .filter(|s| seen.insert(s.clone()))
                .map(to_owned_sentence)
                .collect()
        } else {
            generated.into_iter().map(to_owned_sentence).collect()
        };

        log::debug!(
            "enumerated {} sentences ({} distinct kept) at depth {}",
            total,
            samples.len(),
            self.max_depth
        );
        if samples.is_empty() {
            log::warn!(
                "grammar derives no sentences within depth {}",
                self.max_depth
            );
        }

        SamplePool { samples }
    }
}

fn to_owned_sentence(words: Vec<&str>) -> SampleString {
    words.into_iter().map(str::to_string).collect()
}

fn generate_all<'g>(grammar: &'g Grammar, items: &'g [Symbol], depth: usize) -> Vec<Vec<&'g str>> {
    let Some((head, rest)) = items.split_first() else {
        return vec![Vec::new()];
    };

    let heads = generate_one(grammar, head, depth);
    if heads.is_empty() {
        return heads;
    }
    let tails = generate_all(grammar, rest, depth);

    let mut out = Vec::with_capacity(heads.len() * tails.len());
    for h in &heads {
        for t in &tails {
            let mut sentence = Vec::with_capacity(h.len() + t.len());
            sentence.extend_from_slice(h);
            sentence.extend_from_slice(t);
            out.push(sentence);
        }
    }
    out
}

fn generate_one<'g>(grammar: &'g Grammar, item: &'g Symbol, depth: usize) -> Vec<Vec<&'g str>> {
    if depth == 0 {
        return Vec::new();
    }
    match item {
        Symbol::Terminal(word) => vec![vec![word.as_str()]],
        Symbol::NonTerminal(name) => grammar
            .productions_for(name)
            .flat_map(|p| generate_all(grammar, &p.rhs, depth - 1))
            .collect(),
    }
}

/// The sentences a task draws its datasets from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplePool {
    samples: Vec<SampleString>,
}

impl SamplePool {
    pub fn new(samples: Vec<SampleString>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SampleString] {
        &self.samples
    }

    pub fn contains<S: AsRef<str>>(&self, sentence: &[S]) -> bool {
        self.samples.iter().any(|s| {
            s.len() == sentence.len() && s.iter().zip(sentence).all(|(a, b)| a == b.as_ref())
        })
    }

    /// One uniform draw over the pool.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&SampleString> {
        self.samples.choose(rng).ok_or(Error::EmptyPool)
    }
}
