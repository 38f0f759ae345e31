//! Next-token prediction data from context-free grammars.
//!
//! [`task::CfgTask`] enumerates the sentences a grammar derives up to a
//! bounded depth, encodes random draws of them as padded one-hot inputs and
//! next-word targets, and scores a model's per-position predictions against a
//! restricted set of words.

pub mod task;

pub use task::{CfgTask, Error, Result, Task, TaskConfig};
