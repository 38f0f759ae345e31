// src/task/mod.rs

pub mod cfg_task;
pub mod config;
pub mod criterion;
pub mod dataset;
pub mod evaluator;
pub mod grammar;
#[cfg(not(feature = "progressbar"))]
pub mod progress;
#[cfg(feature = "progressbar")]
pub mod progress {
    pub use indicatif::{ProgressBar, ProgressStyle};
}
pub mod result;
pub mod sampler;
pub mod vocab;

pub use cfg_task::CfgTask;
pub use config::{TaskConfig, TaskConfigBuilder};
pub use criterion::{Criterion, CrossEntropyLoss, NllLoss};
pub use dataset::{Dataset, DatasetBuilder, EncodedBatch};
pub use evaluator::{MaskedStepEvaluator, StepResult, argmax, evaluate_step};
pub use grammar::{Grammar, Production, Symbol};
pub use result::{Error, Result};
pub use sampler::{GrammarSampler, SamplePool, SampleString};
pub use vocab::VocabularyEncoder;

use ndarray::{Array2, ArrayView2};

/// Dense integer code of a vocabulary symbol.
pub type Code = usize;

/// A sequence model, seen only through what the task needs from it.
///
/// Each call to [`SequenceModel::step`] consumes one encoded symbol per
/// sequence and returns a score vector over the vocabulary for the symbol
/// that follows.
pub trait SequenceModel {
    /// Clears any internal state before reading `batch_size` new sequences.
    fn reset(&mut self, batch_size: usize);

    /// `inputs` is `(batch, vocab_size)`; the result must be `(batch, vocab_size)`.
    fn step(&mut self, inputs: ArrayView2<f32>) -> Array2<f32>;
}

/// A data-generating task driven by an external training loop.
pub trait Task {
    /// Fresh training and test sets; every call draws new samples.
    fn get_data(&mut self) -> Result<Dataset>;

    /// Loss and accuracy counts for the model output at `step_index`.
    fn evaluate_step(
        &self,
        predictions: ArrayView2<f32>,
        targets: ArrayView2<Code>,
        step_index: usize,
    ) -> Result<StepResult>;
}
