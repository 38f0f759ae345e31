// src/task/criterion.rs

use ndarray::ArrayView1;

use crate::task::Code;

/// Per-sample loss of a score vector against the correct code.
///
/// Callers guarantee `target < scores.len()`. Any
/// `Fn(ArrayView1<f32>, Code) -> f32` is a criterion as well.
pub trait Criterion: Send + Sync {
    fn loss(&self, scores: ArrayView1<f32>, target: Code) -> f32;
}

impl<F> Criterion for F
where
    F: Fn(ArrayView1<f32>, Code) -> f32 + Send + Sync,
{
    fn loss(&self, scores: ArrayView1<f32>, target: Code) -> f32 {
        self(scores, target)
    }
}

/// Cross entropy over raw, unnormalized scores.
///
/// Infinite scores follow the softmax limit: when some scores are `+inf` the
/// mass is shared between them, so the loss is `ln(count)` for a target among
/// them and `+inf` otherwise. A `-inf` target score, or a row of `-inf`
/// scores, costs `+inf`. A NaN target score gives NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossEntropyLoss;

impl Criterion for CrossEntropyLoss {
    fn loss(&self, scores: ArrayView1<f32>, target: Code) -> f32 {
        let score = scores[target];
        let max = scores.fold(f32::NEG_INFINITY, |m, &s| m.max(s));
        if max == f32::INFINITY {
            if score != f32::INFINITY {
                return f32::INFINITY;
            }
            let tied = scores.iter().filter(|&&s| s == f32::INFINITY).count();
            return (tied as f32).ln();
        }
        if score == f32::NEG_INFINITY {
            return f32::INFINITY;
        }
        log_sum_exp(scores, max) - score
    }
}

/// Negative log likelihood; scores must already be log-probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NllLoss;

impl Criterion for NllLoss {
    fn loss(&self, scores: ArrayView1<f32>, target: Code) -> f32 {
        -scores[target]
    }
}

// `max` is the finite largest score.
fn log_sum_exp(scores: ArrayView1<f32>, max: f32) -> f32 {
    max + scores.fold(0.0, |acc, &s| acc + (s - max).exp()).ln()
}
