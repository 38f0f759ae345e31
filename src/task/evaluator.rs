// src/task/evaluator.rs

use std::ops::AddAssign;

use ndarray::{ArrayView1, ArrayView2};
use rustc_hash::FxHashSet as HashSet;
use serde::Serialize;

use crate::task::criterion::Criterion;
use crate::task::{Code, Error, Result};

/// Loss and accuracy counts for one sequence position of one batch. Results
/// for several positions or batches add up with `+=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepResult {
    pub loss: f32,
    pub correct: usize,
    pub total: usize,
}

impl StepResult {
    /// `correct / total`, or zero when nothing was scored.
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }
}

impl AddAssign for StepResult {
    fn add_assign(&mut self, other: Self) {
        self.loss += other.loss;
        self.correct += other.correct;
        self.total += other.total;
    }
}

/// Index of the largest score; the first maximum wins ties.
pub fn argmax(scores: ArrayView1<f32>) -> Code {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

/// Scores one position of a batch.
///
/// Sample `i` counts only when its target at `step_index` is neither the null
/// code nor outside `predictable`. Counted samples contribute their loss,
/// everything else contributes zero, and the summed loss is divided by the
/// full batch size rather than by the number of counted samples.
pub fn evaluate_step<C: Criterion + ?Sized>(
    predictions: ArrayView2<f32>,
    targets: ArrayView2<Code>,
    predictable: &HashSet<Code>,
    step_index: usize,
    null_code: Code,
    criterion: &C,
) -> Result<StepResult> {
    let batch = predictions.nrows();
    if batch != targets.nrows() {
        return Err(Error::shape(format!(
            "predictions have {} rows but targets have {}",
            batch,
            targets.nrows()
        )));
    }
    if step_index >= targets.ncols() {
        return Err(Error::shape(format!(
            "step {} is out of range for targets of length {}",
            step_index,
            targets.ncols()
        )));
    }

    let width = predictions.ncols();
    let mut loss_sum = 0.0f32;
    let mut result = StepResult::default();

    for (scores, &target) in predictions.rows().into_iter().zip(targets.column(step_index)) {
        if target == null_code || !predictable.contains(&target) {
            continue;
        }
        if target >= width {
            return Err(Error::shape(format!(
                "target code {target} does not fit predictions of width {width}"
            )));
        }
        result.total += 1;
        if argmax(scores) == target {
            result.correct += 1;
        }
        loss_sum += criterion.loss(scores, target);
    }

    if batch > 0 {
        result.loss = loss_sum / batch as f32;
    }
    Ok(result)
}

/// [`evaluate_step`] bound to a vocabulary, a predictable set and a criterion.
#[derive(Debug, Clone)]
pub struct MaskedStepEvaluator<C> {
    predictable: HashSet<Code>,
    null_code: Code,
    vocab_size: usize,
    criterion: C,
}

impl<C: Criterion> MaskedStepEvaluator<C> {
    pub fn new<I>(predictable: I, null_code: Code, vocab_size: usize, criterion: C) -> Self
    where
        I: IntoIterator<Item = Code>,
    {
        Self {
            predictable: predictable.into_iter().collect(),
            null_code,
            vocab_size,
            criterion,
        }
    }

    pub fn predictable(&self) -> &HashSet<Code> {
        &self.predictable
    }

    pub fn criterion(&self) -> &C {
        &self.criterion
    }

    pub fn evaluate_step(
        &self,
        predictions: ArrayView2<f32>,
        targets: ArrayView2<Code>,
        step_index: usize,
    ) -> Result<StepResult> {
        if predictions.ncols() != self.vocab_size {
            return Err(Error::shape(format!(
                "predictions have width {} but the vocabulary has {} codes",
                predictions.ncols(),
                self.vocab_size
            )));
        }
        evaluate_step(
            predictions,
            targets,
            &self.predictable,
            step_index,
            self.null_code,
            &self.criterion,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::criterion::CrossEntropyLoss;
    use ndarray::{Array2, array};

    fn set(codes: &[Code]) -> HashSet<Code> {
        codes.iter().copied().collect()
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(array![0.1f32, 0.7, 0.7, 0.2].view()), 1);
        assert_eq!(argmax(array![3.0f32].view()), 0);
        assert_eq!(argmax(array![-1.0f32, -1.0].view()), 0);
    }

    #[test]
    fn only_predictable_non_null_targets_count() {
        // codes: the=0 cat=1 runs=2 #=3
        let targets = array![[1usize, 2, 3, 3, 3], [1, 2, 3, 3, 3]];
        let predictions = array![[0.0f32, 0.0, 5.0, 0.0], [0.0, 5.0, 0.0, 0.0]];
        let predictable = set(&[2]);

        let step0 = evaluate_step(
            predictions.view(),
            targets.view(),
            &predictable,
            0,
            3,
            &CrossEntropyLoss,
        )
        .unwrap();
        assert_eq!(step0, StepResult::default());

        let step1 = evaluate_step(
            predictions.view(),
            targets.view(),
            &predictable,
            1,
            3,
            &CrossEntropyLoss,
        )
        .unwrap();
        assert_eq!(step1.total, 2);
        assert_eq!(step1.correct, 1);
        let expected = (CrossEntropyLoss.loss(predictions.row(0), 2)
            + CrossEntropyLoss.loss(predictions.row(1), 2))
            / 2.0;
        assert!((step1.loss - expected).abs() < 1e-6);
    }

    #[test]
    fn loss_is_averaged_over_the_whole_batch() {
        let targets = array![[0usize], [1], [2], [3]];
        let predictions = Array2::<f32>::zeros((4, 4));
        fn unit(_: ArrayView1<f32>, _: Code) -> f32 {
            1.0
        }

        let r = evaluate_step(predictions.view(), targets.view(), &set(&[0, 3]), 0, 3, &unit)
            .unwrap();
        assert_eq!(r.total, 1);
        assert_eq!(r.correct, 1);
        assert_eq!(r.loss, 0.25);
    }

    #[test]
    fn null_targets_never_count() {
        let targets = array![[3usize], [3]];
        let predictions = array![[0.0f32, 0.0, 0.0, 9.0], [0.0, 0.0, 0.0, 9.0]];
        let r = evaluate_step(
            predictions.view(),
            targets.view(),
            &set(&[0, 1, 2, 3]),
            0,
            3,
            &CrossEntropyLoss,
        )
        .unwrap();
        assert_eq!(r, StepResult::default());
    }

    #[test]
    fn empty_predictable_set_scores_nothing() {
        let targets = array![[0usize, 1], [1, 0]];
        let predictions = array![[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0]];
        for step in 0..2 {
            let r = evaluate_step(
                predictions.view(),
                targets.view(),
                &HashSet::default(),
                step,
                2,
                &CrossEntropyLoss,
            )
            .unwrap();
            assert_eq!(r, StepResult::default());
        }
    }

    #[test]
    fn shape_mismatches_are_reported() {
        let targets = array![[0usize, 1], [1, 0]];
        let three_rows = Array2::<f32>::zeros((3, 3));
        let two_rows = Array2::<f32>::zeros((2, 3));
        let predictable = set(&[0, 1]);

        assert!(matches!(
            evaluate_step(three_rows.view(), targets.view(), &predictable, 0, 2, &CrossEntropyLoss),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            evaluate_step(two_rows.view(), targets.view(), &predictable, 2, 2, &CrossEntropyLoss),
            Err(Error::ShapeMismatch(_))
        ));

        let evaluator = MaskedStepEvaluator::new([0, 1], 2, 4, CrossEntropyLoss);
        assert!(matches!(
            evaluator.evaluate_step(two_rows.view(), targets.view(), 0),
            Err(Error::ShapeMismatch(_))
        ));
        let evaluator = MaskedStepEvaluator::new([0, 1], 2, 3, CrossEntropyLoss);
        assert_eq!(
            evaluator.evaluate_step(two_rows.view(), targets.view(), 0).unwrap().total,
            2
        );
    }
}
