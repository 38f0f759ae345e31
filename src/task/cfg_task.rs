// src/task/cfg_task.rs

//! Next-word prediction over sentences of a context-free grammar.
//!
//! A network reads a sentence one word at a time and predicts the following
//! word. Only predictions whose correct answer is one of the configured
//! `to_predict` words are scored, so a task can for example evaluate a model
//! on verbs alone. Datasets are drawn uniformly from every sentence the
//! grammar derives within `sample_depth`.

use ndarray::{ArrayView2, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet as HashSet;

use crate::task::config::TaskConfig;
use crate::task::criterion::{Criterion, CrossEntropyLoss};
use crate::task::dataset::{Dataset, DatasetBuilder, EncodedBatch};
use crate::task::evaluator::{MaskedStepEvaluator, StepResult};
use crate::task::grammar::Grammar;
use crate::task::sampler::{GrammarSampler, SamplePool};
use crate::task::vocab::VocabularyEncoder;
use crate::task::{Code, Error, Result, SequenceModel, Task};

/// Sizes a compatible model is built with: one-hot input width, the width of
/// the vectors its data structure stores, and output width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDims {
    pub input_size: usize,
    pub read_size: usize,
    pub output_size: usize,
}

#[derive(Debug)]
pub struct CfgTask<C = CrossEntropyLoss> {
    grammar: Grammar,
    config: TaskConfig,
    encoder: VocabularyEncoder,
    pool: SamplePool,
    evaluator: MaskedStepEvaluator<C>,
    rng: StdRng,
}

impl CfgTask<CrossEntropyLoss> {
    pub fn new(grammar: Grammar, config: TaskConfig) -> Result<Self> {
        Self::with_criterion(grammar, config, CrossEntropyLoss)
    }
}

impl<C: Criterion> CfgTask<C> {
    pub fn with_criterion(grammar: Grammar, config: TaskConfig, criterion: C) -> Result<Self> {
        config.validate()?;

        let encoder = VocabularyEncoder::build(&grammar, &config.null)?;
        let to_predict = encoder.words_to_code(&config.to_predict)?;
        let pool = GrammarSampler::new(config.sample_depth)
            .remove_duplicates(config.remove_duplicates)
            .enumerate(&grammar);
        let evaluator =
            MaskedStepEvaluator::new(to_predict, encoder.null_code(), encoder.len(), criterion);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::info!(
            "cfg task ready: {} codes (null {:?} = {}), {} sentences within depth {}",
            encoder.len(),
            encoder.null(),
            encoder.null_code(),
            pool.len(),
            config.sample_depth
        );

        Ok(Self {
            grammar,
            config,
            encoder,
            pool,
            evaluator,
            rng,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn encoder(&self) -> &VocabularyEncoder {
        &self.encoder
    }

    pub fn pool(&self) -> &SamplePool {
        &self.pool
    }

    pub fn vocab_size(&self) -> usize {
        self.encoder.len()
    }

    pub fn null_code(&self) -> Code {
        self.encoder.null_code()
    }

    pub fn predictable_codes(&self) -> &HashSet<Code> {
        self.evaluator.predictable()
    }

    pub fn model_dims(&self) -> ModelDims {
        ModelDims {
            input_size: self.vocab_size(),
            read_size: self.config.read_size,
            output_size: self.vocab_size(),
        }
    }

    /// `count` freshly drawn, encoded sentences.
    pub fn get_tensors<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<EncodedBatch> {
        dataset_builder(&self.pool, &self.encoder, &self.config).build(count, rng)
    }

    /// Like [`Task::get_data`] but with a caller supplied random source.
    pub fn get_data_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Dataset> {
        build_dataset(&self.pool, &self.encoder, &self.config, rng)
    }

    /// Feeds every position of a batch through `model` and sums the step
    /// results. The loss is the sum of the per-position losses.
    pub fn evaluate_batch<M: SequenceModel + ?Sized>(
        &self,
        model: &mut M,
        inputs: ArrayView3<f32>,
        targets: ArrayView2<Code>,
    ) -> Result<StepResult> {
        let batch = inputs.len_of(Axis(0));
        let length = inputs.len_of(Axis(1));
        if batch != targets.nrows() || length != targets.ncols() {
            return Err(Error::shape(format!(
                "inputs cover ({}, {}) positions but targets cover ({}, {})",
                batch,
                length,
                targets.nrows(),
                targets.ncols()
            )));
        }

        model.reset(batch);
        let mut total = StepResult::default();
        for j in 0..length {
            let predictions = model.step(inputs.index_axis(Axis(1), j));
            total += self
                .evaluator
                .evaluate_step(predictions.view(), targets, j)?;
        }
        Ok(total)
    }

    /// Runs [`CfgTask::evaluate_batch`] over `data` in mini-batches of
    /// `batch_size`.
    pub fn evaluate<M: SequenceModel + ?Sized>(
        &self,
        model: &mut M,
        data: &EncodedBatch,
    ) -> Result<StepResult> {
        let mut total = StepResult::default();
        for (inputs, targets) in data.batches(self.config.batch_size) {
            total += self.evaluate_batch(model, inputs, targets)?;
        }
        log::debug!(
            "evaluated {} samples: {}/{} correct",
            data.len(),
            total.correct,
            total.total
        );
        Ok(total)
    }
}

impl<C: Criterion> Task for CfgTask<C> {
    fn get_data(&mut self) -> Result<Dataset> {
        build_dataset(&self.pool, &self.encoder, &self.config, &mut self.rng)
    }

    fn evaluate_step(
        &self,
        predictions: ArrayView2<f32>,
        targets: ArrayView2<Code>,
        step_index: usize,
    ) -> Result<StepResult> {
        self.evaluator.evaluate_step(predictions, targets, step_index)
    }
}

fn dataset_builder<'a>(
    pool: &'a SamplePool,
    encoder: &'a VocabularyEncoder,
    config: &TaskConfig,
) -> DatasetBuilder<'a> {
    DatasetBuilder::new(pool, encoder, config.max_length).show_progress(config.show_progress)
}

fn build_dataset<R: Rng + ?Sized>(
    pool: &SamplePool,
    encoder: &VocabularyEncoder,
    config: &TaskConfig,
    rng: &mut R,
) -> Result<Dataset> {
    let builder = dataset_builder(pool, encoder, config);
    let train = builder.build(config.train_size, rng)?;
    let test = builder.build(config.test_size, rng)?;
    log::info!(
        "generated {} training and {} test samples",
        train.len(),
        test.len()
    );
    Ok(Dataset { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    const ANIMALS: &str = "
        S -> NP VP
        NP -> 'the' N
        N -> 'cat' | 'dog'
        VP -> 'runs' | 'sleeps'
    ";

    fn task(seed: u64) -> CfgTask {
        let config = TaskConfig::builder()
            .to_predict(["runs"])
            .sample_depth(4)
            .max_length(5)
            .train_size(40)
            .test_size(8)
            .batch_size(16)
            .seed(seed)
            .build()
            .unwrap();
        CfgTask::new(Grammar::parse(ANIMALS).unwrap(), config).unwrap()
    }

    /// Predicts the code it was told to, whatever it reads.
    struct Constant {
        code: Code,
        width: usize,
        resets: usize,
    }

    impl SequenceModel for Constant {
        fn reset(&mut self, _batch_size: usize) {
            self.resets += 1;
        }

        fn step(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
            let mut out = Array2::zeros((inputs.nrows(), self.width));
            out.column_mut(self.code).fill(1.0);
            out
        }
    }

    #[test]
    fn construction_derives_vocabulary_and_pool() {
        let task = task(0);
        assert_eq!(task.vocab_size(), 6);
        assert_eq!(task.null_code(), 5);
        assert_eq!(task.pool().len(), 4);
        assert_eq!(
            task.predictable_codes().iter().copied().collect::<Vec<_>>(),
            vec![task.encoder().code_for("runs").unwrap()]
        );
        assert_eq!(
            task.model_dims(),
            ModelDims {
                input_size: 6,
                read_size: 2,
                output_size: 6
            }
        );
    }

    #[test]
    fn unknown_predict_word_is_rejected() {
        let config = TaskConfig::builder()
            .to_predict(["flies"])
            .build()
            .unwrap();
        let err = CfgTask::new(Grammar::parse(ANIMALS).unwrap(), config).unwrap_err();
        assert!(matches!(err, Error::UnknownSymbol(ref w) if w == "flies"));
    }

    #[test]
    fn get_data_has_configured_shapes_and_is_seeded() {
        let mut a = task(5);
        let mut b = task(5);
        let da = a.get_data().unwrap();
        let db = b.get_data().unwrap();
        assert_eq!(da.train.inputs.dim(), (40, 5, 6));
        assert_eq!(da.train.targets.dim(), (40, 5));
        assert_eq!(da.test.targets.dim(), (8, 5));
        assert_eq!(da, db);
    }

    #[test]
    fn successive_get_data_calls_draw_fresh_samples() {
        let mut task = task(9);
        let first = task.get_data().unwrap();
        let second = task.get_data().unwrap();
        assert_eq!(first.train.targets.dim(), second.train.targets.dim());
        assert_ne!(first.train, second.train);
        assert_ne!(first.test, second.test);

        let mut replay = self::task(9);
        assert_eq!(replay.get_data().unwrap(), first);
        assert_eq!(replay.get_data().unwrap(), second);
    }

    #[test]
    fn evaluate_step_uses_the_predictable_set() {
        let task = task(1);
        let runs = task.encoder().code_for("runs").unwrap();
        let cat = task.encoder().code_for("cat").unwrap();
        let null = task.null_code();
        let targets = array![[cat, runs, null], [cat, cat, null]];

        let mut predictions = Array2::<f32>::zeros((2, 6));
        predictions[[0, runs]] = 1.0;
        predictions[[1, runs]] = 1.0;

        let step0 = task.evaluate_step(predictions.view(), targets.view(), 0).unwrap();
        assert_eq!((step0.correct, step0.total), (0, 0));
        let step1 = task.evaluate_step(predictions.view(), targets.view(), 1).unwrap();
        assert_eq!((step1.correct, step1.total), (1, 1));
    }

    #[test]
    fn evaluate_walks_every_position_of_every_batch() {
        let mut task = task(2);
        let data = task.get_data().unwrap();
        let runs = task.encoder().code_for("runs").unwrap();

        let mut oracle = Constant {
            code: runs,
            width: task.vocab_size(),
            resets: 0,
        };
        let result = task.evaluate(&mut oracle, &data.train).unwrap();

        // 40 samples in batches of 16.
        assert_eq!(oracle.resets, 3);
        let expected_total = data
            .train
            .targets
            .iter()
            .filter(|&&code| code == runs)
            .count();
        assert_eq!(result.total, expected_total);
        assert_eq!(result.correct, expected_total);
        assert_eq!(result.accuracy(), 1.0);

        let mut wrong = Constant {
            code: 0,
            width: task.vocab_size(),
            resets: 0,
        };
        let result = task.evaluate(&mut wrong, &data.train).unwrap();
        assert_eq!(result.correct, 0);
        assert!(result.loss > 0.0);
    }

    #[test]
    fn evaluate_batch_rejects_misaligned_targets() {
        let mut task = task(3);
        let data = task.get_data().unwrap();
        let mut model = Constant {
            code: 0,
            width: task.vocab_size(),
            resets: 0,
        };
        let short_targets = data.test.targets.slice(ndarray::s![.., ..2]);
        assert!(matches!(
            task.evaluate_batch(&mut model, data.test.inputs.view(), short_targets),
            Err(Error::ShapeMismatch(_))
        ));
    }
}
