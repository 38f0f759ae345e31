// src/task/dataset.rs

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::task::progress::{ProgressBar, ProgressStyle};
use crate::task::sampler::SamplePool;
use crate::task::vocab::VocabularyEncoder;
use crate::task::{Code, Result};

/// Padded next-token prediction data for a batch of sentences.
///
/// `inputs[[i, j, ..]]` is word `j` of sentence `i` as a one-hot row and
/// `targets[[i, j]]` is the code of word `j + 1`. Positions past the end of a
/// sentence hold the null one-hot row and the null code respectively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedBatch {
    pub inputs: Array3<f32>,
    pub targets: Array2<Code>,
}

impl EncodedBatch {
    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.targets.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_length(&self) -> usize {
        self.targets.ncols()
    }

    pub fn vocab_size(&self) -> usize {
        self.inputs.len_of(Axis(2))
    }

    /// Consecutive mini-batches of at most `batch_size` sentences.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> impl Iterator<Item = (ArrayView3<'_, f32>, ArrayView2<'_, Code>)> + '_ {
        assert!(batch_size > 0, "batch_size must be greater than 0");
        self.inputs
            .axis_chunks_iter(Axis(0), batch_size)
            .zip(self.targets.axis_chunks_iter(Axis(0), batch_size))
    }
}

/// Training and test data for one `get_data` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub train: EncodedBatch,
    pub test: EncodedBatch,
}

pub struct DatasetBuilder<'a> {
    pool: &'a SamplePool,
    encoder: &'a VocabularyEncoder,
    max_length: usize,
    show_progress: bool,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(pool: &'a SamplePool, encoder: &'a VocabularyEncoder, max_length: usize) -> Self {
        Self {
            pool,
            encoder,
            max_length,
            show_progress: false,
        }
    }

    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Draws `count` sentences from the pool and encodes them.
    pub fn build<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<EncodedBatch> {
        let samples = (0..count)
            .map(|_| self.pool.sample(rng))
            .collect::<Result<Vec<_>>>()?;
        self.encode(&samples)
    }

    /// Encodes the given sentences without any random draws.
    pub fn encode<S>(&self, samples: &[S]) -> Result<EncodedBatch>
    where
        S: AsRef<[String]> + Sync,
    {
        let progress = self.setup_progress(samples.len());

        // Every word is looked up, then input keeps codes[..max_length] and
        // target keeps codes[1..max_length + 1].
        let rows = samples
            .par_iter()
            .map(|sample| {
                let mut codes = self.encoder.words_to_code(sample.as_ref())?;
                codes.truncate(self.max_length + 1);
                if let Some(p) = &progress {
                    p.inc(1);
                }
                Ok(codes)
            })
            .collect::<Result<Vec<Vec<Code>>>>()?;

        if let Some(p) = &progress {
            p.finish();
        }

        let null = self.encoder.null_code();
        let shape = (rows.len(), self.max_length, self.encoder.len());
        let mut inputs = Array3::zeros(shape);
        inputs.index_axis_mut(Axis(2), null).fill(1.0);
        let mut targets = Array2::from_elem((rows.len(), self.max_length), null);

        for (i, codes) in rows.iter().enumerate() {
            for (j, &code) in codes.iter().take(self.max_length).enumerate() {
                inputs[[i, j, null]] = 0.0;
                inputs[[i, j, code]] = 1.0;
            }
            for (j, &code) in codes.iter().skip(1).enumerate() {
                targets[[i, j]] = code;
            }
        }

        log::debug!(
            "encoded {} samples into ({}, {}, {}) inputs",
            shape.0,
            shape.0,
            shape.1,
            shape.2
        );

        Ok(EncodedBatch { inputs, targets })
    }

    fn setup_progress(&self, len: usize) -> Option<ProgressBar> {
        if self.show_progress {
            let p = ProgressBar::new(len as u64);
            p.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {msg:<30!} {wide_bar} {pos:>9!}/{len:<9!}")
                    .expect("progress template is a valid constant"),
            );
            p.set_message("Encode samples");
            Some(p)
        } else {
            None
        }
    }
}
