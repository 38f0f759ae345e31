// src/task/config.rs

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::task::{Error, Result};

pub const DEFAULT_NULL: &str = "#";
pub const DEFAULT_TRAIN_SIZE: usize = 800;
pub const DEFAULT_TEST_SIZE: usize = 100;

/// Immutable settings for a [`crate::task::CfgTask`].
///
/// The data generation fields drive sampling and encoding. `batch_size`,
/// `epochs`, `learning_rate`, `l2_weight` and `read_size` are carried for the
/// external training loop and only `batch_size` is read by this crate.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Words whose predictions are scored.
    pub to_predict: Vec<String>,
    /// Maximum derivation depth when enumerating sentences.
    pub sample_depth: usize,
    /// Length every encoded sentence is truncated or padded to.
    pub max_length: usize,
    pub null: String,
    pub train_size: usize,
    pub test_size: usize,
    pub remove_duplicates: bool,
    /// Seed for dataset draws; drawn from entropy when absent.
    pub seed: Option<u64>,
    pub show_progress: bool,

    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2_weight: f64,
    pub read_size: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        TaskConfigBuilder::default().config
    }
}

impl TaskConfig {
    pub fn builder() -> TaskConfigBuilder {
        TaskConfigBuilder::new()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TaskConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_depth == 0 {
            return Err(invalid("sample_depth must be greater than 0"));
        }
        if self.max_length == 0 {
            return Err(invalid("max_length must be greater than 0"));
        }
        if self.null.is_empty() {
            return Err(invalid("null symbol must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be greater than 0"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid("learning_rate must be positive"));
        }
        if !(self.l2_weight >= 0.0) {
            return Err(invalid("l2_weight must not be negative"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfig(message.to_string())
}

pub struct TaskConfigBuilder {
    config: TaskConfig,
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self {
            config: TaskConfig {
                to_predict: vec![],
                sample_depth: 5,
                max_length: 25,
                null: DEFAULT_NULL.to_string(),
                train_size: DEFAULT_TRAIN_SIZE,
                test_size: DEFAULT_TEST_SIZE,
                remove_duplicates: true,
                seed: None,
                show_progress: false,
                batch_size: 10,
                epochs: 30,
                learning_rate: 0.01,
                l2_weight: 0.01,
                read_size: 2,
            },
        }
    }
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn to_predict<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.to_predict = words.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn sample_depth(mut self, depth: usize) -> Self {
        self.config.sample_depth = depth;
        self
    }

    #[must_use]
    pub fn max_length(mut self, length: usize) -> Self {
        self.config.max_length = length;
        self
    }

    #[must_use]
    pub fn null<S: Into<String>>(mut self, null: S) -> Self {
        self.config.null = null.into();
        self
    }

    #[must_use]
    pub fn train_size(mut self, size: usize) -> Self {
        self.config.train_size = size;
        self
    }

    #[must_use]
    pub fn test_size(mut self, size: usize) -> Self {
        self.config.test_size = size;
        self
    }

    #[must_use]
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.config.remove_duplicates = remove;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    #[must_use]
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.config.epochs = epochs;
        self
    }

    #[must_use]
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    #[must_use]
    pub fn l2_weight(mut self, weight: f64) -> Self {
        self.config.l2_weight = weight;
        self
    }

    #[must_use]
    pub fn read_size(mut self, size: usize) -> Self {
        self.config.read_size = size;
        self
    }

    pub fn build(self) -> Result<TaskConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TaskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.null, "#");
        assert_eq!(config.train_size, 800);
        assert_eq!(config.test_size, 100);
        assert_eq!(config.max_length, 25);
        assert!(config.remove_duplicates);
    }

    #[test]
    fn builder_sets_fields() {
        let config = TaskConfig::builder()
            .to_predict(["runs", "sleeps"])
            .sample_depth(7)
            .max_length(12)
            .null("<pad>")
            .seed(9)
            .batch_size(4)
            .build()
            .unwrap();
        assert_eq!(config.to_predict, vec!["runs", "sleeps"]);
        assert_eq!(config.sample_depth, 7);
        assert_eq!(config.max_length, 12);
        assert_eq!(config.null, "<pad>");
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.batch_size, 4);
    }

    #[test]
    fn builder_rejects_invalid_values() {
        for builder in [
            TaskConfig::builder().sample_depth(0),
            TaskConfig::builder().max_length(0),
            TaskConfig::builder().null(""),
            TaskConfig::builder().batch_size(0),
            TaskConfig::builder().learning_rate(0.0),
            TaskConfig::builder().learning_rate(f64::NAN),
            TaskConfig::builder().l2_weight(-1.0),
        ] {
            assert!(matches!(builder.build(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            TaskConfig::from_json_str(r#"{"to_predict": ["runs"], "sample_depth": 6, "seed": 1}"#)
                .unwrap();
        assert_eq!(config.to_predict, vec!["runs"]);
        assert_eq!(config.sample_depth, 6);
        assert_eq!(config.seed, Some(1));
        assert_eq!(config.max_length, 25);

        assert!(matches!(
            TaskConfig::from_json_str(r#"{"max_length": 0}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            TaskConfig::from_json_str("{"),
            Err(Error::JsonError(_))
        ));
    }
}
