// src/task/progress.rs

// No-op stand-ins for the indicatif types, used when the "progressbar"
// feature is off.

use std::borrow::Cow;

pub struct ProgressBar;

impl ProgressBar {
    pub fn new(_length: u64) -> Self {
        Self {}
    }

    pub fn set_message(&self, _message: impl Into<Cow<'static, str>>) {}
    pub fn finish(&self) {}
    pub fn inc(&self, _inc: u64) {}
    pub fn set_style(&self, _style: ProgressStyle) {}
}

pub struct ProgressStyle;

impl ProgressStyle {
    pub fn default_bar() -> Self {
        Self {}
    }
    pub fn template(self, _template: &str) -> Result<Self, String> {
        Ok(self)
    }
}
