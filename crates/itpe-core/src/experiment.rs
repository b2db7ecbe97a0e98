use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one benchmark run. All fields take part in equality and
/// ordering, so a map keyed by `ExperimentKey` holds one entry per run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExperimentKey {
    pub model: String,
    /// Parameter size in billions
    pub param_size_b: u32,
    pub input_mean: u32,
    pub output_mean: u32,
    pub concurrency: u32,
}

impl ExperimentKey {
    pub fn new(
        model: impl Into<String>,
        param_size_b: u32,
        input_mean: u32,
        output_mean: u32,
        concurrency: u32,
    ) -> Self {
        Self {
            model: model.into(),
            param_size_b,
            input_mean,
            output_mean,
            concurrency,
        }
    }

    pub fn length_key(&self) -> LengthKey {
        LengthKey {
            input_mean: self.input_mean,
            output_mean: self.output_mean,
        }
    }

    pub fn model_group(&self) -> ModelGroup {
        ModelGroup {
            model: self.model.clone(),
            param_size_b: self.param_size_b,
        }
    }
}

impl fmt::Display for ExperimentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}b in{}/out{} c{}",
            self.model, self.param_size_b, self.input_mean, self.output_mean, self.concurrency
        )
    }
}

/// Input/output token-length configuration of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LengthKey {
    pub input_mean: u32,
    pub output_mean: u32,
}

impl LengthKey {
    pub fn new(input_mean: u32, output_mean: u32) -> Self {
        Self {
            input_mean,
            output_mean,
        }
    }
}

impl fmt::Display for LengthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in{}/out{}", self.input_mean, self.output_mean)
    }
}

/// Model identity paired with its parameter size.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelGroup {
    pub model: String,
    pub param_size_b: u32,
}

impl ModelGroup {
    pub fn new(model: impl Into<String>, param_size_b: u32) -> Self {
        Self {
            model: model.into(),
            param_size_b,
        }
    }
}

impl fmt::Display for ModelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}b", self.model, self.param_size_b)
    }
}
