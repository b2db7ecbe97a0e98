use thiserror::Error;

#[derive(Error, Debug)]
pub enum ItpeError {
    #[error("Experiment has no usable requests: {experiment}")]
    EmptyTrace { experiment: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid profile path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Chart error: {0}")]
    Chart(String),
}

impl ItpeError {
    pub fn empty_trace(experiment: impl Into<String>) -> Self {
        ItpeError::EmptyTrace {
            experiment: experiment.into(),
        }
    }

    /// Names the experiment in an `EmptyTrace`; other variants pass through.
    pub fn for_experiment(self, experiment: impl std::fmt::Display) -> Self {
        match self {
            ItpeError::EmptyTrace { experiment: why } => ItpeError::EmptyTrace {
                experiment: format!("{}: {}", experiment, why),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ItpeError>;
