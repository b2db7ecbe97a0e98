//! GenAI-Perf `profile_export.json` layout.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileExport {
    #[serde(default)]
    pub experiments: Vec<ProfileExperiment>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub service_kind: String,
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileExperiment {
    #[serde(default)]
    pub experiment: ExperimentMode,
    #[serde(flatten)]
    pub trace: RequestTrace,
    #[serde(default)]
    pub window_boundaries: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentMode {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub value: u32,
}

/// Requests of one experiment, in the order the benchmark issued them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestTrace {
    #[serde(default)]
    pub requests: Vec<TraceRequest>,
}

impl RequestTrace {
    pub fn new(requests: Vec<TraceRequest>) -> Self {
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceRequest {
    /// Request start, nanoseconds since the epoch
    pub timestamp: i64,
    #[serde(default)]
    pub request_inputs: RequestInputs,
    /// Arrival of every streamed chunk, nanoseconds since the epoch
    #[serde(default)]
    pub response_timestamps: Vec<i64>,
    #[serde(default)]
    pub response_outputs: Vec<ResponseOutput>,
}

impl TraceRequest {
    pub fn first_response(&self) -> Option<i64> {
        self.response_timestamps.first().copied()
    }

    pub fn last_response(&self) -> Option<i64> {
        self.response_timestamps.last().copied()
    }

    /// Streamed chunks minus the trailing termination chunk.
    pub fn output_tokens(&self) -> u64 {
        self.response_outputs.len().saturating_sub(1) as u64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestInputs {
    /// Request body as sent to the endpoint, itself a JSON document
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutput {
    #[serde(default)]
    pub response: String,
}

pub fn load_profile(path: &Path) -> Result<ProfileExport> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read profile {}: {}", path.display(), e);
        e
    })?;
    let profile: ProfileExport = serde_json::from_str(&content).map_err(|e| {
        tracing::error!("Failed to parse profile {}: {}", path.display(), e);
        e
    })?;
    Ok(profile)
}
