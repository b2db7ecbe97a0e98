use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{ItpeError, MetricRegistry, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItpeConfig {
    #[serde(default, rename = "itpe_report")]
    pub report: ReportSection,
    #[serde(default, rename = "itpe_perf")]
    pub perf: PerfSweepConfig,
    #[serde(default)]
    pub metrics: Option<MetricRegistry>,
}

impl ItpeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ItpeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
            .map_err(|e| ItpeError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Configured metric registry, or the built-in one.
    pub fn registry(&self) -> MetricRegistry {
        self.metrics.clone().unwrap_or_default()
    }

    pub fn plot_dir(&self) -> PathBuf {
        self.report
            .plot_dir
            .clone()
            .unwrap_or_else(|| self.report.artifacts_dir.join("plots"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_container_name")]
    pub container_name: String,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default)]
    pub plot_dir: Option<PathBuf>,
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("/artifacts")
}

fn default_container_name() -> String {
    "ollama".to_string()
}

fn default_query_timeout_secs() -> u64 {
    10
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            prometheus_url: default_prometheus_url(),
            artifacts_dir: default_artifacts_dir(),
            container_name: default_container_name(),
            query_timeout_secs: default_query_timeout_secs(),
            plot_dir: None,
        }
    }
}

/// The benchmark sweep whose artifacts the report reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfSweepConfig {
    #[serde(default = "default_endpoint_url", rename = "url")]
    pub endpoint_url: String,
    #[serde(default)]
    pub enabled: Enabled,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub concurrency: Vec<u32>,
    #[serde(default)]
    pub requests: Requests,
    #[serde(default)]
    pub token_confs: TokenConfs,
}

fn default_endpoint_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for PerfSweepConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            enabled: Enabled::default(),
            models: Vec::new(),
            concurrency: Vec::new(),
            requests: Requests::default(),
            token_confs: TokenConfs::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enabled {
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub checkpoint: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requests {
    #[serde(default)]
    pub run_count: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenConfs {
    #[serde(default)]
    pub input: Vec<TokenConf>,
    #[serde(default)]
    pub output: Vec<TokenConf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConf {
    #[serde(default)]
    pub name: String,
    pub mean: u32,
    #[serde(default)]
    pub stddev: u32,
}
