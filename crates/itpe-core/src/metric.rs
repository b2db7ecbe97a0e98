use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ExperimentMetrics, ItpeError, Result};

/// Metrics the report knows how to extract from an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    RequestThroughput,
    OutputTokenThroughput,
    AvgRequestLatency,
    AvgTtft,
    AvgItl,
    NodePlatform,
    NodeGpu,
    NodePackage,
    PodPlatform,
    EnergyPerToken,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::RequestThroughput,
        Metric::OutputTokenThroughput,
        Metric::AvgRequestLatency,
        Metric::AvgTtft,
        Metric::AvgItl,
        Metric::NodePlatform,
        Metric::NodeGpu,
        Metric::NodePackage,
        Metric::PodPlatform,
        Metric::EnergyPerToken,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::RequestThroughput => "Request Throughput",
            Metric::OutputTokenThroughput => "Output Token Throughput",
            Metric::AvgRequestLatency => "Avg Request Latency",
            Metric::AvgTtft => "Avg TTFT",
            Metric::AvgItl => "Avg ITL",
            Metric::NodePlatform => "Node Platform",
            Metric::NodeGpu => "Node GPU",
            Metric::NodePackage => "Node Package",
            Metric::PodPlatform => "Pod Platform",
            Metric::EnergyPerToken => "Energy Per Token",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == name)
            .ok_or_else(|| ItpeError::UnknownMetric(name.to_string()))
    }

    pub fn value(&self, m: &ExperimentMetrics) -> f64 {
        match self {
            Metric::RequestThroughput => m.perf.request_throughput,
            Metric::OutputTokenThroughput => m.perf.output_token_throughput,
            Metric::AvgRequestLatency => m.perf.avg_request_latency_ms,
            Metric::AvgTtft => m.perf.avg_ttft_ms,
            Metric::AvgItl => m.perf.avg_itl_ms,
            Metric::NodePlatform => m.power.node_platform_j,
            Metric::NodeGpu => m.power.node_gpu_j,
            Metric::NodePackage => m.power.node_package_j,
            Metric::PodPlatform => m.power.pod_platform_j,
            Metric::EnergyPerToken => m.energy_per_token(),
        }
    }
}

/// Plot settings for one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub y_label: String,
    /// Output file stem, e.g. `avg_ttft`
    pub filename: String,
}

impl MetricSpec {
    pub fn new(y_label: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            y_label: y_label.into(),
            filename: filename.into(),
        }
    }
}

/// Metric display name to plot settings. Only metrics present here are charted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRegistry {
    entries: BTreeMap<String, MetricSpec>,
}

impl MetricRegistry {
    pub fn new(entries: BTreeMap<String, MetricSpec>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Result<&MetricSpec> {
        self.entries
            .get(name)
            .ok_or_else(|| ItpeError::UnknownMetric(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricSpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves every registered name to an extractable metric.
    pub fn resolve(&self) -> Result<Vec<(Metric, &str, &MetricSpec)>> {
        self.iter()
            .map(|(name, spec)| Ok((Metric::from_name(name)?, name, spec)))
            .collect()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        let entries = [
            (Metric::RequestThroughput, "Requests per Second", "req_throughput"),
            (Metric::OutputTokenThroughput, "Tokens per Second", "out_token_throughput"),
            (Metric::AvgRequestLatency, "Milliseconds", "avg_req_latency"),
            (Metric::AvgTtft, "Milliseconds", "avg_ttft"),
            (Metric::AvgItl, "Milliseconds", "avg_itl"),
            (Metric::NodePlatform, "Joules", "node_pltf_energy"),
            (Metric::NodeGpu, "Joules", "node_gpu_energy"),
            (Metric::NodePackage, "Joules", "node_pkg_energy"),
            (Metric::PodPlatform, "Joules", "pod_pltf_energy"),
            (Metric::EnergyPerToken, "Joules per Token", "energy_per_token"),
        ]
        .into_iter()
        .map(|(metric, y_label, filename)| {
            (metric.name().to_string(), MetricSpec::new(y_label, filename))
        })
        .collect();

        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_resolves() {
        let registry = MetricRegistry::default();
        let resolved = registry.resolve().unwrap();
        assert_eq!(resolved.len(), Metric::ALL.len());
    }

    #[test]
    fn test_unknown_metric_name() {
        let registry = MetricRegistry::default();
        assert!(matches!(
            registry.get("Avg Vibes"),
            Err(ItpeError::UnknownMetric(name)) if name == "Avg Vibes"
        ));
        assert!(Metric::from_name("Avg Vibes").is_err());
    }

    #[test]
    fn test_registry_with_unextractable_entry_fails_resolve() {
        let mut entries = BTreeMap::new();
        entries.insert("Avg TTFT".to_string(), MetricSpec::new("ms", "avg_ttft"));
        entries.insert("Cost".to_string(), MetricSpec::new("USD", "cost"));
        let registry = MetricRegistry::new(entries);
        assert!(matches!(registry.resolve(), Err(ItpeError::UnknownMetric(_))));
    }

    #[test]
    fn test_metric_value_extraction() {
        let mut m = ExperimentMetrics::default();
        m.perf.avg_itl_ms = 12.5;
        m.power.node_gpu_j = 3.0;
        assert_eq!(Metric::AvgItl.value(&m), 12.5);
        assert_eq!(Metric::NodeGpu.value(&m), 3.0);
        assert!(Metric::EnergyPerToken.value(&m).is_nan());
    }
}
