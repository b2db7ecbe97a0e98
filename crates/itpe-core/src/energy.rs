use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cumulative Kepler energy counters tracked per experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergyCounter {
    NodePlatform,
    NodeGpu,
    NodePackage,
    NodeDram,
    NodeOther,
    PodPlatform,
    PodGpu,
    PodPackage,
    PodDram,
    PodOther,
}

impl EnergyCounter {
    pub const ALL: [EnergyCounter; 10] = [
        EnergyCounter::NodePlatform,
        EnergyCounter::NodeGpu,
        EnergyCounter::NodePackage,
        EnergyCounter::NodeDram,
        EnergyCounter::NodeOther,
        EnergyCounter::PodPlatform,
        EnergyCounter::PodGpu,
        EnergyCounter::PodPackage,
        EnergyCounter::PodDram,
        EnergyCounter::PodOther,
    ];

    /// Prometheus metric name exported by Kepler.
    pub fn metric_name(&self) -> &'static str {
        match self {
            EnergyCounter::NodePlatform => "kepler_node_platform_joules_total",
            EnergyCounter::NodeGpu => "kepler_node_gpu_joules_total",
            EnergyCounter::NodePackage => "kepler_node_package_joules_total",
            EnergyCounter::NodeDram => "kepler_node_dram_joules_total",
            EnergyCounter::NodeOther => "kepler_node_other_joules_total",
            EnergyCounter::PodPlatform => "kepler_container_platform_joules_total",
            EnergyCounter::PodGpu => "kepler_container_gpu_joules_total",
            EnergyCounter::PodPackage => "kepler_container_package_joules_total",
            EnergyCounter::PodDram => "kepler_container_dram_joules_total",
            EnergyCounter::PodOther => "kepler_container_other_joules_total",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnergyCounter::NodePlatform => "Node Platform (J)",
            EnergyCounter::NodeGpu => "Node GPU (J)",
            EnergyCounter::NodePackage => "Node Package (J)",
            EnergyCounter::NodeDram => "Node DRAM (J)",
            EnergyCounter::NodeOther => "Node Other (J)",
            EnergyCounter::PodPlatform => "Pod Platform (J)",
            EnergyCounter::PodGpu => "Pod GPU (J)",
            EnergyCounter::PodPackage => "Pod Package (J)",
            EnergyCounter::PodDram => "Pod DRAM (J)",
            EnergyCounter::PodOther => "Pod Other (J)",
        }
    }

    pub fn is_pod_scoped(&self) -> bool {
        matches!(
            self,
            EnergyCounter::PodPlatform
                | EnergyCounter::PodGpu
                | EnergyCounter::PodPackage
                | EnergyCounter::PodDram
                | EnergyCounter::PodOther
        )
    }

    /// PromQL selector; container counters are filtered to one container.
    pub fn query(&self, container: &str) -> String {
        if self.is_pod_scoped() {
            format!("{}{{container_name=\"{}\"}}", self.metric_name(), container)
        } else {
            self.metric_name().to_string()
        }
    }
}

/// One time series value of a cumulative energy counter at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    /// Counter (metric) name, e.g. `kepler_node_platform_joules_total`
    pub counter: String,
    pub joules: f64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub timestamp_ms: i64,
}

impl EnergySample {
    pub fn new(counter: impl Into<String>, joules: f64) -> Self {
        Self {
            counter: counter.into(),
            joules,
            labels: BTreeMap::new(),
            timestamp_ms: 0,
        }
    }

    pub fn for_counter(counter: EnergyCounter, joules: f64) -> Self {
        Self::new(counter.metric_name(), joules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_queries_filter_container() {
        assert_eq!(
            EnergyCounter::PodGpu.query("ollama"),
            "kepler_container_gpu_joules_total{container_name=\"ollama\"}"
        );
        assert_eq!(
            EnergyCounter::NodeDram.query("ollama"),
            "kepler_node_dram_joules_total"
        );
    }

    #[test]
    fn test_counter_names_are_unique() {
        let mut names: Vec<_> = EnergyCounter::ALL.iter().map(|c| c.metric_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), EnergyCounter::ALL.len());
    }
}
