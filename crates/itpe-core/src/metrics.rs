use serde::{Deserialize, Serialize};

use crate::EnergyCounter;

/// Latency and throughput figures derived from one experiment's request trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedPerfMetrics {
    #[serde(default)]
    pub model: String,
    pub total_time_sec: f64,
    pub num_requests: usize,
    pub request_throughput: f64,
    pub avg_ttft_ms: f64,
    pub avg_itl_ms: f64,
    pub avg_request_latency_ms: f64,
    pub total_output_tokens: u64,
    pub output_token_throughput: f64,
}

/// Energy consumed during the experiment window, in joules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedPowerMetrics {
    pub node_platform_j: f64,
    pub node_gpu_j: f64,
    pub node_package_j: f64,
    pub node_dram_j: f64,
    pub node_other_j: f64,
    pub pod_platform_j: f64,
    pub pod_gpu_j: f64,
    pub pod_package_j: f64,
    pub pod_dram_j: f64,
    pub pod_other_j: f64,
}

impl DerivedPowerMetrics {
    pub fn get(&self, counter: EnergyCounter) -> f64 {
        match counter {
            EnergyCounter::NodePlatform => self.node_platform_j,
            EnergyCounter::NodeGpu => self.node_gpu_j,
            EnergyCounter::NodePackage => self.node_package_j,
            EnergyCounter::NodeDram => self.node_dram_j,
            EnergyCounter::NodeOther => self.node_other_j,
            EnergyCounter::PodPlatform => self.pod_platform_j,
            EnergyCounter::PodGpu => self.pod_gpu_j,
            EnergyCounter::PodPackage => self.pod_package_j,
            EnergyCounter::PodDram => self.pod_dram_j,
            EnergyCounter::PodOther => self.pod_other_j,
        }
    }

    pub fn set(&mut self, counter: EnergyCounter, joules: f64) {
        let slot = match counter {
            EnergyCounter::NodePlatform => &mut self.node_platform_j,
            EnergyCounter::NodeGpu => &mut self.node_gpu_j,
            EnergyCounter::NodePackage => &mut self.node_package_j,
            EnergyCounter::NodeDram => &mut self.node_dram_j,
            EnergyCounter::NodeOther => &mut self.node_other_j,
            EnergyCounter::PodPlatform => &mut self.pod_platform_j,
            EnergyCounter::PodGpu => &mut self.pod_gpu_j,
            EnergyCounter::PodPackage => &mut self.pod_package_j,
            EnergyCounter::PodDram => &mut self.pod_dram_j,
            EnergyCounter::PodOther => &mut self.pod_other_j,
        };
        *slot = joules;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetrics {
    pub perf: DerivedPerfMetrics,
    pub power: DerivedPowerMetrics,
}

impl ExperimentMetrics {
    pub fn new(perf: DerivedPerfMetrics, power: DerivedPowerMetrics) -> Self {
        Self { perf, power }
    }

    /// Node platform joules per output token. NaN when no tokens were produced.
    pub fn energy_per_token(&self) -> f64 {
        if self.perf.total_output_tokens == 0 {
            return f64::NAN;
        }
        self.power.node_platform_j / self.perf.total_output_tokens as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_accessors_round_trip_every_counter() {
        let mut power = DerivedPowerMetrics::default();
        for (i, counter) in EnergyCounter::ALL.iter().enumerate() {
            power.set(*counter, i as f64 + 1.0);
        }
        for (i, counter) in EnergyCounter::ALL.iter().enumerate() {
            assert_eq!(power.get(*counter), i as f64 + 1.0);
        }
    }

    #[test]
    fn test_energy_per_token_zero_tokens_is_nan() {
        let mut m = ExperimentMetrics::default();
        m.power.node_platform_j = 50.0;
        assert!(m.energy_per_token().is_nan());

        m.perf.total_output_tokens = 25;
        assert_eq!(m.energy_per_token(), 2.0);
    }
}
