use itpe_core::{DerivedPowerMetrics, EnergyCounter, EnergySample};
use tracing::warn;

/// Energy consumed between two counter snapshots.
///
/// For every tracked counter the delta is `sum(end) - sum(start)` over all
/// samples carrying that counter's name; several series of one counter (one
/// per pod, say) are summed before differencing. Counters are assumed to be
/// monotonic, so a reset shows up as a negative delta rather than an error.
pub fn compute_power_metrics(start: &[EnergySample], end: &[EnergySample]) -> DerivedPowerMetrics {
    let mut metrics = DerivedPowerMetrics::default();
    for counter in EnergyCounter::ALL {
        let delta = sum_counter(end, counter) - sum_counter(start, counter);
        if delta < 0.0 {
            warn!(
                counter = counter.metric_name(),
                delta, "Energy counter decreased during experiment window"
            );
        }
        metrics.set(counter, delta);
    }
    metrics
}

fn sum_counter(samples: &[EnergySample], counter: EnergyCounter) -> f64 {
    samples
        .iter()
        .filter(|s| s.counter == counter.metric_name())
        .map(|s| s.joules)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_per_counter() {
        let start = vec![
            EnergySample::for_counter(EnergyCounter::NodePlatform, 1000.0),
            EnergySample::for_counter(EnergyCounter::NodeGpu, 400.0),
        ];
        let end = vec![
            EnergySample::for_counter(EnergyCounter::NodePlatform, 1250.0),
            EnergySample::for_counter(EnergyCounter::NodeGpu, 500.0),
        ];
        let m = compute_power_metrics(&start, &end);

        assert_eq!(m.node_platform_j, 250.0);
        assert_eq!(m.node_gpu_j, 100.0);
        assert_eq!(m.node_dram_j, 0.0);
        assert_eq!(m.pod_platform_j, 0.0);
    }

    #[test]
    fn test_multiple_series_are_summed_not_averaged() {
        let start = vec![
            EnergySample::for_counter(EnergyCounter::PodGpu, 10.0),
            EnergySample::for_counter(EnergyCounter::PodGpu, 20.0),
        ];
        let end = vec![
            EnergySample::for_counter(EnergyCounter::PodGpu, 15.0),
            EnergySample::for_counter(EnergyCounter::PodGpu, 45.0),
        ];
        assert_eq!(compute_power_metrics(&start, &end).pod_gpu_j, 30.0);
    }

    #[test]
    fn test_no_cross_counter_leakage() {
        let end = vec![
            EnergySample::for_counter(EnergyCounter::NodePackage, 7.0),
            EnergySample::new("kepler_node_unrelated_joules_total", 99.0),
        ];
        let m = compute_power_metrics(&[], &end);

        for counter in EnergyCounter::ALL {
            let expected = if counter == EnergyCounter::NodePackage { 7.0 } else { 0.0 };
            assert_eq!(m.get(counter), expected, "{:?}", counter);
        }
    }

    #[test]
    fn test_decreasing_counter_is_not_clamped() {
        let start = vec![EnergySample::for_counter(EnergyCounter::NodePlatform, 100.0)];
        let end = vec![EnergySample::for_counter(EnergyCounter::NodePlatform, 80.0)];
        assert_eq!(compute_power_metrics(&start, &end).node_platform_j, -20.0);
    }
}
