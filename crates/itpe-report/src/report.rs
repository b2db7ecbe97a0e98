use std::path::{Path, PathBuf};

use itpe_core::{
    load_profile, profile_paths, ExperimentKey, ExperimentMetrics, ExperimentPath, ItpeConfig,
    ItpeError, MetricRegistry, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::aggregate::{Aggregation, ExperimentSet};
use crate::chart::ChartSink;
use crate::perf::{compute_perf_metrics, trace_window};
use crate::power::compute_power_metrics;
use crate::series::{plan_pivots, render_chart, ChartFamily};
use crate::style::StyleManager;
use crate::telemetry::EnergySource;

/// Outcome of one chart generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartReport {
    pub written: Vec<PathBuf>,
    /// Charts with no data point at all
    pub skipped: usize,
    /// Charts the sink could not persist
    pub failed: usize,
}

/// Derived metrics for every profile the configured sweep produced.
///
/// A repeated experiment key (several run counts) keeps the last profile read.
#[instrument(skip_all, fields(artifacts = %config.report.artifacts_dir.display()))]
pub async fn collect_experiments(
    config: &ItpeConfig,
    energy: &dyn EnergySource,
) -> Result<ExperimentSet> {
    let paths = profile_paths(config)?;
    info!(profiles = paths.len(), "Collecting experiments");

    let mut experiments = ExperimentSet::new();
    for path in &paths {
        let (key, metrics) = collect_experiment(path, energy).await?;
        if experiments.insert(key.clone(), metrics).is_some() {
            warn!(experiment = %key, "Experiment read twice, keeping the last profile");
        }
    }

    info!(experiments = experiments.len(), "Collected experiments");
    Ok(experiments)
}

/// Perf and power metrics of a single profile file.
pub async fn collect_experiment(
    path: &Path,
    energy: &dyn EnergySource,
) -> Result<(ExperimentKey, ExperimentMetrics)> {
    let ExperimentPath { key, run_count } = ExperimentPath::parse(path)?;
    let profile = load_profile(path)?;

    let experiment = profile
        .experiments
        .first()
        .ok_or_else(|| ItpeError::empty_trace(key.to_string()))?;
    if experiment.experiment.value != 0 && experiment.experiment.value != key.concurrency {
        warn!(
            experiment = %key,
            recorded = experiment.experiment.value,
            "Profile concurrency differs from its directory name"
        );
    }

    let perf = compute_perf_metrics(&experiment.trace).map_err(|e| e.for_experiment(&key))?;
    let (begin, end) = trace_window(&experiment.trace).map_err(|e| e.for_experiment(&key))?;

    let start_samples = energy.energy_samples(begin).await?;
    let end_samples = energy.energy_samples(end).await?;
    let power = compute_power_metrics(&start_samples, &end_samples);

    info!(
        experiment = %key,
        run_count,
        requests = perf.num_requests,
        tokens = perf.total_output_tokens,
        "Collected experiment"
    );
    Ok((key, ExperimentMetrics::new(perf, power)))
}

/// Renders and writes every planned chart for every registered metric.
///
/// Each chart family keeps its own style manager, so one label has one look
/// across all charts of that family.
#[instrument(skip_all)]
pub fn generate_charts(
    aggregation: &Aggregation,
    registry: &MetricRegistry,
    sink: &mut impl ChartSink,
) -> Result<ChartReport> {
    sink.prepare()?;

    let mut by_model = StyleManager::new();
    let mut by_length = StyleManager::new();
    let pivots = plan_pivots(aggregation);
    let mut report = ChartReport::default();

    for name in registry.names() {
        for pivot in &pivots {
            let styles = match pivot.family() {
                ChartFamily::ByModel => &mut by_model,
                ChartFamily::ByLength => &mut by_length,
            };
            let Some(chart) = render_chart(name, pivot, aggregation, registry, styles)? else {
                report.skipped += 1;
                continue;
            };
            match sink.write(&chart) {
                Ok(path) => report.written.push(path),
                Err(e) => {
                    error!(title = %chart.title, error = %e, "Failed to write chart");
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        written = report.written.len(),
        skipped = report.skipped,
        failed = report.failed,
        "Chart generation complete"
    );
    Ok(report)
}

/// Collect, aggregate and chart the configured sweep.
pub async fn run_report(
    config: &ItpeConfig,
    energy: &dyn EnergySource,
    sink: &mut impl ChartSink,
) -> Result<ChartReport> {
    let registry = config.registry();
    let experiments = collect_experiments(config, energy).await?;
    let aggregation = Aggregation::build(&experiments, &registry)?;
    generate_charts(&aggregation, &registry, sink)
}
