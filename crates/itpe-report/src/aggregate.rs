use std::collections::{BTreeMap, BTreeSet};

use itpe_core::{
    ExperimentKey, ExperimentMetrics, ItpeError, LengthKey, Metric, MetricRegistry, ModelGroup,
    Result,
};
use tracing::{debug, instrument};

/// Derived metrics of every experiment in one report.
pub type ExperimentSet = BTreeMap<ExperimentKey, ExperimentMetrics>;

/// Lines of a "fixed length, across models" chart.
pub type ByLength<'a> = BTreeMap<LengthKey, BTreeMap<&'a ModelGroup, &'a [f64]>>;

/// Lines of a "fixed model, across lengths" chart.
pub type ByModel<'a> = BTreeMap<&'a ModelGroup, BTreeMap<LengthKey, &'a [f64]>>;

type CellKey = (LengthKey, ModelGroup);

/// Metric values re-indexed along the pivot axes.
///
/// Each cell holds one value per entry of the concurrency axis. Concurrency
/// levels an experiment group never ran stay at `0.0`, which the series
/// renderer treats as absent.
#[derive(Debug, Clone)]
pub struct Aggregation {
    concurrency_axis: Vec<u32>,
    input_axis: Vec<u32>,
    output_axis: Vec<u32>,
    cells: BTreeMap<Metric, BTreeMap<CellKey, Vec<f64>>>,
}

impl Aggregation {
    #[instrument(skip_all, fields(experiments = experiments.len(), metrics = registry.len()))]
    pub fn build(experiments: &ExperimentSet, registry: &MetricRegistry) -> Result<Self> {
        if experiments.is_empty() {
            return Err(ItpeError::NoData("no experiments to aggregate".into()));
        }
        let metrics: Vec<Metric> = registry.resolve()?.into_iter().map(|(m, _, _)| m).collect();

        let concurrency_axis: Vec<u32> = experiments
            .keys()
            .map(|k| k.concurrency)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let input_axis: Vec<u32> = experiments
            .keys()
            .map(|k| k.input_mean)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let output_axis: Vec<u32> = experiments
            .keys()
            .map(|k| k.output_mean)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let slot: BTreeMap<u32, usize> = concurrency_axis
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, i))
            .collect();

        let mut cells: BTreeMap<Metric, BTreeMap<CellKey, Vec<f64>>> = BTreeMap::new();
        for metric in &metrics {
            let table = cells.entry(*metric).or_default();
            for (key, m) in experiments {
                let values = table
                    .entry((key.length_key(), key.model_group()))
                    .or_insert_with(|| vec![0.0; concurrency_axis.len()]);
                // one slot per concurrency; a repeated key would overwrite
                values[slot[&key.concurrency]] = metric.value(m);
            }
        }

        debug!(
            concurrency = ?concurrency_axis,
            inputs = ?input_axis,
            outputs = ?output_axis,
            "Aggregated experiments"
        );

        Ok(Self {
            concurrency_axis,
            input_axis,
            output_axis,
            cells,
        })
    }

    /// Sorted union of every concurrency level seen; the shared x axis.
    pub fn concurrency_axis(&self) -> &[u32] {
        &self.concurrency_axis
    }

    pub fn input_axis(&self) -> &[u32] {
        &self.input_axis
    }

    pub fn output_axis(&self) -> &[u32] {
        &self.output_axis
    }

    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.cells.keys().copied()
    }

    fn table(&self, metric: Metric) -> Result<&BTreeMap<CellKey, Vec<f64>>> {
        self.cells
            .get(&metric)
            .ok_or_else(|| ItpeError::UnknownMetric(metric.name().to_string()))
    }

    pub fn by_length(&self, metric: Metric) -> Result<ByLength<'_>> {
        let mut view: ByLength<'_> = BTreeMap::new();
        for ((lk, mg), values) in self.table(metric)? {
            view.entry(*lk).or_default().insert(mg, values.as_slice());
        }
        Ok(view)
    }

    pub fn by_model(&self, metric: Metric) -> Result<ByModel<'_>> {
        let mut view: ByModel<'_> = BTreeMap::new();
        for ((lk, mg), values) in self.table(metric)? {
            view.entry(mg).or_default().insert(*lk, values.as_slice());
        }
        Ok(view)
    }

    /// Value aligned to `concurrency`, if that cell exists.
    pub fn value(
        &self,
        metric: Metric,
        length: LengthKey,
        group: &ModelGroup,
        concurrency: u32,
    ) -> Option<f64> {
        let idx = self.concurrency_axis.binary_search(&concurrency).ok()?;
        let values = self.cells.get(&metric)?.get(&(length, group.clone()))?;
        values.get(idx).copied()
    }

    /// Every model group with at least one experiment.
    pub fn model_groups(&self) -> BTreeSet<&ModelGroup> {
        self.cells
            .values()
            .flat_map(|table| table.keys().map(|(_, mg)| mg))
            .collect()
    }

    pub fn length_keys(&self) -> BTreeSet<LengthKey> {
        self.cells
            .values()
            .flat_map(|table| table.keys().map(|(lk, _)| *lk))
            .collect()
    }

    pub fn param_sizes(&self) -> BTreeSet<u32> {
        self.model_groups().iter().map(|mg| mg.param_size_b).collect()
    }
}
