use std::collections::HashSet;
use std::path::PathBuf;

use itpe_core::{LengthKey, Metric, MetricRegistry, MetricSpec, ModelGroup, Result};
use tracing::{debug, info, warn};

use crate::aggregate::Aggregation;
use crate::style::{GlyphStyle, LineStyle, StyleManager};

pub const X_LABEL: &str = "Concurrency";
pub const CHART_EXT: &str = "svg";

/// Directory a chart lands in; each family shares one style manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartFamily {
    ByModel,
    ByLength,
}

impl ChartFamily {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ChartFamily::ByModel => "by_model",
            ChartFamily::ByLength => "by_length",
        }
    }
}

/// Which token lengths a by-model chart holds fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthFilter {
    /// Fixed input mean; one line per model and output mean
    Input(u32),
    /// Fixed output mean; one line per model and input mean
    Output(u32),
    /// Both lengths fixed; one line per model
    Pair(LengthKey),
}

impl LengthFilter {
    fn matches(&self, lk: &LengthKey) -> bool {
        match self {
            LengthFilter::Input(n) => lk.input_mean == *n,
            LengthFilter::Output(n) => lk.output_mean == *n,
            LengthFilter::Pair(pair) => lk == pair,
        }
    }

    fn label(&self, model: &str, lk: &LengthKey) -> String {
        match self {
            LengthFilter::Input(_) => format!("{}-output{}", model, lk.output_mean),
            LengthFilter::Output(_) => format!("{}-input{}", model, lk.input_mean),
            LengthFilter::Pair(_) => model.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pivot {
    /// Across models of one parameter size
    ByModel { param_size_b: u32, filter: LengthFilter },
    /// Across length pairs of one model
    ByLength { group: ModelGroup },
}

impl Pivot {
    pub fn family(&self) -> ChartFamily {
        match self {
            Pivot::ByModel { .. } => ChartFamily::ByModel,
            Pivot::ByLength { .. } => ChartFamily::ByLength,
        }
    }

    pub fn title(&self, metric_name: &str) -> String {
        match self {
            Pivot::ByModel { param_size_b, filter } => match filter {
                LengthFilter::Input(n) => {
                    format!("{} ({}b Parameters, Input {})", metric_name, param_size_b, n)
                }
                LengthFilter::Output(n) => {
                    format!("{} ({}b Parameters, Output {})", metric_name, param_size_b, n)
                }
                LengthFilter::Pair(lk) => format!(
                    "{} ({}b Parameters, Input {}, Output {})",
                    metric_name, param_size_b, lk.input_mean, lk.output_mean
                ),
            },
            Pivot::ByLength { group } => format!(
                "{} ({}, {}b Parameters)",
                metric_name, group.model, group.param_size_b
            ),
        }
    }

    /// Chart path relative to the plot directory.
    pub fn relative_path(&self, spec: &MetricSpec) -> PathBuf {
        let stem = match self {
            Pivot::ByModel { param_size_b, filter } => match filter {
                LengthFilter::Input(n) => format!("{}_{}b_input{}", spec.filename, param_size_b, n),
                LengthFilter::Output(n) => {
                    format!("{}_{}b_output{}", spec.filename, param_size_b, n)
                }
                LengthFilter::Pair(lk) => format!(
                    "{}_{}b_in{}_out{}",
                    spec.filename, param_size_b, lk.input_mean, lk.output_mean
                ),
            },
            Pivot::ByLength { group } => {
                format!("{}_{}_{}b", spec.filename, group.model, group.param_size_b)
            }
        };
        PathBuf::from(self.family().dir_name()).join(format!("{}.{}", stem, CHART_EXT))
    }
}

/// One comparison line: (concurrency, value) points in axis order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub line: LineStyle,
    pub glyph: GlyphStyle,
}

/// Everything the chart writer needs for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub path: PathBuf,
    pub series: Vec<StyledSeries>,
}

impl Chart {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

/// Zero and NaN both mean "not measured".
pub fn is_present(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

pub fn to_points(axis: &[u32], values: &[f64]) -> Vec<(f64, f64)> {
    axis.iter()
        .zip(values)
        .filter(|(_, v)| is_present(**v))
        .map(|(c, v)| (*c as f64, *v))
        .collect()
}

/// Lines of one chart, ordered by length key then model group. Lines left
/// without points are dropped.
pub fn series_for(metric: Metric, pivot: &Pivot, agg: &Aggregation) -> Result<Vec<Series>> {
    let axis = agg.concurrency_axis();
    let mut series = Vec::new();

    match pivot {
        Pivot::ByModel { param_size_b, filter } => {
            for (lk, groups) in agg.by_length(metric)? {
                if !filter.matches(&lk) {
                    continue;
                }
                for (mg, values) in groups {
                    if mg.param_size_b != *param_size_b {
                        continue;
                    }
                    let points = to_points(axis, values);
                    if points.is_empty() {
                        continue;
                    }
                    series.push(Series {
                        label: filter.label(&mg.model, &lk),
                        points,
                    });
                }
            }
        }
        Pivot::ByLength { group } => {
            let view = agg.by_model(metric)?;
            if let Some(lengths) = view.get(group) {
                for (lk, values) in lengths {
                    let points = to_points(axis, values);
                    if points.is_empty() {
                        continue;
                    }
                    series.push(Series {
                        label: lk.to_string(),
                        points,
                    });
                }
            }
        }
    }

    Ok(series)
}

/// Builds one styled chart. Returns `None` when no line has a point.
pub fn render_chart(
    metric_name: &str,
    pivot: &Pivot,
    agg: &Aggregation,
    registry: &MetricRegistry,
    styles: &mut StyleManager,
) -> Result<Option<Chart>> {
    let spec = registry.get(metric_name)?;
    let metric = Metric::from_name(metric_name)?;
    let title = pivot.title(metric_name);

    let series = series_for(metric, pivot, agg)?;
    if series.is_empty() {
        info!(title = %title, "Skipping chart due to no data");
        return Ok(None);
    }

    let mut labels = HashSet::new();
    for s in &series {
        if !labels.insert(s.label.as_str()) {
            warn!(title = %title, label = %s.label, "Duplicate series label");
        }
    }

    let series = series
        .into_iter()
        .map(|s| {
            let (line, glyph) = styles.style_for(&s.label);
            StyledSeries {
                label: s.label,
                points: s.points,
                line,
                glyph,
            }
        })
        .collect::<Vec<_>>();

    debug!(title = %title, lines = series.len(), "Rendered chart series");

    Ok(Some(Chart {
        title,
        x_label: X_LABEL.to_string(),
        y_label: spec.y_label.clone(),
        path: pivot.relative_path(spec),
        series,
    }))
}

/// Every chart the report draws for one metric, by-model charts first.
pub fn plan_pivots(agg: &Aggregation) -> Vec<Pivot> {
    let mut pivots = Vec::new();
    let length_keys = agg.length_keys();

    for param_size_b in agg.param_sizes() {
        for n in agg.input_axis() {
            pivots.push(Pivot::ByModel {
                param_size_b,
                filter: LengthFilter::Input(*n),
            });
        }
        for n in agg.output_axis() {
            pivots.push(Pivot::ByModel {
                param_size_b,
                filter: LengthFilter::Output(*n),
            });
        }
        for lk in &length_keys {
            pivots.push(Pivot::ByModel {
                param_size_b,
                filter: LengthFilter::Pair(*lk),
            });
        }
    }

    for group in agg.model_groups() {
        pivots.push(Pivot::ByLength {
            group: group.clone(),
        });
    }

    pivots
}
