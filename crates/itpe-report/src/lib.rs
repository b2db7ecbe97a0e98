pub mod aggregate;
pub mod chart;
pub mod perf;
pub mod power;
pub mod report;
pub mod series;
pub mod style;
pub mod table;
pub mod telemetry;

pub use aggregate::{Aggregation, ByLength, ByModel, ExperimentSet};
pub use chart::{ChartSink, ChartWriter};
pub use perf::{compute_perf_metrics, extract_model, trace_window};
pub use power::compute_power_metrics;
pub use report::{collect_experiment, collect_experiments, generate_charts, run_report, ChartReport};
pub use series::{plan_pivots, render_chart, series_for, Chart, ChartFamily, LengthFilter, Pivot, Series};
pub use style::{palette_entry, StyleManager};
pub use table::{format_table, perf_rows, power_rows};
pub use telemetry::{
    clean_query_name, parse_query_response, EnergySource, KeplerSource, NoEnergy,
    PrometheusClient, QueryResponse, QueryResult,
};
