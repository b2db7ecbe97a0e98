pub mod config;
pub mod energy;
pub mod error;
pub mod experiment;
pub mod metric;
pub mod metrics;
pub mod paths;
pub mod profile;

pub use config::{Enabled, ItpeConfig, PerfSweepConfig, ReportSection, Requests, TokenConf, TokenConfs};
pub use energy::{EnergyCounter, EnergySample};
pub use error::{ItpeError, Result};
pub use experiment::{ExperimentKey, LengthKey, ModelGroup};
pub use metric::{Metric, MetricRegistry, MetricSpec};
pub use metrics::{DerivedPerfMetrics, DerivedPowerMetrics, ExperimentMetrics};
pub use paths::{profile_paths, ExperimentPath};
pub use profile::{
    load_profile, ExperimentMode, ProfileExperiment, ProfileExport, RequestInputs, RequestTrace,
    ResponseOutput, TraceRequest,
};
