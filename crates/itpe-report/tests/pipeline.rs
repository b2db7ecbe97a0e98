use std::path::{Path, PathBuf};

use async_trait::async_trait;
use itpe_core::{
    EnergyCounter, EnergySample, ItpeConfig, ItpeError, LengthKey, Metric, MetricRegistry,
    ModelGroup, Result,
};
use itpe_report::{
    collect_experiments, generate_charts, series_for, Aggregation, Chart, ChartSink,
    LengthFilter, NoEnergy, Pivot, EnergySource,
};
use serde_json::json;

const BASE_NS: i64 = 1_700_000_000_000_000_000;
const SEC_NS: i64 = 1_000_000_000;

/// Node platform counter reads 100 J at the window start and 80 J at its end.
struct ResettingCounter;

#[async_trait]
impl EnergySource for ResettingCounter {
    async fn energy_samples(&self, at_ns: i64) -> Result<Vec<EnergySample>> {
        let joules = if at_ns == BASE_NS { 100.0 } else { 80.0 };
        Ok(vec![EnergySample::for_counter(EnergyCounter::NodePlatform, joules)])
    }
}

#[derive(Default)]
struct Recorder {
    charts: Vec<Chart>,
}

impl ChartSink for Recorder {
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, chart: &Chart) -> Result<PathBuf> {
        self.charts.push(chart.clone());
        Ok(chart.path.clone())
    }
}

/// `requests` requests, each streaming `tokens_each` tokens plus a final
/// chunk; every request starts at the window start and the last chunk lands
/// one second later.
fn profile(requests: usize, tokens_each: usize, concurrency: u32) -> serde_json::Value {
    let reqs: Vec<_> = (0..requests)
        .map(|_| {
            let chunks = tokens_each + 1;
            let stamps: Vec<i64> = (1..=chunks as i64)
                .map(|i| BASE_NS + i * SEC_NS / chunks as i64)
                .collect();
            let outputs: Vec<_> = (0..chunks).map(|_| json!({"response": "tok"})).collect();
            json!({
                "timestamp": BASE_NS,
                "request_inputs": {"payload": "{\"model\":\"m:7b\"}"},
                "response_timestamps": stamps,
                "response_outputs": outputs,
            })
        })
        .collect();

    json!({
        "experiments": [{
            "experiment": {"mode": "concurrency", "value": concurrency},
            "requests": reqs,
        }],
        "version": "0.0.1",
    })
}

fn write_profile(artifacts: &Path, model: &str, concurrency: u32, body: &serde_json::Value) {
    let dir = artifacts.join(format!("{}-100-50-concurrency{}", model, concurrency));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("10_{}_profile.json", concurrency)),
        serde_json::to_string(body).unwrap(),
    )
    .unwrap();
}

fn config(artifacts: &Path, models: &[&str]) -> ItpeConfig {
    let yaml = format!(
        r#"
itpe_report:
  artifacts_dir: {}
itpe_perf:
  models: [{}]
  concurrency: [1, 4]
  requests:
    run_count: [10]
  token_confs:
    input:
      - name: short
        mean: 100
        stddev: 0
    output:
      - name: short
        mean: 50
        stddev: 0
"#,
        artifacts.display(),
        models
            .iter()
            .map(|m| format!("\"{}\"", m))
            .collect::<Vec<_>>()
            .join(", ")
    );
    ItpeConfig::from_yaml(&yaml).unwrap()
}

fn sweep(artifacts: &Path) -> ItpeConfig {
    write_profile(artifacts, "m:7b", 1, &profile(1, 10, 1));
    write_profile(artifacts, "m:7b", 4, &profile(4, 10, 4));
    config(artifacts, &["m:7b"])
}

#[tokio::test]
async fn test_throughput_series_across_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let config = sweep(dir.path());

    let experiments = collect_experiments(&config, &NoEnergy).await.unwrap();
    assert_eq!(experiments.len(), 2);

    let registry = MetricRegistry::default();
    let agg = Aggregation::build(&experiments, &registry).unwrap();
    assert_eq!(agg.concurrency_axis(), &[1, 4]);

    let by_length = agg.by_length(Metric::OutputTokenThroughput).unwrap();
    let group = ModelGroup::new("m", 7);
    assert_eq!(by_length[&LengthKey::new(100, 50)][&group], &[10.0, 40.0]);

    let pivot = Pivot::ByModel {
        param_size_b: 7,
        filter: LengthFilter::Pair(LengthKey::new(100, 50)),
    };
    let series = series_for(Metric::OutputTokenThroughput, &pivot, &agg).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].label, "m");
    assert_eq!(series[0].points, vec![(1.0, 10.0), (4.0, 40.0)]);
}

#[tokio::test]
async fn test_counter_reset_yields_negative_energy() {
    let dir = tempfile::tempdir().unwrap();
    let config = sweep(dir.path());

    let experiments = collect_experiments(&config, &ResettingCounter).await.unwrap();
    for metrics in experiments.values() {
        assert_eq!(metrics.power.node_platform_j, -20.0);
        assert_eq!(metrics.power.node_gpu_j, 0.0);
    }

    let agg = Aggregation::build(&experiments, &MetricRegistry::default()).unwrap();
    let group = ModelGroup::new("m", 7);
    let lk = LengthKey::new(100, 50);
    assert_eq!(agg.value(Metric::NodePlatform, lk, &group, 1), Some(-20.0));
    assert_eq!(agg.value(Metric::EnergyPerToken, lk, &group, 1), Some(-2.0));
}

#[tokio::test]
async fn test_zero_token_energy_per_token_is_not_plotted() {
    let dir = tempfile::tempdir().unwrap();
    // a single terminating chunk per request: responses but no tokens
    write_profile(dir.path(), "z:3b", 1, &profile(2, 0, 1));
    write_profile(dir.path(), "z:3b", 4, &profile(2, 0, 4));
    let config = config(dir.path(), &["z:3b"]);

    let experiments = collect_experiments(&config, &ResettingCounter).await.unwrap();
    let agg = Aggregation::build(&experiments, &MetricRegistry::default()).unwrap();

    let group = ModelGroup::new("z", 3);
    let lk = LengthKey::new(100, 50);
    assert!(agg.value(Metric::EnergyPerToken, lk, &group, 1).unwrap().is_nan());

    let series = series_for(
        Metric::EnergyPerToken,
        &Pivot::ByLength { group },
        &agg,
    )
    .unwrap();
    assert!(series.is_empty());
}

#[tokio::test]
async fn test_profile_without_responses_names_experiment() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path(), "m:7b", 1, &profile(1, 10, 1));
    let silent = json!({
        "experiments": [{
            "experiment": {"mode": "concurrency", "value": 4},
            "requests": [{"timestamp": BASE_NS, "response_timestamps": [], "response_outputs": []}],
        }],
    });
    write_profile(dir.path(), "m:7b", 4, &silent);

    let err = collect_experiments(&config(dir.path(), &["m:7b"]), &NoEnergy)
        .await
        .unwrap_err();
    match err {
        ItpeError::EmptyTrace { experiment } => assert!(experiment.contains("m:7b"), "{}", experiment),
        other => panic!("expected EmptyTrace, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_profile_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path(), "m:7b", 1, &profile(1, 10, 1));

    let err = collect_experiments(&config(dir.path(), &["m:7b"]), &NoEnergy)
        .await
        .unwrap_err();
    assert!(matches!(err, ItpeError::Io(_)));
}

#[tokio::test]
async fn test_full_report_charts() {
    let dir = tempfile::tempdir().unwrap();
    let config = sweep(dir.path());
    let registry = config.registry();

    let experiments = collect_experiments(&config, &NoEnergy).await.unwrap();
    let agg = Aggregation::build(&experiments, &registry).unwrap();
    let mut sink = Recorder::default();
    let report = generate_charts(&agg, &registry, &mut sink).unwrap();

    // without telemetry every energy chart is empty
    assert_eq!(report.failed, 0);
    assert_eq!(report.written.len(), sink.charts.len());
    assert!(sink
        .charts
        .iter()
        .all(|c| c.x_label == "Concurrency" && !c.series.is_empty()));
    assert!(sink
        .charts
        .iter()
        .any(|c| c.title == "Output Token Throughput (7b Parameters, Input 100, Output 50)"));
    assert!(!sink.charts.iter().any(|c| c.title.starts_with("Node Platform")));
}
