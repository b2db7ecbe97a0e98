//! Artifact layout of a benchmark sweep:
//! `<artifacts>/<model>:<N>b-<in>-<out>-concurrency<c>/<run>_<c>_profile.json`

use std::path::{Path, PathBuf};

use crate::{ExperimentKey, ItpeConfig, ItpeError, Result};

/// Every profile file the configured sweep is expected to have produced.
pub fn profile_paths(config: &ItpeConfig) -> Result<Vec<PathBuf>> {
    let artifacts = &config.report.artifacts_dir;
    let sweep = &config.perf;
    let tc = &sweep.token_confs;

    if artifacts.as_os_str().is_empty() {
        return Err(ItpeError::Config("artifacts directory is empty".into()));
    }
    if sweep.models.is_empty() {
        return Err(ItpeError::Config("no models specified".into()));
    }
    if sweep.concurrency.is_empty() {
        return Err(ItpeError::Config("no concurrency values specified".into()));
    }
    if sweep.requests.run_count.is_empty() {
        return Err(ItpeError::Config("no run counts specified".into()));
    }
    if tc.input.is_empty() || tc.output.is_empty() {
        return Err(ItpeError::Config(
            "no input or output token configurations specified".into(),
        ));
    }

    let mut paths = Vec::new();
    for model in &sweep.models {
        for input in &tc.input {
            for output in &tc.output {
                for concurrency in &sweep.concurrency {
                    let dir = artifacts.join(experiment_dir_name(
                        model,
                        input.mean,
                        output.mean,
                        *concurrency,
                    ));
                    for run_count in &sweep.requests.run_count {
                        paths.push(dir.join(format!("{}_{}_profile.json", run_count, concurrency)));
                    }
                }
            }
        }
    }
    Ok(paths)
}

fn experiment_dir_name(model: &str, input_mean: u32, output_mean: u32, concurrency: u32) -> String {
    format!(
        "{}-{}-{}-concurrency{}",
        model, input_mean, output_mean, concurrency
    )
}

/// Experiment identity recovered from a profile path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPath {
    pub key: ExperimentKey,
    pub run_count: u32,
}

impl ExperimentPath {
    pub fn parse(path: &Path) -> Result<Self> {
        let invalid = |why: &str| ItpeError::InvalidPath(format!("{} ({})", path.display(), why));

        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| invalid("missing file name"))?;
        let dir_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|d| d.to_str())
            .ok_or_else(|| invalid("missing experiment directory"))?;

        // Model names may contain '-', so lengths and concurrency are taken from the right.
        let fields: Vec<&str> = dir_name.split('-').collect();
        if fields.len() < 4 {
            return Err(invalid("expected <model>-<in>-<out>-concurrency<c>"));
        }
        let n = fields.len();
        let model_spec = fields[..n - 3].join("-");
        let input_mean = parse_num(fields[n - 3]).ok_or_else(|| invalid("bad input length"))?;
        let output_mean = parse_num(fields[n - 2]).ok_or_else(|| invalid("bad output length"))?;
        let concurrency = fields[n - 1]
            .strip_prefix("concurrency")
            .and_then(parse_num)
            .ok_or_else(|| invalid("bad concurrency"))?;

        let (model, size) = model_spec
            .rsplit_once(':')
            .ok_or_else(|| invalid("model tag must be <name>:<N>b"))?;
        let param_size_b = size
            .strip_suffix(['b', 'B'])
            .and_then(parse_num)
            .ok_or_else(|| invalid("bad parameter size"))?;

        let run_count = file_name
            .split('_')
            .next()
            .and_then(parse_num)
            .ok_or_else(|| invalid("bad run count"))?;

        Ok(Self {
            key: ExperimentKey::new(model, param_size_b, input_mean, output_mean, concurrency),
            run_count,
        })
    }
}

fn parse_num(s: &str) -> Option<u32> {
    s.parse().ok()
}
