use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use itpe_core::{load_profile, EnergyCounter, ItpeConfig, ItpeError};
use itpe_report::{
    clean_query_name, collect_experiments, compute_perf_metrics, format_table, generate_charts,
    perf_rows, Aggregation, ChartWriter, EnergySource, KeplerSource, NoEnergy, PrometheusClient,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "itpe")]
#[command(about = "Inference throughput, power and energy reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect every profile of the configured sweep and draw the charts
    Report {
        /// Config file (default: $ITPE_CONFIG or config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not query Prometheus; energy metrics stay zero
        #[arg(long)]
        skip_energy: bool,

        /// Chart output directory (overrides the config)
        #[arg(long)]
        plot_dir: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "table")]
        output: Output,
    },

    /// Derived perf metrics of a single profile export
    Metrics {
        profile: PathBuf,

        #[arg(short, long, value_enum, default_value = "table")]
        output: Output,
    },

    /// Current Kepler energy counters
    Query {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Evaluate this many seconds in the past
        #[arg(long, default_value = "0")]
        ago_secs: u64,
    },
}

fn get_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("ITPE_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}

fn load_config(flag: Option<PathBuf>) -> Result<ItpeConfig> {
    let path = get_config_path(flag);
    let mut config = ItpeConfig::load(&path)?;
    if let Ok(url) = std::env::var("ITPE_PROMETHEUS_URL") {
        config.report.prometheus_url = url;
    }
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

fn prometheus(config: &ItpeConfig) -> Result<PrometheusClient> {
    let timeout = Duration::from_secs(config.report.query_timeout_secs);
    Ok(PrometheusClient::new(&config.report.prometheus_url, timeout)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            config,
            skip_energy,
            plot_dir,
            output,
        } => cmd_report(config, skip_energy, plot_dir, output).await?,
        Commands::Metrics { profile, output } => cmd_metrics(&profile, output)?,
        Commands::Query { config, ago_secs } => cmd_query(config, ago_secs).await?,
    }

    Ok(())
}

async fn cmd_report(
    config: Option<PathBuf>,
    skip_energy: bool,
    plot_dir: Option<PathBuf>,
    output: Output,
) -> Result<()> {
    let config = load_config(config)?;
    let registry = config.registry();

    let energy: Box<dyn EnergySource> = if skip_energy {
        Box::new(NoEnergy)
    } else {
        Box::new(KeplerSource::new(
            prometheus(&config)?,
            config.report.container_name.clone(),
        ))
    };

    let experiments = collect_experiments(&config, energy.as_ref()).await?;
    let aggregation = Aggregation::build(&experiments, &registry)?;

    let plot_dir = plot_dir.unwrap_or_else(|| config.plot_dir());
    let mut writer = ChartWriter::new(&plot_dir);
    let report = generate_charts(&aggregation, &registry, &mut writer)?;

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Output::Table => {
            println!();
            println!("Experiments:");
            println!("{:-<96}", "");
            println!(
                "  {:<40} {:>12} {:>12} {:>12} {:>14}",
                "Experiment", "Tok/s", "TTFT (ms)", "ITL (ms)", "Node Pltf (J)"
            );
            println!("{:-<96}", "");
            for (key, m) in &experiments {
                println!(
                    "  {:<40} {:>12.2} {:>12.2} {:>12.2} {:>14.2}",
                    key.to_string(),
                    m.perf.output_token_throughput,
                    m.perf.avg_ttft_ms,
                    m.perf.avg_itl_ms,
                    m.power.node_platform_j
                );
            }
            println!();
            println!("Charts:");
            println!("{:-<40}", "");
            println!("  Directory:  {}", writer.plot_dir().display());
            println!("  Written:    {}", report.written.len());
            println!("  Skipped:    {}", report.skipped);
            println!("  Failed:     {}", report.failed);
            println!();
        }
    }

    if report.failed > 0 {
        return Err(anyhow!("{} chart(s) could not be written", report.failed));
    }
    Ok(())
}

fn cmd_metrics(path: &Path, output: Output) -> Result<()> {
    let profile = load_profile(path).with_context(|| format!("loading {}", path.display()))?;
    let experiment = profile
        .experiments
        .first()
        .ok_or_else(|| ItpeError::empty_trace(path.display().to_string()))?;
    let metrics = compute_perf_metrics(&experiment.trace)?;

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&metrics)?),
        Output::Table => {
            println!();
            print!("{}", format_table("Perf Metrics:", &perf_rows(&metrics)));
            println!();
        }
    }
    Ok(())
}

/// `now_ns` moved `ago_secs` into the past.
fn instant_before(now_ns: i64, ago_secs: u64) -> Result<i64> {
    i64::try_from(ago_secs)
        .ok()
        .and_then(|secs| secs.checked_mul(1_000_000_000))
        .and_then(|ago_ns| now_ns.checked_sub(ago_ns))
        .ok_or_else(|| anyhow!("--ago-secs {} is out of range", ago_secs))
}

async fn cmd_query(config: Option<PathBuf>, ago_secs: u64) -> Result<()> {
    let config = load_config(config)?;
    let client = prometheus(&config)?;

    let now_ns = Utc::now()
        .timestamp_nanos_opt()
        .ok_or_else(|| anyhow!("system clock out of range"))?;
    let at_ns = instant_before(now_ns, ago_secs)?;
    let at = DateTime::<Utc>::from_timestamp_nanos(at_ns);

    let queries: Vec<String> = EnergyCounter::ALL
        .iter()
        .map(|c| c.query(&config.report.container_name))
        .collect();
    let results = client.multi_query(&queries, at_ns).await;

    println!();
    println!("Energy Counters @ {}", at.to_rfc3339());
    println!("  Prometheus: {}", client.base_url());
    println!("{:-<60}", "");
    for (query, result) in queries.iter().zip(results) {
        match result {
            Ok(resp) => println!(
                "  {:<24} {:>14.2} J  ({} series)",
                clean_query_name(query),
                resp.sum(),
                resp.results.len()
            ),
            Err(e) => println!("  {:<24} error: {}", clean_query_name(query), e),
        }
    }
    println!();

    Ok(())
}
