use itpe_core::{DerivedPerfMetrics, DerivedPowerMetrics, EnergyCounter};

pub type Row = (&'static str, String);

pub fn perf_rows(m: &DerivedPerfMetrics) -> Vec<Row> {
    vec![
        ("Model", m.model.clone()),
        ("Total Time (s)", format!("{:.2}", m.total_time_sec)),
        ("Requests", m.num_requests.to_string()),
        ("Request Throughput (req/s)", format!("{:.2}", m.request_throughput)),
        ("Avg TTFT (ms)", format!("{:.2}", m.avg_ttft_ms)),
        ("Avg ITL (ms)", format!("{:.2}", m.avg_itl_ms)),
        ("Avg Request Latency (ms)", format!("{:.2}", m.avg_request_latency_ms)),
        ("Output Tokens", m.total_output_tokens.to_string()),
        ("Output Token Throughput (tok/s)", format!("{:.2}", m.output_token_throughput)),
    ]
}

pub fn power_rows(m: &DerivedPowerMetrics) -> Vec<Row> {
    EnergyCounter::ALL
        .into_iter()
        .map(|counter| (counter.label(), format!("{:.2}", m.get(counter))))
        .collect()
}

/// Rows as a two-column text table.
pub fn format_table(title: &str, rows: &[Row]) -> String {
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = format!("{}\n{}\n", title, "-".repeat(width + 16));
    for (label, value) in rows {
        out.push_str(&format!("{:<width$}  {}\n", label, value, width = width));
    }
    out
}
