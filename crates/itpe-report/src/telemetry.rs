use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use itpe_core::{EnergyCounter, EnergySample, ItpeError, Result};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Supplies cumulative energy counter snapshots at a point in time.
#[async_trait]
pub trait EnergySource: Send + Sync {
    /// All counter samples at `at_ns` (nanoseconds since the epoch).
    async fn energy_samples(&self, at_ns: i64) -> Result<Vec<EnergySample>>;
}

/// Used when no telemetry backend is configured; every energy delta is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnergy;

#[async_trait]
impl EnergySource for NoEnergy {
    async fn energy_samples(&self, _at_ns: i64) -> Result<Vec<EnergySample>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<ApiData>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    /// `[<unix seconds>, "<value>"]`
    value: (f64, String),
}

/// One series of an instant query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub results: Vec<QueryResult>,
    pub warnings: Vec<String>,
}

impl QueryResponse {
    pub fn sum(&self) -> f64 {
        self.results.iter().map(|r| r.value).sum()
    }
}

impl PrometheusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ItpeError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Instant query evaluated at `at_ns`.
    #[instrument(skip(self))]
    pub async fn query(&self, name: &str, at_ns: i64) -> Result<QueryResponse> {
        let url = format!("{}/api/v1/query", self.base_url);
        let time = format!("{:.3}", at_ns as f64 / 1_000_000_000.0);

        let resp = self
            .client
            .get(&url)
            .query(&[("query", name), ("time", time.as_str())])
            .send()
            .await
            .map_err(|e| ItpeError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ItpeError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(ItpeError::Telemetry(format!(
                "query {} failed: {} - {}",
                name,
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        let response = parse_query_response(name, &body)?;
        if !response.warnings.is_empty() {
            warn!(query = name, warnings = ?response.warnings, "Prometheus returned warnings");
        }
        debug!(query = name, results = response.results.len(), "Query complete");
        Ok(response)
    }

    /// Runs every query at the same instant; one outcome per query, in order.
    pub async fn multi_query(&self, names: &[String], at_ns: i64) -> Vec<Result<QueryResponse>> {
        join_all(names.iter().map(|name| self.query(name, at_ns))).await
    }

    /// The ten Kepler counters, container counters filtered to `container`.
    pub async fn kepler_samples(&self, at_ns: i64, container: &str) -> Result<Vec<EnergySample>> {
        let batches = try_join_all(EnergyCounter::ALL.into_iter().map(|counter| async move {
            let response = self.query(&counter.query(container), at_ns).await?;
            Ok::<_, ItpeError>(
                response
                    .results
                    .into_iter()
                    .map(|r| EnergySample {
                        counter: counter.metric_name().to_string(),
                        joules: r.value,
                        labels: r.labels,
                        timestamp_ms: r.timestamp_ms,
                    })
                    .collect::<Vec<_>>(),
            )
        }))
        .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Kepler counters for one container, read through Prometheus.
#[derive(Debug, Clone)]
pub struct KeplerSource {
    client: PrometheusClient,
    container: String,
}

impl KeplerSource {
    pub fn new(client: PrometheusClient, container: impl Into<String>) -> Self {
        Self {
            client,
            container: container.into(),
        }
    }
}

#[async_trait]
impl EnergySource for KeplerSource {
    async fn energy_samples(&self, at_ns: i64) -> Result<Vec<EnergySample>> {
        self.client.kepler_samples(at_ns, &self.container).await
    }
}

/// Decodes a `/api/v1/query` body. Non-vector results come back empty.
pub fn parse_query_response(name: &str, body: &str) -> Result<QueryResponse> {
    let api: ApiResponse = serde_json::from_str(body)?;

    if api.status != "success" {
        return Err(ItpeError::Telemetry(format!(
            "query {} failed: {}",
            name,
            api.error.unwrap_or_else(|| api.status.clone())
        )));
    }

    let mut response = QueryResponse {
        results: Vec::new(),
        warnings: api.warnings,
    };

    let Some(data) = api.data else {
        return Ok(response);
    };
    if data.result_type != "vector" {
        debug!(query = name, result_type = %data.result_type, "Ignoring non-vector result");
        return Ok(response);
    }

    let samples: Vec<VectorSample> = serde_json::from_value(data.result)?;
    for sample in samples {
        let value = sample.value.1.parse::<f64>().map_err(|e| {
            ItpeError::Telemetry(format!("query {}: bad sample value {:?}: {}", name, sample.value.1, e))
        })?;
        response.results.push(QueryResult {
            labels: sample.metric,
            value,
            timestamp_ms: (sample.value.0 * 1000.0).round() as i64,
        });
    }

    Ok(response)
}

/// Short display name of a query: `kepler_node_gpu_joules_total{..}` -> `node_gpu`.
pub fn clean_query_name(query: &str) -> &str {
    let name = query.split('{').next().unwrap_or(query);
    let name = name.strip_prefix("kepler_").unwrap_or(name);
    name.strip_suffix("_joules_total").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_response() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"__name__": "kepler_container_gpu_joules_total", "pod_name": "a"},
                     "value": [1700000000.5, "120.5"]},
                    {"metric": {"__name__": "kepler_container_gpu_joules_total", "pod_name": "b"},
                     "value": [1700000000.5, "79.5"]}
                ]
            }
        }"#;
        let resp = parse_query_response("q", body).unwrap();

        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].labels["pod_name"], "a");
        assert_eq!(resp.results[0].timestamp_ms, 1_700_000_000_500);
        assert_eq!(resp.sum(), 200.0);
        assert_eq!(
            resp.results[1],
            QueryResult {
                labels: BTreeMap::from([
                    ("__name__".to_string(), "kepler_container_gpu_joules_total".to_string()),
                    ("pod_name".to_string(), "b".to_string()),
                ]),
                value: 79.5,
                timestamp_ms: 1_700_000_000_500,
            }
        );
    }

    #[test]
    fn test_parse_error_response() {
        let body = r#"{"status": "error", "errorType": "bad_data", "error": "parse error"}"#;
        let err = parse_query_response("q", body).unwrap_err();
        assert!(matches!(err, ItpeError::Telemetry(msg) if msg.contains("parse error")));
    }

    #[test]
    fn test_parse_scalar_response_is_empty() {
        let body = r#"{
            "status": "success",
            "warnings": ["partial"],
            "data": {"resultType": "scalar", "result": [1700000000, "1"]}
        }"#;
        let resp = parse_query_response("q", body).unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.warnings, vec!["partial".to_string()]);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = PrometheusClient::new("http://prom:9090/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://prom:9090");
    }

    #[test]
    fn test_clean_query_name() {
        assert_eq!(clean_query_name("kepler_node_gpu_joules_total"), "node_gpu");
        assert_eq!(
            clean_query_name("kepler_container_dram_joules_total{container_name=\"ollama\"}"),
            "container_dram"
        );
        assert_eq!(clean_query_name("up"), "up");
    }

    #[tokio::test]
    async fn test_no_energy_source_is_empty() {
        assert!(NoEnergy.energy_samples(42).await.unwrap().is_empty());
    }
}
