use itpe_core::{DerivedPerfMetrics, ItpeError, RequestTrace, Result};
use tracing::{debug, instrument};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;
const NANOS_PER_MS: f64 = 1_000_000.0;

/// Experiment window in nanoseconds: start of the first request to the last
/// response chunk of the last request that received any.
pub fn trace_window(trace: &RequestTrace) -> Result<(i64, i64)> {
    let first = trace
        .requests
        .first()
        .ok_or_else(|| ItpeError::empty_trace("trace has no requests"))?;
    let end = trace
        .requests
        .iter()
        .rev()
        .find_map(|r| r.last_response())
        .ok_or_else(|| ItpeError::empty_trace("no request received a response"))?;
    Ok((first.timestamp, end))
}

#[instrument(skip(trace), fields(requests = trace.len()))]
pub fn compute_perf_metrics(trace: &RequestTrace) -> Result<DerivedPerfMetrics> {
    let (begin, end) = trace_window(trace)?;
    let total_time_sec = (end - begin) as f64 / NANOS_PER_SEC;
    let num_requests = trace.len();

    let mut responded = 0usize;
    let mut sum_ttft_ms = 0.0;
    let mut sum_latency_ms = 0.0;
    let mut sum_itl_ms = 0.0;
    let mut itl_requests = 0usize;
    let mut total_output_tokens = 0u64;

    for req in &trace.requests {
        let (Some(first), Some(last)) = (req.first_response(), req.last_response()) else {
            continue;
        };
        responded += 1;

        sum_ttft_ms += (first - req.timestamp) as f64 / NANOS_PER_MS;
        sum_latency_ms += (last - req.timestamp) as f64 / NANOS_PER_MS;
        total_output_tokens += req.output_tokens();

        let stamps = &req.response_timestamps;
        if stamps.len() >= 2 {
            let gaps_ms: f64 = stamps
                .windows(2)
                .map(|w| (w[1] - w[0]) as f64 / NANOS_PER_MS)
                .sum();
            sum_itl_ms += gaps_ms / (stamps.len() - 1) as f64;
            itl_requests += 1;
        }
    }

    let metrics = DerivedPerfMetrics {
        model: trace
            .requests
            .first()
            .and_then(|r| extract_model(&r.request_inputs.payload))
            .unwrap_or_default(),
        total_time_sec,
        num_requests,
        request_throughput: per_second(num_requests as f64, total_time_sec),
        avg_ttft_ms: mean(sum_ttft_ms, responded),
        avg_itl_ms: mean(sum_itl_ms, itl_requests),
        avg_request_latency_ms: mean(sum_latency_ms, responded),
        total_output_tokens,
        output_token_throughput: per_second(total_output_tokens as f64, total_time_sec),
    };

    debug!(
        total_time_sec,
        responded,
        itl_requests,
        total_output_tokens,
        "Computed perf metrics"
    );
    Ok(metrics)
}

/// Model name from the request payload. Missing or unparseable payloads yield `None`.
pub fn extract_model(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value.get("model")?.as_str().map(str::to_string)
}

// A degenerate window reports no throughput rather than infinity.
fn per_second(count: f64, secs: f64) -> f64 {
    if secs > 0.0 {
        count / secs
    } else {
        0.0
    }
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itpe_core::{RequestInputs, ResponseOutput, TraceRequest};

    const MS: i64 = 1_000_000;

    fn request(start_ms: i64, responses_ms: &[i64]) -> TraceRequest {
        TraceRequest {
            timestamp: start_ms * MS,
            request_inputs: RequestInputs::default(),
            response_timestamps: responses_ms.iter().map(|t| t * MS).collect(),
            response_outputs: responses_ms
                .iter()
                .map(|_| ResponseOutput { response: "tok".into() })
                .collect(),
        }
    }

    #[test]
    fn test_basic_metrics() {
        // two requests, 3 chunks each: 2 tokens + terminator
        let trace = RequestTrace::new(vec![
            request(0, &[100, 150, 200]),
            request(500, &[700, 800, 1000]),
        ]);
        let m = compute_perf_metrics(&trace).unwrap();

        assert_eq!(m.num_requests, 2);
        assert_eq!(m.total_time_sec, 1.0);
        assert_eq!(m.total_output_tokens, 4);
        assert_eq!(m.request_throughput, 2.0);
        assert_eq!(m.output_token_throughput, 4.0);
        assert_eq!(m.avg_ttft_ms, 150.0);
        assert_eq!(m.avg_request_latency_ms, 350.0);
        // (50 + 150) / 2
        assert_eq!(m.avg_itl_ms, 100.0);
    }

    #[test]
    fn test_empty_trace_fails() {
        let err = compute_perf_metrics(&RequestTrace::default()).unwrap_err();
        assert!(matches!(err, ItpeError::EmptyTrace { .. }));
    }

    #[test]
    fn test_trace_without_any_response_fails() {
        let trace = RequestTrace::new(vec![request(0, &[]), request(10, &[])]);
        assert!(matches!(
            compute_perf_metrics(&trace),
            Err(ItpeError::EmptyTrace { .. })
        ));
    }

    #[test]
    fn test_zero_chunk_requests_are_skipped_but_counted() {
        let trace = RequestTrace::new(vec![
            request(0, &[100, 200]),
            request(50, &[]),
            request(100, &[300, 400]),
        ]);
        let m = compute_perf_metrics(&trace).unwrap();

        assert_eq!(m.num_requests, 3);
        assert_eq!(m.avg_ttft_ms, 150.0);
        assert_eq!(m.total_output_tokens, 2);
    }

    #[test]
    fn test_window_ends_at_last_request_not_latest_chunk() {
        // the first request finishes after the last one; trace order wins
        let trace = RequestTrace::new(vec![request(0, &[100, 5000]), request(10, &[500, 1000])]);
        let (begin, end) = trace_window(&trace).unwrap();
        assert_eq!(begin, 0);
        assert_eq!(end, 1000 * MS);
    }

    #[test]
    fn test_single_chunk_request_excluded_from_itl() {
        let trace = RequestTrace::new(vec![request(0, &[100]), request(0, &[100, 110, 120])]);
        let m = compute_perf_metrics(&trace).unwrap();

        assert_eq!(m.avg_itl_ms, 10.0);
        assert_eq!(m.avg_ttft_ms, 100.0);
        assert_eq!(m.avg_request_latency_ms, 110.0);
    }

    #[test]
    fn test_zero_duration_forces_zero_throughput() {
        let trace = RequestTrace::new(vec![request(5, &[5, 5, 5])]);
        let m = compute_perf_metrics(&trace).unwrap();

        assert_eq!(m.total_time_sec, 0.0);
        assert_eq!(m.request_throughput, 0.0);
        assert_eq!(m.output_token_throughput, 0.0);
        assert!(m.request_throughput.is_finite());
    }

    #[test]
    fn test_idempotent() {
        let trace = RequestTrace::new(vec![request(0, &[10, 20, 40]), request(5, &[30, 60])]);
        let a = compute_perf_metrics(&trace).unwrap();
        let b = compute_perf_metrics(&trace).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num_requests, trace.len());
    }

    #[test]
    fn test_model_extraction() {
        let mut req = request(0, &[10, 20]);
        req.request_inputs.payload = r#"{"model":"llama3.1:8b","stream":true}"#.into();
        let m = compute_perf_metrics(&RequestTrace::new(vec![req])).unwrap();
        assert_eq!(m.model, "llama3.1:8b");

        assert_eq!(extract_model("not json"), None);
        assert_eq!(extract_model(r#"{"model": 7}"#), None);
        assert_eq!(extract_model(r#"{"messages": []}"#), None);
    }

    #[test]
    fn test_unparseable_payload_is_not_fatal() {
        let mut req = request(0, &[10, 20]);
        req.request_inputs.payload = "{broken".into();
        let m = compute_perf_metrics(&RequestTrace::new(vec![req])).unwrap();
        assert!(m.model.is_empty());
    }
}
