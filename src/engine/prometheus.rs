use crate::engine::MetricSource;
use crate::model::MetricSeries;
use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

/// Body of `GET /api/v1/query`. Only the parts the comparator reads.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<RangeSeries>,
}

#[derive(Debug, Deserialize)]
struct RangeSeries {
    #[serde(default)]
    metric: serde_json::Value,
    /// `[epoch_seconds, "value"]` pairs.
    values: Vec<(f64, String)>,
}

/// Blocking client for a Prometheus HTTP API.
pub struct PrometheusClient {
    http: reqwest::blocking::Client,
}

impl PrometheusClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("cloud-perf-stats/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build HTTP client")?;
        Ok(Self { http })
    }
}

impl MetricSource for PrometheusClient {
    fn fetch_series(&self, metric: &str, timeframe: &str, endpoint: &str) -> Result<MetricSeries> {
        let url = query_url(metric, timeframe, endpoint)?;
        tracing::debug!(%url, "querying metrics backend");

        let body = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("request {url}"))?
            .error_for_status()
            .with_context(|| format!("metrics backend rejected {url}"))?
            .text()
            .with_context(|| format!("read response body from {url}"))?;

        let values = parse_query_response(&body)
            .with_context(|| format!("decode response for {metric}[{timeframe}] from {endpoint}"))?;
        tracing::debug!(metric, endpoint, samples = values.len(), "fetched series");

        Ok(MetricSeries {
            metric: metric.to_string(),
            values,
        })
    }
}

/// `http://{endpoint}/api/v1/query?query={metric}[{timeframe}]`, percent-encoded.
pub(crate) fn query_url(metric: &str, timeframe: &str, endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("http://{endpoint}/api/v1/query"))
        .with_context(|| format!("invalid metrics endpoint {endpoint:?}"))?;
    url.query_pairs_mut()
        .append_pair("query", &format!("{metric}[{timeframe}]"));
    Ok(url)
}

/// Extract the sample values of the first result series.
///
/// A range query is expected to select exactly one series. When it selects more, the
/// first one is used and the rest are dropped with a warning.
pub(crate) fn parse_query_response(body: &str) -> Result<Vec<f64>> {
    let resp: QueryResponse = serde_json::from_str(body).context("malformed query response")?;
    let mut result = resp.data.result.into_iter();
    let Some(first) = result.next() else {
        bail!("query returned no series (empty data.result)");
    };
    let dropped = result.count();
    if dropped > 0 {
        tracing::warn!(
            series = %first.metric,
            dropped,
            "query matched several series, using only the first"
        );
    }

    first
        .values
        .iter()
        .map(|(ts, v)| {
            v.parse::<f64>()
                .with_context(|| format!("sample at {ts} has non-numeric value {v:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    const BODY: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "matrix",
            "result": [
                {"metric": {"__name__": "network_connection_errors_total"},
                 "values": [[1700000000.123, "3"], [1700000015, "4.5"], [1700000030, "1e3"]]}
            ]
        }
    }"#;

    #[test]
    fn keeps_values_and_drops_timestamps() {
        assert_eq!(parse_query_response(BODY).unwrap(), vec![3.0, 4.5, 1000.0]);
    }

    #[test]
    fn only_the_first_series_is_used() {
        let body = r#"{"data": {"result": [
            {"metric": {"instance": "a"}, "values": [[1, "1"]]},
            {"metric": {"instance": "b"}, "values": [[1, "2"], [2, "3"]]}
        ]}}"#;
        assert_eq!(parse_query_response(body).unwrap(), vec![1.0]);
    }

    #[test]
    fn empty_result_is_fatal() {
        let err = parse_query_response(r#"{"data": {"result": []}}"#).unwrap_err();
        assert!(err.to_string().contains("no series"));
    }

    #[test]
    fn malformed_bodies_are_fatal() {
        assert!(parse_query_response("not json").is_err());
        assert!(parse_query_response(r#"{"status": "error", "error": "bad"}"#).is_err());
        assert!(parse_query_response(r#"{"data": {"result": [{"values": [[1, "x"]]}]}}"#).is_err());
    }

    #[test]
    fn query_url_carries_selector_and_range() {
        let url = query_url(
            r#"network_throughput_bytes_total{direction="upload"}"#,
            "5m",
            "localhost:9090",
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(9090));
        assert_eq!(url.path(), "/api/v1/query");
        let (k, v) = url.query_pairs().next().unwrap();
        assert_eq!(k, "query");
        assert_eq!(v, r#"network_throughput_bytes_total{direction="upload"}[5m]"#);
    }

    #[test]
    fn fetches_from_a_live_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 2 {
                line.clear();
            }
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                BODY.len(),
                BODY
            )
            .unwrap();
            request_line
        });

        let client = PrometheusClient::new().unwrap();
        let series = client
            .fetch_series("network_connection_errors_total", "5m", &endpoint)
            .unwrap();
        assert_eq!(series.metric, "network_connection_errors_total");
        assert_eq!(series.values, vec![3.0, 4.5, 1000.0]);

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /api/v1/query?query=network_connection_errors_total"));
    }

    #[test]
    fn unreachable_endpoint_is_fatal() {
        // Bind then drop to get a port nobody listens on.
        let endpoint = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .to_string();
        let client = PrometheusClient::new().unwrap();
        assert!(client.fetch_series("up", "5m", &endpoint).is_err());
    }
}
