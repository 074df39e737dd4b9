mod prometheus;

pub use prometheus::PrometheusClient;

use crate::model::{MetricSeries, ObservationTable, Platform};
use anyhow::{Context, Result};

/// Something that can answer a range query for one metric on one endpoint.
pub trait MetricSource {
    /// Values of `metric` over the last `timeframe`, timestamps discarded, in the order
    /// the backend returned them.
    fn fetch_series(&self, metric: &str, timeframe: &str, endpoint: &str) -> Result<MetricSeries>;
}

/// Fetch `metric` from every platform, in order, and tag each value with its platform.
pub fn build_table<S: MetricSource + ?Sized>(
    source: &S,
    metric: &str,
    timeframe: &str,
    platforms: &[Platform],
) -> Result<ObservationTable> {
    let mut tables = Vec::with_capacity(platforms.len());
    for platform in platforms {
        let series = source
            .fetch_series(metric, timeframe, &platform.endpoint)
            .with_context(|| format!("fetch {metric} for platform {}", platform.label))?;
        tables.push(ObservationTable::from_series(&platform.label, &series));
    }
    Ok(ObservationTable::concat(tables))
}

/// One table holding every metric for every platform, metrics in input order.
pub fn build_run_table<S: MetricSource + ?Sized>(
    source: &S,
    metrics: &[String],
    timeframe: &str,
    platforms: &[Platform],
) -> Result<ObservationTable> {
    let tables = metrics
        .iter()
        .map(|metric| build_table(source, metric, timeframe, platforms))
        .collect::<Result<Vec<_>>>()?;
    let table = ObservationTable::concat(tables);
    tracing::debug!(rows = table.len(), "assembled observation table");
    Ok(table)
}
