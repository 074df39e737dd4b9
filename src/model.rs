use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::stats::{AnovaResult, TukeyHsd};

/// A platform under comparison and the metrics backend that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub label: String,
    /// `host:port` of the Prometheus server.
    pub endpoint: String,
}

/// Which platform label column the post-hoc test pairs with the metric-subset values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PostHocGrouping {
    /// Labels of every row of the run table, regardless of metric.
    #[default]
    FullTable,
    /// Labels of the metric-subset rows only.
    MetricSubset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    pub platforms: Vec<Platform>,
    pub metrics: Vec<String>,
    /// Range selector appended to each metric, e.g. `5m`.
    pub timeframe: String,
    pub alpha: f64,
    pub grouping: PostHocGrouping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// `(provider label, ping log path)` in plotting order.
    pub logs: Vec<(String, PathBuf)>,
    pub output: PathBuf,
}

/// Values of one (platform, metric) query in the order the backend returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub value: f64,
    pub platform: String,
    pub metric: String,
}

/// Flat, denormalized set of observations. Operations return new tables instead of
/// mutating this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn from_rows(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    /// Tag every value of `series` with `platform` and the series' metric.
    pub fn from_series(platform: &str, series: &MetricSeries) -> Self {
        let rows = series
            .values
            .iter()
            .map(|&value| Observation {
                value,
                platform: platform.to_string(),
                metric: series.metric.clone(),
            })
            .collect();
        Self { rows }
    }

    /// Concatenate tables in iteration order.
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = ObservationTable>,
    {
        Self::from_rows(tables.into_iter().flat_map(|t| t.rows).collect())
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filter_metric(&self, metric: &str) -> Self {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.metric == metric)
            .cloned()
            .collect();
        Self { rows }
    }

    /// The value column, in row order.
    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value).collect()
    }

    /// The platform label column, in row order.
    pub fn platforms(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.platform.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    NoDifferenceOmnibus,
    NoDifferencePostHoc,
    SignificantDifference,
}

impl Verdict {
    /// Human-readable line printed at the end of a metric's trace.
    pub fn to_message(self) -> &'static str {
        match self {
            Verdict::NoDifferenceOmnibus => "No statistically significant difference (Anova)",
            Verdict::NoDifferencePostHoc => "No Statistically significant difference (Tukey)",
            Verdict::SignificantDifference => "Statistically significant difference (Tukey)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVerdict {
    pub metric: String,
    pub verdict: Verdict,
    pub omnibus: AnovaResult,
    pub post_hoc: Option<TukeyHsd>,
}

/// Everything `compare --json` prints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub timestamp_utc: String,
    pub timeframe: String,
    pub alpha: f64,
    pub grouping: PostHocGrouping,
    pub platforms: Vec<Platform>,
    pub rows: usize,
    pub verdicts: Vec<TestVerdict>,
}
