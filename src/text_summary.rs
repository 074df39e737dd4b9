//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for the latency report and the verdict recap.

use crate::latency::LatencyGroup;
use crate::metrics;
use crate::model::TestVerdict;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One line per provider: sample count and RTT spread.
pub(crate) fn build_latency_summary(groups: &[LatencyGroup]) -> TextSummary {
    let width = groups.iter().map(|g| g.label.len()).max().unwrap_or(0);
    let lines = groups
        .iter()
        .map(|g| match metrics::compute_metrics(&g.samples) {
            Some((mean, median, p25, p75)) => format!(
                "{:<width$} n={:<5} avg {:.2} med {:.2} p25 {:.2} p75 {:.2} ms",
                g.label,
                g.samples.len(),
                mean,
                median,
                p25,
                p75,
                width = width
            ),
            None => format!(
                "{:<width$} n={:<5} insufficient samples",
                g.label,
                g.samples.len(),
                width = width
            ),
        })
        .collect();
    TextSummary { lines }
}

/// One line per metric with its verdict and omnibus p-value.
pub(crate) fn build_verdict_summary(verdicts: &[TestVerdict]) -> TextSummary {
    let mut lines = vec!["Summary:".to_string()];
    for v in verdicts {
        lines.push(format!(
            "  {}: {:?} (ANOVA p={:.4})",
            v.metric, v.verdict, v.omnibus.p_value
        ));
    }
    TextSummary { lines }
}
