//! Per-metric hypothesis testing over an observation table.
//!
//! Each metric goes through a one-way ANOVA first; only a significant omnibus result
//! triggers Tukey's HSD. The narrative written to `out` is part of the program's output.

use crate::model::{ObservationTable, PostHocGrouping, TestVerdict, Verdict};
use crate::stats::{one_way_anova, tukey_hsd};
use anyhow::{bail, Context, Result};
use std::io::Write;

/// Test every metric in `metrics`, in order, against the rows of `table` tagged with it.
pub fn evaluate(
    table: &ObservationTable,
    metrics: &[String],
    alpha: f64,
    grouping: PostHocGrouping,
    out: &mut dyn Write,
) -> Result<Vec<TestVerdict>> {
    let mut verdicts = Vec::with_capacity(metrics.len());
    for metric in metrics {
        writeln!(out, "----Testing {metric}----")?;
        let verdict = evaluate_metric(table, metric, alpha, grouping, out)
            .with_context(|| format!("test {metric}"))?;
        writeln!(out, "{}", verdict.verdict.to_message())?;
        writeln!(out, "----Finish {metric}----")?;
        verdicts.push(verdict);
    }
    Ok(verdicts)
}

fn evaluate_metric(
    table: &ObservationTable,
    metric: &str,
    alpha: f64,
    grouping: PostHocGrouping,
    out: &mut dyn Write,
) -> Result<TestVerdict> {
    let subset = table.filter_metric(metric);
    if subset.is_empty() {
        bail!("no observations tagged with this metric");
    }
    let values = subset.values();
    let omnibus = one_way_anova(&values, &subset.platforms())?;
    writeln!(
        out,
        "ANOVA F={:.4} p={:.4}",
        omnibus.f_statistic, omnibus.p_value
    )?;

    // NaN fails this comparison and lands on "no difference".
    if !(omnibus.p_value < alpha) {
        return Ok(TestVerdict {
            metric: metric.to_string(),
            verdict: Verdict::NoDifferenceOmnibus,
            omnibus,
            post_hoc: None,
        });
    }

    writeln!(out, "Performing Tukey Test")?;
    // FullTable pairs the subset values with every label of the run table, which only
    // lines up when the table holds a single metric.
    let labels = match grouping {
        PostHocGrouping::FullTable => table.platforms(),
        PostHocGrouping::MetricSubset => subset.platforms(),
    };
    let post_hoc = tukey_hsd(&values, &labels, alpha)?;
    writeln!(out, "{post_hoc}")?;

    let verdict = if post_hoc.any_rejected() {
        Verdict::SignificantDifference
    } else {
        Verdict::NoDifferencePostHoc
    };
    Ok(TestVerdict {
        metric: metric.to_string(),
        verdict,
        omnibus,
        post_hoc: Some(post_hoc),
    })
}
