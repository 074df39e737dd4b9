use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use super::{group_by_label, mean};

/// One-way analysis of variance of a value column explained by a single factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaResult {
    /// Factor levels in sorted order.
    pub groups: Vec<String>,
    pub df_between: usize,
    pub df_within: usize,
    pub ss_between: f64,
    pub ss_within: f64,
    pub f_statistic: f64,
    /// Upper tail of F(df_between, df_within). NaN when undefined.
    pub p_value: f64,
}

/// Fit `value ~ label` and test the label factor.
///
/// Zero within-group variance yields F = +inf (p = 0) when group means differ and
/// F = NaN (p = NaN) when they don't.
pub fn one_way_anova(values: &[f64], labels: &[&str]) -> Result<AnovaResult> {
    if values.len() != labels.len() {
        bail!(
            "ANOVA needs one label per value (got {} values, {} labels)",
            values.len(),
            labels.len()
        );
    }
    if values.is_empty() {
        bail!("ANOVA needs at least one observation");
    }
    let groups = group_by_label(values, labels);
    if groups.len() < 2 {
        bail!(
            "ANOVA needs at least two groups, found {}",
            groups.len()
        );
    }

    let n = values.len();
    let k = groups.len();
    let grand_mean = mean(values);

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for (_, g) in &groups {
        let m = mean(g);
        ss_between += g.len() as f64 * (m - grand_mean).powi(2);
        ss_within += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    let df_between = k - 1;
    let df_within = n - k;
    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;
    let f_statistic = ms_between / ms_within;

    let p_value = if df_within == 0 || f_statistic.is_nan() {
        f64::NAN
    } else if f_statistic.is_infinite() {
        0.0
    } else {
        FisherSnedecor::new(df_between as f64, df_within as f64)?.sf(f_statistic)
    };

    Ok(AnovaResult {
        groups: groups.iter().map(|(l, _)| l.to_string()).collect(),
        df_between,
        df_within,
        ss_between,
        ss_within,
        f_statistic,
        p_value,
    })
}
