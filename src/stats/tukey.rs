use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{group_by_label, mean, ptukey, qtukey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub group1: String,
    pub group2: String,
    /// `mean(group2) - mean(group1)`.
    pub mean_diff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// Tukey's honestly-significant-difference test over every pair of groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TukeyHsd {
    pub alpha: f64,
    /// Residual degrees of freedom, `N - k`.
    pub df: usize,
    /// Pooled within-group variance.
    pub mse: f64,
    pub comparisons: Vec<PairwiseComparison>,
}

impl TukeyHsd {
    pub fn any_rejected(&self) -> bool {
        self.comparisons.iter().any(|c| c.reject)
    }
}

/// Run Tukey's HSD with `values[i]` belonging to group `labels[i]`.
///
/// Values and labels are paired by position, so they must have the same length.
pub fn tukey_hsd(values: &[f64], labels: &[&str], alpha: f64) -> Result<TukeyHsd> {
    if values.len() != labels.len() {
        bail!(
            "Tukey HSD pairs values with group labels by position, but got {} values and {} labels",
            values.len(),
            labels.len()
        );
    }
    let groups = group_by_label(values, labels);
    let k = groups.len();
    if k < 2 {
        bail!("Tukey HSD needs at least two groups, found {}", k);
    }

    let n = values.len();
    let df = n - k;
    let means: Vec<f64> = groups.iter().map(|(_, g)| mean(g)).collect();
    let ss_within: f64 = groups
        .iter()
        .zip(&means)
        .map(|((_, g), m)| g.iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();
    let mse = ss_within / df as f64;
    let q_crit = qtukey(1.0 - alpha, k as f64, df as f64);

    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let (ni, nj) = (groups[i].1.len() as f64, groups[j].1.len() as f64);
            let mean_diff = means[j] - means[i];
            let std_pair = (mse / 2.0 * (1.0 / ni + 1.0 / nj)).sqrt();
            let q = mean_diff.abs() / std_pair;
            // NaN (no spread at all) must survive so it never rejects.
            let mut p_adj = 1.0 - ptukey(q, k as f64, df as f64);
            if p_adj < 0.0 {
                p_adj = 0.0;
            }
            let half_width = q_crit * std_pair;
            comparisons.push(PairwiseComparison {
                group1: groups[i].0.to_string(),
                group2: groups[j].0.to_string(),
                mean_diff,
                p_adj,
                lower: mean_diff - half_width,
                upper: mean_diff + half_width,
                reject: p_adj < alpha,
            });
        }
    }

    Ok(TukeyHsd {
        alpha,
        df,
        mse,
        comparisons,
    })
}

impl fmt::Display for TukeyHsd {
    /// Summary table in the layout of `statsmodels`' `pairwise_tukeyhsd(...).summary()`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = ["group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"];
        let rows: Vec<[String; 7]> = self
            .comparisons
            .iter()
            .map(|c| {
                [
                    c.group1.clone(),
                    c.group2.clone(),
                    format!("{:.4}", c.mean_diff),
                    format!("{:.4}", c.p_adj),
                    format!("{:.4}", c.lower),
                    format!("{:.4}", c.upper),
                    if c.reject { "True" } else { "False" }.to_string(),
                ]
            })
            .collect();

        let mut widths = header.map(str::len);
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.len());
            }
        }
        let total = widths.iter().sum::<usize>() + widths.len() - 1;
        let fmt_row = |cells: &[&str]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:>w$}", c, w = *w))
                .collect::<Vec<_>>()
                .join(" ")
        };

        writeln!(
            f,
            "Multiple Comparison of Means - Tukey HSD, FWER={:.2}",
            self.alpha
        )?;
        writeln!(f, "{}", "=".repeat(total))?;
        writeln!(f, "{}", fmt_row(&header))?;
        writeln!(f, "{}", "-".repeat(total))?;
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            writeln!(f, "{}", fmt_row(&cells))?;
        }
        write!(f, "{}", "-".repeat(total))
    }
}
