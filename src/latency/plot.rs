use anyhow::Result;
use std::path::Path;

use super::LatencyGroup;

pub const TITLE: &str = "Round trip time on various cloud providers";
pub const Y_DESC: &str = "RTT (ms)";
pub const X_DESC: &str = "Cloud provider";

/// Draw one box per group, left to right in input order, and save the figure as a PNG.
#[cfg(feature = "plot")]
pub fn render_boxplot(groups: &[LatencyGroup], output_path: &Path) -> Result<()> {
    use crate::metrics::BoxStats;
    use anyhow::{anyhow, bail};
    use plotters::prelude::*;

    if groups.is_empty() {
        bail!("no latency groups to plot");
    }
    let draw_err = |e: &dyn std::fmt::Display| anyhow!("draw boxplot {}: {e}", output_path.display());

    let (y_lo, y_hi) = y_range(groups);
    let n = groups.len();
    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err(&e))?;
    let mut chart = ChartBuilder::on(&root)
        .caption(TITLE, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_lo..y_hi)
        .map_err(|e| draw_err(&e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x: &f64| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .x_desc(X_DESC)
        .y_desc(Y_DESC)
        .draw()
        .map_err(|e| draw_err(&e))?;

    let line = BLACK.stroke_width(1);
    let half = 0.25;
    for (i, group) in groups.iter().enumerate() {
        // An empty group keeps its slot and label but has nothing to draw.
        let Some(b) = BoxStats::from_samples(&group.samples) else {
            continue;
        };
        let x = i as f64;

        chart
            .draw_series([
                Rectangle::new([(x - half, b.q1), (x + half, b.q3)], BLUE.mix(0.15).filled()),
                Rectangle::new([(x - half, b.q1), (x + half, b.q3)], line),
            ])
            .map_err(|e| draw_err(&e))?;
        chart
            .draw_series([
                PathElement::new(vec![(x - half, b.median), (x + half, b.median)], RED.stroke_width(2)),
                PathElement::new(vec![(x, b.q1), (x, b.whisker_low)], line),
                PathElement::new(vec![(x, b.q3), (x, b.whisker_high)], line),
                PathElement::new(vec![(x - half / 2.0, b.whisker_low), (x + half / 2.0, b.whisker_low)], line),
                PathElement::new(vec![(x - half / 2.0, b.whisker_high), (x + half / 2.0, b.whisker_high)], line),
            ])
            .map_err(|e| draw_err(&e))?;
        chart
            .draw_series(b.outliers.iter().map(|&y| Circle::new((x, y), 3, line)))
            .map_err(|e| draw_err(&e))?;
    }

    root.present().map_err(|e| draw_err(&e))?;
    tracing::debug!(path = %output_path.display(), groups = n, "wrote boxplot");
    Ok(())
}

#[cfg(not(feature = "plot"))]
pub fn render_boxplot(_groups: &[LatencyGroup], output_path: &Path) -> Result<()> {
    anyhow::bail!(
        "cannot write {}: built without the `plot` feature",
        output_path.display()
    )
}

/// Y-axis bounds covering every sample with a little headroom.
#[cfg_attr(not(feature = "plot"), allow(dead_code))]
fn y_range(groups: &[LatencyGroup]) -> (f64, f64) {
    let mut all = groups.iter().flat_map(|g| g.samples.iter().copied());
    let Some(first) = all.next() else {
        return (0.0, 1.0);
    };
    let (lo, hi) = all.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo == hi {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(label: &str, samples: &[f64]) -> LatencyGroup {
        LatencyGroup {
            label: label.into(),
            samples: samples.to_vec(),
        }
    }

    #[test]
    fn y_range_pads_data() {
        assert_eq!(y_range(&[group("a", &[])]), (0.0, 1.0));
        assert_eq!(y_range(&[group("a", &[5.0]), group("b", &[])]), (4.0, 6.0));
        let (lo, hi) = y_range(&[group("a", &[10.0, 20.0]), group("b", &[30.0])]);
        assert!((lo - 9.0).abs() < 1e-12 && (hi - 31.0).abs() < 1e-12);
    }

    #[cfg(feature = "plot")]
    #[test]
    fn renders_degenerate_groups() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("boxplot.png");
        let groups = [
            group("AWS", &[]),
            group("Azure", &[12.5]),
            group("GCP", &[10.0, 11.0, 9.5, 30.0, 10.5]),
        ];
        render_boxplot(&groups, &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[cfg(feature = "plot")]
    #[test]
    fn nothing_to_plot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_boxplot(&[], &dir.path().join("x.png")).is_err());
    }
}
