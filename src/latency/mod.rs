//! Ping round-trip times per cloud provider: log parsing and boxplot rendering.

mod parse;
mod plot;

pub use parse::parse_latencies;
pub use plot::render_boxplot;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// RTT samples (ms) for one provider, in log order.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyGroup {
    pub label: String,
    pub samples: Vec<f64>,
}

/// Parse every `(label, path)` log, keeping the given order.
pub fn load_groups(logs: &[(String, PathBuf)]) -> Result<Vec<LatencyGroup>> {
    logs.iter()
        .map(|(label, path)| {
            let samples = parse_latencies(path)
                .with_context(|| format!("load RTT samples for {label}"))?;
            Ok(LatencyGroup {
                label: label.clone(),
                samples,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let aws = dir.path().join("aws_log.txt");
        let gcp = dir.path().join("gcp_log.txt");
        std::fs::write(&aws, "time=1.5 ms\n").unwrap();
        std::fs::write(&gcp, "time=2.5 ms\ntime=3.5 ms\n").unwrap();

        let groups = load_groups(&[("GCP".into(), gcp), ("AWS".into(), aws)]).unwrap();
        assert_eq!(groups[0].label, "GCP");
        assert_eq!(groups[0].samples, vec![2.5, 3.5]);
        assert_eq!(groups[1].samples, vec![1.5]);
    }

    #[test]
    fn a_missing_log_names_its_provider() {
        let err = load_groups(&[("Azure".into(), PathBuf::from("/nonexistent/azure_log.txt"))])
            .unwrap_err();
        assert!(format!("{err:#}").contains("Azure"));
    }
}
