use crate::engine::{build_run_table, PrometheusClient};
use crate::model::{ComparisonReport, CompareConfig, LatencyConfig, Platform, PostHocGrouping};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Port appended to a platform host given without one.
const DEFAULT_PROMETHEUS_PORT: u16 = 9090;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "cloud-perf-stats",
    version,
    about = "Compare network performance across cloud providers"
)]
pub struct Cli {
    /// Log debug diagnostics to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Query Prometheus on every platform and test each metric for differences
    Compare(CompareArgs),
    /// Plot ping round-trip times per provider as a boxplot
    Latency(LatencyArgs),
}

#[derive(Debug, clap::Args, Clone)]
pub struct CompareArgs {
    /// Platform to compare as LABEL=HOST[:PORT] (repeatable, order is kept)
    #[arg(
        long = "platform",
        value_name = "LABEL=HOST[:PORT]",
        value_parser = parse_label_value,
        default_values = ["none=localhost", "yone=localhost"]
    )]
    pub platforms: Vec<(String, String)>,

    /// Prometheus port for hosts given without one
    #[arg(long, default_value_t = DEFAULT_PROMETHEUS_PORT)]
    pub port: u16,

    /// Metric name or selector to test (repeatable, order is kept)
    #[arg(
        long = "metric",
        value_name = "SELECTOR",
        default_values = [
            "network_connection_errors_total",
            r#"network_throughput_bytes_total{direction="upload"}"#,
            r#"network_throughput_bytes_total{direction="download"}"#,
        ]
    )]
    pub metrics: Vec<String>,

    /// Range selector window, e.g. 5m or 1h
    #[arg(long, default_value = "5m", value_parser = parse_timeframe)]
    pub timeframe: String,

    /// Significance threshold for both the ANOVA and the Tukey test
    #[arg(long, default_value_t = 0.05, value_parser = parse_alpha)]
    pub alpha: f64,

    /// Label column the Tukey test groups the metric values by
    #[arg(long, value_enum, default_value_t = PostHocGrouping::FullTable)]
    pub posthoc_grouping: PostHocGrouping,

    /// Print the JSON report on stdout (the narrative moves to stderr)
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, clap::Args, Clone)]
pub struct LatencyArgs {
    /// Ping log as LABEL=PATH (repeatable, one box per log in this order)
    #[arg(
        long = "log",
        value_name = "LABEL=PATH",
        value_parser = parse_label_value,
        default_values = ["AWS=aws_log.txt", "Azure=azure_log.txt", "GCP=gcp_log.txt"]
    )]
    pub logs: Vec<(String, String)>,

    /// Output PNG path
    #[arg(long, short, default_value = "boxplot.png")]
    pub output: PathBuf,
}

fn parse_label_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((label, value)) if !label.is_empty() && !value.is_empty() => {
            Ok((label.to_string(), value.to_string()))
        }
        _ => Err(format!("expected LABEL=VALUE, got {s:?}")),
    }
}

/// Prometheus duration syntax: unit-suffixed integers, largest unit first, no spaces.
fn prometheus_duration() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+(ms|s|m|h|d|w|y))+$").expect("static regex"))
}

fn parse_timeframe(s: &str) -> Result<String, String> {
    if !prometheus_duration().is_match(s) {
        return Err(format!(
            "invalid timeframe {s:?}: expected a Prometheus duration such as 5m or 1h30m"
        ));
    }
    humantime::parse_duration(s)
        .map(|_| s.to_string())
        .map_err(|e| format!("invalid timeframe {s:?}: {e}"))
}

fn parse_alpha(s: &str) -> Result<f64, String> {
    let alpha: f64 = s.parse().map_err(|e| format!("invalid alpha {s:?}: {e}"))?;
    if alpha > 0.0 && alpha < 1.0 {
        Ok(alpha)
    } else {
        Err(format!("alpha must lie strictly between 0 and 1, got {alpha}"))
    }
}

/// `host` if it already ends in `:PORT`, else `host:port`. IPv6 literals must be
/// bracketed to carry a port; a bare one is bracketed here.
fn endpoint_for(host: &str, port: u16) -> String {
    let has_port = |rest: &str| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit());
    if host.starts_with('[') {
        match host.rsplit_once("]:") {
            Some((_, p)) if has_port(p) => host.to_string(),
            _ => format!("{host}:{port}"),
        }
    } else if host.matches(':').count() > 1 {
        format!("[{host}]:{port}")
    } else {
        match host.rsplit_once(':') {
            Some((_, p)) if has_port(p) => host.to_string(),
            _ => format!("{}:{port}", host.trim_end_matches(':')),
        }
    }
}

/// Build a `CompareConfig` from CLI arguments.
pub fn build_compare_config(args: &CompareArgs) -> CompareConfig {
    CompareConfig {
        platforms: args
            .platforms
            .iter()
            .map(|(label, host)| Platform {
                label: label.clone(),
                endpoint: endpoint_for(host, args.port),
            })
            .collect(),
        metrics: args.metrics.clone(),
        timeframe: args.timeframe.clone(),
        alpha: args.alpha,
        grouping: args.posthoc_grouping,
    }
}

/// Build a `LatencyConfig` from CLI arguments.
pub fn build_latency_config(args: &LatencyArgs) -> LatencyConfig {
    LatencyConfig {
        logs: args
            .logs
            .iter()
            .map(|(label, path)| (label.clone(), PathBuf::from(path)))
            .collect(),
        output: args.output.clone(),
    }
}

pub fn run(args: Cli) -> Result<()> {
    match args.command {
        Command::Compare(a) => run_compare(&a),
        Command::Latency(a) => run_latency(&a),
    }
}

fn run_compare(args: &CompareArgs) -> Result<()> {
    let cfg = build_compare_config(args);
    let client = PrometheusClient::new()?;
    let table = build_run_table(&client, &cfg.metrics, &cfg.timeframe, &cfg.platforms)?;

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let mut narrative: Box<dyn Write> = if args.json {
        Box::new(stderr.lock())
    } else {
        Box::new(stdout.lock())
    };
    let verdicts = crate::comparator::evaluate(
        &table,
        &cfg.metrics,
        cfg.alpha,
        cfg.grouping,
        &mut narrative,
    )?;

    let report = ComparisonReport {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        timeframe: cfg.timeframe.clone(),
        alpha: cfg.alpha,
        grouping: cfg.grouping,
        platforms: cfg.platforms.clone(),
        rows: table.len(),
        verdicts,
    };

    if args.json {
        drop(narrative);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let summary = crate::text_summary::build_verdict_summary(&report.verdicts);
        for line in summary.lines {
            writeln!(narrative, "{line}")?;
        }
        narrative.flush()?;
    }

    handle_exports(args, &report)
}

fn run_latency(args: &LatencyArgs) -> Result<()> {
    let cfg = build_latency_config(args);
    let groups = crate::latency::load_groups(&cfg.logs)?;
    crate::latency::render_boxplot(&groups, &cfg.output)?;

    let summary = crate::text_summary::build_latency_summary(&groups);
    for line in summary.lines {
        println!("{line}");
    }
    eprintln!("Saved: {}", cfg.output.display());
    Ok(())
}

/// Handle export operations for the comparison report.
fn handle_exports(args: &CompareArgs, report: &ComparisonReport) -> Result<()> {
    if let Some(p) = args.export_json.as_deref() {
        let out = serde_json::to_string_pretty(report)?;
        std::fs::write(p, out).with_context(|| format!("write {}", p.display()))?;
        eprintln!("Exported JSON: {}", p.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cloud-perf-stats").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn compare_defaults_match_the_stock_setup() {
        let Command::Compare(args) = parse(&["compare"]).command else {
            panic!("expected compare");
        };
        let cfg = build_compare_config(&args);
        assert_eq!(
            cfg.platforms,
            vec![
                Platform {
                    label: "none".into(),
                    endpoint: "localhost:9090".into()
                },
                Platform {
                    label: "yone".into(),
                    endpoint: "localhost:9090".into()
                },
            ]
        );
        assert_eq!(cfg.metrics.len(), 3);
        assert_eq!(
            cfg.metrics[1],
            r#"network_throughput_bytes_total{direction="upload"}"#
        );
        assert_eq!(cfg.timeframe, "5m");
        assert_eq!(cfg.alpha, 0.05);
        assert_eq!(cfg.grouping, PostHocGrouping::FullTable);
    }

    #[test]
    fn explicit_platforms_replace_defaults() {
        let Command::Compare(args) = parse(&[
            "compare",
            "--platform",
            "AWS=10.0.0.1",
            "--platform",
            "GCP=10.0.0.2:19090",
            "--port",
            "9091",
        ])
        .command
        else {
            panic!("expected compare");
        };
        let cfg = build_compare_config(&args);
        let endpoints: Vec<&str> = cfg.platforms.iter().map(|p| p.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["10.0.0.1:9091", "10.0.0.2:19090"]);
    }

    #[test]
    fn bad_values_are_rejected() {
        let bad = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("cloud-perf-stats").chain(args.iter().copied()))
                .is_err()
        };
        assert!(bad(&["compare", "--alpha", "0"]));
        assert!(bad(&["compare", "--alpha", "1.5"]));
        assert!(bad(&["compare", "--timeframe", "five minutes"]));
        assert!(bad(&["compare", "--timeframe", "5min"]));
        assert!(bad(&["compare", "--timeframe", "1h 30m"]));
        assert!(bad(&["compare", "--timeframe", "2 days"]));
        assert!(bad(&["compare", "--platform", "no-label"]));
        assert!(bad(&["latency", "--log", "=aws_log.txt"]));
    }

    #[test]
    fn prometheus_durations_are_accepted() {
        for tf in ["30s", "5m", "1h30m", "2d", "1w", "500ms"] {
            assert_eq!(parse_timeframe(tf).as_deref(), Ok(tf), "{tf}");
        }
    }

    #[test]
    fn endpoints_keep_explicit_ports_and_bracket_ipv6() {
        assert_eq!(endpoint_for("localhost", 9090), "localhost:9090");
        assert_eq!(endpoint_for("10.0.0.2:19090", 9090), "10.0.0.2:19090");
        assert_eq!(endpoint_for("::1", 9090), "[::1]:9090");
        assert_eq!(endpoint_for("fe80::2", 9091), "[fe80::2]:9091");
        assert_eq!(endpoint_for("[::1]", 9090), "[::1]:9090");
        assert_eq!(endpoint_for("[::1]:19090", 9090), "[::1]:19090");
    }

    #[test]
    fn latency_defaults() {
        let Command::Latency(args) = parse(&["latency"]).command else {
            panic!("expected latency");
        };
        let cfg = build_latency_config(&args);
        let labels: Vec<&str> = cfg.logs.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["AWS", "Azure", "GCP"]);
        assert_eq!(cfg.logs[0].1, PathBuf::from("aws_log.txt"));
        assert_eq!(cfg.output, PathBuf::from("boxplot.png"));
    }
}
