use anyhow::{Context, Result};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

/// `time=` followed by digits, any one character, digits. Greedy prefix, so the last
/// `time=` on a line wins.
fn rtt_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r".*time=(?P<time>[0-9]*.[0-9]*)").expect("valid RTT regex"))
}

/// Round-trip times from a ping log, in file order.
///
/// Lines without a `time=` sample are skipped; a sample that isn't a number is an error.
pub fn parse_latencies(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut times = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if let Some(caps) = rtt_pattern().captures(&line) {
            let raw = &caps["time"];
            let ms: f64 = raw.trim().parse().with_context(|| {
                format!("{}:{}: bad RTT value {raw:?}", path.display(), idx + 1)
            })?;
            times.push(ms);
        }
    }
    tracing::debug!(path = %path.display(), samples = times.len(), "parsed ping log");
    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn log(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_ping_output() {
        let f = log("PING 1.1.1.1 (1.1.1.1) 56(84) bytes of data.\n\
             64 bytes from 1.1.1.1: icmp_seq=1 ttl=57 time=12.3 ms\n\
             64 bytes from 1.1.1.1: icmp_seq=2 ttl=57 time=9.87 ms\n\
             \n\
             --- 1.1.1.1 ping statistics ---\n\
             64 bytes from 1.1.1.1: icmp_seq=3 ttl=57 time=110.0 ms\n");
        assert_eq!(parse_latencies(f.path()).unwrap(), vec![12.3, 9.87, 110.0]);
    }

    #[test]
    fn whole_millisecond_samples() {
        // The separator slot swallows the space before "ms".
        let f = log("icmp_seq=1 time=12 ms\n");
        assert_eq!(parse_latencies(f.path()).unwrap(), vec![12.0]);
    }

    #[test]
    fn last_occurrence_wins() {
        let f = log("time=1.0 then time=2.5\n");
        assert_eq!(parse_latencies(f.path()).unwrap(), vec![2.5]);
    }

    #[test]
    fn bare_time_key_is_skipped() {
        let f = log("time=\nno sample here\n");
        assert!(parse_latencies(f.path()).unwrap().is_empty());
    }

    #[test]
    fn non_numeric_sample_is_fatal() {
        let f = log("time=1.0 ms\ntime=abc\n");
        let err = parse_latencies(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains(":2: bad RTT value"));
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(parse_latencies(Path::new("/nonexistent/aws_log.txt")).is_err());
    }

    proptest! {
        #[test]
        fn one_value_per_matching_line(
            lines in prop::collection::vec(
                prop_oneof![
                    (0u32..100_000).prop_map(|v| Some(v as f64 / 100.0)),
                    Just(None),
                ],
                0..40,
            )
        ) {
            let contents: String = lines
                .iter()
                .enumerate()
                .map(|(i, l)| match l {
                    Some(v) => format!("64 bytes: icmp_seq={i} ttl=57 time={v:.2} ms\n"),
                    None => format!("Request timeout for icmp_seq {i}\n"),
                })
                .collect();
            let f = log(&contents);
            let parsed = parse_latencies(f.path()).unwrap();
            let expected: Vec<f64> = lines.iter().flatten().copied().collect();
            prop_assert_eq!(parsed.len(), expected.len());
            for (p, e) in parsed.iter().zip(&expected) {
                prop_assert!((p - e).abs() < 1e-9);
            }
        }
    }
}
