use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Playback position of one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameTimestamp {
    pub minutes: u64,
    pub seconds: u8,
    pub millis: u16,
}

impl FrameTimestamp {
    /// Split a non-negative seconds value into minutes, seconds and
    /// truncated milliseconds.
    pub fn from_seconds(t: f64) -> Self {
        let whole = t.trunc();
        Self {
            minutes: (t / 60.0).floor() as u64,
            seconds: (t % 60.0).floor() as u8,
            millis: (((t - whole) * 1000.0).floor() as u16).min(999),
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.minutes as f64 * 60.0 + self.seconds as f64 + self.millis as f64 / 1000.0
    }

    /// `MM-SS-mmm`, the form embedded in renamed frame files.
    pub fn file_label(&self) -> String {
        format!("{:02}-{:02}-{:03}", self.minutes, self.seconds, self.millis)
    }
}

impl fmt::Display for FrameTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}.{:03}", self.minutes, self.seconds, self.millis)
    }
}

fn pts_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"pts_time:([0-9.]+)").expect("valid pts_time pattern"))
}

/// Extract the presentation time from one decoder log line.
pub fn parse_pts_time(line: &str) -> Option<f64> {
    let captures = pts_pattern().captures(line)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Timestamps for every parsable line, in the order the decoder emitted them.
/// Lines without a usable `pts_time` are skipped.
pub fn reconstruct<S: AsRef<str>>(lines: &[S]) -> Vec<FrameTimestamp> {
    lines
        .iter()
        .filter_map(|line| {
            let parsed = parse_pts_time(line.as_ref());
            if parsed.is_none() {
                tracing::debug!("Skipping decoder line without pts_time: {}", line.as_ref());
            }
            parsed
        })
        .map(FrameTimestamp::from_seconds)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOWINFO_LINE: &str = "[Parsed_showinfo_2 @ 0x55d5c8] n:  12 pts:  49152 pts_time:3.25    duration:   1 fmt:rgb24";

    #[test]
    fn test_parse_showinfo_line() {
        assert_eq!(parse_pts_time(SHOWINFO_LINE), Some(3.25));
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert_eq!(parse_pts_time("frame=  40 fps=0.0 q=-0.0 size=N/A"), None);
        assert_eq!(parse_pts_time("pts_time:"), None);
        assert_eq!(parse_pts_time("pts_time:1.2.3"), None);
    }

    #[test]
    fn test_from_seconds_splits_components() {
        let ts = FrameTimestamp::from_seconds(125.75);
        assert_eq!(ts.minutes, 2);
        assert_eq!(ts.seconds, 5);
        assert_eq!(ts.millis, 750);
        assert_eq!(ts.file_label(), "02-05-750");
        assert_eq!(ts.to_string(), "02:05.750");
    }

    #[test]
    fn test_reassembly_within_one_millisecond() {
        for i in 0..5000 {
            let t = i as f64 * 0.25 + (i % 7) as f64 * 0.0013;
            let line = format!("[Parsed_showinfo_2 @ 0x1] n:{} pts_time:{} duration:1", i, t);
            let parsed = reconstruct(&[line]);
            assert_eq!(parsed.len(), 1);
            let error = t - parsed[0].as_seconds();
            assert!(error.abs() < 0.001, "t={} error={}", t, error);
        }
    }

    #[test]
    fn test_reconstruct_skips_unparsable_and_keeps_order() {
        let lines = vec![
            "[Parsed_showinfo_2 @ 0x1] n:0 pts:0 pts_time:0 duration:1".to_string(),
            "garbage pts_time:abc".to_string(),
            "[Parsed_showinfo_2 @ 0x1] n:1 pts:1 pts_time:0.25 duration:1".to_string(),
            "[Parsed_showinfo_2 @ 0x1] n:2 pts:2 pts_time:61.5 duration:1".to_string(),
        ];
        let stamps = reconstruct(&lines);
        assert_eq!(stamps.len(), 3);
        assert_eq!(stamps[0], FrameTimestamp::from_seconds(0.0));
        assert_eq!(stamps[1].millis, 250);
        assert_eq!(stamps[2].minutes, 1);
        assert_eq!(stamps[2].seconds, 1);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }
}
