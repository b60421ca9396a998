//! Synthetic payload construction
//!
//! Payloads are filler: the target never checks the values, only the wire
//! shape matters. Each logical connection renders into a single buffer that
//! is sized up front, and the pseudo-random value is drawn once per
//! connection and shared by every point of that connection.

use std::fmt::Write as _;

/// Newline-terminated plaintext lines for one logical connection.
///
/// Each point renders as `"{prefix}{connection}.metric{point} {value} {timestamp}\n"`
/// with `value` a pseudo-random float in `[0, 1)`.
pub fn lines(prefix: &str, connection_index: u64, points: u64, timestamp: i64) -> Vec<u8> {
    let value: f64 = rand::random();
    let base = format!("{prefix}{connection_index}.metric");
    let tail = format!(" {value} {timestamp}\n");

    // base + point index (at most 20 digits) + tail, per point
    let mut buf = String::with_capacity((base.len() + 20 + tail.len()) * points as usize);
    for point in 0..points {
        let _ = write!(buf, "{base}{point}{tail}");
    }
    buf.into_bytes()
}

/// GET path for one query-style request.
///
/// The timestamp doubles as a cache-buster; the target metric is offset by
/// the point index plus the connection index.
pub fn query(prefix: &str, connection_index: u64, point_index: u64, timestamp: i64) -> String {
    let offset = connection_index + point_index;
    format!("/render?_ts={timestamp}&target={prefix}{offset}.metric")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_lines(buf: &[u8]) -> Vec<String> {
        String::from_utf8(buf.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_lines_one_per_point() {
        let buf = lines("perf.test", 3, 5, 1_700_000_000);
        assert_eq!(split_lines(&buf).len(), 5);
        assert_eq!(buf.last(), Some(&b'\n'));
    }

    #[test]
    fn test_line_shape() {
        let buf = lines("perf.test", 3, 1, 1_700_000_000);
        let line = &split_lines(&buf)[0];
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], "perf.test3.metric0");
        let value: f64 = fields[1].parse().unwrap();
        assert!((0.0..1.0).contains(&value));
        assert_eq!(fields[2], "1700000000");
    }

    #[test]
    fn test_points_share_value_and_timestamp() {
        let buf = lines("perf.test", 0, 4, 1_700_000_000);
        let lines = split_lines(&buf);
        let tail = |line: &str| line.splitn(2, ' ').nth(1).map(str::to_string);
        let first = tail(&lines[0]);
        assert!(lines.iter().all(|line| tail(line) == first));
    }

    #[test]
    fn test_point_indexes_increment() {
        let buf = lines("p.", 1, 3, 0);
        let lines = split_lines(&buf);
        assert!(lines[0].starts_with("p.1.metric0 "));
        assert!(lines[1].starts_with("p.1.metric1 "));
        assert!(lines[2].starts_with("p.1.metric2 "));
    }

    #[test]
    fn test_zero_points_is_empty() {
        assert!(lines("p.", 0, 0, 0).is_empty());
    }

    #[test]
    fn test_query_offsets_metric_by_point_and_connection() {
        let path = query("perf.test", 7, 3, 1_700_000_000);
        assert_eq!(path, "/render?_ts=1700000000&target=perf.test10.metric");
    }
}
