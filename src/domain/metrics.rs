// Metric samples, resources and the query vocabulary used to read them back
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A batch of metric values reported by one resource at one instant.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricSample {
    pub resource_id: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, f64>,
}

/// A monitored resource as announced by its agent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Resource {
    pub resource_id: String,
    #[serde(default, alias = "Tags")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, alias = "Hostname")]
    pub hostname: String,
}

/// A single stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub resource_id: String,
    pub metric_key: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricSample {
    /// Split the sample into one stored point per metric key.
    pub fn points(&self) -> impl Iterator<Item = StoredPoint> + '_ {
        self.metrics.iter().map(move |(key, value)| StoredPoint {
            resource_id: self.resource_id.clone(),
            metric_key: key.clone(),
            timestamp: self.timestamp,
            value: *value,
        })
    }
}

/// Per-bucket aggregation applied when reading a series back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregator {
    #[default]
    Avg,
    Sum,
    Max,
    Min,
}

impl Aggregator {
    /// Parse a query parameter. Missing or unknown names fall back to `avg`.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("sum") => Aggregator::Sum,
            Some("max") => Aggregator::Max,
            Some("min") => Aggregator::Min,
            _ => Aggregator::Avg,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregator::Avg => "avg",
            Aggregator::Sum => "sum",
            Aggregator::Max => "max",
            Aggregator::Min => "min",
        }
    }

    /// Name of the matching InfluxQL function.
    pub fn influx_function(&self) -> &'static str {
        match self {
            Aggregator::Avg => "mean",
            Aggregator::Sum => "sum",
            Aggregator::Max => "max",
            Aggregator::Min => "min",
        }
    }

    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let result = match self {
            Aggregator::Avg => values.iter().sum::<f64>() / values.len() as f64,
            Aggregator::Sum => values.iter().sum(),
            Aggregator::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregator::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        };
        Some(result)
    }
}

/// Truncate a timestamp to the start of its minute, in unix seconds.
pub fn minute_bucket(timestamp: &DateTime<Utc>) -> i64 {
    let secs = timestamp.timestamp();
    secs - secs.rem_euclid(60)
}

/// Identifier pattern where `*` matches any run of characters.
///
/// An empty pattern matches every identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    raw: String,
}

impl WildcardPattern {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn matches_all(&self) -> bool {
        self.raw.is_empty() || self.raw.chars().all(|c| c == '*')
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.matches_all() {
            return true;
        }

        let parts: Vec<&str> = self.raw.split('*').collect();
        if parts.len() == 1 {
            return candidate == self.raw;
        }

        let first = parts[0];
        let last = parts[parts.len() - 1];
        if !candidate.starts_with(first) {
            return false;
        }
        let mut rest = &candidate[first.len()..];
        for middle in &parts[1..parts.len() - 1] {
            match rest.find(middle) {
                Some(idx) => rest = &rest[idx + middle.len()..],
                None => return false,
            }
        }
        rest.len() >= last.len() && rest.ends_with(last)
    }

    /// Anchored regular expression body equivalent to this pattern.
    pub fn to_regex(&self) -> String {
        let mut regex = String::from("^");
        for c in self.raw.chars() {
            match c {
                '*' => regex.push_str(".*"),
                '\\' | '.' | '^' | '$' | '|' | '?' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
                | '/' => {
                    regex.push('\\');
                    regex.push(c);
                }
                _ => regex.push(c),
            }
        }
        regex.push('$');
        regex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_aggregator_from_param() {
        assert_eq!(Aggregator::from_param(None), Aggregator::Avg);
        assert_eq!(Aggregator::from_param(Some("sum")), Aggregator::Sum);
        assert_eq!(Aggregator::from_param(Some("max")), Aggregator::Max);
        assert_eq!(Aggregator::from_param(Some("min")), Aggregator::Min);
        assert_eq!(Aggregator::from_param(Some("median")), Aggregator::Avg);
        assert_eq!(Aggregator::from_param(Some("")), Aggregator::Avg);
    }

    #[test]
    fn test_aggregator_apply() {
        let values = [1.0, 4.0, 2.5];
        assert_eq!(Aggregator::Avg.apply(&values), Some(2.5));
        assert_eq!(Aggregator::Sum.apply(&values), Some(7.5));
        assert_eq!(Aggregator::Max.apply(&values), Some(4.0));
        assert_eq!(Aggregator::Min.apply(&values), Some(1.0));
        assert_eq!(Aggregator::Avg.apply(&[]), None);
    }

    #[test]
    fn test_minute_bucket() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 42).unwrap();
        let bucket = minute_bucket(&ts);
        assert_eq!(bucket % 60, 0);
        assert_eq!(ts.timestamp() - bucket, 42);
    }

    #[test]
    fn test_wildcard_matching() {
        let pattern = WildcardPattern::new("net.if.*.bytes_sent");
        assert!(pattern.matches("net.if.eth0.bytes_sent"));
        assert!(!pattern.matches("net.if.eth0.bytes_recv"));

        assert!(WildcardPattern::new("cpu.*").matches("cpu.user"));
        assert!(WildcardPattern::new("*.user").matches("cpu.user"));
        assert!(WildcardPattern::new("cpu.user").matches("cpu.user"));
        assert!(!WildcardPattern::new("cpu.user").matches("cpu.users"));
        assert!(!WildcardPattern::new("a*a").matches("a"));
        assert!(WildcardPattern::new("").matches("anything"));
        assert!(WildcardPattern::new("*").matches(""));
    }

    #[test]
    fn test_wildcard_to_regex() {
        assert_eq!(WildcardPattern::new("cpu.*").to_regex(), "^cpu\\..*$");
        assert_eq!(WildcardPattern::new("a/b").to_regex(), "^a\\/b$");
    }

    #[test]
    fn test_sample_points() {
        let mut metrics = BTreeMap::new();
        metrics.insert("cpu.user".to_string(), 12.0);
        metrics.insert("cpu.idle".to_string(), 80.0);
        let sample = MetricSample {
            resource_id: "test".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            metrics,
        };

        let points: Vec<StoredPoint> = sample.points().collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].metric_key, "cpu.idle");
        assert_eq!(points[1].value, 12.0);
        assert!(points.iter().all(|p| p.resource_id == "test"));
    }
}
