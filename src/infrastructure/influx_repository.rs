// InfluxDB repository implementation
use crate::application::metric_repository::{MetricRepository, SeriesQuery};
use crate::domain::chart::DataPoint;
use crate::domain::metrics::{MetricSample, Resource};
use crate::infrastructure::config::prepare_query;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const DATAPOINTS_MEASUREMENT: &str = "datapoints";
const RESOURCES_MEASUREMENT: &str = "resources";

const BUCKET_QUERY: &str = "SELECT ${aggregate}(value) FROM datapoints WHERE ${filters}time > '${since}' GROUP BY time(1m) fill(none)";
const METRIC_KEYS_QUERY: &str = "SELECT last(value) FROM datapoints GROUP BY resource_id, metric_key";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

impl InfluxRepository {
    pub fn new(host: String, token: String, database: String, retention_policy: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host, self.database, self.retention_policy, encoded_query
        )
    }

    fn build_write_url(&self) -> String {
        format!(
            "{}/write?db={}&rp={}&precision=s",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy)
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .context("Failed to parse InfluxDB response")?;

        if let Some(result) = data.results.first() {
            if let Some(error) = &result.error {
                anyhow::bail!("InfluxDB query error: {}", error);
            }
        }

        Ok(data)
    }

    async fn execute_write(&self, lines: String) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.build_write_url())
            .header("Authorization", format!("Token {}", self.token))
            .body(lines)
            .send()
            .await
            .context("Failed to send write to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB write failed with status {}: {}", status, body);
        }
        Ok(())
    }

    fn bucket_query(query: &SeriesQuery) -> String {
        let mut filters = String::new();
        if !query.resource.matches_all() {
            filters.push_str(&format!("resource_id =~ /{}/ AND ", query.resource.to_regex()));
        }
        if !query.metric.matches_all() {
            filters.push_str(&format!("metric_key =~ /{}/ AND ", query.metric.to_regex()));
        }

        let mut vars = HashMap::new();
        vars.insert("aggregate".to_string(), query.aggregator.influx_function().to_string());
        vars.insert("filters".to_string(), filters);
        vars.insert(
            "since".to_string(),
            query.since.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        prepare_query(BUCKET_QUERY, &vars)
    }
}

/// Escape a tag key or value for line protocol.
fn escape_tag(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, ',' | '=' | ' ' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_field_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

fn sample_lines(sample: &MetricSample) -> String {
    let timestamp = sample.timestamp.timestamp();
    sample
        .points()
        .map(|p| {
            format!(
                "{},resource_id={},metric_key={} value={} {}",
                DATAPOINTS_MEASUREMENT,
                escape_tag(&p.resource_id),
                escape_tag(&p.metric_key),
                p.value,
                timestamp
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn resource_line(resource: &Resource) -> String {
    let mut line = format!("{},resource_id={}", RESOURCES_MEASUREMENT, escape_tag(&resource.resource_id));
    for (key, value) in &resource.tags {
        if key == "resource_id" || value.is_empty() {
            continue;
        }
        line.push_str(&format!(",{}={}", escape_tag(key), escape_tag(value)));
    }
    line.push_str(&format!(" hostname=\"{}\"", escape_field_string(&resource.hostname)));
    line
}

#[async_trait]
impl MetricRepository for InfluxRepository {
    async fn register_resource(&self, resource: &Resource) -> Result<()> {
        self.execute_write(resource_line(resource)).await
    }

    async fn insert_sample(&self, sample: &MetricSample) -> Result<()> {
        self.execute_write(sample_lines(sample)).await
    }

    async fn list_metric_keys(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let response = self.execute_query(METRIC_KEYS_QUERY).await?;
        let keys = metric_keys(&response);
        tracing::debug!("Found {} resources with metrics", keys.len());
        Ok(keys)
    }

    async fn query_minute_buckets(&self, query: &SeriesQuery) -> Result<Vec<DataPoint>> {
        let influxql = Self::bucket_query(query);
        tracing::debug!("Executing bucket query: {}", influxql);
        let response = self.execute_query(&influxql).await?;
        Ok(bucket_points(&response, query.aggregator.influx_function()))
    }
}

/// Distinct metric keys per resource from a `GROUP BY resource_id, metric_key` result.
fn metric_keys(response: &InfluxQLResponse) -> BTreeMap<String, Vec<String>> {
    let mut keys: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    if let Some(result) = response.results.first() {
        if let Some(series_list) = &result.series {
            for series in series_list {
                let Some(tags) = &series.tags else { continue };
                if let (Some(resource), Some(metric)) = (tags.get("resource_id"), tags.get("metric_key")) {
                    keys.entry(resource.clone()).or_default().insert(metric.clone());
                }
            }
        }
    }

    keys.into_iter()
        .map(|(resource, metrics)| (resource, metrics.into_iter().collect()))
        .collect()
}

/// Rows of `(time, <value_column>)` as points sorted by time. Rows with a
/// null value or an unparseable time are skipped.
fn bucket_points(response: &InfluxQLResponse, value_column: &str) -> Vec<DataPoint> {
    let mut points = Vec::new();
    if let Some(result) = response.results.first() {
        if let Some(series) = &result.series {
            for s in series {
                let time_idx = s.columns.iter().position(|c| c == "time").unwrap_or(0);
                let value_idx = s
                    .columns
                    .iter()
                    .position(|c| c == value_column)
                    .unwrap_or(1);

                for value_row in &s.values {
                    if value_row.len() > time_idx && value_row.len() > value_idx {
                        if let (Some(time_str), Some(value)) = (
                            value_row[time_idx].as_str(),
                            value_row[value_idx].as_f64(),
                        ) {
                            if let Ok(time) = chrono::DateTime::parse_from_rfc3339(time_str) {
                                points.push(DataPoint::new(time.timestamp(), value));
                            }
                        }
                    }
                }
            }
        }
    }

    points.sort_by_key(|p| p.x);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::{Aggregator, WildcardPattern};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sample_lines() {
        let sample = MetricSample {
            resource_id: "web 1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            metrics: [("cpu.user".to_string(), 12.5), ("a=b".to_string(), 1.0)]
                .into_iter()
                .collect(),
        };
        let lines = sample_lines(&sample);
        let ts = sample.timestamp.timestamp();
        assert_eq!(
            lines,
            format!(
                "datapoints,resource_id=web\\ 1,metric_key=a\\=b value=1 {ts}\n\
                 datapoints,resource_id=web\\ 1,metric_key=cpu.user value=12.5 {ts}"
            )
        );
    }

    #[test]
    fn test_resource_line() {
        let resource = Resource {
            resource_id: "web-1".to_string(),
            tags: [("role".to_string(), "front end".to_string())].into_iter().collect(),
            hostname: "web\"1".to_string(),
        };
        assert_eq!(
            resource_line(&resource),
            "resources,resource_id=web-1,role=front\\ end hostname=\"web\\\"1\""
        );
    }

    #[test]
    fn test_bucket_query() {
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        let query = SeriesQuery {
            resource: WildcardPattern::new("web-*"),
            metric: WildcardPattern::new("cpu.user"),
            aggregator: Aggregator::Avg,
            since,
        };
        assert_eq!(
            InfluxRepository::bucket_query(&query),
            "SELECT mean(value) FROM datapoints WHERE resource_id =~ /^web-.*$/ AND metric_key =~ /^cpu\\.user$/ AND time > '2024-05-01T07:00:00Z' GROUP BY time(1m) fill(none)"
        );

        let all = SeriesQuery {
            resource: WildcardPattern::new(""),
            metric: WildcardPattern::new("*"),
            aggregator: Aggregator::Max,
            since,
        };
        assert_eq!(
            InfluxRepository::bucket_query(&all),
            "SELECT max(value) FROM datapoints WHERE time > '2024-05-01T07:00:00Z' GROUP BY time(1m) fill(none)"
        );
    }

    #[test]
    fn test_urls() {
        let repo = InfluxRepository::new(
            "http://influx:8086/".to_string(),
            "t".to_string(),
            "monitor".to_string(),
            "autogen".to_string(),
        );
        assert_eq!(repo.build_write_url(), "http://influx:8086/write?db=monitor&rp=autogen&precision=s");
        assert!(repo.build_query_url("SHOW MEASUREMENTS").ends_with("q=SHOW%20MEASUREMENTS"));
    }

    #[test]
    fn test_bucket_points_from_response() {
        let body = r#"{"results":[{"statement_id":0,"series":[{"name":"datapoints","columns":["time","max"],"values":[
            ["2024-05-01T10:02:00Z",7.5],
            ["2024-05-01T10:00:00Z",3],
            ["2024-05-01T10:01:00Z",null],
            ["not a time",1.0]
        ]}]}]}"#;
        let response: InfluxQLResponse = serde_json::from_str(body).unwrap();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap().timestamp();

        assert_eq!(
            bucket_points(&response, "max"),
            vec![DataPoint::new(base, 3.0), DataPoint::new(base + 120, 7.5)]
        );

        let empty: InfluxQLResponse = serde_json::from_str(r#"{"results":[{"statement_id":0}]}"#).unwrap();
        assert!(bucket_points(&empty, "mean").is_empty());
    }

    #[test]
    fn test_metric_keys_from_response() {
        let body = r#"{"results":[{"series":[
            {"name":"datapoints","tags":{"resource_id":"web-2","metric_key":"cpu.usage"},"columns":["time","last"],"values":[["1970-01-01T00:00:00Z",1]]},
            {"name":"datapoints","tags":{"resource_id":"web-1","metric_key":"mem.used_bytes"},"columns":["time","last"],"values":[["1970-01-01T00:00:00Z",1]]},
            {"name":"datapoints","tags":{"resource_id":"web-1","metric_key":"cpu.usage"},"columns":["time","last"],"values":[["1970-01-01T00:00:00Z",1]]},
            {"name":"datapoints","columns":["time","last"],"values":[]}
        ]}]}"#;
        let response: InfluxQLResponse = serde_json::from_str(body).unwrap();
        let keys = metric_keys(&response);

        assert_eq!(keys.len(), 2);
        assert_eq!(keys["web-1"], vec!["cpu.usage".to_string(), "mem.used_bytes".to_string()]);
        assert_eq!(keys["web-2"], vec!["cpu.usage".to_string()]);
    }
}
