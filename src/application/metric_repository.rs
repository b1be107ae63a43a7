// Repository trait for metric storage
use crate::domain::chart::DataPoint;
use crate::domain::metrics::{Aggregator, MetricSample, Resource, WildcardPattern};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Minute-bucketed read of every series matching both patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub resource: WildcardPattern,
    pub metric: WildcardPattern,
    pub aggregator: Aggregator,
    /// Only points strictly after this instant are read.
    pub since: DateTime<Utc>,
}

#[async_trait]
pub trait MetricRepository: Send + Sync {
    /// Record a resource announcement
    async fn register_resource(&self, resource: &Resource) -> anyhow::Result<()>;

    /// Store one point per metric in the sample
    async fn insert_sample(&self, sample: &MetricSample) -> anyhow::Result<()>;

    /// Distinct metric keys per resource, both sorted ascending
    async fn list_metric_keys(&self) -> anyhow::Result<BTreeMap<String, Vec<String>>>;

    /// Aggregate matching points per minute, ascending by time
    async fn query_minute_buckets(&self, query: &SeriesQuery) -> anyhow::Result<Vec<DataPoint>>;
}
