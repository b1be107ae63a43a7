// In-process metric store
use crate::application::metric_repository::{MetricRepository, SeriesQuery};
use crate::domain::chart::DataPoint;
use crate::domain::metrics::{minute_bucket, MetricSample, Resource, StoredPoint};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

pub const DEFAULT_RETENTION_HOURS: i64 = 6;

/// Each insert drops points older than `retention` before the sample's
/// timestamp, capped at the current time. Metric keys are never dropped.
#[derive(Debug)]
pub struct MemoryRepository {
    retention: Duration,
    points: RwLock<Vec<StoredPoint>>,
    keys: RwLock<BTreeMap<String, BTreeSet<String>>>,
    resources: RwLock<HashMap<String, Resource>>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::with_retention(Duration::hours(DEFAULT_RETENTION_HOURS))
    }
}

impl MemoryRepository {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            retention,
            points: RwLock::new(Vec::new()),
            keys: RwLock::new(BTreeMap::new()),
            resources: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resource(&self, resource_id: &str) -> Option<Resource> {
        self.resources.read().await.get(resource_id).cloned()
    }

    pub async fn point_count(&self) -> usize {
        self.points.read().await.len()
    }
}

#[async_trait]
impl MetricRepository for MemoryRepository {
    async fn register_resource(&self, resource: &Resource) -> Result<()> {
        self.resources
            .write()
            .await
            .insert(resource.resource_id.clone(), resource.clone());
        Ok(())
    }

    async fn insert_sample(&self, sample: &MetricSample) -> Result<()> {
        {
            let mut keys = self.keys.write().await;
            let metrics = keys.entry(sample.resource_id.clone()).or_default();
            metrics.extend(sample.metrics.keys().cloned());
        }

        let horizon = sample.timestamp.min(Utc::now()) - self.retention;
        let mut points = self.points.write().await;
        let before = points.len();
        points.retain(|p| p.timestamp >= horizon);
        if points.len() < before {
            tracing::debug!("Pruned {} points older than {}", before - points.len(), horizon);
        }
        points.extend(sample.points().filter(|p| p.timestamp >= horizon));
        Ok(())
    }

    async fn list_metric_keys(&self) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self
            .keys
            .read()
            .await
            .iter()
            .map(|(resource, metrics)| (resource.clone(), metrics.iter().cloned().collect()))
            .collect())
    }

    async fn query_minute_buckets(&self, query: &SeriesQuery) -> Result<Vec<DataPoint>> {
        let points = self.points.read().await;
        let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for point in points.iter().filter(|p| {
            p.timestamp > query.since
                && query.resource.matches(&p.resource_id)
                && query.metric.matches(&p.metric_key)
        }) {
            buckets
                .entry(minute_bucket(&point.timestamp))
                .or_default()
                .push(point.value);
        }

        Ok(buckets
            .into_iter()
            .filter_map(|(bucket, values)| {
                query
                    .aggregator
                    .apply(&values)
                    .map(|value| DataPoint::new(bucket, value))
            })
            .collect())
    }
}
