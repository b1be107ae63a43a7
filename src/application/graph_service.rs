// Graph service - Use case for turning stored metrics into chart requests
use crate::application::metric_repository::{MetricRepository, SeriesQuery};
use crate::domain::chart::{ChartRequest, DataPoint};
use crate::domain::metrics::{Aggregator, WildcardPattern};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Parameters of one graph page.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRequest {
    /// Empty matches every resource.
    pub resource_id: String,
    pub metric_key: String,
    pub aggregator: Aggregator,
    /// Plot the change between consecutive buckets instead of the values.
    pub change: bool,
}

#[derive(Clone)]
pub struct GraphService {
    repository: Arc<dyn MetricRepository>,
    window: Duration,
}

impl GraphService {
    pub fn new(repository: Arc<dyn MetricRepository>, window_hours: i64) -> Self {
        Self {
            repository,
            window: Duration::hours(window_hours),
        }
    }

    pub async fn metric_index(&self) -> anyhow::Result<BTreeMap<String, Vec<String>>> {
        self.repository.list_metric_keys().await
    }

    pub async fn chart_request(&self, request: &GraphRequest) -> anyhow::Result<ChartRequest> {
        self.chart_request_at(request, Utc::now()).await
    }

    pub async fn chart_request_at(
        &self,
        request: &GraphRequest,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ChartRequest> {
        let query = SeriesQuery {
            resource: WildcardPattern::new(request.resource_id.clone()),
            metric: WildcardPattern::new(request.metric_key.clone()),
            aggregator: request.aggregator,
            since: now - self.window,
        };
        let mut points = self.repository.query_minute_buckets(&query).await?;
        if request.change {
            points = to_changes(points);
        }

        let resource_id = if request.resource_id.is_empty() {
            "*".to_string()
        } else {
            request.resource_id.clone()
        };
        tracing::debug!(
            "Graph {}.{} ({}, change={}): {} points",
            resource_id,
            request.metric_key,
            request.aggregator.as_str(),
            request.change,
            points.len()
        );
        Ok(ChartRequest::new(resource_id, request.metric_key.clone(), points))
    }
}

/// Replace each value with the difference to its successor and drop the last point.
pub fn to_changes(mut points: Vec<DataPoint>) -> Vec<DataPoint> {
    for i in 0..points.len().saturating_sub(1) {
        points[i].y = points[i + 1].y - points[i].y;
    }
    points.pop();
    points
}
