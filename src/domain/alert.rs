// Alert trigger rules
use super::metrics::MetricSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub resource_id: String,
    pub metric_key: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fires when `metric_key` is reported strictly above `above`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriggerRule {
    pub metric_key: String,
    pub above: f64,
}

impl TriggerRule {
    #[cfg(test)]
    pub fn new(metric_key: impl Into<String>, above: f64) -> Self {
        Self {
            metric_key: metric_key.into(),
            above,
        }
    }

    pub fn evaluate(&self, sample: &MetricSample) -> Option<Alert> {
        let value = *sample.metrics.get(&self.metric_key)?;
        if value > self.above {
            Some(Alert {
                resource_id: sample.resource_id.clone(),
                metric_key: self.metric_key.clone(),
                value,
                timestamp: sample.timestamp,
            })
        } else {
            None
        }
    }
}
