// Trigger monitor - Evaluates alert rules against every ingested sample
use crate::domain::alert::{Alert, TriggerRule};
use crate::domain::metrics::MetricSample;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Bounded history of fired alerts, oldest first.
#[derive(Debug)]
pub struct AlertLog {
    capacity: usize,
    alerts: RwLock<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            alerts: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn push(&self, alert: Alert) {
        if self.capacity == 0 {
            return;
        }
        let mut alerts = self.alerts.write().await;
        while alerts.len() >= self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(alert);
    }

    pub async fn recent(&self) -> Vec<Alert> {
        self.alerts.read().await.iter().cloned().collect()
    }
}

pub struct TriggerMonitor {
    rules: Vec<TriggerRule>,
    log: Arc<AlertLog>,
}

impl TriggerMonitor {
    pub fn new(rules: Vec<TriggerRule>, log: Arc<AlertLog>) -> Self {
        Self { rules, log }
    }

    pub fn evaluate(&self, sample: &MetricSample) -> Vec<Alert> {
        self.rules.iter().filter_map(|r| r.evaluate(sample)).collect()
    }

    /// Consume samples until every sender is dropped.
    pub async fn run(self, mut samples: mpsc::Receiver<MetricSample>) {
        tracing::info!("Trigger monitor started with {} rules", self.rules.len());
        while let Some(sample) = samples.recv().await {
            for alert in self.evaluate(&sample) {
                tracing::warn!(
                    resource_id = %alert.resource_id,
                    metric_key = %alert.metric_key,
                    value = alert.value,
                    timestamp = %alert.timestamp,
                    "Alert triggered"
                );
                self.log.push(alert).await;
            }
        }
        tracing::info!("Trigger monitor stopped");
    }
}
