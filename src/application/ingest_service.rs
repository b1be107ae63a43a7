// Ingest service - Use case for accepting resource announcements and metric samples
use crate::application::metric_repository::MetricRepository;
use crate::domain::metrics::{MetricSample, Resource};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct IngestService {
    repository: Arc<dyn MetricRepository>,
    triggers: mpsc::Sender<MetricSample>,
}

impl IngestService {
    pub fn new(repository: Arc<dyn MetricRepository>, triggers: mpsc::Sender<MetricSample>) -> Self {
        Self {
            repository,
            triggers,
        }
    }

    pub async fn register_resource(&self, resource: Resource) -> anyhow::Result<()> {
        tracing::info!(
            "Resource {} registered (hostname {:?}, {} tags)",
            resource.resource_id,
            resource.hostname,
            resource.tags.len()
        );
        self.repository.register_resource(&resource).await
    }

    /// Hand the sample to the trigger monitor, then store it.
    pub async fn ingest(&self, sample: MetricSample) -> anyhow::Result<()> {
        if self.triggers.send(sample.clone()).await.is_err() {
            tracing::warn!("Trigger monitor is not running; sample from {} not evaluated", sample.resource_id);
        }
        self.repository.insert_sample(&sample).await?;
        tracing::debug!(
            "Stored {} metrics for {}",
            sample.metrics.len(),
            sample.resource_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_repository::MemoryRepository;
    use chrono::Utc;

    #[tokio::test]
    async fn test_ingest_stores_and_forwards() {
        let repo = Arc::new(MemoryRepository::new());
        let (tx, mut rx) = mpsc::channel(4);
        let service = IngestService::new(repo.clone(), tx);

        let sample = MetricSample {
            resource_id: "web-1".to_string(),
            timestamp: Utc::now(),
            metrics: [("cpu.user".to_string(), 1.0), ("cpu.idle".to_string(), 99.0)]
                .into_iter()
                .collect(),
        };
        service.ingest(sample.clone()).await.unwrap();

        assert_eq!(rx.recv().await, Some(sample));
        assert_eq!(repo.point_count().await, 2);
    }

    #[tokio::test]
    async fn test_ingest_without_monitor_still_stores() {
        let repo = Arc::new(MemoryRepository::new());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let service = IngestService::new(repo.clone(), tx);

        let sample = MetricSample {
            resource_id: "web-1".to_string(),
            timestamp: Utc::now(),
            metrics: [("cpu.user".to_string(), 1.0)].into_iter().collect(),
        };
        service.ingest(sample).await.unwrap();
        assert_eq!(repo.point_count().await, 1);
    }
}
