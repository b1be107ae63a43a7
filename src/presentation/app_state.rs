// Application state for HTTP handlers
use crate::application::graph_service::GraphService;
use crate::application::ingest_service::IngestService;
use crate::application::trigger_monitor::AlertLog;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ingest_service: IngestService,
    pub graph_service: GraphService,
    pub alert_log: Arc<AlertLog>,
}
