// HTTP request handlers
use crate::application::graph_service::GraphRequest;
use crate::domain::alert::Alert;
use crate::domain::metrics::{Aggregator, MetricSample, Resource};
use crate::infrastructure::http_response::{accepts_brotli, encoded_response, HTML, JAVASCRIPT};
use crate::infrastructure::pages::{render_graph, render_index, GRAPH_JS};
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
    pub resource_id: Option<String>,
    pub metric_key: Option<String>,
    pub aggregator: Option<String>,
    pub change: Option<String>,
}

/// Accepts the usual spellings of true; anything else is false.
fn parse_bool_flag(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "t" | "T" | "TRUE" | "true" | "True"))
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::BadRequest("Could not parse JSON".to_string())
    })
}

async fn html_response(html: String, headers: &HeaderMap) -> Response {
    match encoded_response(html.into_bytes(), HTML, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Announce a resource and its tags
pub async fn register_resource(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let resource: Resource = parse_json(&body)?;
    state.ingest_service.register_resource(resource).await?;
    Ok(StatusCode::OK)
}

/// Store one sample of metrics from an agent
pub async fn ingest_metrics(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let sample: MetricSample = parse_json(&body)?;
    state.ingest_service.ingest(sample).await?;
    Ok(StatusCode::OK)
}

/// List every resource with links to its graphs
pub async fn index(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let metrics = state.graph_service.metric_index().await?;
    Ok(html_response(render_index(&metrics), &headers).await)
}

/// Render the chart page for one resource and metric
pub async fn graph(
    headers: HeaderMap,
    Query(params): Query<GraphParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let metric_key = params
        .metric_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::BadRequest("metric_key is required".to_string()))?;

    let request = GraphRequest {
        resource_id: params.resource_id.unwrap_or_default(),
        metric_key,
        aggregator: Aggregator::from_param(params.aggregator.as_deref()),
        change: parse_bool_flag(params.change.as_deref()),
    };
    let chart = state.graph_service.chart_request(&request).await?;
    let html = render_graph(&request, chart)?;
    Ok(html_response(html, &headers).await)
}

/// Recently fired alerts, oldest first
pub async fn alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    Json(state.alert_log.recent().await)
}

pub async fn graph_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, JAVASCRIPT)], GRAPH_JS)
}
