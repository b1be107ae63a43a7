// Application layer - Use cases over the repository and chart widgets
pub mod chart_bootstrap;
pub mod graph_service;
pub mod ingest_service;
pub mod metric_repository;
pub mod trigger_monitor;
