// Infrastructure layer - External dependencies and adapters
pub mod chart;
pub mod config;
pub mod http_response;
pub mod influx_repository;
pub mod memory_repository;
pub mod pages;
