// Domain layer - Plain data types and rules with no I/O
pub mod alert;
pub mod chart;
pub mod metrics;
