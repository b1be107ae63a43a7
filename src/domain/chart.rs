// Chart request domain model
use serde::Serialize;

/// Fixed chart dimensions in pixels.
pub const CHART_WIDTH: u32 = 960;
pub const CHART_HEIGHT: u32 = 500;

/// Stroke color of the single metric series.
pub const SERIES_COLOR: &str = "#c05020";

const SERIES_NAME_SEPARATOR: char = '.';

/// One plotted sample: `x` is a unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub x: i64,
    pub y: f64,
}

impl DataPoint {
    pub fn new(x: i64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Everything needed to draw one metric chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub resource_id: String,
    pub metric_key: String,
    pub data_points: Vec<DataPoint>,
}

impl ChartRequest {
    pub fn new(resource_id: String, metric_key: String, data_points: Vec<DataPoint>) -> Self {
        Self {
            resource_id,
            metric_key,
            data_points,
        }
    }

    /// Name of the derived series, e.g. `host-42.cpu.load`.
    pub fn series_name(&self) -> String {
        let mut name = String::with_capacity(self.resource_id.len() + self.metric_key.len() + 1);
        name.push_str(&self.resource_id);
        name.push(SERIES_NAME_SEPARATOR);
        name.push_str(&self.metric_key);
        name
    }
}
