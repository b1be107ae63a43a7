// Pointer-hover readout attached to a graph
use super::document::{ChartId, Document, Element, EventKind, Listener};
use super::error::ChartError;
use super::graph::Graph;
use crate::domain::chart::DataPoint;
use chrono::DateTime;
use serde::Serialize;

/// Value shown for one series at the hovered position.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverReadout {
    pub series: String,
    pub x: i64,
    pub y: f64,
}

impl HoverReadout {
    pub fn label(&self) -> String {
        format!("{}: {}", self.series, format_value(self.y))
    }
}

#[derive(Serialize)]
struct HoverSeries<'a> {
    name: &'a str,
    color: String,
    data: &'a [DataPoint],
}

#[derive(Debug, Clone)]
pub struct HoverDetail {
    chart: ChartId,
    element: String,
}

const DETAIL_CLASS: &str = "detail";
const INACTIVE_CLASS: &str = "inactive";
const X_MIN_ATTR: &str = "data-x-min";
const X_MAX_ATTR: &str = "data-x-max";

impl HoverDetail {
    pub fn new(graph: &Graph, document: &mut Document) -> Result<Self, ChartError> {
        let chart = graph.chart();
        let (x_lo, x_hi) = graph.x_domain();
        let payload: Vec<HoverSeries<'_>> = graph
            .series()
            .iter()
            .map(|s| HoverSeries {
                name: &s.name,
                color: s.color.to_hex(),
                data: &s.data,
            })
            .collect();
        let payload = serde_json::to_string(&payload)
            .map_err(|e| ChartError::DelegatedRender(format!("hover data: {}", e)))?;

        let detail = Element::new("div")
            .with_class(format!("{} {}", DETAIL_CLASS, INACTIVE_CLASS))
            .with_attr("data-points", payload)
            .with_attr(X_MIN_ATTR, x_lo.to_string())
            .with_attr(X_MAX_ATTR, x_hi.to_string())
            .with_attr("data-width", graph.width().to_string())
            .owned_by(chart);

        let element = graph.element().to_string();
        document.require_element_mut(&element)?.append(detail);
        for kind in [EventKind::MouseMove, EventKind::MouseOut] {
            document.add_event_listener(Listener {
                owner: chart,
                element_id: element.clone(),
                kind,
                series: None,
            });
        }

        Ok(Self { chart, element })
    }

    /// Show the nearest point of every enabled series to the pixel offset.
    pub fn update(
        &self,
        graph: &Graph,
        document: &mut Document,
        offset_x: f64,
    ) -> Result<Vec<HoverReadout>, ChartError> {
        let px = offset_x.clamp(0.0, graph.width() as f64);
        let target = graph.pixel_to_x(px);

        let readouts: Vec<HoverReadout> = graph
            .enabled_series()
            .filter_map(|(_, series)| {
                series
                    .data
                    .iter()
                    .min_by(|a, b| {
                        let da = (a.x as f64 - target).abs();
                        let db = (b.x as f64 - target).abs();
                        da.total_cmp(&db)
                    })
                    .map(|p| HoverReadout {
                        series: series.name.clone(),
                        x: p.x,
                        y: p.y,
                    })
            })
            .collect();

        let detail = self.detail_mut(document)?;
        detail.children.clear();
        match readouts.first() {
            Some(first) => {
                detail.remove_class(INACTIVE_CLASS);
                detail.append(
                    Element::new("div")
                        .with_class("x_label")
                        .with_text(format_time(first.x)),
                );
                for readout in &readouts {
                    detail.append(Element::new("div").with_class("item").with_text(readout.label()));
                }
            }
            None => detail.add_class(INACTIVE_CLASS),
        }

        Ok(readouts)
    }

    /// Rewrite the x range the browser maps pointer offsets through.
    pub fn refresh_range(&self, graph: &Graph, document: &mut Document) -> Result<(), ChartError> {
        let (x_lo, x_hi) = graph.x_domain();
        let detail = self.detail_mut(document)?;
        detail.set_attr(X_MIN_ATTR, x_lo.to_string());
        detail.set_attr(X_MAX_ATTR, x_hi.to_string());
        Ok(())
    }

    pub fn clear(&self, document: &mut Document) -> Result<(), ChartError> {
        let detail = self.detail_mut(document)?;
        detail.children.clear();
        detail.add_class(INACTIVE_CLASS);
        Ok(())
    }

    fn detail_mut<'a>(&self, document: &'a mut Document) -> Result<&'a mut Element, ChartError> {
        let chart = self.chart;
        let container = document.require_element_mut(&self.element)?;
        container
            .child_elements_mut()
            .find(|e| e.is_owned_by(chart) && e.has_class(DETAIL_CLASS))
            .ok_or_else(|| ChartError::MissingElement {
                id: format!("{} .{}", self.element, DETAIL_CLASS),
            })
    }
}

/// Two decimal places with trailing zeros dropped.
fn format_value(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn format_time(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(ts) => ts.format("%a, %d %b %Y %H:%M:%S UTC").to_string(),
        None => secs.to_string(),
    }
}
