// Time-labelled x axis
use super::document::{ChartId, Document, Element, Node};
use super::error::ChartError;
use super::graph::Graph;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Fixed,
    Month,
    Year,
    Decade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimeUnit {
    name: &'static str,
    seconds: i64,
    format: &'static str,
    boundary: Boundary,
}

// Largest first.
const UNITS: [TimeUnit; 11] = [
    TimeUnit { name: "decade", seconds: 315_360_000, format: "%Y", boundary: Boundary::Decade },
    TimeUnit { name: "year", seconds: 31_536_000, format: "%Y", boundary: Boundary::Year },
    TimeUnit { name: "month", seconds: 2_635_200, format: "%b", boundary: Boundary::Month },
    TimeUnit { name: "week", seconds: 604_800, format: "%b %-d", boundary: Boundary::Fixed },
    TimeUnit { name: "day", seconds: 86_400, format: "%b %-d", boundary: Boundary::Fixed },
    TimeUnit { name: "6 hour", seconds: 21_600, format: "%H:00", boundary: Boundary::Fixed },
    TimeUnit { name: "hour", seconds: 3_600, format: "%H:00", boundary: Boundary::Fixed },
    TimeUnit { name: "15 minute", seconds: 900, format: "%H:%M", boundary: Boundary::Fixed },
    TimeUnit { name: "minute", seconds: 60, format: "%H:%M", boundary: Boundary::Fixed },
    TimeUnit { name: "15 second", seconds: 15, format: "%H:%M:%S", boundary: Boundary::Fixed },
    TimeUnit { name: "second", seconds: 1, format: "%H:%M:%S", boundary: Boundary::Fixed },
];

impl TimeUnit {
    /// Smallest unit boundary at or after `t` (unix seconds, UTC).
    fn ceil(&self, t: i64) -> i64 {
        let calendar = DateTime::from_timestamp(t, 0).and_then(|ts| match self.boundary {
            Boundary::Fixed => None,
            Boundary::Month => ceil_month(&ts),
            Boundary::Year => ceil_year(&ts, 1),
            Boundary::Decade => ceil_year(&ts, 10),
        });
        calendar.unwrap_or_else(|| {
            let rem = t.rem_euclid(self.seconds);
            if rem == 0 { t } else { t - rem + self.seconds }
        })
    }

    fn label(&self, t: i64) -> String {
        match DateTime::from_timestamp(t, 0) {
            Some(ts) => ts.format(self.format).to_string(),
            None => t.to_string(),
        }
    }
}

fn start_of_day_is(ts: &DateTime<Utc>) -> bool {
    ts.num_seconds_from_midnight() == 0
}

fn timestamp_of(year: i32, month: u32) -> Option<i64> {
    Some(
        NaiveDate::from_ymd_opt(year, month, 1)?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
            .timestamp(),
    )
}

fn ceil_month(ts: &DateTime<Utc>) -> Option<i64> {
    if ts.day() == 1 && start_of_day_is(ts) {
        return Some(ts.timestamp());
    }
    let (year, month) = if ts.month() == 12 {
        (ts.year() + 1, 1)
    } else {
        (ts.year(), ts.month() + 1)
    };
    timestamp_of(year, month)
}

fn ceil_year(ts: &DateTime<Utc>, step: i32) -> Option<i64> {
    let year = ts.year();
    let on_boundary = year.rem_euclid(step) == 0 && ts.ordinal() == 1 && start_of_day_is(ts);
    if on_boundary {
        return Some(ts.timestamp());
    }
    let next = year - year.rem_euclid(step) + step;
    timestamp_of(next, 1)
}

fn appropriate_unit(range_seconds: f64) -> TimeUnit {
    UNITS
        .iter()
        .copied()
        .find(|u| (range_seconds / u.seconds as f64).floor() >= 2.0)
        .unwrap_or(UNITS[UNITS.len() - 1])
}

/// Upper bound on marks drawn for one axis.
const MAX_TICKS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: i64,
    pub unit: &'static str,
    pub label: String,
    pub offset_px: f64,
}

#[derive(Debug, Clone)]
pub struct TimeAxis {
    chart: ChartId,
    element: String,
    ticks: Vec<Tick>,
}

impl TimeAxis {
    /// Bind an axis to the graph. Ticks appear on [`TimeAxis::render`].
    pub fn new(graph: &Graph) -> Self {
        Self {
            chart: graph.chart(),
            element: graph.element().to_string(),
            ticks: Vec::new(),
        }
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn tick_offsets(graph: &Graph) -> Vec<Tick> {
        let (lo, hi) = graph.x_domain();
        let unit = appropriate_unit(hi - lo);
        let count = ((hi - lo) / unit.seconds as f64).ceil().clamp(1.0, MAX_TICKS as f64) as usize;
        let step = (unit.seconds / 2).max(1);

        let mut ticks: Vec<Tick> = Vec::new();
        let mut running = lo.ceil() as i64;
        for _ in 0..count {
            let value = unit.ceil(running);
            if value as f64 > hi {
                break;
            }
            running = value + step;
            if ticks.last().is_some_and(|t| t.value == value) {
                continue;
            }
            ticks.push(Tick {
                value,
                unit: unit.name,
                label: unit.label(value),
                offset_px: graph.x_to_pixel(value as f64),
            });
        }
        ticks
    }

    /// Replace this axis' tick marks in the graph element.
    pub fn render(&mut self, graph: &Graph, document: &mut Document) -> Result<(), ChartError> {
        let ticks = Self::tick_offsets(graph);
        let chart = self.chart;
        let container = document.require_element_mut(&self.element)?;
        container.children.retain(|n| match n {
            Node::Element(e) => !(e.is_owned_by(chart) && e.has_class("x_tick")),
            _ => true,
        });

        for tick in &ticks {
            container.append(
                Element::new("div")
                    .with_class(format!("x_tick {}", tick.unit.replace(' ', "_")))
                    .with_attr("style", format!("left: {:.1}px", tick.offset_px))
                    .with_attr("data-time", tick.value.to_string())
                    .owned_by(chart)
                    .with_child(Element::new("div").with_class("title").with_text(tick.label.clone())),
            );
        }

        tracing::debug!("Chart {} axis rendered {} ticks", chart, ticks.len());
        self.ticks = ticks;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::DataPoint;
    use crate::infrastructure::chart::graph::{Color, GraphOptions, Interpolation, Renderer, Series};
    use chrono::TimeZone;

    fn graph_over(doc: &mut Document, data: Vec<DataPoint>) -> Graph {
        let chart = doc.allocate_chart_id();
        let options = GraphOptions {
            element: "chart".to_string(),
            width: 960,
            height: 500,
            renderer: Renderer::Line,
            interpolation: Interpolation::Linear,
            series: vec![Series::new("r.m".to_string(), Color { r: 1, g: 2, b: 3 }, data)],
        };
        Graph::new(chart, options, doc).unwrap()
    }

    fn doc() -> Document {
        Document::from_body(Element::new("body").with_child(Element::new("div").with_id("chart")))
    }

    #[test]
    fn test_appropriate_unit() {
        assert_eq!(appropriate_unit(60.0).name, "15 second");
        assert_eq!(appropriate_unit(3.0 * 3600.0).name, "hour");
        assert_eq!(appropriate_unit(7_199.0).name, "15 minute");
        assert_eq!(appropriate_unit(30.0 * 86_400.0).name, "week");
        assert_eq!(appropriate_unit(1.0).name, "second");
    }

    #[test]
    fn test_calendar_ceil() {
        let month = UNITS[2];
        let mid_march = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap().timestamp();
        let april = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap().timestamp();
        assert_eq!(month.ceil(mid_march), april);
        assert_eq!(month.ceil(april), april);

        let december = Utc.with_ymd_and_hms(2023, 12, 2, 0, 0, 0).unwrap().timestamp();
        let new_year = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp();
        assert_eq!(month.ceil(december), new_year);
        assert_eq!(UNITS[1].ceil(december), new_year);

        let decade = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap().timestamp();
        assert_eq!(UNITS[0].ceil(december), decade);

        let minute = UNITS[8];
        assert_eq!(minute.ceil(61), 120);
        assert_eq!(minute.ceil(120), 120);
        assert_eq!(minute.ceil(-30), 0);
    }

    #[test]
    fn test_ticks_for_one_minute() {
        let mut doc = doc();
        let graph = graph_over(&mut doc, vec![DataPoint::new(0, 1.0), DataPoint::new(60, 2.5)]);
        let ticks = TimeAxis::tick_offsets(&graph);
        let values: Vec<i64> = ticks.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![0, 15, 30, 45]);
        assert_eq!(ticks[1].label, "00:00:15");
        assert_eq!(ticks[2].offset_px, 480.0);
    }

    #[test]
    fn test_render_replaces_ticks() {
        let mut doc = doc();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap().timestamp();
        let data = (0..=180).map(|i| DataPoint::new(start + i * 60, i as f64)).collect();
        let graph = graph_over(&mut doc, data);
        let mut axis = TimeAxis::new(&graph);
        assert!(axis.ticks().is_empty());

        axis.render(&graph, &mut doc).unwrap();
        axis.render(&graph, &mut doc).unwrap();
        let labels: Vec<&str> = axis.ticks().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["09:00", "10:00", "11:00"]);

        let container = doc.get_element_by_id("chart").unwrap();
        assert_eq!(container.find_all_by_class("x_tick").len(), 3);
        assert_eq!(container.find_all_by_class("hour").len(), 3);
    }

    #[test]
    fn test_empty_graph_still_has_axis() {
        let mut doc = doc();
        let graph = graph_over(&mut doc, vec![]);
        let ticks = TimeAxis::tick_offsets(&graph);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].value, 0);
    }

    #[test]
    fn test_huge_span_is_bounded() {
        let mut doc = doc();
        let graph = graph_over(&mut doc, vec![DataPoint::new(0, 1.0), DataPoint::new(100_000_000_000_000_000, 2.0)]);
        let ticks = TimeAxis::tick_offsets(&graph);
        assert_eq!(ticks.len(), MAX_TICKS);
        assert!(ticks.windows(2).all(|w| w[0].value < w[1].value));
    }
}
