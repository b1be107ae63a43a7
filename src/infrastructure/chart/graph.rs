// Line graph backed by the plotters SVG backend
use super::document::{ChartId, Document, Element, Node};
use super::error::ChartError;
use crate::domain::chart::DataPoint;
use plotters::prelude::*;
use plotters::style::Color as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    Line,
}

impl Renderer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Renderer::Line => "line",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
}

impl Interpolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interpolation::Linear => "linear",
        }
    }
}

/// 24-bit RGB color parsed from `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn to_rgb(self) -> RGBColor {
        RGBColor(self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub color: Color,
    pub data: Vec<DataPoint>,
    pub enabled: bool,
}

impl Series {
    pub fn new(name: String, color: Color, data: Vec<DataPoint>) -> Self {
        Self {
            name,
            color,
            data,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub element: String,
    pub width: u32,
    pub height: u32,
    pub renderer: Renderer,
    pub interpolation: Interpolation,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone)]
pub struct Graph {
    chart: ChartId,
    element: String,
    width: u32,
    height: u32,
    renderer: Renderer,
    interpolation: Interpolation,
    series: Vec<Series>,
    render_count: usize,
}

const STROKE_WIDTH: u32 = 2;

impl Graph {
    /// Bind a graph to `options.element`. Nothing is drawn until [`Graph::render`].
    pub fn new(chart: ChartId, options: GraphOptions, document: &Document) -> Result<Self, ChartError> {
        document.require_element(&options.element)?;
        Ok(Self {
            chart,
            element: options.element,
            width: options.width,
            height: options.height,
            renderer: options.renderer,
            interpolation: options.interpolation,
            series: options.series,
            render_count: 0,
        })
    }

    pub fn chart(&self) -> ChartId {
        self.chart
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn renderer(&self) -> Renderer {
        self.renderer
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn series_mut(&mut self) -> &mut [Series] {
        &mut self.series
    }

    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn enabled_series(&self) -> impl Iterator<Item = (usize, &Series)> {
        self.series.iter().enumerate().filter(|(_, s)| s.enabled)
    }

    /// Number of points drawn by the last render (enabled series only).
    pub fn plotted_points(&self) -> usize {
        self.enabled_series().map(|(_, s)| s.data.len()).sum()
    }

    /// Time domain in unix seconds over the enabled series.
    pub fn x_domain(&self) -> (f64, f64) {
        let mut xs = self.enabled_series().flat_map(|(_, s)| s.data.iter().map(|p| p.x));
        let Some(first) = xs.next() else {
            return (0.0, 1.0);
        };
        let (min, max) = xs.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
        if min == max {
            (min as f64, max as f64 + 1.0)
        } else {
            (min as f64, max as f64)
        }
    }

    /// Value domain; includes zero unless every value is negative.
    pub fn y_domain(&self) -> (f64, f64) {
        let mut ys = self
            .enabled_series()
            .flat_map(|(_, s)| s.data.iter().map(|p| p.y))
            .filter(|y| y.is_finite());
        let Some(first) = ys.next() else {
            return (0.0, 1.0);
        };
        let (min, max) = ys.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        let lo = min.min(0.0);
        let hi = if max < 0.0 { 0.0 } else { max };
        if lo == hi { (lo, hi + 1.0) } else { (lo, hi) }
    }

    pub fn x_to_pixel(&self, x: f64) -> f64 {
        let (lo, hi) = self.x_domain();
        (x - lo) / (hi - lo) * self.width as f64
    }

    pub fn pixel_to_x(&self, px: f64) -> f64 {
        let (lo, hi) = self.x_domain();
        lo + px / self.width as f64 * (hi - lo)
    }

    /// Draw every enabled series into the graph element, replacing this
    /// graph's previous drawing if there is one.
    pub fn render(&mut self, document: &mut Document) -> Result<(), ChartError> {
        let layers = self.draw_layers()?;

        let chart = self.chart;
        let mut frame = Element::new("div")
            .with_class("graph_frame")
            .with_attr("data-renderer", self.renderer.as_str())
            .with_attr("data-interpolation", self.interpolation.as_str())
            .with_attr(
                "style",
                format!("position: relative; width: {}px; height: {}px", self.width, self.height),
            )
            .owned_by(chart);
        for (index, svg) in layers {
            frame.append(
                Element::new("div")
                    .with_class("series-layer")
                    .with_attr("data-series", index.to_string())
                    .with_attr("style", "position: absolute; left: 0; top: 0")
                    .with_child(Node::Markup(svg)),
            );
        }

        let container = document.require_element_mut(&self.element)?;
        let existing = container
            .child_elements_mut()
            .find(|e| e.is_owned_by(chart) && e.has_class("graph_frame"));
        match existing {
            Some(previous) => *previous = frame,
            None => container.append(frame),
        }

        self.render_count += 1;
        tracing::debug!(
            "Rendered chart {} into #{} ({} points)",
            chart,
            self.element,
            self.plotted_points()
        );
        Ok(())
    }

    /// One SVG document per enabled series, all sharing the same domains.
    fn draw_layers(&self) -> Result<Vec<(usize, String)>, ChartError> {
        let (x_lo, x_hi) = self.x_domain();
        let (y_lo, y_hi) = self.y_domain();

        let mut layers = Vec::new();
        for (index, series) in self.enabled_series() {
            if let Some(bad) = series.data.iter().position(|p| !p.y.is_finite()) {
                return Err(ChartError::DelegatedRender(format!(
                    "series {} has a non-finite value at index {}",
                    series.name, bad
                )));
            }

            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                    .into_drawing_area();
                let mut chart = ChartBuilder::on(&root)
                    .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
                    .map_err(|e| ChartError::DelegatedRender(e.to_string()))?;
                let style = series.color.to_rgb().stroke_width(STROKE_WIDTH);
                chart
                    .draw_series(LineSeries::new(
                        series.data.iter().map(|p| (p.x as f64, p.y)),
                        style,
                    ))
                    .map_err(|e| ChartError::DelegatedRender(e.to_string()))?;
                root.present()
                    .map_err(|e| ChartError::DelegatedRender(e.to_string()))?;
            }
            layers.push((index, svg));
        }
        Ok(layers)
    }
}
