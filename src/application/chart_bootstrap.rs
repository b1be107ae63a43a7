// Chart bootstrap - Turns a chart request into a mounted, interactive chart
use crate::domain::chart::{CHART_HEIGHT, CHART_WIDTH, ChartRequest, SERIES_COLOR};
use crate::infrastructure::chart::{
    ChartError, ChartId, Color, Document, Graph, GraphOptions, HoverDetail, HoverReadout,
    Interpolation, Legend, PointerEvent, Renderer, Series, SeriesToggle, TimeAxis,
};

/// Outcome of dispatching a pointer event to a chart.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// No listener of this chart matched the event.
    Ignored,
    Hovered(Vec<HoverReadout>),
    Cleared,
    Toggled { series: usize, changed: bool },
}

/// One mounted chart and the widgets wired to it.
///
/// Calling [`ChartBootstrap::initialize`] twice with the same element ids
/// mounts two overlapping charts; use [`ChartBootstrap::teardown`] first
/// when a replacement is wanted.
#[derive(Debug)]
pub struct ChartBootstrap {
    id: ChartId,
    container_id: String,
    legend_id: String,
    graph: Graph,
    hover_detail: HoverDetail,
    legend: Legend,
    toggle: SeriesToggle,
    axis: TimeAxis,
}

impl ChartBootstrap {
    pub fn initialize(
        request: ChartRequest,
        container_id: &str,
        legend_id: &str,
        document: &mut Document,
    ) -> Result<Self, ChartError> {
        let color = Color::from_hex(SERIES_COLOR)
            .ok_or_else(|| ChartError::DelegatedRender(format!("invalid color {}", SERIES_COLOR)))?;
        let series = Series::new(request.series_name(), color, request.data_points);

        let id = document.allocate_chart_id();
        let options = GraphOptions {
            element: container_id.to_string(),
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
            renderer: Renderer::Line,
            interpolation: Interpolation::Linear,
            series: vec![series],
        };
        Self::mount(id, options, legend_id, document)
    }

    /// Run every widget against `document` in mount order.
    fn mount(
        id: ChartId,
        options: GraphOptions,
        legend_id: &str,
        document: &mut Document,
    ) -> Result<Self, ChartError> {
        let container_id = options.element.clone();
        let mut graph = Graph::new(id, options, document)?;
        graph.render(document)?;

        let hover_detail = HoverDetail::new(&graph, document)?;

        let mut legend = Legend::new(&graph, legend_id, document).inspect_err(|e| {
            tracing::warn!("Chart {} rendered without legend: {}", id, e);
        })?;

        let toggle = SeriesToggle::new(&graph, &mut legend, document)?;

        let mut axis = TimeAxis::new(&graph);
        axis.render(&graph, document)?;

        tracing::info!(
            "Mounted chart {} for {} ({} points) into #{} / #{}",
            id,
            graph.series().iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", "),
            graph.plotted_points(),
            container_id,
            legend_id
        );

        Ok(Self {
            id,
            container_id,
            legend_id: legend_id.to_string(),
            graph,
            hover_detail,
            legend,
            toggle,
            axis,
        })
    }

    pub fn id(&self) -> ChartId {
        self.id
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    /// Route a pointer event through the listeners this chart registered.
    pub fn dispatch(
        &mut self,
        document: &mut Document,
        event: &PointerEvent,
    ) -> Result<DispatchOutcome, ChartError> {
        if !document.has_listener(self.id, event) {
            return Ok(DispatchOutcome::Ignored);
        }

        match event {
            PointerEvent::Hover { offset_x, .. } => {
                let readouts = self.hover_detail.update(&self.graph, document, *offset_x)?;
                Ok(DispatchOutcome::Hovered(readouts))
            }
            PointerEvent::Leave { .. } => {
                self.hover_detail.clear(document)?;
                Ok(DispatchOutcome::Cleared)
            }
            PointerEvent::LegendClick { series, .. } => {
                let changed = self
                    .toggle
                    .toggle(&mut self.graph, &self.legend, document, *series)?;
                if changed {
                    self.axis.render(&self.graph, document)?;
                    self.hover_detail.refresh_range(&self.graph, document)?;
                }
                Ok(DispatchOutcome::Toggled {
                    series: *series,
                    changed,
                })
            }
        }
    }

    /// Remove every node and listener this chart added to the document.
    pub fn teardown(self, document: &mut Document) {
        for element_id in [&self.container_id, &self.legend_id] {
            if let Some(element) = document.get_element_by_id_mut(element_id) {
                element.remove_owned_children(self.id);
            }
        }
        document.remove_listeners(self.id);
        tracing::debug!("Chart {} torn down", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::DataPoint;
    use crate::infrastructure::chart::document::EventKind;
    use crate::infrastructure::chart::Element;

    fn page() -> Document {
        Document::from_body(
            Element::new("body")
                .with_child(Element::new("div").with_id("chart"))
                .with_child(Element::new("div").with_id("legend")),
        )
    }

    fn scenario() -> ChartRequest {
        ChartRequest::new(
            "host-42".to_string(),
            "cpu.load".to_string(),
            vec![DataPoint::new(0, 1.0), DataPoint::new(60, 2.5)],
        )
    }

    #[test]
    fn test_scenario_mounts_full_chart() {
        let mut doc = page();
        let chart = ChartBootstrap::initialize(scenario(), "chart", "legend", &mut doc).unwrap();

        let graph = chart.graph();
        assert_eq!(graph.series().len(), 1);
        assert_eq!(graph.series()[0].name, "host-42.cpu.load");
        assert_eq!(graph.series()[0].color.to_hex(), "#c05020");
        assert_eq!(graph.series()[0].data, vec![DataPoint::new(0, 1.0), DataPoint::new(60, 2.5)]);
        assert_eq!(graph.plotted_points(), 2);
        assert_eq!((graph.width(), graph.height()), (960, 500));
        assert_eq!(graph.renderer(), Renderer::Line);
        assert_eq!(graph.interpolation(), Interpolation::Linear);
        assert_eq!(graph.render_count(), 1);

        assert!(!chart.axis().ticks().is_empty());
        let container = doc.get_element_by_id("chart").unwrap();
        assert!(!container.find_all_by_class("x_tick").is_empty());

        let entries = chart.legend().entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].toggle_enabled);
        assert_eq!(entries[0].label, "host-42.cpu.load");
        let legend = doc.get_element_by_id("legend").unwrap();
        assert_eq!(legend.find_all_by_class("line").len(), 1);
        assert_eq!(legend.find_all_by_class("action").len(), 1);

        let clicks = doc
            .listeners()
            .iter()
            .filter(|l| l.kind == EventKind::Click)
            .count();
        assert_eq!(clicks, 1);
    }

    #[test]
    fn test_empty_data_renders_empty_chart() {
        let mut doc = page();
        let request = ChartRequest::new("host-42".to_string(), "cpu.load".to_string(), vec![]);
        let chart = ChartBootstrap::initialize(request, "chart", "legend", &mut doc).unwrap();

        assert_eq!(chart.graph().plotted_points(), 0);
        let container = doc.get_element_by_id("chart").unwrap();
        assert_eq!(container.find_all_by_class("graph_frame").len(), 1);
    }

    #[test]
    fn test_missing_container_leaves_legend_untouched() {
        let mut doc = Document::from_body(
            Element::new("body").with_child(Element::new("div").with_id("legend")),
        );
        let before = doc.get_element_by_id("legend").unwrap().clone();

        let err = ChartBootstrap::initialize(scenario(), "chart", "legend", &mut doc).unwrap_err();
        assert_eq!(err, ChartError::MissingElement { id: "chart".to_string() });
        assert_eq!(doc.get_element_by_id("legend").unwrap(), &before);
        assert!(doc.listeners().is_empty());
    }

    #[test]
    fn test_missing_legend_fails_after_chart_render() {
        let mut doc = Document::from_body(
            Element::new("body").with_child(Element::new("div").with_id("chart")),
        );

        let err = ChartBootstrap::initialize(scenario(), "chart", "legend", &mut doc).unwrap_err();
        assert_eq!(err, ChartError::MissingElement { id: "legend".to_string() });

        // Graph and hover detail were mounted before the legend lookup.
        let container = doc.get_element_by_id("chart").unwrap();
        assert_eq!(container.find_all_by_class("graph_frame").len(), 1);
        assert_eq!(container.find_all_by_class("detail").len(), 1);
        assert!(container.find_all_by_class("x_tick").is_empty());
        assert!(doc.listeners().iter().all(|l| l.kind != EventKind::Click));
    }

    #[test]
    fn test_initialize_twice_overlaps() {
        let mut doc = page();
        let first = ChartBootstrap::initialize(scenario(), "chart", "legend", &mut doc).unwrap();
        let second = ChartBootstrap::initialize(scenario(), "chart", "legend", &mut doc).unwrap();
        assert_ne!(first.id(), second.id());

        let container = doc.get_element_by_id("chart").unwrap();
        assert_eq!(container.find_all_by_class("graph_frame").len(), 2);
        assert_eq!(container.find_all_by_class("detail").len(), 2);
        let legend = doc.get_element_by_id("legend").unwrap();
        assert_eq!(legend.find_all_by_class("line").len(), 2);
        assert_eq!(doc.listeners().len(), 6);

        first.teardown(&mut doc);
        let container = doc.get_element_by_id("chart").unwrap();
        assert_eq!(container.find_all_by_class("graph_frame").len(), 1);
        assert_eq!(doc.listeners().len(), 3);
    }

    #[test]
    fn test_dispatch_hover_and_toggle() {
        let mut doc = page();
        let mut chart = ChartBootstrap::initialize(scenario(), "chart", "legend", &mut doc).unwrap();

        let hover = PointerEvent::Hover { element_id: "chart".to_string(), offset_x: 0.0 };
        match chart.dispatch(&mut doc, &hover).unwrap() {
            DispatchOutcome::Hovered(readouts) => {
                assert_eq!(readouts.len(), 1);
                assert_eq!(readouts[0].label(), "host-42.cpu.load: 1");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let leave = PointerEvent::Leave { element_id: "chart".to_string() };
        assert_eq!(chart.dispatch(&mut doc, &leave).unwrap(), DispatchOutcome::Cleared);

        let click = PointerEvent::LegendClick { element_id: "legend".to_string(), series: 0 };
        assert_eq!(
            chart.dispatch(&mut doc, &click).unwrap(),
            DispatchOutcome::Toggled { series: 0, changed: false }
        );

        let stray = PointerEvent::Hover { element_id: "legend".to_string(), offset_x: 3.0 };
        assert_eq!(chart.dispatch(&mut doc, &stray).unwrap(), DispatchOutcome::Ignored);
    }

    #[test]
    fn test_toggle_redraws_axis_and_hover_range() {
        let mut doc = page();
        let id = doc.allocate_chart_id();
        let short = Series::new("a.short".to_string(), Color { r: 0, g: 0, b: 0 }, vec![DataPoint::new(0, 1.0), DataPoint::new(60, 2.0)]);
        let long = Series::new("b.long".to_string(), Color { r: 9, g: 9, b: 9 }, vec![DataPoint::new(0, 3.0), DataPoint::new(10_800, 4.0)]);
        let options = GraphOptions {
            element: "chart".to_string(),
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
            renderer: Renderer::Line,
            interpolation: Interpolation::Linear,
            series: vec![short, long],
        };
        let mut chart = ChartBootstrap::mount(id, options, "legend", &mut doc).unwrap();
        let before: Vec<i64> = chart.axis().ticks().iter().map(|t| t.value).collect();
        assert_eq!(before, vec![0, 3_600, 7_200]);

        let click = PointerEvent::LegendClick { element_id: "legend".to_string(), series: 1 };
        assert_eq!(
            chart.dispatch(&mut doc, &click).unwrap(),
            DispatchOutcome::Toggled { series: 1, changed: true }
        );

        assert_eq!(chart.graph().x_domain(), (0.0, 60.0));
        let after: Vec<i64> = chart.axis().ticks().iter().map(|t| t.value).collect();
        assert_eq!(after, vec![0, 15, 30, 45]);

        let container = doc.get_element_by_id("chart").unwrap();
        let times: Vec<String> = container
            .find_all_by_class("x_tick")
            .iter()
            .map(|t| t.attr("data-time").unwrap_or_default().to_string())
            .collect();
        assert_eq!(times, vec!["0", "15", "30", "45"]);
        let detail = container.find_all_by_class("detail")[0];
        assert_eq!(detail.attr("data-x-max"), Some("60"));

        let hover = PointerEvent::Hover { element_id: "chart".to_string(), offset_x: 960.0 };
        match chart.dispatch(&mut doc, &hover).unwrap() {
            DispatchOutcome::Hovered(readouts) => {
                assert_eq!(readouts.len(), 1);
                assert_eq!(readouts[0].label(), "a.short: 2");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
