// Show/hide series by clicking legend entries
use super::document::{ChartId, Document, Element, EventKind, Listener};
use super::error::ChartError;
use super::graph::Graph;
use super::legend::Legend;

const DISABLED_CLASS: &str = "disabled";

#[derive(Debug, Clone)]
pub struct SeriesToggle {
    chart: ChartId,
}

impl SeriesToggle {
    /// Add an action anchor to each legend entry and listen for clicks on it.
    pub fn new(graph: &Graph, legend: &mut Legend, document: &mut Document) -> Result<Self, ChartError> {
        let chart = graph.chart();
        let series: Vec<usize> = legend.entries().iter().map(|e| e.series).collect();
        for index in series {
            let li = legend.entry_element_mut(document, index)?;
            li.children.insert(
                0,
                Element::new("a")
                    .with_class("action")
                    .with_attr("data-action", "toggle")
                    .with_text("\u{2714}")
                    .into(),
            );
            document.add_event_listener(Listener {
                owner: chart,
                element_id: legend.element().to_string(),
                kind: EventKind::Click,
                series: Some(index),
            });
        }
        for entry in legend.entries_mut() {
            entry.toggle_enabled = true;
        }
        Ok(Self { chart })
    }

    /// Flip visibility of `series` and redraw. Returns false when the click
    /// was ignored because it would hide the last visible series.
    pub fn toggle(
        &self,
        graph: &mut Graph,
        legend: &Legend,
        document: &mut Document,
        series: usize,
    ) -> Result<bool, ChartError> {
        let Some(target) = graph.series().get(series) else {
            return Ok(false);
        };
        let enable = !target.enabled;
        if !enable && graph.enabled_series().count() <= 1 {
            tracing::debug!("Chart {} keeps its last visible series", self.chart);
            return Ok(false);
        }

        graph.series_mut()[series].enabled = enable;
        let li = legend.entry_element_mut(document, series)?;
        if enable {
            li.remove_class(DISABLED_CLASS);
        } else {
            li.add_class(DISABLED_CLASS);
        }
        graph.render(document)?;
        Ok(true)
    }
}
