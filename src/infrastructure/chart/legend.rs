// Series legend
use super::document::{ChartId, Document, Element};
use super::error::ChartError;
use super::graph::{Color, Graph};

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub series: usize,
    pub label: String,
    pub color: Color,
    /// Set once a toggle behavior has been bound to this entry.
    pub toggle_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct Legend {
    chart: ChartId,
    element: String,
    entries: Vec<LegendEntry>,
}

impl Legend {
    /// Render one `li.line` per graph series into `element`.
    pub fn new(graph: &Graph, element: &str, document: &mut Document) -> Result<Self, ChartError> {
        let chart = graph.chart();
        let container = document.require_element_mut(element)?;

        let entries: Vec<LegendEntry> = graph
            .series()
            .iter()
            .enumerate()
            .map(|(index, s)| LegendEntry {
                series: index,
                label: s.name.clone(),
                color: s.color,
                toggle_enabled: false,
            })
            .collect();

        let mut list = Element::new("ul").owned_by(chart);
        for entry in &entries {
            list.append(
                Element::new("li")
                    .with_class("line")
                    .with_attr("data-series", entry.series.to_string())
                    .with_child(
                        Element::new("div")
                            .with_class("swatch")
                            .with_attr("style", format!("background-color: {}", entry.color.to_hex())),
                    )
                    .with_child(Element::new("span").with_class("label").with_text(entry.label.clone())),
            );
        }
        container.add_class("chart_legend");
        container.append(list);

        Ok(Self {
            chart,
            element: element.to_string(),
            entries,
        })
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }

    pub(super) fn entries_mut(&mut self) -> &mut [LegendEntry] {
        &mut self.entries
    }

    /// The rendered `li` for `series`.
    pub(super) fn entry_element_mut<'a>(
        &self,
        document: &'a mut Document,
        series: usize,
    ) -> Result<&'a mut Element, ChartError> {
        let chart = self.chart;
        let wanted = series.to_string();
        let container = document.require_element_mut(&self.element)?;
        container
            .child_elements_mut()
            .filter(|e| e.is_owned_by(chart))
            .flat_map(|list| list.child_elements_mut())
            .find(|li| li.attr("data-series") == Some(wanted.as_str()))
            .ok_or_else(|| ChartError::MissingElement {
                id: format!("{} li[data-series={}]", self.element, series),
            })
    }
}
