// HTML pages served by the monitor
use crate::application::chart_bootstrap::ChartBootstrap;
use crate::application::graph_service::GraphRequest;
use crate::domain::chart::ChartRequest;
use crate::infrastructure::chart::{ChartError, Document, Element, Node};
use std::collections::BTreeMap;

pub const CHART_ELEMENT_ID: &str = "chart";
pub const LEGEND_ELEMENT_ID: &str = "legend";

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 24px; color: #222; }
#chart_container { position: relative; display: inline-block; }
#chart { position: relative; }
.x_tick { position: absolute; top: 0; bottom: 0; width: 0; border-left: 1px dotted rgba(0,0,0,0.2); pointer-events: none; }
.x_tick .title { position: absolute; bottom: -20px; font-size: 11px; white-space: nowrap; margin-left: 3px; }
.detail { position: absolute; top: 0; background: rgba(0,0,0,0.7); color: #fff; font-size: 12px; padding: 4px 6px; pointer-events: none; }
.detail.inactive { display: none; }
.chart_legend ul { list-style: none; padding: 0; }
.chart_legend li { display: flex; align-items: center; gap: 6px; cursor: pointer; }
.chart_legend li.disabled { opacity: 0.4; }
.chart_legend .swatch { width: 10px; height: 10px; }
.chart_legend .action { cursor: pointer; }
"#;

/// Browser side of the hover detail and series toggle.
pub const GRAPH_JS: &str = r#"(function () {
  document.querySelectorAll('.detail[data-points]').forEach(function (detail) {
    var chart = detail.parentElement;
    var owner = detail.dataset.chart;
    var series = JSON.parse(detail.dataset.points);
    var width = parseFloat(detail.dataset.width);
    chart.addEventListener('mousemove', function (e) {
      var lo = parseFloat(detail.dataset.xMin), hi = parseFloat(detail.dataset.xMax);
      var x = lo + (e.offsetX / width) * (hi - lo);
      var lines = [];
      series.forEach(function (s, i) {
        var li = document.querySelector('.chart_legend ul[data-chart="' + owner + '"] li.line[data-series="' + i + '"]');
        if (li && li.classList.contains('disabled')) return;
        var best = null;
        s.data.forEach(function (p) { if (!best || Math.abs(p.x - x) < Math.abs(best.x - x)) best = p; });
        if (best) lines.push({ x: best.x, text: s.name + ': ' + parseFloat(best.y.toFixed(2)) });
      });
      if (!lines.length) return;
      detail.textContent = '';
      var label = document.createElement('div');
      label.className = 'x_label';
      label.textContent = new Date(lines[0].x * 1000).toUTCString();
      detail.appendChild(label);
      lines.forEach(function (l) {
        var item = document.createElement('div');
        item.className = 'item';
        item.textContent = l.text;
        detail.appendChild(item);
      });
      detail.style.left = e.offsetX + 'px';
      detail.classList.remove('inactive');
    });
    chart.addEventListener('mouseout', function () { detail.classList.add('inactive'); });
  });
  document.querySelectorAll('.chart_legend li.line').forEach(function (li) {
    var action = li.querySelector('[data-action=toggle]');
    if (!action) return;
    action.addEventListener('click', function () {
      var chart = li.closest('ul').dataset.chart;
      var lines = li.parentElement.querySelectorAll('li.line:not(.disabled)');
      if (!li.classList.contains('disabled') && lines.length <= 1) return;
      li.classList.toggle('disabled');
      document.querySelectorAll('.graph_frame[data-chart="' + chart + '"] .series-layer[data-series="' + li.dataset.series + '"]')
        .forEach(function (layer) { layer.style.display = li.classList.contains('disabled') ? 'none' : ''; });
    });
  });
})();
"#;

fn wrap(title: &str, document: &Document) -> String {
    let head = Element::new("head")
        .with_child(Element::new("meta").with_attr("charset", "utf-8"))
        .with_child(Element::new("title").with_text(title))
        .with_child(Element::new("style").with_child(Node::Markup(STYLE.to_string())));
    format!("<!DOCTYPE html><html>{}{}</html>", head.to_html(), document.to_html())
}

fn graph_link(resource_id: &str, metric_key: &str, aggregator: &str, change: bool) -> String {
    let mut href = format!(
        "/graph?resource_id={}&metric_key={}",
        urlencoding::encode(resource_id),
        urlencoding::encode(metric_key)
    );
    if aggregator != "avg" {
        href.push_str(&format!("&aggregator={}", aggregator));
    }
    if change {
        href.push_str("&change=true");
    }
    href
}

/// Index of every resource and its metrics.
pub fn render_index(metrics: &BTreeMap<String, Vec<String>>) -> String {
    let mut list = Element::new("ul").with_class("resources");
    for (resource_id, keys) in metrics {
        let mut inner = Element::new("ul");
        for key in keys {
            inner.append(Element::new("li").with_child(
                Element::new("a")
                    .with_attr("href", graph_link(resource_id, key, "avg", false))
                    .with_text(key.clone()),
            ));
        }
        list.append(
            Element::new("li")
                .with_child(Element::new("strong").with_text(resource_id.clone()))
                .with_child(inner),
        );
    }

    let mut body = Element::new("body").with_child(Element::new("h1").with_text("Metrics"));
    if metrics.is_empty() {
        body.append(Element::new("p").with_text("No metrics recorded yet."));
    } else {
        body.append(list);
    }
    wrap("Metrics", &Document::from_body(body))
}

/// Graph page with the chart mounted and rendered server side.
pub fn render_graph(graph: &GraphRequest, request: ChartRequest) -> Result<String, ChartError> {
    let title = request.series_name();

    let mut nav = Element::new("p").with_class("aggregators");
    for aggregator in ["avg", "sum", "max", "min"] {
        nav.append(
            Element::new("a")
                .with_attr("href", graph_link(&graph.resource_id, &graph.metric_key, aggregator, graph.change))
                .with_text(aggregator),
        );
        nav.append(Node::Text(" ".to_string()));
    }
    nav.append(
        Element::new("a")
            .with_attr(
                "href",
                graph_link(&graph.resource_id, &graph.metric_key, graph.aggregator.as_str(), !graph.change),
            )
            .with_text(if graph.change { "values" } else { "change" }),
    );

    let body = Element::new("body")
        .with_child(Element::new("p").with_child(Element::new("a").with_attr("href", "/").with_text("All metrics")))
        .with_child(Element::new("h1").with_text(format!("{} ({})", title, graph.aggregator.as_str())))
        .with_child(nav)
        .with_child(
            Element::new("div")
                .with_id("chart_container")
                .with_child(Element::new("div").with_id(CHART_ELEMENT_ID)),
        )
        .with_child(Element::new("div").with_id(LEGEND_ELEMENT_ID))
        .with_child(Element::new("script").with_attr("src", "/static/graph.js"));

    let mut document = Document::from_body(body);
    ChartBootstrap::initialize(request, CHART_ELEMENT_ID, LEGEND_ELEMENT_ID, &mut document)?;
    Ok(wrap(&title, &document))
}
