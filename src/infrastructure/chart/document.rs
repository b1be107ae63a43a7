// In-memory page document that chart widgets mount into
use super::error::ChartError;

/// Attribute every widget stamps on the nodes it creates, so that one
/// chart's nodes can be told apart from another's in the same element.
pub const CHART_ATTR: &str = "data-chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartId(u32);

impl std::fmt::Display for ChartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Trusted markup written through verbatim (backend SVG output).
    Markup(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attr("id", id)
    }

    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.with_attr("class", class)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn owned_by(self, chart: ChartId) -> Self {
        self.with_attr(CHART_ATTR, chart.to_string())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", classes);
    }

    pub fn remove_class(&mut self, class: &str) {
        if let Some(existing) = self.attr("class") {
            let classes: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
            let joined = classes.join(" ");
            self.set_attr("class", joined);
        }
    }

    pub fn is_owned_by(&self, chart: ChartId) -> bool {
        self.attr(CHART_ATTR) == Some(chart.to_string().as_str())
    }

    pub fn append(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// Child elements, skipping text and markup nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Drop every direct child element created by `chart`.
    pub fn remove_owned_children(&mut self, chart: ChartId) {
        self.children.retain(|n| match n {
            Node::Element(e) => !e.is_owned_by(chart),
            _ => true,
        });
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.child_elements_mut()
            .find_map(|child| child.find_by_id_mut(id))
    }

    /// All descendant elements (including `self`) carrying `class`, in document order.
    pub fn find_all_by_class(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_by_class(class, &mut found);
        found
    }

    fn collect_by_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            found.push(self);
        }
        for child in self.child_elements() {
            child.collect_by_class(class, found);
        }
    }

    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => text.push_str(t),
                Node::Element(e) => text.push_str(&e.text_content()),
                Node::Markup(_) => {}
            }
        }
        text
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            push_escaped(out, value);
            out.push('"');
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_html(out),
                Node::Text(t) => push_escaped(out, t),
                Node::Markup(m) => out.push_str(m),
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseMove,
    MouseOut,
    Click,
}

/// A pointer listener registered by a widget.
///
/// `series` is set for listeners bound to a single legend entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub owner: ChartId,
    pub element_id: String,
    pub kind: EventKind,
    pub series: Option<usize>,
}

/// Pointer input delivered to a mounted chart.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Hover { element_id: String, offset_x: f64 },
    Leave { element_id: String },
    LegendClick { element_id: String, series: usize },
}

impl PointerEvent {
    pub fn element_id(&self) -> &str {
        match self {
            PointerEvent::Hover { element_id, .. }
            | PointerEvent::Leave { element_id }
            | PointerEvent::LegendClick { element_id, .. } => element_id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            PointerEvent::Hover { .. } => EventKind::MouseMove,
            PointerEvent::Leave { .. } => EventKind::MouseOut,
            PointerEvent::LegendClick { .. } => EventKind::Click,
        }
    }

    pub fn series(&self) -> Option<usize> {
        match self {
            PointerEvent::LegendClick { series, .. } => Some(*series),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    body: Element,
    listeners: Vec<Listener>,
    next_chart_id: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_body(Element::new("body"))
    }

    pub fn from_body(body: Element) -> Self {
        Self {
            body,
            listeners: Vec::new(),
            next_chart_id: 1,
        }
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Element {
        &mut self.body
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<&Element> {
        self.body.find_by_id(id)
    }

    pub fn get_element_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.body.find_by_id_mut(id)
    }

    pub fn require_element(&self, id: &str) -> Result<&Element, ChartError> {
        self.get_element_by_id(id)
            .ok_or_else(|| ChartError::MissingElement { id: id.to_string() })
    }

    pub fn require_element_mut(&mut self, id: &str) -> Result<&mut Element, ChartError> {
        self.get_element_by_id_mut(id)
            .ok_or_else(|| ChartError::MissingElement { id: id.to_string() })
    }

    pub fn allocate_chart_id(&mut self) -> ChartId {
        let id = ChartId(self.next_chart_id);
        self.next_chart_id += 1;
        id
    }

    pub fn add_event_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub fn has_listener(&self, owner: ChartId, event: &PointerEvent) -> bool {
        self.listeners.iter().any(|l| {
            l.owner == owner
                && l.element_id == event.element_id()
                && l.kind == event.kind()
                && l.series == event.series()
        })
    }

    pub fn remove_listeners(&mut self, owner: ChartId) {
        self.listeners.retain(|l| l.owner != owner);
    }

    pub fn to_html(&self) -> String {
        self.body.to_html()
    }
}
