// Chart widgets - Typed wrappers around the plotting backend, mounted into a page document
pub mod document;
pub mod error;
pub mod graph;
pub mod hover_detail;
pub mod legend;
pub mod time_axis;
pub mod toggle;

pub use document::{ChartId, Document, Element, Node, PointerEvent};
pub use error::ChartError;
pub use graph::{Color, Graph, GraphOptions, Interpolation, Renderer, Series};
pub use hover_detail::{HoverDetail, HoverReadout};
pub use legend::Legend;
pub use time_axis::TimeAxis;
pub use toggle::SeriesToggle;
