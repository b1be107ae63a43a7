use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    /// A mount point the chart needs is not present in the document.
    #[error("element #{id} not found in document")]
    MissingElement { id: String },
    /// The charting backend refused to draw the data it was given.
    #[error("chart rendering failed: {0}")]
    DelegatedRender(String),
}
