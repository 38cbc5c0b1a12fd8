use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Cell '{cell}' has no port named '{port}'")]
    MissingPort { cell: String, port: String },

    #[error("Cannot route between ports '{from}' and '{to}': {reason}")]
    Unroutable {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Offset failed: {0}")]
    Offset(String),

    #[error("Degenerate geometry: {0}")]
    Degenerate(String),
}
