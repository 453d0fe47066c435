use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("variable '{name}' declares {dims} dims but its array has {ndim} dimensions")]
    DimMismatch {
        name: String,
        dims: usize,
        ndim: usize,
    },

    #[error("coordinate '{0}' does not name an existing variable")]
    UnknownCoordinate(String),

    #[error("'{path}' is not a tree container file (bad magic)")]
    BadMagic { path: String },

    #[error("container header invalid: {0}")]
    Header(String),

    #[error("unsupported dtype '{0}' in container header")]
    UnsupportedDtype(String),

    #[error("container payload truncated: {0}")]
    Truncated(String),

    #[error("no group '{group}' in '{path}'")]
    MissingGroup { group: String, path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
