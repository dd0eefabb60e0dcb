use ebsd_match_core::{GridError, GridShape, SymmetryError};

/// Structural errors that abort a matching run (or one phase of it).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error(transparent)]
    UnsupportedSymmetry(#[from] SymmetryError),
    #[error(transparent)]
    ShapeMismatch(#[from] GridError),
    #[error("no crystal symmetry configured for phase {}", display_phase(.phase))]
    MissingSymmetry { phase: Option<i32> },
    #[error("invalid match parameters: {0}")]
    InvalidParams(String),
}

/// Per-entry listing problems. These are logged and skipped, never fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    #[error("malformed listing entry '{line}': expected '<name>.tif,<index>'")]
    Malformed { line: String },
    #[error("listing entry '{filename}' index {index} is outside the {shape} scan")]
    IndexOutOfRange {
        filename: String,
        index: usize,
        shape: GridShape,
    },
}

fn display_phase(phase: &Option<i32>) -> String {
    phase.map_or_else(|| "<none>".to_string(), |p| p.to_string())
}
