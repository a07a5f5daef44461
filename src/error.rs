use crate::canvas::Phase;
use crate::types::Pt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{block} needs {needed} but a page only has {usable} of usable height")]
    LayoutOverflow {
        block: &'static str,
        needed: Pt,
        usable: Pt,
    },
    #[error("{operation} is not allowed while the document is {phase}")]
    PhaseViolation {
        operation: &'static str,
        phase: Phase,
    },
    #[error("invalid table: {0}")]
    InvalidTable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("page {page} does not exist (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("pdf serialization error: {0}")]
    Pdf(String),
    #[error("theme error: {0}")]
    Theme(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for EngineError {
    fn from(err: lopdf::Error) -> Self {
        EngineError::Pdf(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Theme(err.to_string())
    }
}
