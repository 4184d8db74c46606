//! Error handling for mdlax conversions
//!
//! Phases return [`ConversionResult`]. A [`ConversionError`] never crosses the
//! public `transform` boundary: the pipeline turns it into a
//! [`Diagnostic`](crate::utils::diagnostics::Diagnostic) and passes the phase
//! input through unchanged.

use thiserror::Error;

use crate::utils::diagnostics::Diagnostic;

/// Internal conversion error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    /// Two edits in one edit list cover the same bytes
    #[error("overlapping edits at {first_start}..{first_end} and {second_start}..{second_end}")]
    OverlappingEdits {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
    /// An edit reaches past the end of the text it is applied to
    #[error("edit range {start}..{end} is out of bounds for text of length {len}")]
    EditOutOfBounds { start: usize, end: usize, len: usize },
    /// An edit boundary falls inside a multi-byte character
    #[error("edit range {start}..{end} does not fall on character boundaries")]
    CharBoundary { start: usize, end: usize },
    /// A phase panicked; the payload message is kept when it is a string
    #[error("phase '{phase}' panicked: {message}")]
    PhasePanicked { phase: &'static str, message: String },
    /// Invalid configuration value or unreadable configuration file
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// IO error (for file operations in front ends)
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        ConversionError::Io(err.to_string())
    }
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Conversion output with the diagnostics collected along the way
#[derive(Debug, Clone, Default)]
pub struct ConversionOutput {
    /// The converted content
    pub content: String,
    /// Every diagnostic emitted by every phase, in emission order
    pub diagnostics: Vec<Diagnostic>,
}

impl ConversionOutput {
    pub fn new(content: String) -> Self {
        Self {
            content,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(content: String, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            content,
            diagnostics,
        }
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Split into the `(text, diagnostics)` pair callers usually want
    pub fn into_parts(self) -> (String, Vec<Diagnostic>) {
        (self.content, self.diagnostics)
    }
}
