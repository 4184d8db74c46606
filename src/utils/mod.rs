//! Utility modules
//!
//! This module contains utilities and helpers:
//! - Diagnostics and error reporting
//! - Error types and result types
//! - Edit lists applied against original offsets
//! - Lexical scanning helpers

pub mod diagnostics;
pub mod edits;
pub mod error;
pub mod scan;

// Re-export commonly used items
pub use diagnostics::{format_diagnostics, Diagnostic, DiagnosticKind, DiagnosticLevel, Diagnostics};
pub use edits::EditList;
pub use error::{ConversionError, ConversionOutput, ConversionResult};
