//! Structured, non-fatal conversion diagnostics
//!
//! Every recoverable problem found by a phase is reported as a [`Diagnostic`]
//! rather than an error. The engine keeps going with the least destructive
//! fallback (raw markers left in place, placeholder text, no numbering) and
//! hands the collected list back next to the converted text.
//!
//! ## Example
//!
//! ```rust
//! use mdlax::{transform, Direction, PipelineConfig};
//! use mdlax::diagnostics::DiagnosticKind;
//!
//! let out = transform(r"\begin{equation} x", &PipelineConfig::default(), Direction::Forward);
//! assert!(out
//!     .diagnostics
//!     .iter()
//!     .any(|d| d.kind == DiagnosticKind::UnmatchedEnvironment));
//! ```

use serde::Serialize;
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Informational note
    Info,
    /// Warning - output is usable but may not match the author's intent
    Warning,
    /// Error - part of the input was left unconverted
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Info => write!(f, "info"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Error => write!(f, "error"),
        }
    }
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    DelimiterMismatch,
    EnvironmentMismatch,
    UnmatchedEnvironment,
    InvalidNesting,
    UnknownEnvironment,
    InvalidMacroName,
    ArityMismatch,
    DuplicateLabel,
    UndefinedReference,
    CitationKeyError,
    /// A whole phase failed and its input was passed through unchanged
    PhaseFailure,
}

impl DiagnosticKind {
    /// Default severity for this kind
    pub fn level(self) -> DiagnosticLevel {
        use DiagnosticKind::*;
        match self {
            DelimiterMismatch | EnvironmentMismatch | UnmatchedEnvironment | PhaseFailure => {
                DiagnosticLevel::Error
            }
            InvalidNesting | InvalidMacroName | ArityMismatch | DuplicateLabel
            | UndefinedReference | CitationKeyError => DiagnosticLevel::Warning,
            UnknownEnvironment => DiagnosticLevel::Info,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single diagnostic message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Severity level
    pub level: DiagnosticLevel,
    /// Human-readable message
    pub message: String,
    /// Approximate byte offset in the text the reporting phase received
    pub position: usize,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with the kind's default severity
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            level: kind.level(),
            message: message.into(),
            position,
            suggestion: None,
        }
    }

    /// Add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Shift the position, used when a region is scanned on its own
    pub fn offset_by(mut self, base: usize) -> Self {
        self.position += base;
        self
    }

    /// 1-indexed line and column of the position within `source`
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        offset_to_location(self.position, &compute_line_offsets(source))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.level, self.kind, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  = help: {}", suggestion)?;
        }
        Ok(())
    }
}

/// Diagnostic sink owned by one conversion run
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
    infos: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic
    pub fn add(&mut self, diag: Diagnostic) {
        match diag.level {
            DiagnosticLevel::Error => self.errors += 1,
            DiagnosticLevel::Warning => self.warnings += 1,
            DiagnosticLevel::Info => self.infos += 1,
        }
        log::debug!("diagnostic at {}: {}", diag.position, diag);
        self.items.push(diag);
    }

    /// Shorthand for `add(Diagnostic::new(..))`
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>, position: usize) {
        self.add(Diagnostic::new(kind, message, position));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for diag in other.items {
            self.add(diag);
        }
    }

    /// Take diagnostics from a sub-scan, shifting positions by `base`
    pub fn extend_offset(&mut self, other: Diagnostics, base: usize) {
        for diag in other.items {
            self.add(diag.offset_by(base));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of diagnostics of the given kind
    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        summarize(self.errors, self.warnings, self.infos)
    }
}

fn summarize(errors: usize, warnings: usize, infos: usize) -> String {
    let plural = |n: usize| if n == 1 { "" } else { "s" };
    let mut parts = Vec::new();
    if errors > 0 {
        parts.push(format!("{} error{}", errors, plural(errors)));
    }
    if warnings > 0 {
        parts.push(format!("{} warning{}", warnings, plural(warnings)));
    }
    if infos > 0 {
        parts.push(format!("{} note{}", infos, plural(infos)));
    }
    if parts.is_empty() {
        "no issues found".to_string()
    } else {
        parts.join(", ")
    }
}

/// Compute byte offsets for each line start
pub fn compute_line_offsets(input: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, c) in input.char_indices() {
        if c == '\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

/// Convert byte offset to 1-indexed line and column
pub fn offset_to_location(offset: usize, line_offsets: &[usize]) -> (usize, usize) {
    let line = line_offsets
        .iter()
        .position(|&o| o > offset)
        .unwrap_or(line_offsets.len())
        .saturating_sub(1);

    let column = offset.saturating_sub(*line_offsets.get(line).unwrap_or(&0)) + 1;
    (line + 1, column)
}

/// Format diagnostics for terminal output
///
/// When `source` is given, each entry gets a `--> line:col` pointer. Positions
/// are approximate because later phases see rewritten text.
pub fn format_diagnostics(
    diagnostics: &[Diagnostic],
    source: Option<&str>,
    use_color: bool,
) -> String {
    let line_offsets = source.map(compute_line_offsets);
    let mut output = String::new();
    let (mut errors, mut warnings, mut infos) = (0, 0, 0);

    for diag in diagnostics {
        match diag.level {
            DiagnosticLevel::Error => errors += 1,
            DiagnosticLevel::Warning => warnings += 1,
            DiagnosticLevel::Info => infos += 1,
        }
        if use_color {
            let color = match diag.level {
                DiagnosticLevel::Error => "\x1b[31m",
                DiagnosticLevel::Warning => "\x1b[33m",
                DiagnosticLevel::Info => "\x1b[34m",
            };
            output.push_str(color);
        }
        output.push_str(&diag.to_string());
        if let Some(ref offsets) = line_offsets {
            let (line, col) = offset_to_location(diag.position, offsets);
            output.push_str(&format!("\n  --> line {}:{}", line, col));
        }
        if use_color {
            output.push_str("\x1b[0m");
        }
        output.push_str("\n\n");
    }

    if use_color {
        if errors > 0 {
            output.push_str("\x1b[31m");
        } else if warnings > 0 {
            output.push_str("\x1b[33m");
        } else {
            output.push_str("\x1b[32m");
        }
    }

    output.push_str(&format!("Summary: {}", summarize(errors, warnings, infos)));

    if use_color {
        output.push_str("\x1b[0m");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_by_kind() {
        assert_eq!(
            DiagnosticKind::UnmatchedEnvironment.level(),
            DiagnosticLevel::Error
        );
        assert_eq!(DiagnosticKind::ArityMismatch.level(), DiagnosticLevel::Warning);
        assert_eq!(DiagnosticKind::UnknownEnvironment.level(), DiagnosticLevel::Info);
    }

    #[test]
    fn test_summary_format() {
        let mut diags = Diagnostics::new();
        diags.report(DiagnosticKind::EnvironmentMismatch, "test", 0);
        diags.report(DiagnosticKind::DuplicateLabel, "test", 0);

        let summary = diags.summary();
        assert!(summary.contains("1 error"));
        assert!(summary.contains("1 warning"));
        assert!(diags.has_errors());
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(Diagnostics::new().summary(), "no issues found");
    }

    #[test]
    fn test_line_col() {
        let source = "first\nsecond\nthird";
        let diag = Diagnostic::new(DiagnosticKind::DelimiterMismatch, "x", 8);
        assert_eq!(diag.line_col(source), (2, 3));
    }

    #[test]
    fn test_offset_by() {
        let diag = Diagnostic::new(DiagnosticKind::InvalidNesting, "x", 4).offset_by(10);
        assert_eq!(diag.position, 14);
    }

    #[test]
    fn test_format_without_color() {
        let diags = vec![Diagnostic::new(DiagnosticKind::UndefinedReference, "no label 'x'", 0)
            .with_suggestion("define \\label{x}")];
        let text = format_diagnostics(&diags, Some("abc"), false);
        assert!(text.contains("warning[UndefinedReference]: no label 'x'"));
        assert!(text.contains("help: define"));
        assert!(text.contains("--> line 1:1"));
        assert!(text.ends_with("Summary: 1 warning"));
    }
}
