//! # mdlax
//!
//! Lexical converter from LaTeX-flavored markup to Markdown with math
//! (`$…$`, `$$…$$`, `> [!type]` callouts), and back.
//!
//! ## Features
//!
//! - **Environments**: nested `\begin`/`\end` regions become `$$` blocks or callouts
//! - **Macros**: `\newcommand`, `\def` and `\DeclareMathOperator` are expanded
//! - **Theorems**: `\newtheorem` declarations with section-scoped and shared counters
//! - **References**: labels are numbered by category and `\ref`-family commands resolved
//! - **Citations**: per-command templates with prenotes and postnotes
//! - **Robust**: malformed input produces diagnostics, never a panic
//!
//! ## Usage Examples
//!
//! ```rust
//! use mdlax::{transform, Direction, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let out = transform(
//!     r"\begin{equation}\label{eq:a} x=1 \end{equation} See \eqref{eq:a}.",
//!     &config,
//!     Direction::Forward,
//! );
//! assert_eq!(out.content, "$$\nx=1 \\tag{1}\n$$\nSee (1).");
//!
//! let back = transform("Let $x$ be real.", &config, Direction::Reverse);
//! assert_eq!(back.content, r"Let \(x\) be real.");
//! ```
//!
//! ### Presets
//!
//! ```rust
//! use mdlax::{transform, Direction, PipelineConfig};
//!
//! // Only environments and delimiters
//! let out = transform(r"\(a\) \cite{k}", &PipelineConfig::basic(), Direction::Forward);
//! assert_eq!(out.content, r"$a$ \cite{k}");
//! ```

/// Core conversion modules
pub mod core;

/// Data layer - static tables and constants
pub mod data;

/// Feature modules - the individual rewriting phases
pub mod features;

/// Utility modules
pub mod utils;

/// WASM bindings (feature-gated)
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export core conversion types and functions
pub use core::latex2md;
pub use core::md2latex;
pub use core::{
    latex_to_markdown, markdown_to_latex, Converter, Direction, PipelineConfig, ReferenceMode,
};

// Re-export data modules
pub use data::constants;

// Re-export feature modules
pub use features::citations;
pub use features::delimiters;
pub use features::macros;
pub use features::refs;
pub use features::theorems;

// Re-export utilities
pub use utils::diagnostics;
pub use utils::diagnostics::{format_diagnostics, Diagnostic, DiagnosticKind, DiagnosticLevel};
pub use utils::error::{ConversionError, ConversionOutput, ConversionResult};

/// Convert `text` in the given direction
///
/// Never panics: a failing phase is reported as a
/// [`DiagnosticKind::PhaseFailure`] and skipped.
///
/// # Arguments
/// * `text` - Source document
/// * `config` - Conversion options
/// * `direction` - `Forward` (LaTeX to Markdown) or `Reverse`
pub fn transform(text: &str, config: &PipelineConfig, direction: Direction) -> ConversionOutput {
    match direction {
        Direction::Forward => latex_to_markdown(text, config),
        Direction::Reverse => markdown_to_latex(text, config),
    }
}
