//! LaTeX to Markdown-with-math conversion
//!
//! The conversion is lexical: every phase scans the full output of the
//! previous one and rewrites it through an edit list.
//!
//! # Module Structure
//!
//! - `context`: configuration and the converter owning the per-run state
//! - `environment`: the nested `\begin`/`\end` scanner and region dispatch
//! - `math`: row and column reflow for math display environments
//! - `markup`: cleanup passes (sizing, prose in math, headings and fonts)
//!
//! # Phases
//!
//! macros → environments → references → citations → delimiters → cleanup.
//! A phase that fails is reported as a `PhaseFailure` diagnostic and its input
//! passes through unchanged.
//!
//! # Example
//!
//! ```rust
//! use mdlax::core::latex2md::{Converter, PipelineConfig};
//!
//! let mut converter = Converter::with_config(PipelineConfig::default());
//! let output = converter.convert(r"\begin{lemma} Let \(x \in \R\). \end{lemma}");
//! assert_eq!(output.content, "> [!lemma] Lemma\n> Let $x \\in \\mathbb{R}$.");
//! ```

pub mod context;
pub mod environment;
pub mod markup;
pub mod math;

pub use context::{
    ConversionState, Converter, Direction, EnvironmentKind, PipelineConfig, ReferenceMode,
};

use crate::core::pipeline::{run_isolated, settle};
use crate::features::citations::convert_citations;
use crate::features::delimiters::{normalize, FORWARD_TABLE};
use crate::features::macros::expand_macros;
use crate::features::refs::process_references;
use crate::utils::error::{ConversionOutput, ConversionResult};

impl Converter {
    /// Run one phase in isolation
    fn phase<F>(&mut self, name: &'static str, input: String, f: F) -> String
    where
        F: FnOnce(&mut Self, &str) -> ConversionResult<String>,
    {
        let result = run_isolated(name, || f(self, &input));
        settle(name, input, result, &mut self.state.diagnostics)
    }

    /// Convert a document; state from any earlier run is discarded first
    pub fn convert(&mut self, input: &str) -> ConversionOutput {
        self.state.reset();
        let mut text = input.to_string();

        if self.config.expand_macros {
            text = self.phase("macros", text, |conv, t| {
                expand_macros(t, &mut conv.state.diagnostics)
            });
        }
        if self.config.convert_environments {
            text = self.phase("environments", text, |conv, t| conv.resolve_environments(t));
        }
        text = self.phase("references", text, |conv, t| {
            let state = &mut conv.state;
            process_references(t, &conv.config, &mut state.labels, &mut state.diagnostics)
        });
        if self.config.convert_citations {
            text = self.phase("citations", text, |conv, t| {
                convert_citations(t, &conv.config.citation_templates, &mut conv.state.diagnostics)
            });
        }
        if self.config.normalize_delimiters {
            text = self.phase("delimiters", text, |conv, t| {
                normalize(t, FORWARD_TABLE, &mut conv.state.diagnostics)
            });
        }
        if self.config.strip_sizing_commands {
            text = self.phase("sizing", text, |_, t| markup::strip_sizing_commands(t));
        }
        if self.config.unify_prose_command {
            text = self.phase("prose", text, |_, t| markup::unify_prose_commands(t));
        }
        if self.config.convert_headings {
            text = self.phase("headings", text, |_, t| markup::convert_headings(t));
        }

        log::debug!("conversion finished: {}", self.state.diagnostics.summary());
        let diagnostics = std::mem::take(&mut self.state.diagnostics).into_vec();
        ConversionOutput::with_diagnostics(text, diagnostics)
    }
}

/// Convert with `config` using a fresh converter
pub fn latex_to_markdown(input: &str, config: &PipelineConfig) -> ConversionOutput {
    Converter::with_config(config.clone()).convert(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::diagnostics::DiagnosticKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_pipeline() {
        let input = "\\newcommand{\\vect}[1]{\\mathbf{#1}}\n\
                     \\section{Intro}\n\
                     \\begin{equation}\\label{eq:a} \\vect{v} = 0 \\end{equation}\n\
                     See \\eqref{eq:a} and \\cite{foo}.";
        let out = latex_to_markdown(input, &PipelineConfig::default());
        assert_eq!(
            out.content,
            "## Intro\n$$\n\\mathbf{v} = 0 \\tag{1}\n$$\nSee (1) and [cite: foo]."
        );
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_state_resets_between_runs() {
        let mut converter = Converter::new();
        let input = "\\begin{theorem}A\\end{theorem}";
        let first = converter.convert(input);
        let second = converter.convert(input);
        assert_eq!(first.content, second.content);
        assert!(first.content.contains("Theorem"));
    }

    #[test]
    fn test_disabled_phases() {
        let config = PipelineConfig {
            convert_environments: false,
            convert_citations: false,
            normalize_delimiters: false,
            ..PipelineConfig::default()
        };
        let input = "\\begin{equation}x\\end{equation} \\cite{a} \\(y\\)";
        let out = latex_to_markdown(input, &config);
        assert_eq!(out.content, input);
    }

    #[test]
    fn test_diagnostics_collected() {
        let out = latex_to_markdown("\\begin{align} x \\ref{nope}", &PipelineConfig::default());
        let kinds: Vec<_> = out.diagnostics.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiagnosticKind::UnmatchedEnvironment));
        assert!(kinds.contains(&DiagnosticKind::UndefinedReference));
    }
}
