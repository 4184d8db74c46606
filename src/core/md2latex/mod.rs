//! Markdown-with-math back to LaTeX
//!
//! The reverse direction undoes the Markdown-specific syntax the forward
//! pipeline introduces: callouts become theorem-like environments, headings
//! become sectioning commands, emphasis becomes font commands and `$`/`$$`
//! become `\(..\)`/`\[..\]`. Math content itself is left as written.
//!
//! ```rust
//! use mdlax::core::md2latex::markdown_to_latex;
//! use mdlax::PipelineConfig;
//!
//! let out = markdown_to_latex("## Intro\nLet $x > 0$.", &PipelineConfig::default());
//! assert_eq!(out.content, "\\section{Intro}\nLet \\(x > 0\\).");
//! ```

mod callouts;
mod markup;

pub use callouts::convert_callouts;
pub use markup::{convert_emphasis, convert_headings};

use crate::core::latex2md::PipelineConfig;
use crate::core::pipeline::{run_isolated, settle};
use crate::features::delimiters::{normalize, REVERSE_TABLE};
use crate::utils::diagnostics::Diagnostics;
use crate::utils::error::ConversionOutput;

/// Convert Markdown with math to LaTeX
///
/// `convert_environments`, `convert_headings` and `normalize_delimiters`
/// switch the matching phases; the other options only apply forward.
pub fn markdown_to_latex(input: &str, config: &PipelineConfig) -> ConversionOutput {
    let mut diags = Diagnostics::new();
    let mut text = input.to_string();

    if config.convert_environments {
        let result = run_isolated("callouts", || convert_callouts(&text));
        text = settle("callouts", text, result, &mut diags);
    }
    if config.convert_headings {
        let result = run_isolated("headings", || convert_headings(&text));
        text = settle("headings", text, result, &mut diags);
        let result = run_isolated("emphasis", || convert_emphasis(&text));
        text = settle("emphasis", text, result, &mut diags);
    }
    if config.normalize_delimiters {
        let mut phase_diags = Diagnostics::new();
        let result = run_isolated("delimiters", || {
            normalize(&text, REVERSE_TABLE, &mut phase_diags)
        });
        diags.extend(phase_diags);
        text = settle("delimiters", text, result, &mut diags);
    }

    log::debug!("reverse conversion finished: {}", diags.summary());
    ConversionOutput::with_diagnostics(text, diags.into_vec())
}
