//! Core conversion modules
//!
//! This module contains the conversion engines:
//! - `latex2md`: LaTeX-flavored markup to Markdown with math
//! - `md2latex`: Markdown with math back to LaTeX
//! - `pipeline`: phase isolation shared by both directions

pub mod latex2md;
pub mod md2latex;
pub mod pipeline;

// Re-export main types and functions from latex2md
pub use latex2md::{
    latex_to_markdown, ConversionState, Converter, Direction, PipelineConfig, ReferenceMode,
};

// Re-export main functions from md2latex
pub use md2latex::markdown_to_latex;
