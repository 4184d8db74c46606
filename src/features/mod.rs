//! Feature modules - the individual rewriting phases
//!
//! This module contains the handlers each pipeline phase is built from:
//! - Math delimiter normalization
//! - Macro definition collection and expansion
//! - Theorem declarations, counters and callouts
//! - Labels and cross-references
//! - Citations

pub mod citations;
pub mod delimiters;
pub mod macros;
pub mod refs;
pub mod theorems;

// Re-export commonly used types
pub use delimiters::{DelimiterRule, FORWARD_TABLE, REVERSE_TABLE};
pub use macros::{Macro, MacroDb};
pub use refs::{LabelCategory, LabelRecord, LabelTable};
pub use theorems::{TheoremDecl, TheoremRegistry};
