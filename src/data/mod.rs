//! Data layer - Static mappings and constants
//!
//! This module contains all static data used by the conversion phases:
//! - Theorem type defaults
//! - Math environment layouts and nesting rules
//! - Built-in macros and cleanup command lists
//! - Default citation and reference templates

pub mod constants;

// Re-export commonly used items
pub use constants::{
    nesting_allowed, MathLayout, TheoremInfo, BUILTIN_MACROS, HEADING_LEVELS, MATH_ENVIRONMENTS,
    THEOREM_TYPES,
};
