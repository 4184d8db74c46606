//! Core state and structures for LaTeX to Markdown conversion
//!
//! This module contains the pipeline configuration and the converter that
//! owns every piece of per-run state.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::data::constants::{
    DEFAULT_CITATION_TEMPLATES, DEFAULT_REFERENCE_TEMPLATES, MATH_ENVIRONMENTS, THEOREM_TYPES,
};
use crate::data::MathLayout;
use crate::features::refs::LabelTable;
use crate::features::theorems::TheoremRegistry;
use crate::utils::diagnostics::Diagnostics;
use crate::utils::error::{ConversionError, ConversionResult};

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Conversion direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// LaTeX-flavored markup to Markdown with math
    #[default]
    Forward,
    /// Markdown with math back to LaTeX
    Reverse,
}

/// How reference commands (`\ref`, `\eqref`, ...) are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceMode {
    /// Leave reference commands untouched
    Ignore,
    /// Replace each reference with a placeholder naming the label
    Placeholder,
    /// Number labels and substitute the numbers
    #[default]
    Resolve,
}

/// Options for one conversion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Convert math and theorem-like environments
    /// Default: true
    pub convert_environments: bool,

    /// Additional environment names to track; unknown ones become generic `$$` blocks
    /// Default: empty
    pub extra_environments: IndexSet<String>,

    /// Track and convert `eqnarray`
    /// Default: true
    pub convert_legacy_array_env: bool,

    /// Strip `\label{..}` definitions that were not turned into tags
    /// Default: true
    pub remove_labels: bool,

    /// Default: resolve
    pub reference_mode: ReferenceMode,

    /// Collect and expand user macros and the built-in shorthands
    /// Default: true
    pub expand_macros: bool,

    /// Default: true
    pub convert_citations: bool,

    /// Drop `\big`-family sizing and `\displaystyle` inside math
    /// Default: false
    pub strip_sizing_commands: bool,

    /// Rewrite `\mbox`, `\textrm`, ... to `\text` inside math
    /// Default: true
    pub unify_prose_command: bool,

    /// Rewrite `\(..\)` and `\[..\]` delimiters
    /// Default: true
    pub normalize_delimiters: bool,

    /// Turn sectioning and font commands into Markdown syntax
    /// Default: true
    pub convert_headings: bool,

    /// Turn equation labels inside display math into `\tag{n}`
    /// Default: true
    pub tag_equations: bool,

    /// First number given in each label category
    /// Default: 1
    pub counter_base: u32,

    /// Citation command to template (`$key`)
    pub citation_templates: IndexMap<String, String>,

    /// Reference command to template (`$n`, `$name`, `$type`, `$label`)
    pub reference_templates: IndexMap<String, String>,
}

fn template_map(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            convert_environments: true,
            extra_environments: IndexSet::new(),
            convert_legacy_array_env: true,
            remove_labels: true,
            reference_mode: ReferenceMode::Resolve,
            expand_macros: true,
            convert_citations: true,
            strip_sizing_commands: false,
            unify_prose_command: true,
            normalize_delimiters: true,
            convert_headings: true,
            tag_equations: true,
            counter_base: 1,
            citation_templates: template_map(DEFAULT_CITATION_TEMPLATES),
            reference_templates: template_map(DEFAULT_REFERENCE_TEMPLATES),
        }
    }
}

impl PipelineConfig {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Environments and delimiters only; macros, references and citations untouched
    pub fn basic() -> Self {
        Self {
            convert_legacy_array_env: false,
            remove_labels: false,
            reference_mode: ReferenceMode::Ignore,
            expand_macros: false,
            convert_citations: false,
            unify_prose_command: false,
            convert_headings: false,
            tag_equations: false,
            ..Self::default()
        }
    }

    /// Every phase enabled, including sizing cleanup
    pub fn extended() -> Self {
        Self {
            strip_sizing_commands: true,
            ..Self::default()
        }
    }

    /// Check values that serde can not check on its own
    pub fn validate(&self) -> ConversionResult<()> {
        for name in &self.extra_environments {
            let base = name.strip_suffix('*').unwrap_or(name);
            if base.is_empty() || !base.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(ConversionError::InvalidConfig(format!(
                    "extra environment name '{}' must be letters with an optional '*'",
                    name
                )));
            }
        }
        for (command, template) in &self.citation_templates {
            if command.is_empty() || !command.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(ConversionError::InvalidConfig(format!(
                    "citation command '{}' must be letters only",
                    command
                )));
            }
            if !template.contains("$key") {
                return Err(ConversionError::InvalidConfig(format!(
                    "citation template for '{}' does not use $key",
                    command
                )));
            }
        }
        for command in self.reference_templates.keys() {
            if command.is_empty() || !command.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(ConversionError::InvalidConfig(format!(
                    "reference command '{}' must be letters only",
                    command
                )));
            }
        }
        Ok(())
    }

    /// Math layout for `name`, honoring the legacy-array switch
    pub fn math_layout(&self, name: &str) -> Option<MathLayout> {
        match MATH_ENVIRONMENTS.get(name) {
            Some(MathLayout::LegacyArray) if !self.convert_legacy_array_env => None,
            Some(layout) => Some(*layout),
            None => None,
        }
    }
}

// =============================================================================
// Conversion State
// =============================================================================

/// What kind of region an environment name opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    Theorem,
    Math(MathLayout),
    /// Listed in `extra_environments` but not otherwise known
    Extra,
}

/// Per-run state, reset at the start of every conversion
#[derive(Debug, Default)]
pub struct ConversionState {
    /// Theorem declarations and counters
    pub theorems: TheoremRegistry,
    /// Labels collected by the reference resolver
    pub labels: LabelTable,
    /// Collected diagnostics
    pub diagnostics: Diagnostics,
}

impl ConversionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.theorems.reset();
        self.labels.clear();
        self.diagnostics.clear();
    }
}

/// The converter; one value per call, never shared
pub struct Converter {
    pub(crate) config: PipelineConfig,
    pub(crate) state: ConversionState,
}

impl Converter {
    /// Create a new converter with default options
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create a new converter with custom options
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            state: ConversionState::new(),
        }
    }

    /// Get a reference to the current options
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Diagnostics collected so far in the current run
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.state.diagnostics
    }

    /// Classify an environment name, or `None` when it is not tracked
    pub(crate) fn environment_kind(&self, name: &str) -> Option<EnvironmentKind> {
        if self.state.theorems.is_declared(name) || THEOREM_TYPES.contains_key(name) {
            Some(EnvironmentKind::Theorem)
        } else if let Some(layout) = self.config.math_layout(name) {
            Some(EnvironmentKind::Math(layout))
        } else if self.config.extra_environments.contains(name) {
            Some(EnvironmentKind::Extra)
        } else {
            None
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.convert_environments);
        assert!(!config.strip_sizing_commands);
        assert_eq!(config.reference_mode, ReferenceMode::Resolve);
        assert_eq!(config.counter_base, 1);
        assert_eq!(
            config.citation_templates.get("cite").map(String::as_str),
            Some("[cite: $key]")
        );
    }

    #[test]
    fn test_presets() {
        let basic = PipelineConfig::basic();
        assert!(!basic.expand_macros);
        assert_eq!(basic.reference_mode, ReferenceMode::Ignore);
        assert!(PipelineConfig::extended().strip_sizing_commands);
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let mut config = PipelineConfig::default();
        config.extra_environments.insert("tikz picture".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConversionError::InvalidConfig(_))
        ));

        let mut config = PipelineConfig::default();
        config
            .citation_templates
            .insert("cite".to_string(), "[no key]".to_string());
        assert!(config.validate().is_err());

        assert!(PipelineConfig::extended().validate().is_ok());
    }

    #[test]
    fn test_legacy_switch() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.math_layout("eqnarray"), Some(MathLayout::LegacyArray));
        config.convert_legacy_array_env = false;
        assert_eq!(config.math_layout("eqnarray"), None);
    }

    #[test]
    fn test_environment_kind() {
        let mut config = PipelineConfig::default();
        config.extra_environments.insert("tikzcd".to_string());
        let converter = Converter::with_config(config);
        assert_eq!(converter.environment_kind("lemma"), Some(EnvironmentKind::Theorem));
        assert_eq!(
            converter.environment_kind("align*"),
            Some(EnvironmentKind::Math(MathLayout::Aligned))
        );
        assert_eq!(converter.environment_kind("tikzcd"), Some(EnvironmentKind::Extra));
        assert_eq!(converter.environment_kind("itemize"), None);
    }
}
