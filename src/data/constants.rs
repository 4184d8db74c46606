//! Constants and mapping tables for LaTeX to Markdown conversion
//!
//! - Theorem-like environment names and their default callouts
//! - Math display environments and how they are laid out
//! - Nesting allow-lists
//! - Built-in macros, sizing and prose commands
//! - Default citation and reference templates

use lazy_static::lazy_static;
use phf::phf_map;
use std::collections::HashMap;

// ============================================================================
// Theorem Environment Mappings
// ============================================================================

/// Theorem type information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TheoremInfo {
    /// Display name in output ("Theorem", "Lemma", ...)
    pub display_name: &'static str,
    /// Callout type written between `[!` and `]`
    pub callout: &'static str,
}

const fn thm(display_name: &'static str, callout: &'static str) -> TheoremInfo {
    TheoremInfo {
        display_name,
        callout,
    }
}

lazy_static! {
    /// Default theorem-like environments, used when a document does not
    /// declare them with `\newtheorem`
    pub static ref THEOREM_TYPES: HashMap<&'static str, TheoremInfo> = {
        let mut m = HashMap::new();

        // Theorems
        m.insert("theorem", thm("Theorem", "theorem"));
        m.insert("thm", thm("Theorem", "theorem"));
        m.insert("Theorem", thm("Theorem", "theorem"));

        // Lemmas
        m.insert("lemma", thm("Lemma", "lemma"));
        m.insert("lem", thm("Lemma", "lemma"));
        m.insert("Lemma", thm("Lemma", "lemma"));

        // Propositions
        m.insert("proposition", thm("Proposition", "proposition"));
        m.insert("prop", thm("Proposition", "proposition"));

        // Corollaries
        m.insert("corollary", thm("Corollary", "corollary"));
        m.insert("cor", thm("Corollary", "corollary"));

        m.insert("conjecture", thm("Conjecture", "conjecture"));
        m.insert("claim", thm("Claim", "claim"));
        m.insert("fact", thm("Fact", "fact"));
        m.insert("assumption", thm("Assumption", "assumption"));
        m.insert("hypothesis", thm("Hypothesis", "hypothesis"));
        m.insert("axiom", thm("Axiom", "axiom"));
        m.insert("property", thm("Property", "property"));

        // Definitions
        m.insert("definition", thm("Definition", "definition"));
        m.insert("defn", thm("Definition", "definition"));
        m.insert("def", thm("Definition", "definition"));

        // Examples and exercises
        m.insert("example", thm("Example", "example"));
        m.insert("ex", thm("Example", "example"));
        m.insert("exercise", thm("Exercise", "exercise"));
        m.insert("problem", thm("Problem", "problem"));
        m.insert("question", thm("Question", "question"));
        m.insert("solution", thm("Solution", "solution"));
        m.insert("notation", thm("Notation", "notation"));

        // Remarks
        m.insert("remark", thm("Remark", "remark"));
        m.insert("rem", thm("Remark", "remark"));
        m.insert("note", thm("Note", "note"));
        m.insert("observation", thm("Observation", "observation"));
        m.insert("case", thm("Case", "case"));
        m.insert("summary", thm("Summary", "summary"));
        m.insert("conclusion", thm("Conclusion", "conclusion"));

        // Proof is never numbered
        m.insert("proof", thm("Proof", "proof"));

        m
    };
}

/// Closing mark appended to proofs
pub const QED_MARK: &str = "∎";

// ============================================================================
// Math Display Environments
// ============================================================================

/// How a math display environment is written inside `$$ ... $$`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathLayout {
    /// Content only (`equation`)
    Equation,
    /// Rows inside `\begin{aligned}`
    Aligned,
    /// Rows inside `\begin{alignedat}{n}`
    AlignedAt,
    /// Rows inside `\begin{gathered}`
    Gathered,
    /// Rows inside the environment's own name (matrices, `cases`, `array`, `CD`)
    Native,
    /// `eqnarray`: three columns collapsed into `aligned`
    LegacyArray,
}

/// Math display environments recognized by the environment resolver
pub static MATH_ENVIRONMENTS: phf::Map<&'static str, MathLayout> = phf_map! {
    "equation" => MathLayout::Equation,
    "equation*" => MathLayout::Equation,
    "displaymath" => MathLayout::Equation,

    "align" => MathLayout::Aligned,
    "align*" => MathLayout::Aligned,
    "flalign" => MathLayout::Aligned,
    "flalign*" => MathLayout::Aligned,
    "split" => MathLayout::Aligned,
    "alignat" => MathLayout::AlignedAt,
    "alignat*" => MathLayout::AlignedAt,

    "gather" => MathLayout::Gathered,
    "gather*" => MathLayout::Gathered,
    "multline" => MathLayout::Gathered,
    "multline*" => MathLayout::Gathered,

    "aligned" => MathLayout::Native,
    "alignedat" => MathLayout::Native,
    "gathered" => MathLayout::Native,
    "matrix" => MathLayout::Native,
    "pmatrix" => MathLayout::Native,
    "bmatrix" => MathLayout::Native,
    "Bmatrix" => MathLayout::Native,
    "vmatrix" => MathLayout::Native,
    "Vmatrix" => MathLayout::Native,
    "smallmatrix" => MathLayout::Native,
    "cases" => MathLayout::Native,
    "dcases" => MathLayout::Native,
    "rcases" => MathLayout::Native,
    "array" => MathLayout::Native,
    "subarray" => MathLayout::Native,
    "CD" => MathLayout::Native,

    "eqnarray" => MathLayout::LegacyArray,
    "eqnarray*" => MathLayout::LegacyArray,
};

/// Environments that take a leading `{...}` argument before their rows
pub static LEADING_ARGUMENT_ENVIRONMENTS: phf::Set<&'static str> = phf::phf_set! {
    "array", "subarray", "alignat", "alignat*", "alignedat",
};

// ============================================================================
// Nesting Rules
// ============================================================================

const INNER_MATH: &[&str] = &[
    "split", "aligned", "alignedat", "gathered", "matrix", "pmatrix", "bmatrix", "Bmatrix",
    "vmatrix", "Vmatrix", "smallmatrix", "cases", "dcases", "rcases", "array", "subarray",
];

const INNER_BLOCK: &[&str] = &[
    "matrix", "pmatrix", "bmatrix", "Bmatrix", "vmatrix", "Vmatrix", "smallmatrix", "cases",
    "dcases", "rcases", "array", "subarray", "aligned", "gathered",
];

/// Allowed children per math environment; names without an entry accept anything
pub static NESTING_ALLOW: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "equation" => INNER_MATH,
    "equation*" => INNER_MATH,
    "displaymath" => INNER_MATH,
    "align" => INNER_BLOCK,
    "align*" => INNER_BLOCK,
    "flalign" => INNER_BLOCK,
    "flalign*" => INNER_BLOCK,
    "alignat" => INNER_BLOCK,
    "alignat*" => INNER_BLOCK,
    "gather" => INNER_BLOCK,
    "gather*" => INNER_BLOCK,
    "multline" => INNER_BLOCK,
    "multline*" => INNER_BLOCK,
    "eqnarray" => INNER_BLOCK,
    "eqnarray*" => INNER_BLOCK,
    "split" => INNER_BLOCK,
    "aligned" => INNER_BLOCK,
    "alignedat" => INNER_BLOCK,
    "gathered" => INNER_BLOCK,
    "matrix" => INNER_BLOCK,
    "pmatrix" => INNER_BLOCK,
    "bmatrix" => INNER_BLOCK,
    "Bmatrix" => INNER_BLOCK,
    "vmatrix" => INNER_BLOCK,
    "Vmatrix" => INNER_BLOCK,
    "smallmatrix" => INNER_BLOCK,
    "cases" => INNER_BLOCK,
    "dcases" => INNER_BLOCK,
    "rcases" => INNER_BLOCK,
    "array" => INNER_BLOCK,
    "subarray" => INNER_BLOCK,
    "CD" => &[],
};

/// Whether `child` may be opened directly inside `parent`
pub fn nesting_allowed(parent: &str, child: &str) -> bool {
    match NESTING_ALLOW.get(parent) {
        Some(allowed) => allowed.contains(&child),
        None => true,
    }
}

// ============================================================================
// Macros and Math Cleanup
// ============================================================================

/// Built-in macros applied after user macros: `(name, arity, body)`
pub const BUILTIN_MACROS: &[(&str, usize, &str)] = &[
    ("R", 0, "\\mathbb{R}"),
    ("N", 0, "\\mathbb{N}"),
    ("Z", 0, "\\mathbb{Z}"),
    ("Q", 0, "\\mathbb{Q}"),
    ("C", 0, "\\mathbb{C}"),
    ("F", 0, "\\mathbb{F}"),
    ("P", 0, "\\mathbb{P}"),
    ("E", 0, "\\mathbb{E}"),
    ("bb", 1, "\\mathbb{#1}"),
];

/// Manual delimiter sizing commands, stripped by the sizing cleanup
pub const SIZING_COMMANDS: &[&str] = &[
    "Biggl", "Biggr", "Biggm", "Bigg", "biggl", "biggr", "biggm", "bigg", "Bigl", "Bigr", "Bigm",
    "Big", "bigl", "bigr", "bigm", "big",
];

/// Prose-in-math commands unified to `\text`
pub const PROSE_COMMANDS: &[&str] = &["mbox", "textrm", "textnormal", "hbox", "textup"];

/// Sectioning commands and the Markdown heading level they map to
pub static HEADING_LEVELS: phf::Map<&'static str, usize> = phf_map! {
    "chapter" => 1,
    "section" => 2,
    "subsection" => 3,
    "subsubsection" => 4,
    "paragraph" => 5,
};

// ============================================================================
// Citations and References
// ============================================================================

/// Citation commands and their default output template (`$key` is the citation key)
pub const DEFAULT_CITATION_TEMPLATES: &[(&str, &str)] = &[
    ("cite", "[cite: $key]"),
    ("citep", "[cite: $key]"),
    ("citet", "[cite: $key]"),
    ("parencite", "[cite: $key]"),
    ("textcite", "[cite: $key]"),
    ("autocite", "[cite: $key]"),
    ("citeauthor", "[author: $key]"),
    ("citeyear", "[year: $key]"),
];

/// Reference commands and their default output template
///
/// Variables: `$n` number, `$name` display name (falls back to the number),
/// `$type` category name, `$label` raw label.
pub const DEFAULT_REFERENCE_TEMPLATES: &[(&str, &str)] = &[
    ("ref", "$n"),
    ("eqref", "($n)"),
    ("pageref", "$n"),
    ("nameref", "$name"),
    ("autoref", "$type $n"),
    ("vref", "$n"),
];

/// Literal substituted for a reference to an unknown label
pub const UNDEFINED_REFERENCE: &str = "(?)";

/// Placeholder used in placeholder mode (`$label` is the raw label)
pub const REFERENCE_PLACEHOLDER: &str = "(ref: $label)";

/// How far back the label resolver looks for an enclosing construct
pub const LABEL_CONTEXT_WINDOW: usize = 400;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theorem_lookup() {
        let thm = THEOREM_TYPES.get("thm").unwrap();
        assert_eq!(thm.display_name, "Theorem");
        assert_eq!(thm.callout, "theorem");
        assert!(THEOREM_TYPES.contains_key("proof"));
    }

    #[test]
    fn test_math_layouts() {
        assert_eq!(MATH_ENVIRONMENTS.get("align*"), Some(&MathLayout::Aligned));
        assert_eq!(MATH_ENVIRONMENTS.get("pmatrix"), Some(&MathLayout::Native));
        assert_eq!(MATH_ENVIRONMENTS.get("itemize"), None);
    }

    #[test]
    fn test_nesting_rules() {
        assert!(nesting_allowed("align", "pmatrix"));
        assert!(!nesting_allowed("align", "align"));
        assert!(nesting_allowed("equation", "split"));
        assert!(!nesting_allowed("CD", "matrix"));
        // Theorem-like parents have no allow-list.
        assert!(nesting_allowed("theorem", "align"));
    }

    #[test]
    fn test_sizing_longest_first() {
        // `big` must come after every longer command it prefixes.
        let big = SIZING_COMMANDS.iter().position(|c| *c == "big").unwrap();
        assert_eq!(big, SIZING_COMMANDS.len() - 1);
    }
}
