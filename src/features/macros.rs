//! LaTeX Macro Expansion Module
//!
//! A lightweight, bounded macro expander. Supports `\newcommand`,
//! `\renewcommand`, `\providecommand` (all optionally starred), `\def` and
//! `\DeclareMathOperator`, followed by a fixed table of built-in shorthands.
//!
//! Expansion is a single pass per macro, longest name first. A body that
//! invokes another macro is only expanded when that macro comes later in the
//! order; nothing is expanded to a fixpoint.

use fxhash::FxHashMap;

use crate::data::constants::BUILTIN_MACROS;
use crate::utils::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::utils::edits::EditList;
use crate::utils::error::ConversionResult;
use crate::utils::scan::{
    is_inert, is_letter_at, read_braced, read_bracketed, read_letters, skip_inline_space,
    skip_whitespace, widen_to_line,
};

/// Largest arity TeX accepts (`#1`..`#9`)
pub const MAX_ARITY: usize = 9;

/// A macro definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    /// Macro name (without backslash)
    pub name: String,
    /// Number of arguments
    pub num_args: usize,
    /// Default for an optional first argument
    pub default: Option<String>,
    /// Replacement text (with #1, #2, etc. placeholders)
    pub replacement: String,
}

impl Macro {
    /// Create a simple macro with no arguments
    pub fn simple(name: &str, replacement: &str) -> Self {
        Self::with_args(name, 0, replacement)
    }

    /// Create a macro with required arguments
    pub fn with_args(name: &str, num_args: usize, replacement: &str) -> Self {
        Self {
            name: name.to_string(),
            num_args,
            default: None,
            replacement: replacement.to_string(),
        }
    }

    /// Create a macro with an optional first argument
    pub fn with_optional(name: &str, num_args: usize, default: &str, replacement: &str) -> Self {
        Self {
            default: Some(default.to_string()),
            ..Self::with_args(name, num_args, replacement)
        }
    }

    /// Substitute `#1..#N` in the replacement text
    ///
    /// Placeholders beyond the captured arguments become empty. Argument text
    /// is inserted literally and never rescanned for placeholders.
    pub fn instantiate(&self, args: &[String]) -> String {
        let bytes = self.replacement.as_bytes();
        let mut out = String::with_capacity(self.replacement.len());
        let mut last = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'#' && i + 1 < bytes.len() && (b'1'..=b'9').contains(&bytes[i + 1]) {
                out.push_str(&self.replacement[last..i]);
                let idx = (bytes[i + 1] - b'1') as usize;
                if let Some(arg) = args.get(idx) {
                    out.push_str(arg);
                }
                i += 2;
                last = i;
                continue;
            }
            i += 1;
        }
        out.push_str(&self.replacement[last..]);
        out
    }
}

/// Macro database, owned by one conversion run
#[derive(Debug, Default, Clone)]
pub struct MacroDb {
    macros: FxHashMap<String, Macro>,
}

impl MacroDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database holding the built-in shorthands (`\R`, `\bb{..}`, ...)
    pub fn builtins() -> Self {
        let mut db = Self::new();
        for &(name, arity, body) in BUILTIN_MACROS {
            db.define(Macro::with_args(name, arity, body));
        }
        db
    }

    /// Define a macro, replacing any earlier definition of the same name
    pub fn define(&mut self, macro_def: Macro) {
        self.macros.insert(macro_def.name.clone(), macro_def);
    }

    /// Define a macro only if the name is free (`\providecommand`)
    pub fn provide(&mut self, macro_def: Macro) {
        self.macros
            .entry(macro_def.name.clone())
            .or_insert(macro_def);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Definitions in expansion order: longest name first, ties by name
    pub fn expansion_order(&self) -> Vec<&Macro> {
        let mut defs: Vec<&Macro> = self.macros.values().collect();
        defs.sort_by(|a, b| {
            b.name
                .len()
                .cmp(&a.name.len())
                .then_with(|| a.name.cmp(&b.name))
        });
        defs
    }
}

// ============================================================================
// Definition Collection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefKind {
    NewCommand,
    ProvideCommand,
    Def,
    MathOperator,
}

fn definition_kind(command: &str) -> Option<DefKind> {
    match command {
        "newcommand" | "renewcommand" => Some(DefKind::NewCommand),
        "providecommand" => Some(DefKind::ProvideCommand),
        "def" => Some(DefKind::Def),
        "DeclareMathOperator" => Some(DefKind::MathOperator),
        _ => None,
    }
}

/// Outcome of parsing one definition command
#[derive(Debug)]
enum Parsed {
    /// A valid definition spanning up to `end`
    Defined(Macro, usize),
    /// Name is not purely alphabetic
    InvalidName(String),
    /// Declared argument count is not a number in 0..=9
    BadArity(String),
    /// Missing braces or body; left alone
    Malformed,
}

/// Read the macro name at `pos`: `{\name}` or `\name`
fn read_macro_name(text: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    match bytes.get(pos)? {
        b'{' => {
            let group = read_braced(text, pos)?;
            Some((text[group.inner].trim().to_string(), group.end))
        }
        b'\\' => {
            let letters = read_letters(text, pos + 1);
            if letters.is_empty() {
                // A single non-letter control symbol such as `\@`
                let ch = text[pos + 1..].chars().next()?;
                let end = pos + 1 + ch.len_utf8();
                Some((text[pos..end].to_string(), end))
            } else {
                Some((format!("\\{}", letters), pos + 1 + letters.len()))
            }
        }
        _ => None,
    }
}

/// `\name` with a non-empty, purely alphabetic name
fn valid_name(raw: &str) -> bool {
    raw.strip_prefix('\\')
        .is_some_and(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphabetic()))
}

fn parse_newcommand(text: &str, pos: usize) -> Parsed {
    let mut pos = pos;
    if text.as_bytes().get(pos) == Some(&b'*') {
        pos += 1;
    }
    pos = skip_whitespace(text, pos);
    let Some((raw, after_name)) = read_macro_name(text, pos) else {
        return Parsed::Malformed;
    };
    if !valid_name(&raw) {
        return Parsed::InvalidName(raw);
    }
    let name = &raw[1..];

    let mut pos = skip_whitespace(text, after_name);
    let mut num_args = 0;
    let mut default = None;

    if text.as_bytes().get(pos) == Some(&b'[') {
        let Some(group) = read_bracketed(text, pos) else {
            return Parsed::Malformed;
        };
        let spec = text[group.inner].trim();
        match spec.parse::<usize>() {
            Ok(n) if n <= MAX_ARITY => num_args = n,
            _ => return Parsed::BadArity(spec.to_string()),
        }
        pos = skip_whitespace(text, group.end);

        if text.as_bytes().get(pos) == Some(&b'[') {
            let Some(group) = read_bracketed(text, pos) else {
                return Parsed::Malformed;
            };
            default = Some(text[group.inner].to_string());
            pos = skip_whitespace(text, group.end);
        }
    }

    let Some(body) = read_braced(text, pos) else {
        return Parsed::Malformed;
    };
    let replacement = &text[body.inner];
    let macro_def = match default {
        Some(ref d) if num_args > 0 => Macro::with_optional(name, num_args, d, replacement),
        _ => Macro::with_args(name, num_args, replacement),
    };
    Parsed::Defined(macro_def, body.end)
}

/// `\def\name#1#2{body}`
fn parse_def(text: &str, pos: usize) -> Parsed {
    let pos = skip_whitespace(text, pos);
    if text.as_bytes().get(pos) != Some(&b'\\') {
        return Parsed::Malformed;
    }
    let Some((raw, mut pos)) = read_macro_name(text, pos) else {
        return Parsed::Malformed;
    };
    if !valid_name(&raw) {
        return Parsed::InvalidName(raw);
    }
    let name = &raw[1..];

    let bytes = text.as_bytes();
    let mut num_args = 0;
    while bytes.get(pos) == Some(&b'#') {
        match bytes.get(pos + 1) {
            Some(d) if d.is_ascii_digit() && *d != b'0' => {
                num_args = num_args.max((d - b'0') as usize);
                pos += 2;
            }
            _ => {
                let param: String = text[pos..].chars().take(2).collect();
                return Parsed::BadArity(param);
            }
        }
    }

    let pos = skip_whitespace(text, pos);
    let Some(body) = read_braced(text, pos) else {
        return Parsed::Malformed;
    };
    Parsed::Defined(Macro::with_args(name, num_args, &text[body.inner]), body.end)
}

/// `\DeclareMathOperator{\name}{text}`, starred form gives limits
fn parse_math_operator(text: &str, pos: usize) -> Parsed {
    let mut pos = pos;
    let starred = text.as_bytes().get(pos) == Some(&b'*');
    if starred {
        pos += 1;
    }
    pos = skip_whitespace(text, pos);
    let Some((raw, after_name)) = read_macro_name(text, pos) else {
        return Parsed::Malformed;
    };
    if !valid_name(&raw) {
        return Parsed::InvalidName(raw);
    }
    let name = &raw[1..];
    let Some(body) = read_braced(text, skip_whitespace(text, after_name)) else {
        return Parsed::Malformed;
    };
    let star = if starred { "*" } else { "" };
    let replacement = format!("\\operatorname{}{{{}}}", star, &text[body.inner]);
    Parsed::Defined(Macro::simple(name, &replacement), body.end)
}

/// Collect every definition and remove it from the text
///
/// Definitions with an invalid name or arity stay in the text and are reported.
pub fn extract_definitions(
    text: &str,
    diags: &mut Diagnostics,
) -> ConversionResult<(MacroDb, String)> {
    let mut db = MacroDb::new();
    let mut edits = EditList::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' || is_inert(text, i) {
            i += 1;
            continue;
        }
        let command = read_letters(text, i + 1);
        let Some(kind) = definition_kind(command) else {
            i += 1 + command.len().max(1);
            continue;
        };
        let after = i + 1 + command.len();

        let parsed = match kind {
            DefKind::NewCommand | DefKind::ProvideCommand => parse_newcommand(text, after),
            DefKind::Def => parse_def(text, after),
            DefKind::MathOperator => parse_math_operator(text, after),
        };

        match parsed {
            Parsed::Defined(macro_def, end) => {
                if kind == DefKind::ProvideCommand {
                    db.provide(macro_def);
                } else {
                    db.define(macro_def);
                }
                edits.delete(widen_to_line(text, i..end));
                i = end;
            }
            Parsed::InvalidName(raw) => {
                diags.add(
                    Diagnostic::new(
                        DiagnosticKind::InvalidMacroName,
                        format!("macro name '{}' is not purely alphabetic", raw),
                        i,
                    )
                    .with_suggestion("use a name made of ASCII letters only"),
                );
                i = after;
            }
            Parsed::BadArity(spec) => {
                diags.report(
                    DiagnosticKind::ArityMismatch,
                    format!(
                        "\\{} declares argument count '{}', expected 0 to {}",
                        command, spec, MAX_ARITY
                    ),
                    i,
                );
                i = after;
            }
            Parsed::Malformed => i = after,
        }
    }

    log::debug!("collected {} macro definitions", db.len());
    Ok((db, edits.apply(text)?))
}

// ============================================================================
// Macro Expansion
// ============================================================================

/// Capture the arguments of an invocation ending its name at `pos`
///
/// Returns the arguments, the end of the invocation and whether every
/// required argument was found.
fn capture_arguments(text: &str, pos: usize, macro_def: &Macro) -> (Vec<String>, usize, bool) {
    let mut args = Vec::with_capacity(macro_def.num_args);
    let mut pos = pos;
    let mut required = macro_def.num_args;

    if let Some(ref default) = macro_def.default {
        let p = skip_inline_space(text, pos);
        match read_bracketed(text, p) {
            Some(group) => {
                args.push(text[group.inner].to_string());
                pos = group.end;
            }
            None => args.push(default.clone()),
        }
        required -= 1;
    }

    for _ in 0..required {
        let p = skip_whitespace(text, pos);
        if text.as_bytes().get(p) != Some(&b'{') {
            return (args, pos, false);
        }
        match read_braced(text, p) {
            Some(group) => {
                args.push(text[group.inner].to_string());
                pos = group.end;
            }
            None => return (args, pos, false),
        }
    }
    (args, pos, true)
}

/// Expand every invocation of one macro in a single pass
fn expand_one(text: &str, macro_def: &Macro, diags: &mut Diagnostics) -> ConversionResult<String> {
    let needle = format!("\\{}", macro_def.name);
    let mut edits = EditList::new();
    let mut search = 0;

    while let Some(found) = text[search..].find(&needle) {
        let start = search + found;
        let name_end = start + needle.len();
        search = name_end;

        if is_letter_at(text, name_end) || is_inert(text, start) {
            continue;
        }

        let (mut args, end, complete) = capture_arguments(text, name_end, macro_def);
        if !complete {
            diags.report(
                DiagnosticKind::ArityMismatch,
                format!(
                    "\\{} expects {} argument(s), found {}",
                    macro_def.name,
                    macro_def.num_args,
                    args.len()
                ),
                start,
            );
            args.resize(macro_def.num_args, String::new());
        }
        edits.replace(start..end, macro_def.instantiate(&args));
        search = end;
    }

    edits.apply(text)
}

/// Expand every macro of `db` in expansion order
pub fn expand_with(text: &str, db: &MacroDb, diags: &mut Diagnostics) -> ConversionResult<String> {
    let mut current = text.to_string();
    for macro_def in db.expansion_order() {
        if current.contains(&format!("\\{}", macro_def.name)) {
            current = expand_one(&current, macro_def, diags)?;
        }
    }
    Ok(current)
}

/// The macro phase: collect user definitions, expand them, then the built-ins
pub fn expand_macros(text: &str, diags: &mut Diagnostics) -> ConversionResult<String> {
    let (db, cleaned) = extract_definitions(text, diags)?;
    let expanded = expand_with(&cleaned, &db, diags)?;
    expand_with(&expanded, &MacroDb::builtins(), diags)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> (String, Diagnostics) {
        let mut diags = Diagnostics::new();
        let out = expand_macros(text, &mut diags).unwrap();
        (out, diags)
    }

    #[test]
    fn test_simple_macro() {
        let (out, diags) = run("\\newcommand{\\foo}{bar}\n\\foo and \\foo.");
        assert_eq!(out, "bar and bar.");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_macro_with_args() {
        let (out, _) = run("\\newcommand{\\pair}[2]{(#1, #2)}\n$\\pair{a} {b}$");
        assert_eq!(out, "$(a, b)$");
    }

    #[test]
    fn test_missing_argument_is_empty() {
        let (out, diags) = run("\\newcommand{\\pair}[2]{(#1, #2)}\n$\\pair{a}$");
        assert_eq!(out, "$(a, )$");
        assert_eq!(diags.count_of(DiagnosticKind::ArityMismatch), 1);
    }

    #[test]
    fn test_optional_default() {
        let (out, _) = run("\\newcommand{\\vec}[2][x]{#1_#2}\n\\vec{1} \\vec[y]{2}");
        assert_eq!(out, "x_1 y_2");
    }

    #[test]
    fn test_longest_name_first() {
        let (out, _) = run("\\newcommand{\\a}{A}\n\\newcommand{\\ab}{B}\n\\ab \\a \\abc");
        assert_eq!(out, "B A \\abc");
    }

    #[test]
    fn test_single_pass() {
        // `\b` is shorter, so it is expanded after `\aa` and sees its output.
        // `\aa` is never rescanned for itself.
        let (out, _) = run("\\def\\aa{\\aa\\b}\n\\def\\b{x}\n\\aa");
        assert_eq!(out, "\\aax");
    }

    #[test]
    fn test_later_definition_wins() {
        let (out, _) = run("\\newcommand{\\x}{1}\n\\renewcommand{\\x}{2}\n\\x");
        assert_eq!(out, "2");
    }

    #[test]
    fn test_providecommand_keeps_existing() {
        let (out, _) = run("\\newcommand{\\x}{1}\n\\providecommand{\\x}{2}\n\\x");
        assert_eq!(out, "1");
    }

    #[test]
    fn test_invalid_name_left_in_place() {
        let text = "\\newcommand{\\my@cmd}{x}\nbody";
        let (out, diags) = run(text);
        assert_eq!(out, text);
        assert_eq!(diags.count_of(DiagnosticKind::InvalidMacroName), 1);
    }

    #[test]
    fn test_bad_arity_left_in_place() {
        let text = "\\newcommand{\\f}[12]{x}\nbody";
        let (out, diags) = run(text);
        assert_eq!(out, text);
        assert_eq!(diags.count_of(DiagnosticKind::ArityMismatch), 1);
    }

    #[test]
    fn test_def_with_params() {
        let (out, _) = run("\\def\\sq#1{#1^2}\n$\\sq{y}$");
        assert_eq!(out, "$y^2$");
    }

    #[test]
    fn test_declare_math_operator() {
        let (out, _) = run("\\DeclareMathOperator{\\argmax}{arg\\,max}\n$\\argmax_x f$");
        assert_eq!(out, "$\\operatorname{arg\\,max}_x f$");
    }

    #[test]
    fn test_commented_definition_ignored() {
        let (out, _) = run("% \\newcommand{\\x}{1}\nkeep");
        assert_eq!(out, "% \\newcommand{\\x}{1}\nkeep");
    }

    #[test]
    fn test_inline_definition_keeps_line() {
        let (out, _) = run("text \\newcommand{\\x}{1} more \\x");
        assert_eq!(out, "text  more 1");
    }

    #[test]
    fn test_builtins() {
        let (out, _) = run("$x \\in \\R, \\bb{K}, \\Rightarrow$");
        assert_eq!(out, "$x \\in \\mathbb{R}, \\mathbb{K}, \\Rightarrow$");
    }

    #[test]
    fn test_user_macro_shadows_builtin() {
        let (out, _) = run("\\renewcommand{\\R}{\\mathcal{R}}\n$\\R$");
        assert_eq!(out, "$\\mathcal{R}$");
    }

    #[test]
    fn test_preserve_unknown_commands() {
        let (out, _) = run("\\unknown{arg}");
        assert_eq!(out, "\\unknown{arg}");
    }

    #[test]
    fn test_instantiate_does_not_rescan_arguments() {
        let m = Macro::with_args("f", 2, "#1|#2");
        assert_eq!(m.instantiate(&["#2".to_string(), "b".to_string()]), "#2|b");
    }
}
