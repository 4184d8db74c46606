//! Citation formatting
//!
//! `\cite[pre][post]{k1,k2}` and its natbib/biblatex relatives are rewritten
//! through per-command templates. Each key is rendered on its own and the
//! results are joined with `", "`; the prenote and postnote wrap the list.

use indexmap::IndexMap;

use crate::utils::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::utils::edits::EditList;
use crate::utils::error::ConversionResult;
use crate::utils::scan::{
    fill_template, is_inert, read_braced, read_bracketed, read_letters, skip_whitespace,
};

/// A parsed citation command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiteGroup {
    pub command: String,
    pub keys: Vec<String>,
    /// Text before the citation (`\cite[see][]{k}`)
    pub prenote: Option<String>,
    /// Text after the citation, usually a locator
    pub postnote: Option<String>,
}

/// Keys may use letters, digits, `_`, `:` and `-`
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'-'))
}

/// Parse the arguments of a citation command; `pos` is just past its name
///
/// With one optional argument it is the postnote; with two, the first is the
/// prenote.
pub fn parse_citation(text: &str, command: &str, pos: usize) -> Option<(CiteGroup, usize)> {
    let bytes = text.as_bytes();
    let mut pos = pos;
    if bytes.get(pos) == Some(&b'*') {
        pos += 1;
    }

    let mut optional = Vec::new();
    loop {
        let p = skip_whitespace(text, pos);
        if optional.len() < 2 && bytes.get(p) == Some(&b'[') {
            let group = read_bracketed(text, p)?;
            optional.push(text[group.inner].trim().to_string());
            pos = group.end;
        } else {
            pos = p;
            break;
        }
    }

    let group = read_braced(text, pos)?;
    let keys = text[group.inner]
        .split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
    let (prenote, postnote) = match optional.len() {
        0 => (None, None),
        1 => (None, optional.pop().and_then(non_empty)),
        _ => {
            let post = optional.pop().and_then(non_empty);
            (optional.pop().and_then(non_empty), post)
        }
    };

    Some((
        CiteGroup {
            command: command.to_string(),
            keys,
            prenote,
            postnote,
        },
        group.end,
    ))
}

/// Render a citation group with `template`
pub fn render_citation(group: &CiteGroup, template: &str) -> String {
    let body = group
        .keys
        .iter()
        .map(|key| fill_template(template, &[("key", key)]))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    if let Some(ref pre) = group.prenote {
        out.push_str(pre);
        out.push(' ');
    }
    out.push_str(&body);
    if let Some(ref post) = group.postnote {
        out.push_str(", ");
        out.push_str(post);
    }
    out
}

/// The citation phase
pub fn convert_citations(
    text: &str,
    templates: &IndexMap<String, String>,
    diags: &mut Diagnostics,
) -> ConversionResult<String> {
    let mut edits = EditList::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut converted = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'\\' || is_inert(text, i) {
            i += 1;
            continue;
        }
        let command = read_letters(text, i + 1);
        if command.is_empty() {
            i += 2;
            continue;
        }
        let after = i + 1 + command.len();
        let Some(template) = templates.get(command) else {
            i = after;
            continue;
        };
        let Some((group, end)) = parse_citation(text, command, after) else {
            i = after;
            continue;
        };

        for key in group.keys.iter().filter(|k| !is_valid_key(k)) {
            diags.add(
                Diagnostic::new(
                    DiagnosticKind::CitationKeyError,
                    format!("citation key '{}' has characters outside [A-Za-z0-9_:-]", key),
                    i,
                )
                .with_suggestion("keys are substituted as written"),
            );
        }

        edits.replace(i..end, render_citation(&group, template));
        converted += 1;
        i = end;
    }

    log::debug!("converted {} citations", converted);
    edits.apply(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex2md::context::PipelineConfig;
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> (String, Diagnostics) {
        let config = PipelineConfig::default();
        let mut diags = Diagnostics::new();
        let out = convert_citations(text, &config.citation_templates, &mut diags).unwrap();
        (out, diags)
    }

    #[test]
    fn test_multiple_keys() {
        let (out, diags) = run("As shown \\cite{foo,bar}.");
        assert_eq!(out, "As shown [cite: foo], [cite: bar].");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_notes() {
        let (out, _) = run("\\citep[see][p.~4]{knuth84}");
        assert_eq!(out, "see [cite: knuth84], p.~4");
        let (out, _) = run("\\cite[ch.~2]{knuth84}");
        assert_eq!(out, "[cite: knuth84], ch.~2");
    }

    #[test]
    fn test_starred_and_author() {
        let (out, _) = run("\\citet*{a} \\citeauthor{b}");
        assert_eq!(out, "[cite: a] [author: b]");
    }

    #[test]
    fn test_bad_key_still_substituted() {
        let (out, diags) = run("\\cite{good, bad key!}");
        assert_eq!(out, "[cite: good], [cite: bad key!]");
        assert_eq!(diags.count_of(DiagnosticKind::CitationKeyError), 1);
    }

    #[test]
    fn test_empty_keys_skipped() {
        let (out, _) = run("\\cite{a,,b,}");
        assert_eq!(out, "[cite: a], [cite: b]");
    }

    #[test]
    fn test_unknown_command_untouched() {
        let (out, _) = run("\\citation{x} \\nocite{y}");
        assert_eq!(out, "\\citation{x} \\nocite{y}");
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("smith-2020:a_b"));
        assert!(!is_valid_key("smith 2020"));
        assert!(!is_valid_key(""));
    }
}
