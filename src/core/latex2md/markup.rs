//! Cleanup passes for LaTeX to Markdown conversion
//!
//! These run last, on text whose math already uses `$`/`$$` delimiters:
//! sizing commands and prose commands are handled inside math, sectioning and
//! font commands outside it.

use crate::data::constants::{HEADING_LEVELS, PROSE_COMMANDS, SIZING_COMMANDS};
use crate::utils::edits::EditList;
use crate::utils::error::ConversionResult;
use crate::utils::scan::{
    inside_any, is_inert, math_spans, read_braced, read_letters, skip_inline_space,
    skip_whitespace, MathSpan,
};

/// A command occurrence: `\name` at `start`, name ending at `after`
struct Command<'a> {
    start: usize,
    after: usize,
    name: &'a str,
}

/// Every live (not escaped, not commented) `\name` in `text`
fn commands(text: &str) -> Vec<Command<'_>> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || is_inert(text, i) {
            i += 1;
            continue;
        }
        let name = read_letters(text, i + 1);
        if name.is_empty() {
            i += 2;
            continue;
        }
        let after = i + 1 + name.len();
        found.push(Command { start: i, after, name });
        i = after;
    }
    found
}

fn display_span(spans: &[MathSpan], pos: usize) -> bool {
    spans
        .iter()
        .any(|s| s.display && s.inner.start <= pos && pos < s.inner.end)
}

// =============================================================================
// Inside math
// =============================================================================

/// Remove `\big`-family sizing (keeping the delimiter) and `\displaystyle` in display math
pub fn strip_sizing_commands(text: &str) -> ConversionResult<String> {
    let spans = math_spans(text);
    if spans.is_empty() {
        return Ok(text.to_string());
    }
    let mut edits = EditList::new();
    for cmd in commands(text) {
        if !inside_any(&spans, cmd.start) {
            continue;
        }
        let strip = SIZING_COMMANDS.contains(&cmd.name)
            || (cmd.name == "displaystyle" && display_span(&spans, cmd.start));
        if strip {
            edits.delete(cmd.start..skip_inline_space(text, cmd.after));
        }
    }
    edits.apply(text)
}

/// Rewrite `\mbox`, `\textrm` and friends to `\text` inside math
pub fn unify_prose_commands(text: &str) -> ConversionResult<String> {
    let spans = math_spans(text);
    let mut edits = EditList::new();
    for cmd in commands(text) {
        if PROSE_COMMANDS.contains(&cmd.name) && inside_any(&spans, cmd.start) {
            edits.replace(cmd.start..cmd.after, "\\text");
        }
    }
    edits.apply(text)
}

// =============================================================================
// Outside math
// =============================================================================

fn font_markers(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "textbf" => Some(("**", "**")),
        "emph" | "textit" => Some(("*", "*")),
        "texttt" => Some(("`", "`")),
        _ => None,
    }
}

/// Convert sectioning commands to `#` headings and font commands to emphasis
///
/// Arguments are converted recursively, so `\textbf{\emph{x}}` becomes
/// `***x***`.
pub fn convert_headings(text: &str) -> ConversionResult<String> {
    let spans = math_spans(text);
    let mut edits = EditList::new();
    let mut covered = 0;

    for cmd in commands(text) {
        if cmd.start < covered || inside_any(&spans, cmd.start) {
            continue;
        }

        if let Some(&level) = HEADING_LEVELS.get(cmd.name) {
            let mut pos = cmd.after;
            if text.as_bytes().get(pos) == Some(&b'*') {
                pos += 1;
            }
            let Some(group) = read_braced(text, skip_whitespace(text, pos)) else {
                continue;
            };
            let title = convert_headings(text[group.inner.clone()].trim())?;
            let at_line_start = text[..cmd.start]
                .rsplit('\n')
                .next()
                .is_some_and(|before| before.trim().is_empty());
            let mut heading = String::new();
            if !at_line_start {
                heading.push('\n');
            }
            heading.push_str(&"#".repeat(level));
            heading.push(' ');
            heading.push_str(&title);
            edits.replace(cmd.start..group.end, heading);
            covered = group.end;
        } else if let Some((open, close)) = font_markers(cmd.name) {
            let Some(group) = read_braced(text, cmd.after) else {
                continue;
            };
            let inner = &text[group.inner.clone()];
            let inner = if cmd.name == "texttt" {
                inner.to_string()
            } else {
                convert_headings(inner)?
            };
            edits.replace(cmd.start..group.end, format!("{}{}{}", open, inner, close));
            covered = group.end;
        }
    }
    edits.apply(text)
}
