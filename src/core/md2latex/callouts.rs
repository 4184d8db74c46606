//! Callout blocks back to theorem-like environments
//!
//! ```text
//! > [!theorem] Theorem 1.1. (Main)
//! > Body
//! ```
//!
//! becomes `\begin{theorem}[Main]` ... `\end{theorem}`. Nested callouts are
//! converted recursively; a trailing end-of-proof mark is dropped.

use lazy_static::lazy_static;
use regex::Regex;

use crate::data::constants::QED_MARK;
use crate::utils::error::ConversionResult;

lazy_static! {
    static ref HEADER_RE: Regex =
        Regex::new(r"^>[ \t]?\[!([A-Za-z]+\*?)\][+-]?[ \t]*(.*)$").unwrap();
    static ref TITLE_RE: Regex = Regex::new(r"\(([^()]*)\)\s*$").unwrap();
}

/// Title in trailing parentheses of a header, e.g. `Theorem 2. (Main)`
fn header_title(header: &str) -> Option<&str> {
    TITLE_RE
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
}

/// Remove one level of `>` quoting from a line
fn unquote(line: &str) -> &str {
    let rest = line.strip_prefix('>').unwrap_or(line);
    rest.strip_prefix(' ').unwrap_or(rest)
}

fn strip_qed(body: &str) -> &str {
    let trimmed = body.trim_end();
    trimmed.strip_suffix(QED_MARK).map(str::trim_end).unwrap_or(trimmed)
}

/// Rewrite every callout block in `text`
pub fn convert_callouts(text: &str) -> ConversionResult<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = HEADER_RE.captures(lines[i]) else {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        };
        let name = caps.get(1).map_or("", |m| m.as_str());
        let header = caps.get(2).map_or("", |m| m.as_str());

        let mut body_lines = Vec::new();
        i += 1;
        while i < lines.len() && lines[i].starts_with('>') && !HEADER_RE.is_match(lines[i]) {
            body_lines.push(unquote(lines[i]));
            i += 1;
        }

        let body = convert_callouts(&body_lines.join("\n"))?;
        let body = if name == "proof" { strip_qed(&body) } else { body.trim_end() };

        let mut block = format!("\\begin{{{}}}", name);
        if let Some(title) = header_title(header) {
            block.push('[');
            block.push_str(title);
            block.push(']');
        }
        if !body.trim().is_empty() {
            block.push('\n');
            block.push_str(body);
        }
        block.push_str(&format!("\n\\end{{{}}}", name));
        out.push(block);
    }

    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_callout() {
        let out = convert_callouts("> [!theorem] Theorem 1.1. (Main)\n> Body $x$.\nAfter").unwrap();
        assert_eq!(out, "\\begin{theorem}[Main]\nBody $x$.\n\\end{theorem}\nAfter");
    }

    #[test]
    fn test_proof_mark_removed() {
        let out = convert_callouts("> [!proof] Proof\n> Trivial. ∎").unwrap();
        assert_eq!(out, "\\begin{proof}\nTrivial.\n\\end{proof}");
    }

    #[test]
    fn test_nested() {
        let input = "> [!theorem] Theorem 1.\n> Claim.\n> > [!proof] Proof\n> > Done. ∎";
        let out = convert_callouts(input).unwrap();
        assert_eq!(
            out,
            "\\begin{theorem}\nClaim.\n\\begin{proof}\nDone.\n\\end{proof}\n\\end{theorem}"
        );
    }

    #[test]
    fn test_adjacent_callouts() {
        let out = convert_callouts("> [!lemma] Lemma\n> A\n> [!lemma] Lemma\n> B").unwrap();
        assert_eq!(
            out,
            "\\begin{lemma}\nA\n\\end{lemma}\n\\begin{lemma}\nB\n\\end{lemma}"
        );
    }

    #[test]
    fn test_plain_quote_untouched() {
        let input = "> just a quote\nText";
        assert_eq!(convert_callouts(input).unwrap(), input);
    }

    #[test]
    fn test_title_parsing() {
        assert_eq!(header_title("Theorem 2. (Main result)"), Some("Main result"));
        assert_eq!(header_title("Proof"), None);
    }
}
