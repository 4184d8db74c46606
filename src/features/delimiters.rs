//! Math delimiter normalization
//!
//! Rewrites inline and display math delimiter pairs from one dialect to the
//! other using a small table of rules:
//!
//! - Forward: `\( x \)` → `$x$`, `\[ x \]` → `$$` block
//! - Reverse: `$$` block → `\[ x \]`, `$x$` → `\(x\)`
//!
//! An unterminated opener, or one interrupted by a different delimiter, is
//! left exactly as written and reported. Output of a table never contains its
//! own source delimiters, so normalizing twice changes nothing.

use crate::utils::diagnostics::{DiagnosticKind, Diagnostics};
use crate::utils::edits::EditList;
use crate::utils::error::ConversionResult;
use crate::utils::scan::{collapse_blank_lines, is_escaped};

/// One `(source pair, target pair)` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterRule {
    pub open: &'static str,
    pub close: &'static str,
    pub target_open: &'static str,
    pub target_close: &'static str,
    /// Display rules trim their content and put it on its own lines
    pub display: bool,
}

/// LaTeX delimiters to Markdown-with-math delimiters
pub const FORWARD_TABLE: &[DelimiterRule] = &[
    DelimiterRule {
        open: "\\[",
        close: "\\]",
        target_open: "$$",
        target_close: "$$",
        display: true,
    },
    DelimiterRule {
        open: "\\(",
        close: "\\)",
        target_open: "$",
        target_close: "$",
        display: false,
    },
];

/// Markdown-with-math delimiters back to LaTeX; `$$` must come before `$`
pub const REVERSE_TABLE: &[DelimiterRule] = &[
    DelimiterRule {
        open: "$$",
        close: "$$",
        target_open: "\\[",
        target_close: "\\]",
        display: true,
    },
    DelimiterRule {
        open: "$",
        close: "$",
        target_open: "\\(",
        target_close: "\\)",
        display: false,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Open(usize),
    Close(usize),
}

fn token_at(text: &str, i: usize, table: &[DelimiterRule]) -> Option<(Token, usize)> {
    let rest = &text.as_bytes()[i..];
    if rest.is_empty() || is_escaped(text, i) {
        return None;
    }
    for (idx, rule) in table.iter().enumerate() {
        if rest.starts_with(rule.open.as_bytes()) {
            return Some((Token::Open(idx), rule.open.len()));
        }
        if rest.starts_with(rule.close.as_bytes()) {
            return Some((Token::Close(idx), rule.close.len()));
        }
    }
    None
}

/// Whether a delimiter of the target dialect starts at `i`
fn target_at(text: &str, i: usize, table: &[DelimiterRule]) -> bool {
    let rest = &text.as_bytes()[i..];
    !is_escaped(text, i)
        && table.iter().any(|rule| {
            rest.starts_with(rule.target_open.as_bytes())
                || rest.starts_with(rule.target_close.as_bytes())
        })
}

/// Offset of the close token for `rule_idx`, or `None` when the text ends or
/// another delimiter (of either dialect) gets in the way first
fn find_close(text: &str, from: usize, rule_idx: usize, table: &[DelimiterRule]) -> Option<usize> {
    let rule = &table[rule_idx];
    let mut j = from;
    while j < text.len() {
        if target_at(text, j, table) {
            return None;
        }
        if let Some((token, _)) = token_at(text, j, table) {
            let closes = match token {
                Token::Close(k) => k == rule_idx,
                Token::Open(k) => k == rule_idx && rule.open == rule.close,
            };
            return if closes { Some(j) } else { None };
        }
        j += 1;
    }
    None
}

fn render(rule: &DelimiterRule, body: &str) -> String {
    if rule.display {
        let body = collapse_blank_lines(body);
        if body.is_empty() {
            format!("{}\n{}", rule.target_open, rule.target_close)
        } else {
            format!("{}\n{}\n{}", rule.target_open, body, rule.target_close)
        }
    } else {
        format!("{}{}{}", rule.target_open, body.trim(), rule.target_close)
    }
}

/// Rewrite every recognized delimiter pair in `text` according to `table`
pub fn normalize(
    text: &str,
    table: &[DelimiterRule],
    diags: &mut Diagnostics,
) -> ConversionResult<String> {
    let mut edits = EditList::new();
    let mut i = 0;

    while i < text.len() {
        let Some((token, len)) = token_at(text, i, table) else {
            i += 1;
            continue;
        };
        match token {
            Token::Open(idx) => {
                let rule = &table[idx];
                match find_close(text, i + len, idx, table) {
                    Some(close) => {
                        let body = &text[i + len..close];
                        edits.replace(i..close + rule.close.len(), render(rule, body));
                        i = close + rule.close.len();
                    }
                    None => {
                        diags.report(
                            DiagnosticKind::DelimiterMismatch,
                            format!("unterminated math delimiter '{}'", rule.open),
                            i,
                        );
                        i += len;
                    }
                }
            }
            Token::Close(idx) => {
                diags.report(
                    DiagnosticKind::DelimiterMismatch,
                    format!("stray closing delimiter '{}'", table[idx].close),
                    i,
                );
                i += len;
            }
        }
    }

    edits.apply(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn forward(text: &str) -> (String, Diagnostics) {
        let mut diags = Diagnostics::new();
        let out = normalize(text, FORWARD_TABLE, &mut diags).unwrap();
        (out, diags)
    }

    #[test]
    fn test_inline_and_display() {
        let (out, diags) = forward(r"Let \( x \) be \[ x^2 \] done");
        assert_eq!(out, "Let $x$ be $$\nx^2\n$$ done");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_display_blank_lines_removed() {
        let (out, _) = forward("\\[\n  a\n\n  b\n\\]");
        assert_eq!(out, "$$\na\nb\n$$");
    }

    #[test]
    fn test_escaped_delimiter_ignored() {
        let (out, diags) = forward(r"row \\[2pt] next");
        assert_eq!(out, r"row \\[2pt] next");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unterminated_left_raw() {
        let (out, diags) = forward(r"open \( x and \[ y \] end");
        assert_eq!(out, "open \\( x and $$\ny\n$$ end");
        assert_eq!(diags.count_of(DiagnosticKind::DelimiterMismatch), 1);
    }

    #[test]
    fn test_stray_close_reported() {
        let (out, diags) = forward(r"a \) b");
        assert_eq!(out, r"a \) b");
        assert_eq!(diags.count_of(DiagnosticKind::DelimiterMismatch), 1);
    }

    #[test]
    fn test_idempotent() {
        let (once, _) = forward(r"\( a \) and \[ b \] and \( c");
        let (twice, _) = forward(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_target_delimiter_inside_is_a_conflict() {
        let (once, diags) = forward(r"\( $y$ \) then \(z\)");
        assert_eq!(once, r"\( $y$ \) then $z$");
        assert_eq!(diags.count_of(DiagnosticKind::DelimiterMismatch), 2);
        let (twice, _) = forward(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reverse() {
        let mut diags = Diagnostics::new();
        let out = normalize("cost \\$5, $x$ and $$\ny\n$$", REVERSE_TABLE, &mut diags).unwrap();
        assert_eq!(out, "cost \\$5, \\(x\\) and \\[\ny\n\\]");
        assert!(diags.is_empty());
    }
}
