//! Math display environment formatting for LaTeX to Markdown conversion
//!
//! Every tracked math environment becomes one `$$` block. Multi-row
//! environments are rebuilt inside the closest environment that Markdown math
//! renderers understand (`aligned`, `alignedat`, `gathered`), with one row per
//! line and normalized spacing around `&`.

use std::fmt::Write;

use lazy_static::lazy_static;
use regex::Regex;

use crate::data::constants::LEADING_ARGUMENT_ENVIRONMENTS;
use crate::data::MathLayout;
use crate::utils::scan::{
    collapse_blank_lines, read_braced, skip_whitespace, split_cells, split_rows, strip_comments,
};

lazy_static! {
    static ref LABEL_RE: Regex = Regex::new(r"\\label\s*\{[^{}]*\}").unwrap();
}

/// Wrap finished math in a display block
pub fn display_block(math: &str) -> String {
    let math = math.trim();
    if math.is_empty() {
        "$$\n$$".to_string()
    } else {
        format!("$$\n{}\n$$", math)
    }
}

/// Split a leading `{...}` argument (column spec, alignat count) off `content`
fn leading_argument(content: &str) -> (Option<&str>, &str) {
    let start = skip_whitespace(content, 0);
    if content.as_bytes().get(start) == Some(&b'{') {
        if let Some(group) = read_braced(content, start) {
            return (Some(&content[start..group.end]), &content[group.end..]);
        }
    }
    (None, content)
}

/// Trim a cell and squeeze its internal whitespace
fn squeeze(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn starts_relation(cell: &str) -> bool {
    matches!(cell.as_bytes().first(), Some(b'=' | b'<' | b'>' | b'+' | b'-' | b'\\'))
}

/// Rebuild one row: `a &= b & c`
fn reflow_row(row: &str) -> String {
    let mut out = String::new();
    for (i, cell) in split_cells(row).into_iter().enumerate() {
        let cell = squeeze(cell);
        if i == 0 {
            out.push_str(&cell);
            continue;
        }
        out.push_str(if out.is_empty() { "&" } else { " &" });
        if !cell.is_empty() {
            if !starts_relation(&cell) {
                out.push(' ');
            }
            out.push_str(&cell);
        }
    }
    out
}

/// eqnarray rows have three columns `lhs & rel & rhs`
fn reflow_legacy_row(row: &str) -> String {
    let cells = split_cells(row);
    if cells.len() == 3 {
        let lhs = squeeze(cells[0]);
        let rel = squeeze(cells[1]);
        let rhs = squeeze(cells[2]);
        let mut out = format!("{} &{}", lhs, rel);
        if !rhs.is_empty() {
            out.push(' ');
            out.push_str(&rhs);
        }
        out.trim_start().to_string()
    } else {
        reflow_row(row)
    }
}

/// Split into rows and rebuild them, one per line
pub fn reflow_rows(content: &str, legacy: bool) -> String {
    let mut rows: Vec<String> = split_rows(content)
        .into_iter()
        .map(|row| {
            if legacy {
                reflow_legacy_row(row)
            } else {
                reflow_row(row)
            }
        })
        .collect();
    // A trailing `\\` leaves an empty last row
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows.join(" \\\\\n")
}

/// Move `\label{..}` commands to the end of a single-line equation
fn labels_last(content: &str) -> String {
    let labels: Vec<&str> = LABEL_RE.find_iter(content).map(|m| m.as_str()).collect();
    if labels.is_empty() {
        return collapse_blank_lines(content);
    }
    let body = collapse_blank_lines(&LABEL_RE.replace_all(content, ""));
    let mut out = body;
    for label in labels {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(label);
    }
    out
}

fn wrap(env: &str, argument: Option<&str>, rows: &str) -> String {
    let mut out = String::new();
    let _ = write!(out, "\\begin{{{}}}", env);
    if let Some(arg) = argument {
        out.push_str(arg);
    }
    out.push('\n');
    if !rows.is_empty() {
        out.push_str(rows);
        out.push('\n');
    }
    let _ = write!(out, "\\end{{{}}}", env);
    out
}

/// Format the content of environment `name` as a `$$` block
pub fn format_math_environment(name: &str, layout: MathLayout, content: &str) -> String {
    let content = strip_comments(content);
    let (argument, body) = if LEADING_ARGUMENT_ENVIRONMENTS.contains(name) {
        leading_argument(&content)
    } else {
        (None, content.as_str())
    };

    let math = match layout {
        MathLayout::Equation => labels_last(body),
        MathLayout::Aligned => wrap("aligned", None, &reflow_rows(body, false)),
        MathLayout::AlignedAt => wrap("alignedat", argument, &reflow_rows(body, false)),
        MathLayout::Gathered => wrap("gathered", None, &reflow_rows(body, false)),
        MathLayout::Native => wrap(name, argument, &reflow_rows(body, false)),
        MathLayout::LegacyArray => wrap("aligned", None, &reflow_rows(body, true)),
    };
    display_block(&math)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_equation() {
        let out = format_math_environment("equation", MathLayout::Equation, "\n  x = 1\n");
        assert_eq!(out, "$$\nx = 1\n$$");
    }

    #[test]
    fn test_equation_label_moved_last() {
        let out =
            format_math_environment("equation", MathLayout::Equation, "\\label{eq:a} x=1 ");
        assert_eq!(out, "$$\nx=1 \\label{eq:a}\n$$");
    }

    #[test]
    fn test_align_rows() {
        let out = format_math_environment(
            "align*",
            MathLayout::Aligned,
            "\n a &= b \\\\\n c   &=   d \\\\\n",
        );
        assert_eq!(
            out,
            "$$\n\\begin{aligned}\na &= b \\\\\nc &= d\n\\end{aligned}\n$$"
        );
    }

    #[test]
    fn test_alignat_keeps_argument() {
        let out = format_math_environment("alignat", MathLayout::AlignedAt, "{2} x &= 1 & y &= 2");
        assert_eq!(
            out,
            "$$\n\\begin{alignedat}{2}\nx &= 1 & y &= 2\n\\end{alignedat}\n$$"
        );
    }

    #[test]
    fn test_gather() {
        let out = format_math_environment("gather", MathLayout::Gathered, "a \\\\ b");
        assert_eq!(out, "$$\n\\begin{gathered}\na \\\\\nb\n\\end{gathered}\n$$");
    }

    #[test]
    fn test_native_array() {
        let out = format_math_environment("array", MathLayout::Native, "{cc} 1 & 2 \\\\ 3 & 4");
        assert_eq!(
            out,
            "$$\n\\begin{array}{cc}\n1 & 2 \\\\\n3 & 4\n\\end{array}\n$$"
        );
    }

    #[test]
    fn test_eqnarray() {
        let out =
            format_math_environment("eqnarray", MathLayout::LegacyArray, "x &=& 1 \\\\ y &=& 2");
        assert_eq!(
            out,
            "$$\n\\begin{aligned}\nx &= 1 \\\\\ny &= 2\n\\end{aligned}\n$$"
        );
    }

    #[test]
    fn test_nested_matrix_stays_in_row() {
        let out = format_math_environment(
            "align",
            MathLayout::Aligned,
            "A &= \\begin{pmatrix} 1 & 0 \\\\ 0 & 1 \\end{pmatrix}",
        );
        assert!(out.contains("A &= \\begin{pmatrix} 1 & 0 \\\\ 0 & 1 \\end{pmatrix}"));
    }

    #[test]
    fn test_comment_does_not_swallow_rows() {
        let out =
            format_math_environment("align", MathLayout::Aligned, "a &= b % note\n \\\\ c &= d");
        assert!(out.contains("a &= b \\\\\nc &= d"));
    }
}
