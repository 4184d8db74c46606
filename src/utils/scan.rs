//! Lexical scanning helpers shared by every phase
//!
//! All of the markup syntax we care about (`\`, `{`, `}`, `[`, `]`, `$`, `&`,
//! `%`) is ASCII, so scanning works on bytes; returned offsets always sit on
//! character boundaries because they point at ASCII bytes.

use std::ops::Range;

/// Whether the byte at `idx` is preceded by an odd run of backslashes
pub fn is_escaped(text: &str, idx: usize) -> bool {
    let bytes = text.as_bytes();
    let mut count = 0;
    let mut i = idx.min(bytes.len());
    while i > 0 && bytes[i - 1] == b'\\' {
        count += 1;
        i -= 1;
    }
    count % 2 == 1
}

/// Whether `idx` sits after an unescaped `%` on its line
pub fn in_comment(text: &str, idx: usize) -> bool {
    let idx = idx.min(text.len());
    let line_start = text[..idx].rfind('\n').map(|p| p + 1).unwrap_or(0);
    text.as_bytes()[line_start..idx]
        .iter()
        .enumerate()
        .any(|(i, &b)| b == b'%' && !is_escaped(text, line_start + i))
}

/// Whether a command match at `idx` should be ignored (escaped or commented out)
pub fn is_inert(text: &str, idx: usize) -> bool {
    is_escaped(text, idx) || in_comment(text, idx)
}

/// Index of the delimiter closing the one at `open_idx`
///
/// Escaped delimiters (`\{`, `\}`) do not count.
pub fn find_matching(text: &str, open_idx: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open_idx) != Some(&open) {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open_idx;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// A delimited group such as `{...}` or `[...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Range of the text between the delimiters
    pub inner: Range<usize>,
    /// Offset just past the closing delimiter
    pub end: usize,
}

/// Read a `{...}` group starting exactly at `pos`
pub fn read_braced(text: &str, pos: usize) -> Option<Group> {
    let close = find_matching(text, pos, b'{', b'}')?;
    Some(Group {
        inner: pos + 1..close,
        end: close + 1,
    })
}

/// Read a `[...]` group starting exactly at `pos`
pub fn read_bracketed(text: &str, pos: usize) -> Option<Group> {
    let close = find_matching(text, pos, b'[', b']')?;
    Some(Group {
        inner: pos + 1..close,
        end: close + 1,
    })
}

/// Skip spaces, tabs and newlines
pub fn skip_whitespace(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Skip spaces and tabs, stopping at a newline
pub fn skip_inline_space(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// The run of ASCII letters starting at `pos`
pub fn read_letters(text: &str, pos: usize) -> &str {
    let bytes = text.as_bytes();
    let mut end = pos;
    while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
        end += 1;
    }
    &text[pos.min(end)..end]
}

/// Whether the byte at `pos` is an ASCII letter
pub fn is_letter_at(text: &str, pos: usize) -> bool {
    text.as_bytes()
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphabetic())
}

fn split_top_level(text: &str, on_row: bool) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut env_depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let rest = &text[i..];
                if rest.starts_with("\\begin{") {
                    env_depth += 1;
                } else if rest.starts_with("\\end{") {
                    env_depth -= 1;
                } else if on_row && rest.starts_with("\\\\") && depth == 0 && env_depth <= 0 {
                    parts.push(&text[start..i]);
                    start = i + 2;
                }
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'&' if !on_row && depth == 0 && env_depth <= 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start.min(text.len())..]);
    parts
}

/// Split math content into rows at top-level `\\`
///
/// Separators inside braces or nested environments are left alone.
pub fn split_rows(text: &str) -> Vec<&str> {
    split_top_level(text, true)
}

/// Split a row into cells at top-level `&`
pub fn split_cells(row: &str) -> Vec<&str> {
    split_top_level(row, false)
}

/// Widen `range` to its whole line (newline included) when nothing else is on it
///
/// A leading `>` quote prefix counts as blank.
pub fn widen_to_line(text: &str, range: Range<usize>) -> Range<usize> {
    let line_start = text[..range.start].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let line_end = text[range.end..].find('\n').map(|p| range.end + p);
    let rest_end = line_end.unwrap_or(text.len());
    let alone = strip_quote(&text[line_start..range.start]).trim().is_empty()
        && text[range.end..rest_end].trim().is_empty();
    match line_end {
        _ if !alone => range,
        Some(nl) => line_start..nl + 1,
        None => line_start..text.len(),
    }
}

/// Drop a leading Markdown quote prefix (`>`, `> >`, ...) and return the rest
pub fn strip_quote(line: &str) -> &str {
    line.trim_start_matches(|c: char| c == '>' || c == ' ' || c == '\t')
}

/// Substitute `$var` placeholders; unknown variables are kept as written
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let name = read_letters(rest, idx + 1);
        match vars.iter().find(|(var, _)| *var == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push('$');
                out.push_str(name);
            }
        }
        rest = &rest[idx + 1 + name.len()..];
    }
    out.push_str(rest);
    out
}

/// Remove `%` comments up to (not including) the end of each line
pub fn strip_comments(text: &str) -> String {
    if !text.contains('%') {
        return text.to_string();
    }
    text.split('\n')
        .map(|line| {
            let cut = line
                .bytes()
                .enumerate()
                .find(|&(i, b)| b == b'%' && !is_escaped(line, i))
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            &line[..cut]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim and drop whitespace-only lines
pub fn collapse_blank_lines(text: &str) -> String {
    text.trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every line with `prefix`; blank lines get the trimmed prefix
pub fn quote_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A `$...$` or `$$...$$` span in Markdown-with-math text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    /// Whole span including delimiters
    pub range: Range<usize>,
    /// Text between the delimiters
    pub inner: Range<usize>,
    pub display: bool,
}

/// Locate every closed `$`/`$$` span; an unclosed opener ends the search
pub fn math_spans(text: &str) -> Vec<MathSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' || is_escaped(text, i) {
            i += 1;
            continue;
        }
        let display = bytes.get(i + 1) == Some(&b'$');
        let open_len = if display { 2 } else { 1 };
        match find_closing_dollar(text, i + open_len, display) {
            Some(close) => {
                spans.push(MathSpan {
                    range: i..close + open_len,
                    inner: i + open_len..close,
                    display,
                });
                i = close + open_len;
            }
            None => break,
        }
    }
    spans
}

fn find_closing_dollar(text: &str, from: usize, display: bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'$' && !is_escaped(text, i) {
            let double = bytes.get(i + 1) == Some(&b'$');
            if display == double {
                return Some(i);
            }
            if display {
                // A lone `$` inside display math is literal.
                i += 1;
                continue;
            }
            return None;
        }
        i += 1;
    }
    None
}

/// Whether `pos` falls inside any of the (sorted) spans
pub fn inside_any(spans: &[MathSpan], pos: usize) -> bool {
    spans.iter().any(|s| s.inner.start <= pos && pos < s.inner.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_escaped() {
        let text = r"a\[b\\[c";
        assert!(!is_escaped(text, 1)); // the backslash itself
        assert!(is_escaped(text, 2)); // `[` after one backslash
        assert!(!is_escaped(text, 6)); // `[` after `\\`
    }

    #[test]
    fn test_in_comment() {
        let text = "x % \\begin{y}\nz \\% \\begin{w}";
        assert!(in_comment(text, text.find("\\begin{y}").unwrap()));
        assert!(!in_comment(text, text.find("\\begin{w}").unwrap()));
    }

    #[test]
    fn test_read_braced_nested() {
        let text = r"\foo{a{b}\}c}rest";
        let group = read_braced(text, 4).unwrap();
        assert_eq!(&text[group.inner.clone()], r"a{b}\}c");
        assert_eq!(&text[group.end..], "rest");
    }

    #[test]
    fn test_read_braced_unclosed() {
        assert!(read_braced("{abc", 0).is_none());
        assert!(read_braced("abc", 0).is_none());
    }

    #[test]
    fn test_split_rows_respects_nesting() {
        let rows = split_rows(r"a &= b \\ c &= \begin{pmatrix} 1 \\ 2 \end{pmatrix} \\ {x \\ y}");
        assert_eq!(rows.len(), 3);
        assert!(rows[1].contains("pmatrix"));
        assert_eq!(rows[2].trim(), r"{x \\ y}");
    }

    #[test]
    fn test_split_cells() {
        let cells = split_cells(r"a & \& b & {c & d}");
        assert_eq!(cells, vec!["a ", r" \& b ", " {c & d}"]);
    }

    #[test]
    fn test_widen_to_line() {
        let text = "a\n  \\cmd{x}  \nb \\cmd{y}";
        let alone = text.find("\\cmd{x}").unwrap();
        assert_eq!(widen_to_line(text, alone..alone + 7), 2..14);
        let inline = text.find("\\cmd{y}").unwrap();
        assert_eq!(widen_to_line(text, inline..inline + 7), inline..inline + 7);
    }

    #[test]
    fn test_widen_to_line_in_quote() {
        let text = "> [!theorem] Theorem 1.\n> \\label{t}\n> Body";
        let at = text.find("\\label").unwrap();
        let line = text.find("\n> \\label").unwrap() + 1;
        assert_eq!(widen_to_line(text, at..at + 9), line..at + 10);

        let text = "> Body \\label{t}";
        let at = text.find("\\label").unwrap();
        assert_eq!(widen_to_line(text, at..at + 9), at..at + 9);
    }

    #[test]
    fn test_fill_template() {
        let vars = [("n", "3"), ("name", "Intro")];
        assert_eq!(fill_template("$name ($n) $other", &vars), "Intro (3) $other");
        assert_eq!(fill_template("cost $", &vars), "cost $");
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("a % note\nb \\% kept"), "a \nb \\% kept");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("\n  a\n\n   \nb  \n"), "a\nb");
    }

    #[test]
    fn test_quote_lines() {
        assert_eq!(quote_lines("a\n\nb", "> "), "> a\n>\n> b");
    }

    #[test]
    fn test_math_spans() {
        let text = r"cost \$5, $x$ and $$y = 1$$ then $z";
        let spans = math_spans(text);
        assert_eq!(spans.len(), 2);
        assert!(!spans[0].display);
        assert_eq!(&text[spans[0].inner.clone()], "x");
        assert!(spans[1].display);
        assert_eq!(&text[spans[1].inner.clone()], "y = 1");
    }
}
