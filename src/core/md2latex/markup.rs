//! Markdown headings and emphasis back to LaTeX commands

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::data::HEADING_LEVELS;
use crate::utils::edits::EditList;
use crate::utils::error::ConversionResult;
use crate::utils::scan::{inside_any, math_spans};

lazy_static! {
    static ref HEADING_RE: Regex = Regex::new(r"(?m)^(#{1,5})[ \t]+(.+?)[ \t]*#*[ \t]*$").unwrap();
    static ref BOLD_RE: Regex = Regex::new(r"\*\*([^*\n]+)\*\*").unwrap();
    static ref EMPH_RE: Regex = Regex::new(r"\*([^*\n]+)\*").unwrap();
    static ref CODE_RE: Regex = Regex::new(r"`([^`\n]+)`").unwrap();
}

fn sectioning_command(level: usize) -> Option<&'static str> {
    HEADING_LEVELS
        .entries()
        .find(|(_, l)| **l == level)
        .map(|(name, _)| *name)
}

/// `## Title` lines to `\section{Title}`
pub fn convert_headings(text: &str) -> ConversionResult<String> {
    let spans = math_spans(text);
    let mut edits = EditList::new();
    for caps in HEADING_RE.captures_iter(text) {
        let (Some(whole), Some(hashes), Some(title)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if inside_any(&spans, whole.start()) {
            continue;
        }
        if let Some(command) = sectioning_command(hashes.as_str().len()) {
            edits.replace(whole.range(), format!("\\{}{{{}}}", command, title.as_str()));
        }
    }
    edits.apply(text)
}

/// Apply `re` to the text between math spans only
fn replace_outside_math(text: &str, re: &Regex, f: impl Fn(&Captures) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in math_spans(text) {
        out.push_str(&re.replace_all(&text[last..span.range.start], &f));
        out.push_str(&text[span.range.clone()]);
        last = span.range.end;
    }
    out.push_str(&re.replace_all(&text[last..], &f));
    out
}

/// `**x**`, `*x*` and `` `x` `` to `\textbf`, `\emph` and `\texttt`
pub fn convert_emphasis(text: &str) -> ConversionResult<String> {
    let text = replace_outside_math(text, &CODE_RE, |c| format!("\\texttt{{{}}}", &c[1]));
    let text = replace_outside_math(&text, &BOLD_RE, |c| format!("\\textbf{{{}}}", &c[1]));
    Ok(replace_outside_math(&text, &EMPH_RE, |c| format!("\\emph{{{}}}", &c[1])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_headings() {
        let out = convert_headings("# One\n## Two ##\n###### Too deep\n#nospace").unwrap();
        assert_eq!(out, "\\chapter{One}\n\\section{Two}\n###### Too deep\n#nospace");
    }

    #[test]
    fn test_emphasis() {
        let out = convert_emphasis("**bold** and *em* and `code`").unwrap();
        assert_eq!(out, "\\textbf{bold} and \\emph{em} and \\texttt{code}");
    }

    #[test]
    fn test_bold_italic() {
        let out = convert_emphasis("***x***").unwrap();
        assert_eq!(out, "\\emph{\\textbf{x}}");
    }

    #[test]
    fn test_math_untouched() {
        let out = convert_emphasis("$a*b*c$ and *d*").unwrap();
        assert_eq!(out, "$a*b*c$ and \\emph{d}");
    }
}
