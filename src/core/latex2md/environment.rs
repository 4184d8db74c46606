//! Environment resolution for LaTeX to Markdown conversion
//!
//! One left-to-right scan matches `\begin{..}`/`\end{..}` pairs of tracked
//! environments with a stack and builds a tree of items. A second walk over
//! the tree, in document order, converts top-level regions, registers theorem
//! declarations and advances the section counter. Theorem bodies are walked
//! recursively, so nested regions are converted exactly once.
//!
//! All rewrites are recorded in an [`EditList`] against the scanned text.

use std::ops::Range;

use fxhash::FxHashSet;

use super::context::{Converter, EnvironmentKind};
use super::math::{display_block, format_math_environment};
use crate::data::nesting_allowed;
use crate::features::delimiters::{normalize, FORWARD_TABLE};
use crate::features::theorems::{parse_declaration, render_callout, TheoremDecl};
use crate::utils::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::utils::edits::EditList;
use crate::utils::error::ConversionResult;
use crate::utils::scan::{
    is_inert, read_braced, read_bracketed, read_letters, skip_inline_space, skip_whitespace,
    widen_to_line,
};

/// A node of the environment tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A matched `\begin{name}` .. `\end{name}` pair
    Region {
        name: String,
        /// The `\begin{name}` marker
        begin: Range<usize>,
        /// The `\end{name}` marker
        end: Range<usize>,
        children: Vec<Item>,
    },
    /// An unstarred `\section`
    Section { at: usize },
    /// A `\newtheorem` declaration, removed from the output
    Declaration { range: Range<usize>, decl: TheoremDecl },
    /// A `\theoremstyle{..}` command, removed from the output
    Style { range: Range<usize> },
}

impl Item {
    fn start(&self) -> usize {
        match self {
            Item::Region { begin, .. } => begin.start,
            Item::Section { at } => *at,
            Item::Declaration { range, .. } | Item::Style { range } => range.start,
        }
    }
}

/// Environment stack frame
#[derive(Debug)]
struct Frame {
    name: String,
    begin: Range<usize>,
    children: Vec<Item>,
}

/// Add an item to the innermost open frame, or to the root
fn attach(stack: &mut [Frame], root: &mut Vec<Item>, item: Item) {
    match stack.last_mut() {
        Some(frame) => frame.children.push(item),
        None => root.push(item),
    }
}

/// Drop a frame whose markers stay raw, handing its children to the parent
fn lift(stack: &mut [Frame], root: &mut Vec<Item>, frame: Frame) {
    for child in frame.children {
        attach(stack, root, child);
    }
}

/// `\name{arg}` with the argument name starting right after the command
fn marker_name(text: &str, after_command: usize) -> Option<(String, usize)> {
    let pos = skip_whitespace(text, after_command);
    let group = read_braced(text, pos)?;
    let name = text[group.inner].trim();
    if name.is_empty() {
        None
    } else {
        Some((name.to_string(), group.end))
    }
}

/// The line ending just before `line_start`, or "" at the top of `span`
fn previous_line<'a>(text: &'a str, span: &Range<usize>, line_start: usize) -> &'a str {
    if line_start <= span.start {
        return "";
    }
    let end = line_start - 1;
    let start = text[span.start..end]
        .rfind('\n')
        .map_or(span.start, |p| span.start + p + 1);
    &text[start..end]
}

/// The line starting after the newline at `line_end`, or "" at the bottom of `span`
fn next_line<'a>(text: &'a str, span: &Range<usize>, line_end: usize) -> &'a str {
    if line_end >= span.end {
        return "";
    }
    let start = line_end + 1;
    let end = text[start..span.end]
        .find('\n')
        .map_or(span.end, |p| start + p);
    &text[start..end]
}

/// Where a converted block sits among its neighbours
#[derive(Debug)]
struct Placement {
    callout: bool,
    /// The previous callout ends right before this block
    joined: bool,
    /// Whole lines deleted just before this block
    removed: Option<Range<usize>>,
}

/// Put a converted block on its own lines
///
/// Inline space after the block is absorbed when text follows on the same
/// line, so the returned range may end later than `range` but stays inside
/// `span`. A callout is also set off from non-blank neighbouring lines by a
/// blank line.
fn separate_block(
    text: &str,
    span: &Range<usize>,
    range: Range<usize>,
    block: String,
    placement: &Placement,
) -> (Range<usize>, String) {
    let line_start = text[span.start..range.start]
        .rfind('\n')
        .map_or(span.start, |p| span.start + p + 1);
    let line_end = text[range.end..span.end]
        .find('\n')
        .map_or(span.end, |p| range.end + p);
    let gap = if placement.callout { "\n\n" } else { "\n" };
    let mut out = block;
    let mut wide = range.clone();

    if !placement.joined {
        if !text[line_start..range.start].trim().is_empty() {
            out.insert_str(0, gap);
        } else if placement.callout {
            let above = match placement.removed {
                Some(ref removed) if removed.end == line_start => removed.start,
                _ => line_start,
            };
            if !previous_line(text, span, above).trim().is_empty() {
                out.insert(0, '\n');
            }
        }
    }
    if !text[range.end..line_end].trim().is_empty() {
        out.push_str(gap);
        wide.end = skip_inline_space(text, range.end).min(span.end);
    } else if placement.callout && !next_line(text, span, line_end).trim().is_empty() {
        out.push('\n');
    }
    (wide, out)
}

/// Extend a run of deleted lines, or start a new one
fn merge_removed(removed: &mut Option<Range<usize>>, range: &Range<usize>) {
    *removed = Some(match removed.take() {
        Some(run) if run.end == range.start => run.start..range.end,
        _ => range.clone(),
    });
}

impl Converter {
    // =========================================================================
    // Scan
    // =========================================================================

    fn is_tracked(&self, name: &str, declared: &FxHashSet<String>) -> bool {
        declared.contains(name) || self.environment_kind(name).is_some()
    }

    /// Build the item tree for `text`, reporting marker problems
    pub(crate) fn scan_environments(&self, text: &str, diags: &mut Diagnostics) -> Vec<Item> {
        let bytes = text.as_bytes();
        let mut root = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut declared: FxHashSet<String> = FxHashSet::default();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'\\' || is_inert(text, i) {
                i += 1;
                continue;
            }
            let command = read_letters(text, i + 1);
            let after = i + 1 + command.len();

            match command {
                "begin" => {
                    let Some((name, end)) = marker_name(text, after) else {
                        i = after;
                        continue;
                    };
                    if self.is_tracked(&name, &declared) {
                        if let Some(top) = stack.last() {
                            if !nesting_allowed(&top.name, &name) {
                                diags.add(
                                    Diagnostic::new(
                                        DiagnosticKind::InvalidNesting,
                                        format!("'{}' is not expected inside '{}'", name, top.name),
                                        i,
                                    )
                                    .with_suggestion("close the outer environment first"),
                                );
                            }
                        }
                        stack.push(Frame {
                            name,
                            begin: i..end,
                            children: Vec::new(),
                        });
                    }
                    i = end;
                }
                "end" => {
                    let Some((name, end)) = marker_name(text, after) else {
                        i = after;
                        continue;
                    };
                    if self.is_tracked(&name, &declared) {
                        match stack.pop() {
                            Some(frame) if frame.name == name => {
                                let item = Item::Region {
                                    name,
                                    begin: frame.begin,
                                    end: i..end,
                                    children: frame.children,
                                };
                                attach(&mut stack, &mut root, item);
                            }
                            Some(frame) => {
                                diags.report(
                                    DiagnosticKind::EnvironmentMismatch,
                                    format!(
                                        "\\end{{{}}} closes '{}' opened at {}",
                                        name, frame.name, frame.begin.start
                                    ),
                                    i,
                                );
                                lift(&mut stack, &mut root, frame);
                            }
                            None => {
                                diags.report(
                                    DiagnosticKind::EnvironmentMismatch,
                                    format!("\\end{{{}}} without a matching \\begin", name),
                                    i,
                                );
                            }
                        }
                    }
                    i = end;
                }
                "section" => {
                    let mut pos = skip_whitespace(text, after);
                    if bytes.get(pos) == Some(&b'[') {
                        if let Some(group) = read_bracketed(text, pos) {
                            pos = skip_whitespace(text, group.end);
                        }
                    }
                    if bytes.get(pos) == Some(&b'{') {
                        attach(&mut stack, &mut root, Item::Section { at: i });
                    }
                    i = after;
                }
                "newtheorem" => match parse_declaration(text, after) {
                    Some((decl, end)) => {
                        declared.insert(decl.name.clone());
                        let item = Item::Declaration {
                            range: widen_to_line(text, i..end),
                            decl,
                        };
                        attach(&mut stack, &mut root, item);
                        i = end;
                    }
                    None => i = after,
                },
                "theoremstyle" => match marker_name(text, after) {
                    Some((_, end)) => {
                        let item = Item::Style {
                            range: widen_to_line(text, i..end),
                        };
                        attach(&mut stack, &mut root, item);
                        i = end;
                    }
                    None => i = after,
                },
                "" => i += 2,
                _ => i = after,
            }
        }

        while let Some(frame) = stack.pop() {
            diags.add(
                Diagnostic::new(
                    DiagnosticKind::UnmatchedEnvironment,
                    format!("\\begin{{{}}} is never closed", frame.name),
                    frame.begin.start,
                )
                .with_suggestion(format!("add \\end{{{}}}", frame.name)),
            );
            lift(&mut stack, &mut root, frame);
        }

        root.sort_by_key(Item::start);
        root
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// The environment phase
    pub fn resolve_environments(&mut self, text: &str) -> ConversionResult<String> {
        let mut diags = Diagnostics::new();
        let items = self.scan_environments(text, &mut diags);
        self.state.diagnostics.extend(diags);
        log::debug!("environment scan found {} top-level items", items.len());
        self.render_span(text, 0..text.len(), &items)
    }

    /// Convert the items of one span (the document or a theorem body)
    fn render_span(
        &mut self,
        text: &str,
        span: Range<usize>,
        items: &[Item],
    ) -> ConversionResult<String> {
        let base = span.start;
        let mut edits = EditList::new();
        let mut last_callout_end: Option<usize> = None;
        let mut removed: Option<Range<usize>> = None;

        for item in items {
            match item {
                Item::Section { .. } => {
                    let next = self.state.theorems.section() + 1;
                    self.state.theorems.update_section(next);
                }
                Item::Declaration { range, decl } => {
                    self.state.theorems.declare(decl.clone());
                    edits.delete(range.start - base..range.end - base);
                    merge_removed(&mut removed, range);
                }
                Item::Style { range } => {
                    edits.delete(range.start - base..range.end - base);
                    merge_removed(&mut removed, range);
                }
                Item::Region {
                    name,
                    begin,
                    end,
                    children,
                } => {
                    let callout = self.environment_kind(name) == Some(EnvironmentKind::Theorem);
                    let placement = Placement {
                        callout,
                        joined: callout
                            && last_callout_end
                                .map_or(false, |prev| text[prev..begin.start].trim().is_empty()),
                        removed: removed.take(),
                    };
                    let replacement = self.convert_region(text, name, begin, end, children)?;
                    let (range, replacement) =
                        separate_block(text, &span, begin.start..end.end, replacement, &placement);
                    edits.replace(range.start - base..range.end - base, replacement);
                    last_callout_end = if callout { Some(end.end) } else { None };
                }
            }
        }

        edits.apply(&text[span])
    }

    fn convert_region(
        &mut self,
        text: &str,
        name: &str,
        begin: &Range<usize>,
        end: &Range<usize>,
        children: &[Item],
    ) -> ConversionResult<String> {
        let kind = self.environment_kind(name);
        match kind {
            Some(EnvironmentKind::Theorem) => {
                self.convert_theorem(text, name, begin, end, children)
            }
            Some(EnvironmentKind::Math(layout)) => Ok(format_math_environment(
                name,
                layout,
                &text[begin.end..end.start],
            )),
            Some(EnvironmentKind::Extra) | None => {
                self.state.diagnostics.report(
                    DiagnosticKind::UnknownEnvironment,
                    format!("'{}' has no converter, kept as a generic math block", name),
                    begin.start,
                );
                Ok(display_block(&text[begin.start..end.end]))
            }
        }
    }

    fn convert_theorem(
        &mut self,
        text: &str,
        name: &str,
        begin: &Range<usize>,
        end: &Range<usize>,
        children: &[Item],
    ) -> ConversionResult<String> {
        // Optional `[Title]` right after the marker
        let mut content_start = begin.end;
        let mut title = None;
        let after = skip_whitespace(text, begin.end);
        if text.as_bytes().get(after) == Some(&b'[') {
            if let Some(group) = read_bracketed(text, after) {
                let before_children = children.first().map_or(true, |c| c.start() >= group.end);
                if group.end <= end.start && before_children {
                    title = Some(text[group.inner].to_string());
                    content_start = group.end;
                }
            }
        }

        // Counters advance before anything nested is numbered
        let header = self.state.theorems.open_instance(name, title.as_deref());

        let body = self.render_span(text, content_start..end.start, children)?;

        let mut local = Diagnostics::new();
        let body = normalize(&body, FORWARD_TABLE, &mut local)?;
        // Pairs left raw here are reported again by the delimiter phase
        if !self.config.normalize_delimiters {
            // Positions inside a rewritten body only approximate the source
            self.state.diagnostics.extend_offset(local, content_start);
        }

        Ok(render_callout(&header, &body, name == "proof"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex2md::context::PipelineConfig;
    use pretty_assertions::assert_eq;

    fn resolve(text: &str) -> (String, Converter) {
        let mut conv = Converter::new();
        let out = conv.resolve_environments(text).unwrap();
        (out, conv)
    }

    #[test]
    fn test_equation_region() {
        let (out, conv) = resolve("Before\n\\begin{equation}\nx = 1\n\\end{equation}\nAfter");
        assert_eq!(out, "Before\n$$\nx = 1\n$$\nAfter");
        assert!(conv.diagnostics().is_empty());
    }

    #[test]
    fn test_untracked_passthrough() {
        let text = "\\begin{itemize}\n\\item a\n\\end{itemize}";
        let (out, _) = resolve(text);
        assert_eq!(out, text);
    }

    #[test]
    fn test_offset_drift() {
        let text = "\\begin{align}a&=b\\\\c&=d\\end{align} mid \\begin{equation}y\\end{equation}";
        let (out, _) = resolve(text);
        assert!(out.contains("\\begin{aligned}"));
        assert!(out.contains("$$\ny\n$$"));
        assert!(!out.contains("\\begin{equation}"));
    }

    #[test]
    fn test_nested_math_converted_once() {
        let text = "\\begin{equation}\nA = \\begin{pmatrix} 1 \\\\ 2 \\end{pmatrix}\n\\end{equation}";
        let (out, conv) = resolve(text);
        assert_eq!(out, "$$\nA = \\begin{pmatrix} 1 \\\\ 2 \\end{pmatrix}\n$$");
        assert!(conv.diagnostics().is_empty());
    }

    #[test]
    fn test_unmatched_begin() {
        let text = "\\begin{equation}\nx";
        let (out, conv) = resolve(text);
        assert_eq!(out, text);
        assert_eq!(
            conv.diagnostics().count_of(DiagnosticKind::UnmatchedEnvironment),
            1
        );
    }

    #[test]
    fn test_mismatched_end_keeps_raw_and_converts_nested() {
        let text = "\\begin{theorem}\n\\begin{equation}x\\end{equation}\n\\end{lemma}";
        let (out, conv) = resolve(text);
        assert!(out.starts_with("\\begin{theorem}"));
        assert!(out.contains("$$\nx\n$$"));
        assert!(out.ends_with("\\end{lemma}"));
        assert_eq!(
            conv.diagnostics().count_of(DiagnosticKind::EnvironmentMismatch),
            1
        );
    }

    #[test]
    fn test_invalid_nesting_warns_and_pushes() {
        let text = "\\begin{align}\\begin{equation}x\\end{equation}\\end{align}";
        let (out, conv) = resolve(text);
        assert_eq!(conv.diagnostics().count_of(DiagnosticKind::InvalidNesting), 1);
        assert_eq!(
            conv.diagnostics().count_of(DiagnosticKind::EnvironmentMismatch),
            0
        );
        assert!(out.starts_with("$$\n\\begin{aligned}"));
    }

    #[test]
    fn test_commented_markers_ignored() {
        let text = "% \\begin{equation}\ntext \\\\begin{equation}";
        let (out, conv) = resolve(text);
        assert_eq!(out, text);
        assert!(conv.diagnostics().is_empty());
    }

    #[test]
    fn test_theorem_callout_with_declaration() {
        let text = "\\newtheorem{thm}{Theorem}[section]\n\\section{One}\n\\begin{thm}[Main]\nBody \\(x\\).\n\\end{thm}";
        let (out, conv) = resolve(text);
        assert_eq!(
            out,
            "\\section{One}\n\n> [!theorem] Theorem 1.1. (Main)\n> Body $x$."
        );
        assert!(conv.diagnostics().is_empty());
    }

    #[test]
    fn test_nested_callouts() {
        let text = "\\begin{theorem}\nOuter\n\\begin{proof}\nInner\n\\end{proof}\n\\end{theorem}";
        let (out, _) = resolve(text);
        assert_eq!(
            out,
            "> [!theorem] Theorem\n> Outer\n>\n> > [!proof] Proof\n> > Inner ∎"
        );
    }

    #[test]
    fn test_adjacent_callouts_are_separated() {
        let text = "\\begin{lemma}\nA\n\\end{lemma}\nAfter text.\n\\begin{lemma}B\\end{lemma}\n\\begin{lemma}C\\end{lemma}";
        let (out, _) = resolve(text);
        assert_eq!(
            out,
            "> [!lemma] Lemma\n> A\n\nAfter text.\n\n> [!lemma] Lemma\n> B\n\n> [!lemma] Lemma\n> C"
        );
    }

    #[test]
    fn test_removed_declaration_leaves_no_gap() {
        let (out, _) = resolve("\\newtheorem{thm}{Theorem}\n\\begin{thm}A\\end{thm}");
        assert_eq!(out, "> [!theorem] Theorem 1.\n> A");
    }

    #[test]
    fn test_callout_inline_with_text() {
        let (out, _) = resolve("Before \\begin{remark}R\\end{remark} after");
        assert_eq!(out, "Before \n\n> [!remark] Remark\n> R\n\nafter");
    }

    #[test]
    fn test_callout_next_to_blank_lines_unchanged() {
        let (out, _) = resolve("Intro\n\n\\begin{lemma}A\\end{lemma}\n\nOutro");
        assert_eq!(out, "Intro\n\n> [!lemma] Lemma\n> A\n\nOutro");
    }

    #[test]
    fn test_body_delimiters_reported_without_delimiter_phase() {
        let text = "\\begin{theorem}\nopen \\( x\n\\end{theorem}";
        let (_, conv) = resolve(text);
        assert_eq!(conv.diagnostics().count_of(DiagnosticKind::DelimiterMismatch), 0);

        let config = PipelineConfig {
            normalize_delimiters: false,
            ..PipelineConfig::default()
        };
        let mut conv = Converter::with_config(config);
        conv.resolve_environments(text).unwrap();
        assert_eq!(conv.diagnostics().count_of(DiagnosticKind::DelimiterMismatch), 1);
    }

    #[test]
    fn test_extra_environment_generic_block() {
        let mut config = PipelineConfig::default();
        config.extra_environments.insert("tikzcd".to_string());
        let mut conv = Converter::with_config(config);
        let out = conv
            .resolve_environments("\\begin{tikzcd} A \\arrow[r] & B \\end{tikzcd}")
            .unwrap();
        assert_eq!(
            out,
            "$$\n\\begin{tikzcd} A \\arrow[r] & B \\end{tikzcd}\n$$"
        );
        assert_eq!(
            conv.diagnostics().count_of(DiagnosticKind::UnknownEnvironment),
            1
        );
    }

    #[test]
    fn test_declaration_removed() {
        let (out, conv) = resolve("\\theoremstyle{plain}\n\\newtheorem{conj}{Conjecture}\nText");
        assert_eq!(out, "Text");
        assert!(conv.state.theorems.is_declared("conj"));
    }
}
