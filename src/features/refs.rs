//! Label and Cross-Reference Module
//!
//! Two passes over the text:
//!
//! 1. Collect every `\label{..}`, decide its category from the text before
//!    it and give it the next number in that category.
//! 2. Substitute `\ref`, `\eqref`, `\pageref`, `\nameref`, `\autoref` and
//!    `\vref` through per-command templates.
//!
//! Label definitions are rewritten afterwards against the original label set:
//! the only label of a single-line display block becomes `\tag{n}`, the rest
//! are stripped when requested. A label in a theorem callout takes the
//! callout's number and leaves every counter alone.

use std::fmt;
use std::ops::Range;

use fxhash::FxHashMap;
use serde::Serialize;

use crate::core::latex2md::context::{PipelineConfig, ReferenceMode};
use crate::data::constants::{LABEL_CONTEXT_WINDOW, REFERENCE_PLACEHOLDER, UNDEFINED_REFERENCE};
use crate::utils::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::utils::edits::EditList;
use crate::utils::error::ConversionResult;
use crate::utils::scan::{
    fill_template, is_escaped, is_inert, read_braced, read_bracketed, read_letters,
    skip_whitespace, strip_quote, widen_to_line,
};

/// Type of labeled element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LabelCategory {
    Equation,
    Figure,
    Table,
    Section,
    Theorem,
}

impl fmt::Display for LabelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LabelCategory::Equation => "Equation",
            LabelCategory::Figure => "Figure",
            LabelCategory::Table => "Table",
            LabelCategory::Section => "Section",
            LabelCategory::Theorem => "Theorem",
        };
        f.write_str(name)
    }
}

/// A label for cross-referencing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRecord {
    pub label: String,
    /// Counter value, or a callout number such as `1.2`
    pub number: String,
    pub category: LabelCategory,
    /// Section title, for `\nameref`
    pub display_name: Option<String>,
    pub position: usize,
}

/// One `\label{..}` occurrence in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
struct LabelSite {
    range: Range<usize>,
    number: String,
    category: LabelCategory,
    /// Enclosing display math block
    block: Option<Range<usize>>,
}

/// Label table for one run
#[derive(Debug, Default, Clone)]
pub struct LabelTable {
    records: FxHashMap<String, LabelRecord>,
    sites: Vec<LabelSite>,
    counters: FxHashMap<LabelCategory, u32>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<&LabelRecord> {
        self.records.get(label)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.sites.clear();
        self.counters.clear();
    }

    fn next_number(&mut self, category: LabelCategory, base: u32) -> u32 {
        let counter = self.counters.entry(category).or_insert(0);
        let number = base.saturating_add(*counter);
        *counter = counter.saturating_add(1);
        number
    }

    /// Whether a label site can become `\tag{n}`
    ///
    /// Math renderers accept one tag per display block and none inside a
    /// multi-line wrapper.
    fn is_taggable(&self, text: &str, site: &LabelSite) -> bool {
        let Some(ref block) = site.block else {
            return false;
        };
        let labels = self
            .sites
            .iter()
            .filter(|other| other.block.as_ref() == Some(block))
            .count();
        labels == 1
            && !MULTILINE_WRAPPERS
                .iter()
                .any(|wrapper| text[block.clone()].contains(wrapper))
    }

    /// Pass 1: number every label in `text`
    pub fn collect(&mut self, text: &str, base: u32, diags: &mut Diagnostics) {
        self.clear();
        let math = DisplayIndex::build(text);

        for (range, label) in label_commands(text) {
            let block = math.block(range.start);
            let (category, number, display_name) = if block.is_some() {
                (LabelCategory::Equation, None, None)
            } else if let Some((floor, number)) = enclosing_callout(text, range.start) {
                // Cues inside the callout still win
                match classify(text, floor, range.start) {
                    (LabelCategory::Equation, _) => (LabelCategory::Theorem, Some(number), None),
                    (category, name) => (category, None, name),
                }
            } else {
                let (category, name) = classify(text, 0, range.start);
                (category, None, name)
            };
            let number = number.unwrap_or_else(|| self.next_number(category, base).to_string());

            if let Some(previous) = self.records.get(&label) {
                diags.add(
                    Diagnostic::new(
                        DiagnosticKind::DuplicateLabel,
                        format!(
                            "label '{}' defined at {} and again here; the later one wins",
                            label, previous.position
                        ),
                        range.start,
                    )
                    .with_suggestion("rename one of the labels"),
                );
            }

            self.sites.push(LabelSite {
                range: range.clone(),
                number: number.clone(),
                category,
                block,
            });
            self.records.insert(
                label.clone(),
                LabelRecord {
                    label,
                    number,
                    category,
                    display_name,
                    position: range.start,
                },
            );
        }
        log::debug!("collected {} labels", self.records.len());
    }
}

// ============================================================================
// Scanning helpers
// ============================================================================

/// Sorted positions of display math delimiters, for parity lookups
struct DisplayIndex {
    dollars: Vec<usize>,
    opens: Vec<usize>,
    closes: Vec<usize>,
    len: usize,
}

impl DisplayIndex {
    fn build(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut index = DisplayIndex {
            dollars: Vec::new(),
            opens: Vec::new(),
            closes: Vec::new(),
            len: text.len(),
        };
        let mut i = 0;
        while i + 1 < bytes.len() {
            let pair = &bytes[i..i + 2];
            if (pair == b"$$" || pair == b"\\[" || pair == b"\\]") && !is_escaped(text, i) {
                match pair[1] {
                    b'$' => index.dollars.push(i),
                    b'[' => index.opens.push(i),
                    _ => index.closes.push(i),
                }
                i += 2;
                continue;
            }
            i += 1;
        }
        index
    }

    /// The `$$ .. $$` or `\[ .. \]` block around `pos`, delimiters included
    fn block(&self, pos: usize) -> Option<Range<usize>> {
        let dollars = self.dollars.partition_point(|&d| d < pos);
        if dollars % 2 == 1 {
            let end = self.dollars.get(dollars).map_or(self.len, |&d| d + 2);
            return Some(self.dollars[dollars - 1]..end);
        }
        let opens = self.opens.partition_point(|&d| d < pos);
        let closes = self.closes.partition_point(|&d| d < pos);
        if opens > closes {
            let end = self.closes.get(closes).map_or(self.len, |&d| d + 2);
            return Some(self.opens[opens - 1]..end);
        }
        None
    }
}

/// Every live `\label{..}` with its command range and trimmed label
fn label_commands(text: &str) -> Vec<(Range<usize>, String)> {
    let mut found = Vec::new();
    let mut search = 0;
    while let Some(idx) = text[search..].find("\\label") {
        let start = search + idx;
        let after = start + "\\label".len();
        search = after;
        if !read_letters(text, after).is_empty() || is_inert(text, start) {
            continue;
        }
        if let Some(group) = read_braced(text, skip_whitespace(text, after)) {
            let label = text[group.inner].trim().to_string();
            if !label.is_empty() {
                found.push((start..group.end, label));
                search = group.end;
            }
        }
    }
    found
}

/// Environments that put several rows in one display block
const MULTILINE_WRAPPERS: &[&str] = &[
    "\\begin{aligned}",
    "\\begin{alignedat}",
    "\\begin{gathered}",
];

const SECTION_COMMANDS: &[&str] = &[
    "\\chapter",
    "\\section",
    "\\subsection",
    "\\subsubsection",
    "\\paragraph",
];

/// Title argument of a sectioning command starting at `pos`
fn section_title(text: &str, pos: usize) -> Option<String> {
    let after = pos + 1 + read_letters(text, pos + 1).len();
    let mut p = after;
    if text.as_bytes().get(p) == Some(&b'*') {
        p += 1;
    }
    p = skip_whitespace(text, p);
    if text.as_bytes().get(p) == Some(&b'[') {
        p = skip_whitespace(text, read_bracketed(text, p)?.end);
    }
    let group = read_braced(text, p)?;
    Some(text[group.inner].trim().to_string())
}

/// Quote depth of a line and the text after its `>` markers
fn unquote(line: &str) -> (usize, &str) {
    let rest = strip_quote(line);
    let prefix = &line[..line.len() - rest.len()];
    (prefix.matches('>').count(), rest)
}

/// Number part of a callout header text such as `Theorem 1.2. (Main)`
///
/// Returns the header without its title, and the number if it has one.
fn split_header(header: &str) -> (&str, Option<String>) {
    let head = match header.rfind(" (") {
        Some(idx) if header.ends_with(')') => header[..idx].trim_end(),
        _ => header,
    };
    let number = head
        .strip_suffix('.')
        .and_then(|h| h.rsplit(' ').next())
        .filter(|n| n.starts_with(|c: char| c.is_ascii_digit()))
        .map(str::to_string);
    (head, number)
}

/// The theorem callout whose quoted body holds `pos`
///
/// Returns the start of the innermost header line and the number to use. An
/// unnumbered header (a proof, say) defers to a numbered callout around it
/// and, failing that, lends its own header text.
fn enclosing_callout(text: &str, pos: usize) -> Option<(usize, String)> {
    let line_start = text[..pos].rfind('\n').map_or(0, |p| p + 1);
    let (mut depth, _) = unquote(&text[line_start..pos]);
    let mut innermost = None;
    let mut fallback = None;
    let mut end = line_start;

    while depth > 0 && end > 0 {
        let start = text[..end - 1].rfind('\n').map_or(0, |p| p + 1);
        let (level, rest) = unquote(&text[start..end - 1]);
        end = start;
        if level == 0 {
            break;
        }
        if level > depth {
            continue;
        }
        let Some(header) = rest
            .strip_prefix("[!")
            .and_then(|r| r.find(']').map(|close| r[close + 1..].trim()))
        else {
            continue;
        };
        let floor = *innermost.get_or_insert(start);
        match split_header(header) {
            (_, Some(number)) => return Some((floor, number)),
            (head, None) => {
                fallback.get_or_insert_with(|| head.to_string());
                depth = level - 1;
            }
        }
    }
    Some((innermost?, fallback?))
}

/// Category from the nearest cue between `floor` and `pos`
///
/// Only the last [`LABEL_CONTEXT_WINDOW`] bytes are searched.
fn classify(text: &str, floor: usize, pos: usize) -> (LabelCategory, Option<String>) {
    let mut start = pos.saturating_sub(LABEL_CONTEXT_WINDOW).max(floor);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let window = &text[start..pos];

    // (offset, category); `None` for cues that close a float
    let mut best: Option<(usize, Option<LabelCategory>)> = None;
    let mut consider = |offset: Option<usize>, category: Option<LabelCategory>| {
        if let Some(offset) = offset {
            if best.map_or(true, |(b, _)| offset > b) {
                best = Some((offset, category));
            }
        }
    };

    consider(window.rfind("\\begin{figure"), Some(LabelCategory::Figure));
    consider(window.rfind("\\caption"), Some(LabelCategory::Figure));
    consider(window.rfind("\\begin{table"), Some(LabelCategory::Table));
    consider(window.rfind("\\end{figure"), None);
    consider(window.rfind("\\end{table"), None);
    for command in SECTION_COMMANDS {
        let mut from = window.len();
        // Skip matches that are a prefix of a longer command
        while let Some(found) = window[..from].rfind(command) {
            if read_letters(window, found + 1).len() == command.len() - 1 {
                consider(Some(found), Some(LabelCategory::Section));
                break;
            }
            from = found;
        }
    }

    match best {
        // A caption inside a table float names a table
        Some((offset, Some(LabelCategory::Figure)))
            if window[offset..].starts_with("\\caption") =>
        {
            let table = window[..offset].rfind("\\begin{table");
            let figure = window[..offset].rfind("\\begin{figure");
            if table > figure {
                (LabelCategory::Table, None)
            } else {
                (LabelCategory::Figure, None)
            }
        }
        Some((offset, Some(LabelCategory::Section))) => {
            (LabelCategory::Section, section_title(text, start + offset))
        }
        Some((_, Some(category))) => (category, None),
        _ => (LabelCategory::Equation, None),
    }
}

// ============================================================================
// Reference substitution
// ============================================================================

fn render_reference(
    command: &str,
    label: &str,
    config: &PipelineConfig,
    table: &LabelTable,
    position: usize,
    diags: &mut Diagnostics,
) -> String {
    if config.reference_mode == ReferenceMode::Placeholder {
        return fill_template(REFERENCE_PLACEHOLDER, &[("label", label)]);
    }
    let Some(record) = table.get(label) else {
        diags.add(
            Diagnostic::new(
                DiagnosticKind::UndefinedReference,
                format!("\\{}{{{}}} refers to an undefined label", command, label),
                position,
            )
            .with_suggestion(format!("add \\label{{{}}} or fix the spelling", label)),
        );
        return UNDEFINED_REFERENCE.to_string();
    };

    let template = config
        .reference_templates
        .get(command)
        .map(String::as_str)
        .unwrap_or("$n");
    let number = record.number.as_str();
    let kind = record.category.to_string();
    let name = record.display_name.as_deref().unwrap_or(number);
    fill_template(
        template,
        &[
            ("n", number),
            ("name", name),
            ("type", &kind),
            ("label", label),
        ],
    )
}

/// What to delete for a label: its whole line when nothing else is on it,
/// otherwise the command and the inline space before it
fn removal_range(text: &str, range: Range<usize>) -> Range<usize> {
    let wide = widen_to_line(text, range.clone());
    if wide != range {
        return wide;
    }
    let line_start = text[..range.start].rfind('\n').map_or(0, |p| p + 1);
    let before = &text[line_start..range.start];
    if strip_quote(before).is_empty() {
        return range;
    }
    line_start + before.trim_end_matches(|c| c == ' ' || c == '\t').len()..range.end
}

/// The reference phase
///
/// `table` is refilled from `text`; references and label definitions are
/// rewritten in one edit list.
pub fn process_references(
    text: &str,
    config: &PipelineConfig,
    table: &mut LabelTable,
    diags: &mut Diagnostics,
) -> ConversionResult<String> {
    let mut edits = EditList::new();

    if config.reference_mode == ReferenceMode::Resolve {
        table.collect(text, config.counter_base, diags);
    } else {
        table.clear();
    }

    // Pass 2
    if config.reference_mode != ReferenceMode::Ignore {
        let bytes = text.as_bytes();
        let mut i = 0;
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
            if !config.reference_templates.contains_key(command) {
                i = after;
                continue;
            }
            let mut pos = after;
            if bytes.get(pos) == Some(&b'*') {
                pos += 1;
            }
            let Some(group) = read_braced(text, skip_whitespace(text, pos)) else {
                i = after;
                continue;
            };
            let label = text[group.inner.clone()].trim();
            let rendered = render_reference(command, label, config, table, i, diags);
            edits.replace(i..group.end, rendered);
            i = group.end;
        }
    }

    // Label definitions
    let tagging = config.reference_mode == ReferenceMode::Resolve && config.tag_equations;
    if tagging {
        for site in &table.sites {
            if site.category == LabelCategory::Equation && table.is_taggable(text, site) {
                edits.replace(site.range.clone(), format!("\\tag{{{}}}", site.number));
            } else if config.remove_labels {
                edits.delete(removal_range(text, site.range.clone()));
            }
        }
    } else if config.remove_labels {
        for (range, _) in label_commands(text) {
            edits.delete(removal_range(text, range));
        }
    }

    edits.apply(text)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(text: &str, config: &PipelineConfig) -> (String, LabelTable, Diagnostics) {
        let mut table = LabelTable::new();
        let mut diags = Diagnostics::new();
        let out = process_references(text, config, &mut table, &mut diags).unwrap();
        (out, table, diags)
    }

    #[test]
    fn test_equation_label_and_eqref() {
        let text = "$$\nx=1 \\label{eq:x}\n$$\nSee \\eqref{eq:x}.";
        let (out, table, diags) = run(text, &PipelineConfig::default());
        assert_eq!(out, "$$\nx=1 \\tag{1}\n$$\nSee (1).");
        assert_eq!(table.get("eq:x").map(|r| r.category), Some(LabelCategory::Equation));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_undefined_reference() {
        let (out, _, diags) = run("See \\ref{nope}.", &PipelineConfig::default());
        assert_eq!(out, "See (?).");
        assert_eq!(diags.count_of(DiagnosticKind::UndefinedReference), 1);
    }

    #[test]
    fn test_categories() {
        let text = "\\section{Intro}\\label{sec:intro}\n\
                    \\begin{figure}\\caption{A}\\label{fig:a}\\end{figure}\n\
                    \\begin{table}\\caption{T}\\label{tab:t}\\end{table}\n\
                    \\begin{figure}\\label{fig:b}\\end{figure}";
        let mut table = LabelTable::new();
        table.collect(text, 1, &mut Diagnostics::new());
        let category = |l: &str| table.get(l).map(|r| (r.category, r.number.as_str()));
        assert_eq!(category("sec:intro"), Some((LabelCategory::Section, "1")));
        assert_eq!(category("fig:a"), Some((LabelCategory::Figure, "1")));
        assert_eq!(category("tab:t"), Some((LabelCategory::Table, "1")));
        assert_eq!(category("fig:b"), Some((LabelCategory::Figure, "2")));
        assert_eq!(
            table.get("sec:intro").and_then(|r| r.display_name.clone()),
            Some("Intro".to_string())
        );
    }

    #[test]
    fn test_subsection_is_not_section_prefix_confusion() {
        let text = "\\subsection{Deep}\\label{s}";
        let mut table = LabelTable::new();
        table.collect(text, 1, &mut Diagnostics::new());
        assert_eq!(
            table.get("s").and_then(|r| r.display_name.clone()),
            Some("Deep".to_string())
        );
    }

    #[test]
    fn test_reference_templates() {
        let text = "\\section{Intro}\\label{sec:intro}\n\\autoref{sec:intro}, \\nameref{sec:intro}, \\ref*{sec:intro}";
        let (out, _, _) = run(text, &PipelineConfig::default());
        assert_eq!(out, "\\section{Intro}\nSection 1, Intro, 1");
    }

    #[test]
    fn test_duplicate_last_wins() {
        let text = "$$a \\label{x}$$ $$b \\label{x}$$ \\ref{x}";
        let (out, _, diags) = run(text, &PipelineConfig::default());
        assert_eq!(diags.count_of(DiagnosticKind::DuplicateLabel), 1);
        assert!(out.ends_with(" 2"));
    }

    #[test]
    fn test_counter_base() {
        let config = PipelineConfig {
            counter_base: 0,
            ..PipelineConfig::default()
        };
        let (out, _, _) = run("$$x \\label{a}$$ \\eqref{a}", &config);
        assert_eq!(out, "$$x \\tag{0}$$ (0)");
    }

    #[test]
    fn test_multi_row_labels_are_not_tagged() {
        let text = "$$\n\\begin{aligned}\na &= b \\label{e1} \\\\\nc &= d \\label{e2}\n\\end{aligned}\n$$\n\\eqref{e2}";
        let (out, table, _) = run(text, &PipelineConfig::default());
        assert_eq!(
            out,
            "$$\n\\begin{aligned}\na &= b \\\\\nc &= d\n\\end{aligned}\n$$\n(2)"
        );
        assert_eq!(table.get("e1").map(|r| r.number.as_str()), Some("1"));

        let config = PipelineConfig {
            remove_labels: false,
            ..PipelineConfig::default()
        };
        let (out, _, _) = run(text, &config);
        assert!(out.contains("a &= b \\label{e1}"));
        assert!(!out.contains("\\tag"));
    }

    #[test]
    fn test_one_tag_per_display_block() {
        let text = "$$a \\label{x} + b \\label{y}$$ $$c \\label{z}$$";
        let (out, _, _) = run(text, &PipelineConfig::default());
        assert_eq!(out, "$$a + b$$ $$c \\tag{3}$$");

        let text = "$$\n\\begin{gathered}\nx \\label{g}\n\\end{gathered}\n$$";
        let (out, _, _) = run(text, &PipelineConfig::default());
        assert_eq!(out, "$$\n\\begin{gathered}\nx\n\\end{gathered}\n$$");
    }

    #[test]
    fn test_counter_base_saturates() {
        let config = PipelineConfig {
            counter_base: u32::MAX,
            ..PipelineConfig::default()
        };
        let text = "$$x \\label{x}$$ $$y \\label{y}$$ \\ref{x} \\ref{y}";
        let (out, _, diags) = run(text, &config);
        let max = u32::MAX.to_string();
        assert_eq!(
            out,
            format!("$$x \\tag{{{max}}}$$ $$y \\tag{{{max}}}$$ {max} {max}")
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_label_in_callout_takes_theorem_number() {
        let text = "> [!theorem] Theorem 2.\n> \\label{t:a}\n> Body\n\n$$\nx \\label{e}\n$$\n\\ref{t:a} \\eqref{e}";
        let (out, table, _) = run(text, &PipelineConfig::default());
        assert_eq!(
            out,
            "> [!theorem] Theorem 2.\n> Body\n\n$$\nx \\tag{1}\n$$\n2 (1)"
        );
        assert_eq!(table.get("t:a").map(|r| r.category), Some(LabelCategory::Theorem));
    }

    #[test]
    fn test_label_in_nested_callout() {
        let text = "> [!theorem] Theorem 1.3. (Main)\n> Outer\n>\n> > [!proof] Proof\n> > Step \\label{s}\n\n\\ref{s}";
        let (out, _, _) = run(text, &PipelineConfig::default());
        assert!(out.contains("> > Step\n"));
        assert!(out.ends_with("\n\n1.3"));

        let text = "> [!definition] Definition (Group)\n> \\label{d}\n> Text\n\nSee \\ref{d}.";
        let (out, _, _) = run(text, &PipelineConfig::default());
        assert_eq!(out, "> [!definition] Definition (Group)\n> Text\n\nSee Definition.");
    }

    #[test]
    fn test_cue_inside_callout_wins() {
        let text = "\\section{S}\n\n> [!lemma] Lemma 4.\n> \\begin{figure}\\caption{C}\\label{f}\\end{figure}\n\n\\ref{f}";
        let mut table = LabelTable::new();
        table.collect(text, 1, &mut Diagnostics::new());
        assert_eq!(table.get("f").map(|r| r.category), Some(LabelCategory::Figure));

        let text = "\\section{S}\n\n> [!lemma] Lemma 4.\n> A \\label{l}";
        table.collect(text, 1, &mut Diagnostics::new());
        assert_eq!(table.get("l").map(|r| r.number.as_str()), Some("4"));
    }

    #[test]
    fn test_placeholder_mode() {
        let config = PipelineConfig {
            reference_mode: ReferenceMode::Placeholder,
            ..PipelineConfig::default()
        };
        let (out, table, diags) = run("See \\ref{fig:x}.\n\\label{fig:x}\n", &config);
        assert_eq!(out, "See (ref: fig:x).\n");
        assert!(table.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_ignore_mode_keeps_references() {
        let config = PipelineConfig {
            reference_mode: ReferenceMode::Ignore,
            remove_labels: false,
            ..PipelineConfig::default()
        };
        let text = "See \\ref{a}. \\label{a}";
        let (out, _, _) = run(text, &config);
        assert_eq!(out, text);
    }

    #[test]
    fn test_keep_labels_outside_display() {
        let config = PipelineConfig {
            remove_labels: false,
            ..PipelineConfig::default()
        };
        let (out, _, _) = run("\\section{A}\\label{s} \\ref{s}", &config);
        assert_eq!(out, "\\section{A}\\label{s} 1");
    }

    #[test]
    fn test_commented_label_ignored() {
        let (_, table, _) = run("% \\label{gone}\n", &PipelineConfig::default());
        assert!(table.get("gone").is_none());
    }
}
