//! Theorem and callout numbering
//!
//! Tracks `\newtheorem` declarations and their counters for one run:
//!
//! - `\newtheorem{name}{Prefix}` - own counter
//! - `\newtheorem{name}{Prefix}[section]` - numbered `{section}.{n}`, reset per section
//! - `\newtheorem{name}[other]{Prefix}` - shares the counter of `other`
//! - `\newtheorem*{name}{Prefix}` - never numbered
//!
//! Environments that were never declared fall back to the default table and
//! get no number.

use fxhash::FxHashMap;

use crate::data::constants::{QED_MARK, THEOREM_TYPES};
use crate::utils::scan::{quote_lines, read_braced, read_bracketed, skip_whitespace};

/// A theorem-like environment declared with `\newtheorem`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TheoremDecl {
    pub name: String,
    pub counter: u32,
    /// Text printed before the number ("Theorem")
    pub prefix: String,
    /// Counter this one is reset by, or shares when `shared` is set
    pub parent: Option<String>,
    pub shared: bool,
    pub numbered: bool,
}

impl TheoremDecl {
    pub fn new(name: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            counter: 0,
            prefix: prefix.to_string(),
            parent: None,
            shared: false,
            numbered: true,
        }
    }

    /// Reset within `parent`
    pub fn within(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self.shared = false;
        self
    }

    /// Share the counter of `other`
    pub fn sharing(mut self, other: &str) -> Self {
        self.parent = Some(other.to_string());
        self.shared = true;
        self
    }

    pub fn unnumbered(mut self) -> Self {
        self.numbered = false;
        self
    }

    fn section_scoped(&self) -> bool {
        !self.shared && self.parent.as_deref() == Some("section")
    }
}

/// Parse a `\newtheorem` declaration; `pos` is just past the command name
///
/// Returns the declaration and the offset where it ends.
pub fn parse_declaration(text: &str, pos: usize) -> Option<(TheoremDecl, usize)> {
    let bytes = text.as_bytes();
    let mut pos = pos;
    let starred = bytes.get(pos) == Some(&b'*');
    if starred {
        pos += 1;
    }

    let name_group = read_braced(text, skip_whitespace(text, pos))?;
    let name = text[name_group.inner].trim();
    if name.is_empty() {
        return None;
    }
    pos = skip_whitespace(text, name_group.end);

    // `[shared]` between name and prefix
    let mut shared = None;
    if bytes.get(pos) == Some(&b'[') {
        let group = read_bracketed(text, pos)?;
        shared = Some(text[group.inner].trim().to_string());
        pos = skip_whitespace(text, group.end);
    }

    let prefix_group = read_braced(text, pos)?;
    let prefix = text[prefix_group.inner].trim();
    let mut end = prefix_group.end;

    // `[parent]` after the prefix
    let mut parent = None;
    let after = skip_whitespace(text, end);
    if shared.is_none() && bytes.get(after) == Some(&b'[') {
        let group = read_bracketed(text, after)?;
        parent = Some(text[group.inner].trim().to_string());
        end = group.end;
    }

    let mut decl = TheoremDecl::new(name, prefix);
    if let Some(ref other) = shared {
        decl = decl.sharing(other);
    } else if let Some(ref parent) = parent {
        decl = decl.within(parent);
    }
    if starred {
        decl = decl.unnumbered();
    }
    Some((decl, end))
}

/// Header of one rendered callout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutHeader {
    /// Callout type written as `[!callout]`
    pub callout: String,
    /// "Theorem 1.2." or "Proof"
    pub text: String,
}

/// Theorem declarations and counters for one conversion run
#[derive(Debug, Default, Clone)]
pub struct TheoremRegistry {
    decls: FxHashMap<String, TheoremDecl>,
    section: u32,
}

impl TheoremRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every declaration and counter
    pub fn reset(&mut self) {
        self.decls.clear();
        self.section = 0;
    }

    /// Register a declaration; a redeclaration replaces the old one
    pub fn declare(&mut self, decl: TheoremDecl) {
        log::debug!(
            "declared theorem '{}' ({}, parent {:?}, shared {})",
            decl.name,
            decl.prefix,
            decl.parent,
            decl.shared
        );
        self.decls.insert(decl.name.clone(), decl);
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TheoremDecl> {
        self.decls.get(name)
    }

    pub fn section(&self) -> u32 {
        self.section
    }

    /// Move to section `n`, zeroing section-scoped counters
    pub fn update_section(&mut self, n: u32) {
        self.section = n;
        for decl in self.decls.values_mut() {
            if decl.section_scoped() {
                decl.counter = 0;
            }
        }
    }

    /// Increment the counter of `name` and format its number
    fn bump(&mut self, name: &str) -> Option<String> {
        let section = self.section;
        let decl = self.decls.get_mut(name)?;
        decl.counter += 1;
        Some(if decl.section_scoped() {
            format!("{}.{}", section, decl.counter)
        } else {
            decl.counter.to_string()
        })
    }

    /// Number for the next instance of `name`, if it is numbered at all
    ///
    /// A shared declaration increments its parent's counter and takes the
    /// parent's format. If the parent was never declared it counts on its own.
    pub fn next_number(&mut self, name: &str) -> Option<String> {
        let decl = self.decls.get(name)?;
        if !decl.numbered {
            return None;
        }
        match decl.parent.clone() {
            Some(parent) if decl.shared && parent != name && self.is_declared(&parent) => {
                self.bump(&parent)
            }
            _ => self.bump(name),
        }
    }

    /// Header for an instance of `name`, advancing counters as needed
    pub fn open_instance(&mut self, name: &str, title: Option<&str>) -> CalloutHeader {
        let callout = THEOREM_TYPES
            .get(name)
            .map(|info| info.callout.to_string())
            .unwrap_or_else(|| name.to_string());

        let prefix = match self.decls.get(name) {
            Some(decl) => decl.prefix.clone(),
            None => THEOREM_TYPES
                .get(name)
                .map(|info| info.display_name.to_string())
                .unwrap_or_else(|| name.to_string()),
        };

        let mut text = match self.next_number(name) {
            Some(number) => format!("{} {}.", prefix, number),
            None => prefix,
        };
        if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
            text.push_str(&format!(" ({})", title));
        }
        CalloutHeader { callout, text }
    }
}

/// Render a callout block from its header and already converted body
pub fn render_callout(header: &CalloutHeader, body: &str, is_proof: bool) -> String {
    let mut body = body.trim().to_string();
    if is_proof {
        if body.is_empty() {
            body = QED_MARK.to_string();
        } else {
            body.push(' ');
            body.push_str(QED_MARK);
        }
    }

    let first = format!("> [!{}] {}", header.callout, header.text);
    if body.is_empty() {
        first
    } else {
        format!("{}\n{}", first, quote_lines(&body, "> "))
    }
}
