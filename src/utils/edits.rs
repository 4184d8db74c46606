//! Deferred text edits
//!
//! Phases never splice the string they are scanning. They record
//! `(range, replacement)` pairs against the original coordinates and build
//! the output in one final pass, so a replacement of a different length can
//! not shift the position of anything scanned later.

use std::ops::Range;

use crate::utils::error::{ConversionError, ConversionResult};

/// A single replacement of `range` (byte offsets into the source) with `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

/// An ordered collection of non-overlapping edits
#[derive(Debug, Clone, Default)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a replacement
    pub fn replace(&mut self, range: Range<usize>, replacement: impl Into<String>) {
        self.edits.push(Edit {
            range,
            replacement: replacement.into(),
        });
    }

    /// Record a deletion
    pub fn delete(&mut self, range: Range<usize>) {
        self.replace(range, String::new());
    }

    /// Record an insertion before `at`
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(at..at, text);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Net change in length once every edit is applied
    pub fn delta(&self) -> isize {
        self.edits
            .iter()
            .map(|e| e.replacement.len() as isize - e.range.len() as isize)
            .sum()
    }

    /// Apply every edit to `source` in one pass
    pub fn apply(mut self, source: &str) -> ConversionResult<String> {
        if self.edits.is_empty() {
            return Ok(source.to_string());
        }

        // Stable sort keeps insertion order for edits at the same offset.
        self.edits.sort_by_key(|e| (e.range.start, e.range.end));

        let capacity = (source.len() as isize + self.delta()).max(0) as usize;
        let mut output = String::with_capacity(capacity);
        let mut cursor = 0;
        let mut previous: Option<&Range<usize>> = None;

        for edit in &self.edits {
            let Range { start, end } = edit.range;
            if start > end || end > source.len() {
                return Err(ConversionError::EditOutOfBounds {
                    start,
                    end,
                    len: source.len(),
                });
            }
            if !source.is_char_boundary(start) || !source.is_char_boundary(end) {
                return Err(ConversionError::CharBoundary { start, end });
            }
            if let Some(prev) = previous {
                if start < prev.end {
                    return Err(ConversionError::OverlappingEdits {
                        first_start: prev.start,
                        first_end: prev.end,
                        second_start: start,
                        second_end: end,
                    });
                }
            }

            output.push_str(&source[cursor..start]);
            output.push_str(&edit.replacement);
            cursor = end;
            previous = Some(&edit.range);
        }

        output.push_str(&source[cursor..]);
        Ok(output)
    }
}
