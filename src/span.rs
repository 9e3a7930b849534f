//! Source ranges for tokens, AST nodes and diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open byte range into the original expression text.
///
/// Offsets are 0-based; `start` is inclusive and `end` exclusive. Lines and
/// columns are derived lazily from the source (see [`line_column`]) and are
/// 1-based when shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl TextRange {
    /// Create a new range. `start` must not exceed `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start must not exceed end");
        Self { start, end }
    }

    /// An empty range anchored at `offset`.
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range covers no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` falls inside the range.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(&self, other: TextRange) -> TextRange {
        TextRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Slice `source` to the text this range denotes.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Map a byte offset to a 1-based `(line, column)` pair.
///
/// Columns count characters, not bytes, so multi-byte input underlines at
/// the right place.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let mut line = 1u32;
    let mut column = 1u32;
    for (pos, ch) in source.char_indices() {
        if pos >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_spans_both_ranges() {
        let a = TextRange::new(2, 5);
        let b = TextRange::new(8, 10);
        assert_eq!(a.cover(b), TextRange::new(2, 10));
        assert_eq!(b.cover(a), TextRange::new(2, 10));
    }

    #[test]
    fn line_column_is_one_based() {
        let source = "a + b\nc.d";
        assert_eq!(line_column(source, 0), (1, 1));
        assert_eq!(line_column(source, 4), (1, 5));
        assert_eq!(line_column(source, 6), (2, 1));
        assert_eq!(line_column(source, 8), (2, 3));
    }

    #[test]
    fn text_slices_source() {
        let source = "name.given";
        assert_eq!(TextRange::new(5, 10).text(source), "given");
    }
}
