use std::fmt;
use std::ops::Range;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)] // Default for convenience
pub struct Span {
    pub start: usize, // Byte offset
    pub end: usize,   // Byte offset (exclusive)
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Zero-width span, used for tokens synthesized by the layout pass.
    pub fn point(offset: usize) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    // Helper to merge two spans (e.g., for binary expressions)
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_range(self) -> Range<usize> {
        self.start..self.end
    }

    /// 1-based line and column of the span start within `source`.
    /// Columns count characters, not bytes.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        assert_eq!(Span::new(4, 6).merge(Span::new(1, 3)), Span::new(1, 6));
        assert_eq!(Span::new(0, 10).merge(Span::new(2, 3)), Span::new(0, 10));
    }

    #[test]
    fn test_line_col() {
        let source = "a: 1\nbb: 2\n  c: 3";
        assert_eq!(Span::point(0).line_col(source), (1, 1));
        assert_eq!(Span::point(5).line_col(source), (2, 1));
        assert_eq!(Span::point(9).line_col(source), (2, 5));
        assert_eq!(Span::point(13).line_col(source), (3, 3));
        // Offsets past the end clamp to the last position
        assert_eq!(Span::point(100).line_col(source), (3, 7));
    }
}
