//! Source location tracking.

/// A span in the source code.
///
/// Nodes built without a known position carry [`Span::UNKNOWN`], which is the
/// identity for [`Span::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Byte offset of the start.
    pub start: usize,
    /// Byte offset of the end (exclusive).
    pub end: usize,
}

impl Span {
    /// The sentinel for positions the front end could not supply.
    pub const UNKNOWN: Span = Span {
        start: usize::MAX,
        end: 0,
    };

    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Merge with an optional span, as used for keyword positions.
    pub fn merge_opt(self, other: Option<Span>) -> Span {
        match other {
            Some(other) => self.merge(other),
            None => self,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.start > self.end
    }

    /// Get the length of the span.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::UNKNOWN
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        if span.is_unknown() {
            (0, 0).into()
        } else {
            (span.start, span.len()).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_covers_both() {
        let merged = Span::new(4, 8).merge(Span::new(1, 5));
        assert_eq!(merged, Span::new(1, 8));
    }

    #[test]
    fn test_unknown_is_merge_identity() {
        let span = Span::new(3, 9);
        assert_eq!(Span::UNKNOWN.merge(span), span);
        assert_eq!(span.merge(Span::UNKNOWN), span);
        assert!(Span::UNKNOWN.merge(Span::UNKNOWN).is_unknown());
    }

    #[test]
    fn test_unknown_converts_to_empty_source_span() {
        let source: miette::SourceSpan = Span::UNKNOWN.into();
        assert_eq!(source.offset(), 0);
        assert_eq!(source.len(), 0);
    }
}
