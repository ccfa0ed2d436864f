use serde::{Deserialize, Serialize};

/// Byte-offset span in source code, with the 1-based line and column of `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end, line: 0, column: 0 }
    }

    pub fn with_position(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0, line: 0, column: 0 }
    }

    /// Span covering `self` through `other`, positioned at `self`.
    pub fn to(self, other: Span) -> Span {
        Span { start: self.start, end: other.end.max(self.end), line: self.line, column: self.column }
    }

    /// Key used by side tables that annotate nodes (e.g. inferred types).
    pub fn key(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// A value annotated with its source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self { node, span: Span::dummy() }
    }
}
