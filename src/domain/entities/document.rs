//! Block geometry of an offset-addressed document.

/// A block (line) of the document, excluding its trailing newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Zero-based block number.
    pub index: usize,
    /// Offset of the first character.
    pub start: usize,
    /// Offset one past the last character, before the newline.
    pub end: usize,
}

impl BlockSpan {
    /// Number of characters in the block.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true for an empty line.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `offset` lies inside the block or right at its end.
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}
