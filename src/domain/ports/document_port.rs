//! Port for the offset-addressed document the previews live in.

use crate::domain::entities::{BlockSpan, PlaceholderFormat};
use crate::domain::errors::DocumentError;

/// Offset-addressed editing surface.
///
/// Offsets are `char` positions. Blocks are newline-separated lines. Every
/// structural edit remaps stored marker formats so that offsets stay valid
/// for text that was not touched.
pub trait PreviewDocument {
    /// Total number of characters.
    fn len_chars(&self) -> usize;

    /// Number of blocks; an empty document has one empty block.
    fn block_count(&self) -> usize;

    /// Block by index.
    fn block(&self, index: usize) -> Option<BlockSpan>;

    /// Block containing `offset`; the end-of-block position belongs to the block.
    fn block_at(&self, offset: usize) -> Option<BlockSpan>;

    /// Text of `start..end`, clamped to the document.
    fn text(&self, start: usize, end: usize) -> String;

    /// Text of a whole block.
    fn block_text(&self, block: &BlockSpan) -> String {
        self.text(block.start, block.end)
    }

    /// Character at `offset`.
    fn char_at(&self, offset: usize) -> Option<char>;

    /// Format of the marker at `offset`, if it carries one.
    fn marker_at(&self, offset: usize) -> Option<&PlaceholderFormat>;

    /// All formatted markers in ascending offset order.
    fn markers(&self) -> Vec<(usize, PlaceholderFormat)>;

    /// Inserts plain text.
    ///
    /// # Errors
    /// Returns error if `offset` is past the end.
    fn insert_text(&mut self, offset: usize, text: &str) -> Result<(), DocumentError>;

    /// Inserts a marker glyph carrying `format`.
    ///
    /// # Errors
    /// Returns error if `offset` is past the end.
    fn insert_marker(&mut self, offset: usize, format: PlaceholderFormat)
    -> Result<(), DocumentError>;

    /// Removes `start..end`.
    ///
    /// # Errors
    /// Returns error if the range is inverted or past the end.
    fn remove(&mut self, start: usize, end: usize) -> Result<(), DocumentError>;

    /// Replaces the format of an existing marker without touching text.
    ///
    /// # Errors
    /// Returns error if no formatted marker sits at `offset`.
    fn set_marker_format(
        &mut self,
        offset: usize,
        format: PlaceholderFormat,
    ) -> Result<(), DocumentError>;

    /// Opens an edit group; nested groups merge into the outermost one.
    fn begin_edit_group(&mut self);

    /// Closes the innermost edit group.
    fn end_edit_group(&mut self);

    /// Modified flag as observed by the user.
    fn is_modified(&self) -> bool;

    /// Overrides the modified flag.
    fn set_modified(&mut self, modified: bool);

    /// Current width of the editing surface in pixels.
    fn viewport_width(&self) -> u32;
}
