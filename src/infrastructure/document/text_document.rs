//! Rope-backed document buffer with placeholder markers.

use std::collections::BTreeMap;
use std::fmt;

use ropey::Rope;
use tracing::trace;

use crate::domain::entities::{BlockSpan, PLACEHOLDER_MARKER, PlaceholderFormat};
use crate::domain::errors::DocumentError;
use crate::domain::ports::PreviewDocument;

/// Default editing surface width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 800;

/// In-memory document addressed by character offsets.
///
/// Marker formats live in an ordered side table keyed by offset. Every
/// insert or removal remaps that table so formats follow their glyphs.
#[derive(Debug, Clone)]
pub struct TextDocument {
    rope: Rope,
    markers: BTreeMap<usize, PlaceholderFormat>,
    modified: bool,
    group_depth: usize,
    group_dirty: bool,
    undo_steps: usize,
    viewport_width: u32,
}

impl TextDocument {
    /// Creates an unmodified document holding `text`.
    #[must_use]
    pub fn new(text: &str, viewport_width: u32) -> Self {
        Self {
            rope: Rope::from_str(text),
            markers: BTreeMap::new(),
            modified: false,
            group_depth: 0,
            group_dirty: false,
            undo_steps: 0,
            viewport_width,
        }
    }

    /// Resizes the editing surface.
    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    /// Number of undoable steps recorded so far.
    #[must_use]
    pub const fn undo_steps(&self) -> usize {
        self.undo_steps
    }

    /// Number of marker glyphs in the text, formatted or not.
    #[must_use]
    pub fn marker_glyph_count(&self) -> usize {
        self.rope.chars().filter(|c| *c == PLACEHOLDER_MARKER).count()
    }

    fn check_offset(&self, offset: usize) -> Result<(), DocumentError> {
        let len = self.rope.len_chars();
        if offset > len {
            return Err(DocumentError::OutOfBounds { offset, len });
        }
        Ok(())
    }

    fn record_edit(&mut self) {
        self.modified = true;
        if self.group_depth == 0 {
            self.undo_steps += 1;
        } else {
            self.group_dirty = true;
        }
    }

    fn remap_after_insert(&mut self, at: usize, count: usize) {
        let tail = self.markers.split_off(&at);
        self.markers
            .extend(tail.into_iter().map(|(offset, format)| (offset + count, format)));
    }

    fn remap_after_remove(&mut self, start: usize, end: usize) {
        let mut tail = self.markers.split_off(&start);
        let after = tail.split_off(&end);
        if !tail.is_empty() {
            trace!(dropped = tail.len(), "Markers removed with text");
        }
        let count = end - start;
        self.markers
            .extend(after.into_iter().map(|(offset, format)| (offset - count, format)));
    }
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new("", DEFAULT_VIEWPORT_WIDTH)
    }
}

impl fmt::Display for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rope)
    }
}

impl PreviewDocument for TextDocument {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn block_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn block(&self, index: usize) -> Option<BlockSpan> {
        if index >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(index);
        let end = if index + 1 < self.rope.len_lines() {
            self.rope.line_to_char(index + 1) - 1
        } else {
            self.rope.len_chars()
        };
        Some(BlockSpan { index, start, end })
    }

    fn block_at(&self, offset: usize) -> Option<BlockSpan> {
        if offset > self.rope.len_chars() {
            return None;
        }
        self.block(self.rope.char_to_line(offset))
    }

    fn text(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let end = end.min(len);
        let start = start.min(end);
        self.rope.slice(start..end).to_string()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.rope.get_char(offset)
    }

    fn marker_at(&self, offset: usize) -> Option<&PlaceholderFormat> {
        self.markers.get(&offset)
    }

    fn markers(&self) -> Vec<(usize, PlaceholderFormat)> {
        self.markers
            .iter()
            .map(|(offset, format)| (*offset, format.clone()))
            .collect()
    }

    fn insert_text(&mut self, offset: usize, text: &str) -> Result<(), DocumentError> {
        self.check_offset(offset)?;
        if text.is_empty() {
            return Ok(());
        }
        self.rope.insert(offset, text);
        self.remap_after_insert(offset, text.chars().count());
        self.record_edit();
        Ok(())
    }

    fn insert_marker(
        &mut self,
        offset: usize,
        format: PlaceholderFormat,
    ) -> Result<(), DocumentError> {
        self.check_offset(offset)?;
        self.rope.insert_char(offset, PLACEHOLDER_MARKER);
        self.remap_after_insert(offset, 1);
        self.markers.insert(offset, format);
        self.record_edit();
        Ok(())
    }

    fn remove(&mut self, start: usize, end: usize) -> Result<(), DocumentError> {
        if end < start {
            return Err(DocumentError::InvalidRange { start, end });
        }
        self.check_offset(end)?;
        if start == end {
            return Ok(());
        }
        self.rope.remove(start..end);
        self.remap_after_remove(start, end);
        self.record_edit();
        Ok(())
    }

    fn set_marker_format(
        &mut self,
        offset: usize,
        format: PlaceholderFormat,
    ) -> Result<(), DocumentError> {
        let slot = self
            .markers
            .get_mut(&offset)
            .ok_or(DocumentError::NotAMarker { offset })?;
        *slot = format;
        self.record_edit();
        Ok(())
    }

    fn begin_edit_group(&mut self) {
        if self.group_depth == 0 {
            self.group_dirty = false;
        }
        self.group_depth += 1;
    }

    fn end_edit_group(&mut self) {
        if self.group_depth == 0 {
            return;
        }
        self.group_depth -= 1;
        if self.group_depth == 0 && self.group_dirty {
            self.undo_steps += 1;
            self.group_dirty = false;
        }
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    fn viewport_width(&self) -> u32 {
        self.viewport_width
    }
}
