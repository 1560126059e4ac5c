//! Placeholder materialization inside the document.
//!
//! A placeholder is a single marker glyph carrying a [`PlaceholderFormat`].
//! Inline links get the marker right after the link text; block links get a
//! new block holding only the marker. Every mutation made here runs inside
//! one edit group and leaves the document's modified flag as it found it.

use tracing::{debug, trace};

use crate::domain::entities::{
    Anchor, BlockSpan, CachedImage, PLACEHOLDER_MARKER, PlaceholderFormat, PreviewId,
};
use crate::domain::errors::DocumentError;
use crate::domain::ports::PreviewDocument;

/// A placeholder found next to a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSite {
    /// Offset of the marker glyph.
    pub marker_offset: usize,
    /// Start of the text to delete when dropping the placeholder.
    pub remove_start: usize,
    /// End of the text to delete when dropping the placeholder.
    pub remove_end: usize,
    /// Format carried by the marker; `None` for a bare glyph.
    pub format: Option<PlaceholderFormat>,
}

/// Runs `edit` as one edit group and restores the modified flag afterwards.
fn grouped_edit<D, T>(
    doc: &mut D,
    edit: impl FnOnce(&mut D) -> Result<T, DocumentError>,
) -> Result<T, DocumentError>
where
    D: PreviewDocument + ?Sized,
{
    let modified = doc.is_modified();
    doc.begin_edit_group();
    let result = edit(doc);
    doc.end_edit_group();
    doc.set_modified(modified);
    result
}

/// Inserts, updates and removes placeholders. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewBlockManager;

impl PreviewBlockManager {
    /// Creates a manager.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// A block is a placeholder iff its trimmed text is exactly the marker.
    pub fn is_placeholder_block<D>(&self, doc: &D, block: &BlockSpan) -> bool
    where
        D: PreviewDocument + ?Sized,
    {
        let text = doc.block_text(block);
        let mut chars = text.trim().chars();
        chars.next() == Some(PLACEHOLDER_MARKER) && chars.next().is_none()
    }

    /// Finds the placeholder sitting right after the link at `anchor`.
    pub fn placeholder_at<D>(&self, doc: &D, anchor: Anchor) -> Option<PlaceholderSite>
    where
        D: PreviewDocument + ?Sized,
    {
        if anchor.is_block {
            let block = doc.block_at(anchor.offset)?;
            let next = doc.block(block.index + 1)?;
            if !self.is_placeholder_block(doc, &next) {
                return None;
            }
            let shift = doc
                .block_text(&next)
                .chars()
                .position(|c| c == PLACEHOLDER_MARKER)?;
            let marker_offset = next.start + shift;
            Some(PlaceholderSite {
                marker_offset,
                remove_start: block.end,
                remove_end: next.end,
                format: doc.marker_at(marker_offset).cloned(),
            })
        } else {
            if doc.char_at(anchor.offset)? != PLACEHOLDER_MARKER {
                return None;
            }
            Some(PlaceholderSite {
                marker_offset: anchor.offset,
                remove_start: anchor.offset,
                remove_end: anchor.offset + 1,
                format: doc.marker_at(anchor.offset).cloned(),
            })
        }
    }

    /// Shows `image` for the link at `anchor` and returns the preview id on display.
    ///
    /// A placeholder already showing `resolved_path` keeps its id and only has
    /// its width refreshed. Otherwise any stale placeholder is replaced by a
    /// new one carrying `candidate`.
    ///
    /// # Errors
    /// Returns error if the anchor no longer lies inside the document.
    pub fn upsert<D>(
        &self,
        doc: &mut D,
        anchor: Anchor,
        image: &CachedImage,
        resolved_path: &str,
        candidate: PreviewId,
        width: u32,
    ) -> Result<PreviewId, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let existing = self.placeholder_at(doc, anchor);
        if let Some(site) = &existing {
            if let Some(format) = &site.format {
                if format.resolved_path == resolved_path {
                    self.refresh_width(doc, site.marker_offset, width)?;
                    return Ok(format.preview_id);
                }
            }
        }

        let format = PlaceholderFormat {
            resource_name: image.resource_name.clone(),
            resolved_path: resolved_path.to_string(),
            preview_id: candidate,
            width,
        };

        grouped_edit(doc, |doc| {
            if let Some(site) = &existing {
                doc.remove(site.remove_start, site.remove_end)?;
            }
            if anchor.is_block {
                doc.insert_text(anchor.offset, "\n")?;
                doc.insert_marker(anchor.offset + 1, format)
            } else {
                doc.insert_marker(anchor.offset, format)
            }
        })?;

        debug!(
            id = %candidate,
            path = %resolved_path,
            block = anchor.is_block,
            replaced = existing.is_some(),
            "Placeholder materialized"
        );
        Ok(candidate)
    }

    /// Updates the width of the marker at `offset` if it differs.
    /// Returns true if the format changed.
    ///
    /// # Errors
    /// Returns error if no formatted marker sits at `offset`.
    pub fn refresh_width<D>(
        &self,
        doc: &mut D,
        offset: usize,
        width: u32,
    ) -> Result<bool, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let format = doc
            .marker_at(offset)
            .ok_or(DocumentError::NotAMarker { offset })?;
        if format.width == width {
            return Ok(false);
        }

        let updated = PlaceholderFormat {
            width,
            ..format.clone()
        };
        trace!(offset, from = format.width, to = width, "Placeholder width updated");
        grouped_edit(doc, |doc| doc.set_marker_format(offset, updated))?;
        Ok(true)
    }

    /// Removes the placeholder of preview `id`. Returns false if it is not in the document.
    ///
    /// # Errors
    /// Returns error if the document rejects the removal.
    pub fn remove<D>(&self, doc: &mut D, id: PreviewId) -> Result<bool, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let offset = doc
            .markers()
            .into_iter()
            .find(|(_, format)| format.preview_id == id)
            .map(|(offset, _)| offset);

        match offset {
            Some(offset) => self.remove_marker_at(doc, offset),
            None => Ok(false),
        }
    }

    /// Removes the marker at `offset`, taking its whole block if that block is
    /// a placeholder. Returns false if no marker glyph sits there.
    ///
    /// # Errors
    /// Returns error if the document rejects the removal.
    pub fn remove_marker_at<D>(&self, doc: &mut D, offset: usize) -> Result<bool, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        if doc.char_at(offset) != Some(PLACEHOLDER_MARKER) {
            return Ok(false);
        }
        let Some(block) = doc.block_at(offset) else {
            return Ok(false);
        };

        let (start, end) = if self.is_placeholder_block(doc, &block) {
            self.block_removal_range(doc, &block)
        } else {
            (offset, offset + 1)
        };
        grouped_edit(doc, |doc| doc.remove(start, end))?;
        trace!(offset, "Placeholder removed");
        Ok(true)
    }

    /// Strips marker glyphs from a block where users typed next to them.
    ///
    /// Only blocks mixing markers with other non-whitespace text qualify.
    /// Markers whose format satisfies `keep` stay; the rest of the text is
    /// never touched. Returns the number of glyphs removed.
    ///
    /// # Errors
    /// Returns error if the document rejects the removal.
    pub fn repair_corrupted<D>(
        &self,
        doc: &mut D,
        block: &BlockSpan,
        keep: impl Fn(&PlaceholderFormat) -> bool,
    ) -> Result<usize, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let text = doc.block_text(block);
        let has_marker = text.contains(PLACEHOLDER_MARKER);
        let only_spaces = text
            .chars()
            .all(|c| c == PLACEHOLDER_MARKER || c.is_whitespace());
        if !has_marker || only_spaces {
            return Ok(0);
        }

        let removed = self.strip_markers(doc, block, keep)?;
        if removed > 0 {
            debug!(block = block.index, removed, "Repaired corrupted placeholder block");
        }
        Ok(removed)
    }

    /// Detaches every placeholder in the document, leaving other text untouched.
    /// Returns the number of placeholders removed.
    ///
    /// # Errors
    /// Returns error if the document rejects a removal.
    pub fn clear_all<D>(&self, doc: &mut D) -> Result<usize, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let removed = grouped_edit(doc, |doc| {
            let mut removed = 0;
            for index in (0..doc.block_count()).rev() {
                let Some(block) = doc.block(index) else {
                    continue;
                };
                if self.is_placeholder_block(doc, &block) {
                    let (start, end) = self.block_removal_range(doc, &block);
                    doc.remove(start, end)?;
                    removed += 1;
                } else {
                    removed += self.strip_markers(doc, &block, |_| false)?;
                }
            }
            Ok(removed)
        })?;

        if removed > 0 {
            debug!(removed, "Cleared all placeholders");
        }
        Ok(removed)
    }

    fn strip_markers<D>(
        &self,
        doc: &mut D,
        block: &BlockSpan,
        keep: impl Fn(&PlaceholderFormat) -> bool,
    ) -> Result<usize, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let doomed: Vec<usize> = doc
            .block_text(block)
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == PLACEHOLDER_MARKER)
            .map(|(i, _)| block.start + i)
            .filter(|offset| !doc.marker_at(*offset).is_some_and(&keep))
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        grouped_edit(doc, |doc| {
            for offset in doomed.iter().rev() {
                doc.remove(*offset, offset + 1)?;
            }
            Ok(doomed.len())
        })
    }

    fn block_removal_range<D>(&self, doc: &D, block: &BlockSpan) -> (usize, usize)
    where
        D: PreviewDocument + ?Sized,
    {
        if block.index > 0 {
            (block.start - 1, block.end)
        } else if let Some(next) = doc.block(1) {
            (block.start, next.start)
        } else {
            (block.start, block.end)
        }
    }
}
