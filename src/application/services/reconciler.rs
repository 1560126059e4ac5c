//! Image-preview reconciliation.
//!
//! Each pass takes the full list of image-link regions reported by the
//! extractor and brings the document's placeholders in line with it. A
//! generation counter marks which previews the current pass confirmed; the
//! rest are swept at the end.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::domain::entities::{
    ImageRegion, PendingLink, PreviewEntry, PreviewId, PreviewSettings, SyncReport,
};
use crate::domain::errors::{DocumentError, PreviewError};
use crate::domain::ports::{
    CacheResult, ImageFetchPort, LinkResolverPort, PreviewDocument, PreviewSettingsPort,
};
use crate::infrastructure::image::{ImageFetchedEvent, ImageResourceCache, Resolution};

use super::block_manager::PreviewBlockManager;
use super::link_parser::single_image_target;
use super::preview_width::desired_width;

/// Region plus a hash of the text it covered when reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RegionSnapshot {
    region: ImageRegion,
    fingerprint: u64,
}

/// Keeps placeholders in a document consistent with its image links.
pub struct PreviewReconciler {
    resolver: Arc<dyn LinkResolverPort>,
    settings: Arc<dyn PreviewSettingsPort>,
    cache: ImageResourceCache,
    blocks: PreviewBlockManager,
    regions: Vec<RegionSnapshot>,
    previews: HashMap<PreviewId, PreviewEntry>,
    generation: u64,
    last_preview_id: u64,
}

impl std::fmt::Debug for PreviewReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewReconciler")
            .field("generation", &self.generation)
            .field("regions", &self.regions.len())
            .field("previews", &self.previews.len())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl PreviewReconciler {
    /// Creates an engine with no previews.
    ///
    /// `cache_capacity` bounds the decoded-image cache; `None` keeps every
    /// image for the whole session.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn LinkResolverPort>,
        fetcher: Arc<dyn ImageFetchPort>,
        settings: Arc<dyn PreviewSettingsPort>,
        cache_capacity: Option<usize>,
    ) -> Self {
        Self {
            resolver,
            settings,
            cache: ImageResourceCache::new(fetcher, cache_capacity),
            blocks: PreviewBlockManager::new(),
            regions: Vec::new(),
            previews: HashMap::new(),
            generation: 0,
            last_preview_id: 0,
        }
    }

    /// Number of the last pass that did work.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of live previews.
    #[must_use]
    pub fn preview_count(&self) -> usize {
        self.previews.len()
    }

    /// Returns the record of preview `id`.
    #[must_use]
    pub fn preview(&self, id: PreviewId) -> Option<&PreviewEntry> {
        self.previews.get(&id)
    }

    /// Iterates over live previews in no particular order.
    pub fn previews(&self) -> impl Iterator<Item = &PreviewEntry> {
        self.previews.values()
    }

    /// The decoded-image cache.
    #[must_use]
    pub const fn cache(&self) -> &ImageResourceCache {
        &self.cache
    }

    /// Number of remote fetches still in flight.
    #[must_use]
    pub fn pending_fetches(&self) -> usize {
        self.cache.pending_count()
    }

    /// Runs a pass for the regions reported by the extractor.
    ///
    /// A region list identical to the previous one, covering identical text,
    /// is a no-op. Otherwise every region is resolved, placeholders are
    /// created or refreshed in descending offset order, and previews no
    /// region confirmed are removed.
    pub fn synchronize<D>(&mut self, doc: &mut D, regions: &[ImageRegion]) -> SyncReport
    where
        D: PreviewDocument + ?Sized,
    {
        let snapshot = snapshot_regions(doc, regions);
        if snapshot == self.regions {
            trace!(regions = regions.len(), "Region list unchanged");
            return SyncReport::deduplicated(self.generation);
        }

        let settings = self.settings.snapshot();
        if !settings.enable_preview {
            let mut report = SyncReport::new(self.generation);
            report.removed = self.detach_all(doc);
            return report;
        }

        self.regions = snapshot;
        self.generation += 1;
        let mut report = SyncReport::new(self.generation);

        let links = self.extract_links(doc, &mut report);
        let viewport = doc.viewport_width();
        for link in &links {
            if let Err(e) = self.apply_link(doc, link, &settings, viewport, &mut report) {
                warn!(start = link.start, end = link.end, error = %e, "Failed to apply preview");
                report.skip(
                    ImageRegion::new(link.start, link.end),
                    PreviewError::malformed(link.start, link.end, e.to_string()),
                );
            }
        }
        self.sweep(doc, &mut report);

        debug!(
            generation = self.generation,
            regions = regions.len(),
            created = report.created,
            reused = report.reused,
            resized = report.resized,
            removed = report.removed,
            repaired = report.repaired,
            pending = report.pending,
            skipped = report.skipped.len(),
            "Preview pass complete"
        );
        report
    }

    /// Runs a pass even if `regions` matches the previous one.
    ///
    /// Used after remote images arrive, since a completed fetch does not by
    /// itself change any region.
    pub fn update<D>(&mut self, doc: &mut D, regions: &[ImageRegion]) -> SyncReport
    where
        D: PreviewDocument + ?Sized,
    {
        self.regions.clear();
        self.synchronize(doc, regions)
    }

    /// Drops every placeholder and decoded image. Returns the number of
    /// placeholders removed; the next pass rebuilds from scratch.
    pub fn refresh<D>(&mut self, doc: &mut D) -> usize
    where
        D: PreviewDocument + ?Sized,
    {
        let removed = self.detach_all(doc);
        self.cache.clear();
        info!(removed, "Previews refreshed");
        removed
    }

    /// Recomputes every live placeholder's width, e.g. after the viewport
    /// was resized. Returns the number of placeholders changed.
    pub fn rescale<D>(&mut self, doc: &mut D) -> usize
    where
        D: PreviewDocument + ?Sized,
    {
        let settings = self.settings.snapshot();
        if !settings.enable_preview {
            return 0;
        }
        let viewport = doc.viewport_width();

        let mut resized = 0;
        for (offset, format) in doc.markers() {
            if !self.previews.contains_key(&format.preview_id) {
                continue;
            }
            let Some(image) = self.cache.lookup(&format.resolved_path) else {
                continue;
            };
            let width = desired_width(image.natural_width, viewport, &settings);
            match self.blocks.refresh_width(doc, offset, width) {
                Ok(true) => resized += 1,
                Ok(false) => {}
                Err(e) => warn!(offset, error = %e, "Failed to rescale preview"),
            }
        }
        if resized > 0 {
            debug!(resized, viewport, "Previews rescaled");
        }
        resized
    }

    /// Feeds a finished remote fetch into the cache. Returns true if a new
    /// image became available; the next pass will show it.
    pub fn complete_fetch(&mut self, url: &str, result: CacheResult<bytes::Bytes>) -> bool {
        self.cache.complete_fetch(url, result).is_some()
    }

    /// Same as [`Self::complete_fetch`] for an event from the fetcher channel.
    pub fn on_image_fetched(&mut self, event: ImageFetchedEvent) -> bool {
        self.complete_fetch(&event.url, event.result)
    }

    /// Decoded image behind the placeholder marker at `offset`.
    pub fn image_for_placeholder<D>(
        &self,
        doc: &D,
        offset: usize,
    ) -> Option<Arc<image::DynamicImage>>
    where
        D: PreviewDocument + ?Sized,
    {
        let format = doc.marker_at(offset)?;
        self.cache.image(&format.resource_name)
    }

    fn detach_all<D>(&mut self, doc: &mut D) -> usize
    where
        D: PreviewDocument + ?Sized,
    {
        if self.regions.is_empty() && self.previews.is_empty() {
            return 0;
        }
        let removed = self.blocks.clear_all(doc).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to clear placeholders");
            0
        });
        self.previews.clear();
        self.regions.clear();
        debug!(removed, "Previews detached");
        removed
    }

    fn extract_links<D>(&mut self, doc: &D, report: &mut SyncReport) -> Vec<PendingLink>
    where
        D: PreviewDocument + ?Sized,
    {
        let regions: Vec<ImageRegion> = self.regions.iter().map(|s| s.region).collect();
        let mut links = Vec::with_capacity(regions.len());
        let mut floor: Option<usize> = None;

        for region in regions {
            match self.extract_link(doc, region, floor) {
                Ok(link) => {
                    floor = Some(region.start);
                    links.push(link);
                }
                Err(e) => {
                    debug!(start = region.start, end = region.end, error = %e, "Region skipped");
                    report.skip(region, e);
                }
            }
        }
        links
    }

    fn extract_link<D>(
        &mut self,
        doc: &D,
        region: ImageRegion,
        floor: Option<usize>,
    ) -> Result<PendingLink, PreviewError>
    where
        D: PreviewDocument + ?Sized,
    {
        let ImageRegion { start, end } = region;
        if region.is_inverted() {
            return Err(PreviewError::malformed(start, end, "end before start"));
        }
        if end > doc.len_chars() {
            return Err(PreviewError::malformed(start, end, "past end of document"));
        }
        if floor.is_some_and(|f| end > f) {
            return Err(PreviewError::malformed(start, end, "overlaps another region"));
        }
        let block = doc
            .block_at(start)
            .ok_or_else(|| PreviewError::malformed(start, end, "outside any block"))?;
        if end > block.end {
            return Err(PreviewError::malformed(start, end, "spans multiple blocks"));
        }

        let is_block = start == block.start && end == block.end;
        let text = doc.text(start, end);
        let raw = single_image_target(&text).ok_or_else(|| PreviewError::unresolvable(text))?;
        let target = self.resolver.resolve(&raw);
        if !target.is_resolved() {
            return Err(PreviewError::unresolvable(raw));
        }

        let mut link = PendingLink {
            start,
            end,
            is_block,
            resolved_target: target.path,
            kind: target.kind,
            matched_preview: None,
        };
        link.matched_preview = self.confirm_existing(doc, &link);
        Ok(link)
    }

    /// Marks the preview already showing `link`'s target as live.
    fn confirm_existing<D>(&mut self, doc: &D, link: &PendingLink) -> Option<PreviewId>
    where
        D: PreviewDocument + ?Sized,
    {
        let format = self.blocks.placeholder_at(doc, link.anchor())?.format?;
        if format.resolved_path != link.resolved_target {
            return None;
        }
        let entry = self.previews.get_mut(&format.preview_id)?;
        if entry.resolved_path != link.resolved_target {
            return None;
        }
        entry.generation = self.generation;
        trace!(id = %entry.id, "Preview confirmed");
        Some(entry.id)
    }

    fn apply_link<D>(
        &mut self,
        doc: &mut D,
        link: &PendingLink,
        settings: &PreviewSettings,
        viewport: u32,
        report: &mut SyncReport,
    ) -> Result<(), DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let anchor = link.anchor();

        if link.matched_preview.is_some() {
            if let Some(image) = self.cache.lookup(&link.resolved_target) {
                let width = desired_width(image.natural_width, viewport, settings);
                if let Some(site) = self.blocks.placeholder_at(doc, anchor) {
                    if self.blocks.refresh_width(doc, site.marker_offset, width)? {
                        report.resized += 1;
                    }
                }
                report.reused += 1;
                return Ok(());
            }
        }

        if link.is_block {
            report.repaired += self.repair_following_block(doc, anchor.offset)?;
        }

        match self.cache.resolve(&link.resolved_target, link.kind) {
            Resolution::Ready(image) => {
                let candidate = PreviewId(self.last_preview_id + 1);
                let width = desired_width(image.natural_width, viewport, settings);
                let shown = self.blocks.upsert(
                    doc,
                    anchor,
                    &image,
                    &link.resolved_target,
                    candidate,
                    width,
                )?;
                if shown == candidate {
                    report.created += 1;
                } else {
                    report.reused += 1;
                }
                self.last_preview_id = self.last_preview_id.max(shown.get());
                self.previews.insert(
                    shown,
                    PreviewEntry::new(shown, self.generation, link.resolved_target.as_str()),
                );
            }
            Resolution::Pending => report.pending += 1,
            Resolution::Unavailable(e) => report.skip(ImageRegion::new(link.start, link.end), e),
        }
        Ok(())
    }

    /// Strips stray markers from the block right after a block-level link,
    /// keeping those of previews this pass already confirmed.
    fn repair_following_block<D>(&self, doc: &mut D, offset: usize) -> Result<usize, DocumentError>
    where
        D: PreviewDocument + ?Sized,
    {
        let Some(next) = doc
            .block_at(offset)
            .and_then(|block| doc.block(block.index + 1))
        else {
            return Ok(0);
        };
        if self.blocks.is_placeholder_block(doc, &next) {
            return Ok(0);
        }

        let generation = self.generation;
        let previews = &self.previews;
        let removed = self.blocks.repair_corrupted(doc, &next, |format| {
            previews
                .get(&format.preview_id)
                .is_some_and(|entry| !entry.is_stale(generation))
        })?;
        Ok(usize::from(removed > 0))
    }

    /// Forgets previews this pass did not confirm and removes every marker
    /// that no live preview owns.
    fn sweep<D>(&mut self, doc: &mut D, report: &mut SyncReport)
    where
        D: PreviewDocument + ?Sized,
    {
        let generation = self.generation;
        self.previews.retain(|_, entry| !entry.is_stale(generation));

        let orphans: Vec<usize> = doc
            .markers()
            .into_iter()
            .filter(|(_, format)| !self.previews.contains_key(&format.preview_id))
            .map(|(offset, _)| offset)
            .collect();

        for offset in orphans.into_iter().rev() {
            match self.blocks.remove_marker_at(doc, offset) {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => warn!(offset, error = %e, "Failed to remove orphaned placeholder"),
            }
        }
    }
}

/// Sorts regions by descending start and fingerprints the text under each.
fn snapshot_regions<D>(doc: &D, regions: &[ImageRegion]) -> Vec<RegionSnapshot>
where
    D: PreviewDocument + ?Sized,
{
    let mut sorted = regions.to_vec();
    sorted.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    sorted
        .into_iter()
        .map(|region| {
            let mut hasher = DefaultHasher::new();
            if !region.is_inverted() {
                doc.text(region.start, region.end).hash(&mut hasher);
            }
            RegionSnapshot {
                region,
                fingerprint: hasher.finish(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PLACEHOLDER_MARKER;
    use crate::domain::ports::MockImageFetchPort;
    use crate::infrastructure::config::SharedPreviewSettings;
    use crate::infrastructure::document::TextDocument;
    use crate::infrastructure::markdown::RegionExtractor;
    use crate::infrastructure::resolver::FsLinkResolver;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    const MARKER: &str = "\u{FFFC}";

    struct Fixture {
        dir: TempDir,
        settings: SharedPreviewSettings,
        resolver: FsLinkResolver,
        engine: PreviewReconciler,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_fetcher(MockImageFetchPort::new())
        }

        fn with_fetcher(fetcher: MockImageFetchPort) -> Self {
            let dir = TempDir::new().unwrap();
            let settings = SharedPreviewSettings::default();
            let resolver = FsLinkResolver::new(dir.path());
            let engine = PreviewReconciler::new(
                Arc::new(resolver.clone()),
                Arc::new(fetcher),
                Arc::new(settings.clone()),
                None,
            );
            Self {
                dir,
                settings,
                resolver,
                engine,
            }
        }

        fn image(&self, rel: &str, width: u32) {
            let path = self.dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            image::RgbImage::new(width, 4).save(&path).unwrap();
        }

        fn resolved(&self, raw: &str) -> String {
            self.resolver.resolve(raw).path
        }

        fn sync(&mut self, doc: &mut TextDocument) -> SyncReport {
            let regions = RegionExtractor::extract(&doc.to_string());
            self.engine.synchronize(doc, &regions)
        }
    }

    fn png_bytes(width: u32) -> bytes::Bytes {
        let mut out = Vec::new();
        image::DynamicImage::new_rgb8(width, 2)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        bytes::Bytes::from(out)
    }

    fn file_name(path: &str) -> &str {
        Path::new(path).file_name().and_then(|n| n.to_str()).unwrap()
    }

    #[test]
    fn test_block_link_then_target_change() {
        let mut fx = Fixture::new();
        fx.image("img/a.png", 200);
        fx.image("img/b.png", 120);
        let mut doc = TextDocument::new("abcdefghi\n![alt text here1](./img/a.png)\nafter", 800);
        let regions = [ImageRegion::new(10, 40)];

        let report = fx.engine.synchronize(&mut doc, &regions);

        assert_eq!(report.created, 1);
        assert_eq!(
            doc.to_string(),
            format!("abcdefghi\n![alt text here1](./img/a.png)\n{MARKER}\nafter")
        );
        let format = doc.marker_at(41).unwrap().clone();
        assert_eq!(format.preview_id, PreviewId(1));
        assert_eq!(format.width, 200);
        assert_eq!(format.resolved_path, fx.resolved("./img/a.png"));
        assert_eq!(
            fx.engine.cache().image(&format.resource_name).map(|i| i.width()),
            Some(200)
        );

        doc.remove(34, 35).unwrap();
        doc.insert_text(34, "b").unwrap();
        let report = fx.engine.synchronize(&mut doc, &regions);

        assert!(!report.deduplicated);
        assert_eq!(report.created, 1);
        let markers = doc.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].0, 41);
        assert_eq!(markers[0].1.preview_id, PreviewId(2));
        assert_eq!(file_name(&markers[0].1.resolved_path), "b.png");
        assert_eq!(markers[0].1.width, 120);
        assert_eq!(fx.engine.preview_count(), 1);
        assert!(fx.engine.preview(PreviewId(1)).is_none());
        assert_eq!(doc.marker_glyph_count(), 1);
    }

    #[test]
    fn test_identical_regions_are_noop() {
        let mut fx = Fixture::new();
        fx.image("a.png", 64);
        let mut doc = TextDocument::new("intro\n![a](a.png)\noutro", 800);
        let regions = RegionExtractor::extract(&doc.to_string());
        fx.engine.synchronize(&mut doc, &regions);
        let text = doc.to_string();
        let steps = doc.undo_steps();

        let report = fx.engine.synchronize(&mut doc, &regions);

        assert!(report.deduplicated);
        assert_eq!(report.generation, 1);
        assert_eq!(doc.to_string(), text);
        assert_eq!(doc.undo_steps(), steps);
    }

    #[test]
    fn test_pass_over_own_output_is_stable() {
        let mut fx = Fixture::new();
        fx.image("a.png", 64);
        fx.image("b.png", 64);
        let mut doc = TextDocument::new("![a](a.png)\ntext ![b](b.png) more\n![a](a.png)", 800);
        let first = fx.sync(&mut doc);
        assert_eq!(first.created, 3);
        let text = doc.to_string();
        let steps = doc.undo_steps();

        // Inserting placeholders shifted the inline region, so this is a real pass.
        let second = fx.sync(&mut doc);

        assert!(!second.deduplicated);
        assert_eq!(second.created, 0);
        assert_eq!(second.removed, 0);
        assert_eq!(second.reused, 3);
        assert_eq!(doc.to_string(), text);
        assert_eq!(doc.undo_steps(), steps);
    }

    #[test]
    fn test_inline_links_processed_in_descending_order() {
        let mut fx = Fixture::new();
        fx.image("img/a.png", 10);
        fx.image("img/b.png", 10);
        let mut doc = TextDocument::new("![a](img/a.png) and ![b](img/b.png) end", 800);

        let report = fx.sync(&mut doc);

        assert_eq!(report.created, 2);
        assert_eq!(
            doc.to_string(),
            format!("![a](img/a.png){MARKER} and ![b](img/b.png){MARKER} end")
        );
        assert_eq!(file_name(&doc.marker_at(15).unwrap().resolved_path), "a.png");
        assert_eq!(file_name(&doc.marker_at(36).unwrap().resolved_path), "b.png");
    }

    #[test]
    fn test_modified_flag_untouched() {
        for initially in [false, true] {
            let mut fx = Fixture::new();
            fx.image("a.png", 10);
            let mut doc = TextDocument::new("![a](a.png)", 800);
            doc.set_modified(initially);

            fx.sync(&mut doc);
            assert_eq!(doc.is_modified(), initially);

            fx.settings.update(|s| s.enable_preview = false);
            let regions = RegionExtractor::extract(&doc.to_string());
            fx.engine.update(&mut doc, &regions);
            assert_eq!(doc.is_modified(), initially);
        }
    }

    #[test]
    fn test_disable_removes_all_placeholders() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        fx.image("b.png", 10);
        let original = "# Title\n![a](a.png)\nsee ![b](b.png) here\n";
        let mut doc = TextDocument::new(original, 800);
        fx.sync(&mut doc);
        assert_eq!(doc.markers().len(), 2);

        fx.settings.update(|s| s.enable_preview = false);
        let regions = RegionExtractor::extract(&doc.to_string());
        let report = fx.engine.update(&mut doc, &regions);

        assert_eq!(report.removed, 2);
        assert_eq!(doc.to_string(), original);
        assert_eq!(fx.engine.preview_count(), 0);

        fx.settings.update(|s| s.enable_preview = true);
        let report = fx.sync(&mut doc);
        assert_eq!(report.created, 2);
        assert!(fx.engine.preview(PreviewId(3)).is_some());
    }

    #[test]
    fn test_malformed_regions_skipped() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        let mut doc = TextDocument::new("![a](a.png)\nline two", 800);
        let regions = [
            ImageRegion::new(0, 11),
            ImageRegion::new(50, 60),
            ImageRegion::new(5, 2),
            ImageRegion::new(8, 14),
        ];

        let report = fx.engine.synchronize(&mut doc, &regions);

        assert_eq!(report.created, 1);
        assert_eq!(report.skipped.len(), 3);
        assert!(
            report
                .skipped
                .iter()
                .all(|s| matches!(s.error, PreviewError::MalformedRegion { .. }))
        );
        assert_eq!(doc.markers().len(), 1);
    }

    #[test]
    fn test_ambiguous_region_skipped() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        fx.image("b.png", 10);
        let mut doc = TextDocument::new("![a](a.png)![b](b.png)", 800);

        let report = fx
            .engine
            .synchronize(&mut doc, &[ImageRegion::new(0, 22)]);

        assert_eq!(report.created, 0);
        assert!(matches!(
            report.skipped[0].error,
            PreviewError::UnresolvableLink { .. }
        ));
        assert_eq!(doc.marker_glyph_count(), 0);
    }

    #[test]
    fn test_missing_and_undecodable_targets() {
        let mut fx = Fixture::new();
        std::fs::write(fx.dir.path().join("broken.png"), b"not an image").unwrap();
        let mut doc = TextDocument::new("![x](nowhere.png)\n![y](broken.png)", 800);

        let report = fx.sync(&mut doc);

        assert_eq!(report.created, 0);
        assert_eq!(report.skipped.len(), 2);
        // Extraction skips come first, load failures while applying.
        assert!(matches!(
            report.skipped[0].error,
            PreviewError::UnresolvableLink { .. }
        ));
        assert!(matches!(report.skipped[1].error, PreviewError::DecodeFailed { .. }));
        assert_eq!(doc.marker_glyph_count(), 0);
    }

    #[test]
    fn test_remote_image_shown_after_fetch() {
        let url = "https://example.com/r.png";
        let mut fetcher = MockImageFetchPort::new();
        fetcher.expect_fetch().times(1).return_const(());
        let mut fx = Fixture::with_fetcher(fetcher);
        let mut doc = TextDocument::new(&format!("![r]({url})"), 800);
        let regions = RegionExtractor::extract(&doc.to_string());

        let report = fx.engine.synchronize(&mut doc, &regions);
        assert_eq!(report.pending, 1);
        assert_eq!(doc.marker_glyph_count(), 0);
        assert_eq!(fx.engine.pending_fetches(), 1);

        // Still in flight: no second fetch.
        let report = fx.engine.update(&mut doc, &regions);
        assert_eq!(report.pending, 1);

        assert!(fx.engine.complete_fetch(url, Ok(png_bytes(300))));
        assert_eq!(fx.engine.pending_fetches(), 0);

        let report = fx.engine.synchronize(&mut doc, &regions);
        assert!(report.deduplicated);
        assert_eq!(doc.marker_glyph_count(), 0);

        let report = fx.engine.update(&mut doc, &regions);
        assert_eq!(report.created, 1);
        let format = doc.marker_at(doc.len_chars() - 1).unwrap();
        assert_eq!(format.resolved_path, url);
        assert_eq!(format.width, 300);
    }

    #[test]
    fn test_failed_fetch_retried_on_later_pass() {
        let url = "https://example.com/r.png";
        let mut fetcher = MockImageFetchPort::new();
        fetcher.expect_fetch().times(2).return_const(());
        let mut fx = Fixture::with_fetcher(fetcher);
        let mut doc = TextDocument::new(&format!("![r]({url})"), 800);
        let regions = RegionExtractor::extract(&doc.to_string());

        fx.engine.synchronize(&mut doc, &regions);
        let failed = Err(crate::domain::ports::CacheError::NetworkError("timeout".into()));
        assert!(!fx.engine.complete_fetch(url, failed));

        let report = fx.engine.update(&mut doc, &regions);
        assert_eq!(report.pending, 1);
    }

    #[test]
    fn test_width_follows_viewport_and_settings() {
        let mut fx = Fixture::new();
        fx.image("wide.png", 800);
        let mut doc = TextDocument::new("![w](wide.png)", 300);
        fx.sync(&mut doc);
        let offset = doc.len_chars() - 1;
        assert_eq!(doc.marker_at(offset).unwrap().width, 250);

        doc.set_viewport_width(1000);
        assert_eq!(fx.engine.rescale(&mut doc), 1);
        assert_eq!(doc.marker_at(offset).unwrap().width, 800);

        doc.set_viewport_width(120);
        fx.engine.rescale(&mut doc);
        assert_eq!(doc.marker_at(offset).unwrap().width, 100);

        fx.settings.update(|s| s.constrain_width = false);
        fx.engine.rescale(&mut doc);
        assert_eq!(doc.marker_at(offset).unwrap().width, 800);
        assert_eq!(fx.engine.rescale(&mut doc), 0);
    }

    #[test]
    fn test_corrupted_placeholder_block_repaired() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        let mut doc = TextDocument::new("![a](a.png)\nnext", 800);
        fx.sync(&mut doc);
        assert_eq!(doc.to_string(), format!("![a](a.png)\n{MARKER}\nnext"));

        doc.insert_text(13, "hello").unwrap();
        let regions = RegionExtractor::extract(&doc.to_string());
        let report = fx.engine.update(&mut doc, &regions);

        assert_eq!(report.repaired, 1);
        assert_eq!(report.created, 1);
        assert_eq!(doc.to_string(), format!("![a](a.png)\n{MARKER}\nhello\nnext"));
        let markers = doc.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].1.preview_id, PreviewId(2));
    }

    #[test]
    fn test_deleted_link_loses_placeholder() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        fx.image("b.png", 10);
        let mut doc = TextDocument::new("![a](a.png)\n![b](b.png)", 800);
        fx.sync(&mut doc);
        assert_eq!(
            doc.to_string(),
            format!("![a](a.png)\n{MARKER}\n![b](b.png)\n{MARKER}")
        );

        doc.remove(14, 25).unwrap();
        let report = fx.sync(&mut doc);

        assert_eq!(report.removed, 1);
        assert_eq!(report.reused, 1);
        assert_eq!(doc.to_string(), format!("![a](a.png)\n{MARKER}\n"));
        assert_eq!(fx.engine.preview_count(), 1);
    }

    #[test]
    fn test_orphaned_inline_marker_removed() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        let mut doc = TextDocument::new("x ![a](a.png) y", 800);
        fx.sync(&mut doc);
        assert_eq!(doc.marker_glyph_count(), 1);

        // Break the link syntax; the marker is left behind.
        doc.remove(2, 3).unwrap();
        let report = fx.sync(&mut doc);

        assert_eq!(report.removed, 1);
        assert_eq!(doc.to_string(), "x [a](a.png) y");
        assert_eq!(fx.engine.preview_count(), 0);
    }

    #[test]
    fn test_refresh_rebuilds_from_scratch() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        let mut doc = TextDocument::new("![a](a.png)", 800);
        let regions = RegionExtractor::extract(&doc.to_string());
        fx.engine.synchronize(&mut doc, &regions);

        assert_eq!(fx.engine.refresh(&mut doc), 1);
        assert_eq!(doc.to_string(), "![a](a.png)");
        assert!(fx.engine.cache().is_empty());

        let report = fx.engine.synchronize(&mut doc, &regions);
        assert!(!report.deduplicated);
        assert_eq!(report.created, 1);
        assert_eq!(fx.engine.cache().len(), 1);
    }

    #[test]
    fn test_image_for_placeholder() {
        let mut fx = Fixture::new();
        fx.image("a.png", 42);
        let mut doc = TextDocument::new("see ![a](a.png)", 800);
        fx.sync(&mut doc);

        let image = fx.engine.image_for_placeholder(&doc, 15).unwrap();
        assert_eq!(image.width(), 42);
        assert!(fx.engine.image_for_placeholder(&doc, 0).is_none());
        assert_eq!(doc.char_at(15), Some(PLACEHOLDER_MARKER));
    }

    #[test]
    fn test_unknown_marker_ids_do_not_collide() {
        let mut fx = Fixture::new();
        fx.image("a.png", 10);
        fx.image("b.png", 10);
        let mut doc = TextDocument::new("![a](a.png) ![b](b.png)", 800);
        let a = fx.resolved("a.png");
        let image = crate::domain::entities::CachedImage::new(&a, image::DynamicImage::new_rgb8(10, 1));
        doc.insert_marker(
            11,
            crate::domain::entities::PlaceholderFormat {
                resource_name: image.resource_name,
                resolved_path: a,
                preview_id: PreviewId(7),
                width: 10,
            },
        )
        .unwrap();

        let report = fx.sync(&mut doc);
        assert_eq!(report.created, 1);
        assert_eq!(report.reused, 1);
        assert_eq!(marker_ids(&doc), vec![1, 7]);

        let end = doc.len_chars();
        doc.insert_text(end, "\n![b](b.png)").unwrap();
        fx.sync(&mut doc);
        assert_eq!(marker_ids(&doc), vec![1, 7, 8]);
    }

    fn marker_ids(doc: &TextDocument) -> Vec<u64> {
        let mut ids: Vec<u64> = doc.markers().iter().map(|(_, f)| f.preview_id.get()).collect();
        ids.sort_unstable();
        ids
    }
}
