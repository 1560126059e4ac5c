//! Markdown image-link region extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::application::services::link_parser::IMAGE_LINK_RE;
use crate::domain::entities::ImageRegion;

static FENCE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)```([^`\s]*)\s*[^`]*$").unwrap());

static FENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*)```$").unwrap());

/// Finds image-link spans in markdown text.
pub struct RegionExtractor;

impl RegionExtractor {
    /// Returns image-link regions as char offsets, sorted by descending start.
    /// Links inside fenced code blocks are ignored.
    #[must_use]
    pub fn extract(text: &str) -> Vec<ImageRegion> {
        let mut regions = Vec::new();
        let mut in_fence = false;
        let mut line_start = 0;

        for line in text.split('\n') {
            let line_chars = line.chars().count();

            if in_fence {
                if FENCE_END_RE.is_match(line) {
                    in_fence = false;
                }
            } else if FENCE_START_RE.is_match(line) {
                in_fence = true;
            } else {
                for m in IMAGE_LINK_RE.find_iter(line) {
                    let start = line_start + line[..m.start()].chars().count();
                    let end = start + m.as_str().chars().count();
                    regions.push(ImageRegion::new(start, end));
                }
            }

            line_start += line_chars + 1;
        }

        regions.sort_by(|a, b| b.start.cmp(&a.start));
        regions
    }
}
