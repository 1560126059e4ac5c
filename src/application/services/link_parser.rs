//! Markdown image-link parsing.

use std::sync::LazyLock;

use regex::Regex;

/// Matches `![alt](target "optional title")`; group 2 is the target.
pub static IMAGE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(([^)"]+)\s*("(?:\\.|[^")])*")?\s*\)"#).unwrap()
});

/// Returns the trimmed target of the only image link in `text`.
///
/// Yields `None` when there is no link, more than one link, or an empty target.
#[must_use]
pub fn single_image_target(text: &str) -> Option<String> {
    let mut matches = IMAGE_LINK_RE.captures_iter(text);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }

    let target = first.get(2)?.as_str().trim();
    (!target.is_empty()).then(|| target.to_string())
}

/// Counts image links in `text`.
#[must_use]
pub fn count_image_links(text: &str) -> usize {
    IMAGE_LINK_RE.find_iter(text).count()
}
