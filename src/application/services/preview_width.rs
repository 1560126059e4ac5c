//! Display width policy for previews.

use crate::domain::entities::PreviewSettings;

/// Width available to previews on a surface `viewport_width` pixels wide.
#[must_use]
pub const fn available_width(viewport_width: u32, settings: &PreviewSettings) -> u32 {
    let available = viewport_width.saturating_sub(settings.width_margin);
    if available < settings.min_width {
        settings.min_width
    } else {
        available
    }
}

/// Width a preview of an image `natural_width` pixels wide should render at.
#[must_use]
pub const fn desired_width(natural_width: u32, viewport_width: u32, settings: &PreviewSettings) -> u32 {
    if !settings.constrain_width {
        return natural_width;
    }
    let available = available_width(viewport_width, settings);
    if available < natural_width {
        available
    } else {
        natural_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn settings(constrain_width: bool) -> PreviewSettings {
        PreviewSettings {
            constrain_width,
            ..PreviewSettings::default()
        }
    }

    #[test_case(true, 300, 800, 250 ; "constrained_shrinks")]
    #[test_case(true, 300, 200, 200 ; "constrained_keeps_small")]
    #[test_case(false, 300, 800, 800 ; "unconstrained_ignores_viewport")]
    #[test_case(true, 120, 800, 100 ; "clamped_to_minimum")]
    #[test_case(true, 0, 800, 100 ; "zero_viewport")]
    fn test_desired_width(constrain: bool, viewport: u32, natural: u32, expected: u32) {
        assert_eq!(desired_width(natural, viewport, &settings(constrain)), expected);
    }

    #[test]
    fn test_margin_is_subtracted() {
        let s = settings(true);
        assert_eq!(desired_width(800, 300, &s), 300 - s.width_margin);
    }
}
