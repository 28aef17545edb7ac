//! Near-uniform frame detection.
//!
//! Fades, title cards and blown-out shots make poor training images. A
//! frame is rejected when almost all of its pixels sit at either end of the
//! luma range. Luma uses the BT.601 weights (`0.299 R + 0.587 G + 0.114 B`).

use image::DynamicImage;

use crate::config::SamplerOptions;

/// Why a frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Too many pixels below the dark level.
    MostlyBlack,
    /// Too many pixels above the bright level.
    MostlyWhite,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MostlyBlack => f.write_str("mostly black"),
            Rejection::MostlyWhite => f.write_str("mostly white"),
        }
    }
}

/// Pixel counts gathered from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LumaCounts {
    pub total: u64,
    pub dark: u64,
    pub bright: u64,
}

/// Threshold heuristic for black or white frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessFilter {
    dark_level: u8,
    bright_level: u8,
    coverage: f32,
}

impl Default for BrightnessFilter {
    fn default() -> Self {
        Self::new(30, 225, 0.95)
    }
}

impl BrightnessFilter {
    pub fn new(dark_level: u8, bright_level: u8, coverage: f32) -> Self {
        Self {
            dark_level,
            bright_level,
            coverage: coverage.clamp(0.0, 1.0),
        }
    }

    pub(crate) fn from_options(options: &SamplerOptions) -> Self {
        Self::new(options.dark_level, options.bright_level, options.coverage)
    }

    /// Count near-black and near-white pixels in `image`.
    pub fn count(&self, image: &DynamicImage) -> LumaCounts {
        let mut counts = LumaCounts::default();
        match image {
            DynamicImage::ImageLuma8(gray) => {
                for &value in gray.as_raw() {
                    self.tally(&mut counts, value);
                }
            }
            DynamicImage::ImageRgb8(rgb) => {
                for pixel in rgb.as_raw().chunks_exact(3) {
                    self.tally(&mut counts, luma(pixel[0], pixel[1], pixel[2]));
                }
            }
            other => {
                let rgb = other.to_rgb8();
                for pixel in rgb.as_raw().chunks_exact(3) {
                    self.tally(&mut counts, luma(pixel[0], pixel[1], pixel[2]));
                }
            }
        }
        counts
    }

    /// Classify a frame. `None` means the frame is worth keeping.
    ///
    /// An empty image is kept; there is nothing to judge it by.
    pub fn classify(&self, image: &DynamicImage) -> Option<Rejection> {
        self.judge(self.count(image))
    }

    /// Apply the coverage rule to precomputed counts.
    pub fn judge(&self, counts: LumaCounts) -> Option<Rejection> {
        if counts.total == 0 {
            return None;
        }
        let total = counts.total as f64;
        let coverage = self.coverage as f64;
        if counts.dark as f64 / total >= coverage {
            Some(Rejection::MostlyBlack)
        } else if counts.bright as f64 / total >= coverage {
            Some(Rejection::MostlyWhite)
        } else {
            None
        }
    }

    fn tally(&self, counts: &mut LumaCounts, value: u8) {
        counts.total += 1;
        if value < self.dark_level {
            counts.dark += 1;
        } else if value > self.bright_level {
            counts.bright += 1;
        }
    }
}

/// BT.601 luma, rounded to the nearest integer.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((weighted + 500) / 1000) as u8
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::*;

    fn gray_with(dark: u32, mid: u32, bright: u32) -> DynamicImage {
        let width = dark + mid + bright;
        let image = GrayImage::from_fn(width, 1, |x, _| {
            if x < dark {
                Luma([5])
            } else if x < dark + mid {
                Luma([128])
            } else {
                Luma([250])
            }
        });
        DynamicImage::ImageLuma8(image)
    }

    #[test]
    fn luma_matches_bt601() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn exactly_ninety_five_percent_dark_is_rejected() {
        let filter = BrightnessFilter::default();
        assert_eq!(
            filter.classify(&gray_with(95, 5, 0)),
            Some(Rejection::MostlyBlack)
        );
        assert_eq!(filter.classify(&gray_with(94, 6, 0)), None);
    }

    #[test]
    fn mostly_white_is_rejected() {
        let filter = BrightnessFilter::default();
        assert_eq!(
            filter.classify(&gray_with(0, 4, 96)),
            Some(Rejection::MostlyWhite)
        );
    }

    #[test]
    fn mixed_extremes_are_kept() {
        // Half black, half white: neither side dominates.
        let filter = BrightnessFilter::default();
        assert_eq!(filter.classify(&gray_with(50, 0, 50)), None);
    }

    #[test]
    fn levels_are_strict() {
        let filter = BrightnessFilter::default();
        let at_dark = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([30])));
        let at_bright = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([225])));
        assert_eq!(filter.classify(&at_dark), None);
        assert_eq!(filter.classify(&at_bright), None);
    }

    #[test]
    fn rgb_frames_use_luma() {
        let filter = BrightnessFilter::default();
        // Pure blue has luma 29: below the dark level.
        let blue = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 0, 255])));
        assert_eq!(filter.classify(&blue), Some(Rejection::MostlyBlack));
        let green = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 255, 0])));
        assert_eq!(filter.classify(&green), None);
    }

    #[test]
    fn empty_image_is_kept() {
        let filter = BrightnessFilter::default();
        assert_eq!(filter.classify(&DynamicImage::new_rgb8(0, 0)), None);
    }
}
