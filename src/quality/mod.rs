//! Per-detection quality scoring: relative size, sharpness and contrast.
//!
//! Every function here is total: degenerate or off-image boxes fall back to
//! score 0 and the worst class instead of failing.

pub mod area;
pub mod clarity;
pub mod contrast;

use crate::models::{BoundingBox, Frame, QualityMetrics};

/// Laplacian variance cut-offs; a score must exceed a threshold to reach
/// its class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClarityThresholds {
    pub clear: f64,
    pub slight_blur: f64,
    pub medium_blur: f64,
}

impl Default for ClarityThresholds {
    fn default() -> Self {
        Self {
            clear: 500.0,
            slight_blur: 200.0,
            medium_blur: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityConfig {
    pub clarity_thresholds: ClarityThresholds,
    /// Contrast score that must be exceeded for `distinct`
    pub contrast_threshold: f64,
    /// Area percentage that must be exceeded for `area_exceeds_threshold`
    pub area_threshold_percent: f64,
    /// Width of the background ring around the box
    pub contrast_margin_px: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            clarity_thresholds: ClarityThresholds::default(),
            contrast_threshold: 50.0,
            area_threshold_percent: 5.0,
            contrast_margin_px: 20,
        }
    }
}

/// Score one box against the frame it was detected in.
pub fn analyze(frame: &Frame, bbox: &BoundingBox, config: &QualityConfig) -> QualityMetrics {
    let area = area::area_ratio(
        bbox,
        frame.width(),
        frame.height(),
        config.area_threshold_percent,
    );
    let clarity = clarity::clarity(frame, bbox, &config.clarity_thresholds);
    let contrast = contrast::contrast(
        frame,
        bbox,
        config.contrast_margin_px,
        config.contrast_threshold,
    );

    QualityMetrics {
        qr_area_pixels: area.qr_area_pixels,
        image_area_pixels: area.image_area_pixels,
        area_ratio_percent: area.percent,
        area_exceeds_threshold: area.exceeds_threshold,
        clarity_score: clarity.score,
        clarity_class: clarity.class,
        sobel_score: clarity.sobel,
        contrast_score: contrast.score,
        contrast_class: contrast.class,
        gray_contrast: contrast.gray,
        rgb_contrast: contrast.rgb,
        hsv_contrast: contrast.hsv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClarityClass, ContrastClass};

    #[test]
    fn test_analyze_combines_metrics() {
        let mut frame = Frame::filled(500, 500, [255, 255, 255]);
        frame.fill_rect(150, 150, 200, 200, [0, 0, 0]);
        let m = analyze(&frame, &BoundingBox::new(150, 150, 200, 200), &QualityConfig::default());

        assert_eq!(m.area_ratio_percent, 16.0);
        assert!(m.area_exceeds_threshold);
        assert_eq!(m.contrast_class, ContrastClass::Distinct);
        assert!(m.has_good_contrast());
        // Solid block: no texture inside the box
        assert_eq!(m.clarity_class, ClarityClass::HeavyBlur);
    }

    #[test]
    fn test_scores_are_finite_and_non_negative_for_degenerate_boxes() {
        let frame = Frame::filled(10, 10, [9, 9, 9]);
        for bbox in [
            BoundingBox::new(0, 0, 0, 0),
            BoundingBox::new(-100, -100, 5, 5),
            BoundingBox::new(i32::MAX - 1, 0, u32::MAX, 3),
        ] {
            let m = analyze(&frame, &bbox, &QualityConfig::default());
            assert!(m.clarity_score.is_finite() && m.clarity_score >= 0.0);
            assert!(m.contrast_score.is_finite() && m.contrast_score >= 0.0);
            assert_eq!(m.clarity_class, ClarityClass::HeavyBlur);
            assert_eq!(m.contrast_class, ContrastClass::Similar);
        }
    }
}
