use serde::{Deserialize, Serialize};

use super::{BoundingBox, ClarityClass, ContrastClass, FusedDetection, FusionStrategy, QualityMetrics};

/// Per-region output: a fused detection joined with its quality metrics.
///
/// Field names form the persisted JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub bbox: BoundingBox,
    pub qr_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_type: Option<String>,
    pub qr_area_pixels: u64,
    pub image_area_pixels: u64,
    pub area_ratio_percent: f64,
    pub area_larger_than_5_percent: bool,
    pub clarity_score: f64,
    pub clarity_class: ClarityClass,
    pub clarity_level: u8,
    pub sobel_score: f64,
    pub color_contrast_class: ContrastClass,
    pub contrast_score: f64,
    pub has_good_contrast: bool,
    pub gray_contrast: f64,
    pub rgb_contrast: f64,
    pub hsv_contrast: f64,
    pub detectors_used: Vec<String>,
    pub num_votes: usize,
    pub fusion_method: FusionStrategy,
    pub detection_confidence: f32,
}

impl AnalysisRecord {
    pub fn new(detection: FusedDetection, metrics: QualityMetrics) -> Self {
        Self {
            bbox: detection.bbox,
            qr_data: detection.payload.unwrap_or_default(),
            code_type: detection.code_type,
            qr_area_pixels: metrics.qr_area_pixels,
            image_area_pixels: metrics.image_area_pixels,
            area_ratio_percent: metrics.area_ratio_percent,
            area_larger_than_5_percent: metrics.area_exceeds_threshold,
            clarity_score: metrics.clarity_score,
            clarity_class: metrics.clarity_class,
            clarity_level: metrics.clarity_class.level(),
            sobel_score: metrics.sobel_score,
            color_contrast_class: metrics.contrast_class,
            contrast_score: metrics.contrast_score,
            has_good_contrast: metrics.has_good_contrast(),
            gray_contrast: metrics.gray_contrast,
            rgb_contrast: metrics.rgb_contrast,
            hsv_contrast: metrics.hsv_contrast,
            detectors_used: detection.contributing_detectors.into_iter().collect(),
            num_votes: detection.vote_count,
            fusion_method: detection.fusion_method,
            detection_confidence: detection.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawDetection;

    fn metrics() -> QualityMetrics {
        QualityMetrics {
            qr_area_pixels: 40_000,
            image_area_pixels: 250_000,
            area_ratio_percent: 16.0,
            area_exceeds_threshold: true,
            clarity_score: 612.5,
            clarity_class: ClarityClass::Clear,
            sobel_score: 80.0,
            contrast_score: 72.0,
            contrast_class: ContrastClass::Distinct,
            gray_contrast: 60.0,
            rgb_contrast: 100.0,
            hsv_contrast: 50.0,
        }
    }

    #[test]
    fn test_json_shape() {
        let raw = RawDetection::new(BoundingBox::new(10, 20, 200, 200), 0.9, "decoder")
            .with_payload("https://example.org");
        let fused = FusedDetection::standalone(raw, FusionStrategy::Union);
        let record = AnalysisRecord::new(fused, metrics());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["bbox"]["width"], 200);
        assert_eq!(value["qr_data"], "https://example.org");
        assert_eq!(value["area_larger_than_5_percent"], true);
        assert_eq!(value["clarity_class"], "clear");
        assert_eq!(value["color_contrast_class"], "distinct");
        assert_eq!(value["fusion_method"], "union");
        assert_eq!(value["num_votes"], 1);
        assert_eq!(value["detectors_used"][0], "decoder");
        assert!(value.get("code_type").is_none());
    }

    #[test]
    fn test_missing_payload_is_empty_string() {
        let raw = RawDetection::new(BoundingBox::new(0, 0, 5, 5), 0.7, "contour");
        let fused = FusedDetection::standalone(raw, FusionStrategy::Voting);
        let record = AnalysisRecord::new(fused, metrics());
        assert_eq!(record.qr_data, "");
        assert_eq!(record.clarity_level, 0);
        assert!(record.has_good_contrast);
    }
}
