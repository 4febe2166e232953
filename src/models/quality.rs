use serde::{Deserialize, Serialize};

/// Sharpness bucket derived from Laplacian variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarityClass {
    /// Crisp edges
    Clear,
    /// Slightly soft
    SlightBlur,
    /// Noticeably soft
    MediumBlur,
    /// Edges mostly gone; also used for degenerate regions
    HeavyBlur,
}

impl ClarityClass {
    /// 0 (clear) through 3 (heavy blur)
    pub fn level(&self) -> u8 {
        match self {
            ClarityClass::Clear => 0,
            ClarityClass::SlightBlur => 1,
            ClarityClass::MediumBlur => 2,
            ClarityClass::HeavyBlur => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClarityClass::Clear => "clear",
            ClarityClass::SlightBlur => "slight_blur",
            ClarityClass::MediumBlur => "medium_blur",
            ClarityClass::HeavyBlur => "heavy_blur",
        }
    }
}

/// Separation between a region and its surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastClass {
    /// Stands out from the background
    Distinct,
    /// Blends into the background; also used for degenerate regions
    Similar,
}

impl ContrastClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContrastClass::Distinct => "distinct",
            ContrastClass::Similar => "similar",
        }
    }
}

/// Quality scores for one fused detection.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityMetrics {
    pub qr_area_pixels: u64,
    pub image_area_pixels: u64,
    pub area_ratio_percent: f64,
    pub area_exceeds_threshold: bool,
    pub clarity_score: f64,
    pub clarity_class: ClarityClass,
    pub sobel_score: f64,
    pub contrast_score: f64,
    pub contrast_class: ContrastClass,
    pub gray_contrast: f64,
    pub rgb_contrast: f64,
    pub hsv_contrast: f64,
}

impl QualityMetrics {
    /// True when the region stands out from its background
    pub fn has_good_contrast(&self) -> bool {
        self.contrast_class == ContrastClass::Distinct
    }
}
