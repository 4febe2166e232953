use crate::models::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaRatio {
    pub qr_area_pixels: u64,
    pub image_area_pixels: u64,
    pub percent: f64,
    pub exceeds_threshold: bool,
}

/// Box area as a percentage of the image area.
///
/// The box is not clipped, matching how detectors report it. An image with
/// no pixels yields 0%.
pub fn area_ratio(
    bbox: &BoundingBox,
    image_width: usize,
    image_height: usize,
    threshold_percent: f64,
) -> AreaRatio {
    let qr_area_pixels = bbox.area();
    let image_area_pixels = image_width as u64 * image_height as u64;
    let percent = if image_area_pixels == 0 {
        0.0
    } else {
        100.0 * qr_area_pixels as f64 / image_area_pixels as f64
    };
    AreaRatio {
        qr_area_pixels,
        image_area_pixels,
        percent,
        exceeds_threshold: percent > threshold_percent,
    }
}
