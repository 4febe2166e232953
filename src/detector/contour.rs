use super::DetectorAdapter;
use super::connected_components::{Region, find_regions};
use crate::error::DetectorError;
use crate::models::{BoundingBox, Frame, RawDetection};
use crate::utils::binarization::{otsu_binarize, otsu_threshold};
use crate::utils::morphology::close;

/// Adapter name used in configuration and output
pub const NAME: &str = "contour";

/// Heuristic code locator: closed dark blobs that are square-ish, busy
/// with edges and roughly half dark.
///
/// It decodes nothing and favours recall, so fusion should weight it low.
#[derive(Debug, Clone)]
pub struct ContourAdapter {
    /// Fixed confidence reported for every candidate
    pub confidence: f32,
    /// Minimum foreground pixels in a closed blob
    pub min_area: usize,
    /// Exclusive width/height ratio bounds
    pub aspect_range: (f32, f32),
    /// Closing kernel radius (2 → 5×5)
    pub close_radius: usize,
    pub close_iterations: usize,
    /// Gradient magnitude that counts as an edge
    pub edge_magnitude: f32,
    /// Required share of edge pixels inside the region
    pub min_edge_density: f32,
    /// Exclusive bounds on the dark-pixel share inside the region
    pub dark_ratio_range: (f32, f32),
}

impl Default for ContourAdapter {
    fn default() -> Self {
        Self {
            confidence: 0.7,
            min_area: 1000,
            aspect_range: (0.7, 1.3),
            close_radius: 2,
            close_iterations: 2,
            edge_magnitude: 150.0,
            min_edge_density: 0.1,
            dark_ratio_range: (0.3, 0.7),
        }
    }
}

impl ContourAdapter {
    fn is_candidate_shape(&self, region: &Region) -> bool {
        if region.pixel_count < self.min_area {
            return false;
        }
        let aspect = region.width() as f32 / region.height() as f32;
        aspect > self.aspect_range.0 && aspect < self.aspect_range.1
    }

    /// Check the grayscale content of a region for code-like texture.
    fn looks_like_code(&self, frame: &Frame, region: &Region) -> bool {
        let roi = crop_gray(frame, region);
        let (w, h) = (region.width(), region.height());
        if roi.is_empty() {
            return false;
        }

        let edge_density = edge_pixels(&roi, w, h, self.edge_magnitude) as f32 / roi.len() as f32;

        let threshold = otsu_threshold(&roi);
        let dark = roi.iter().filter(|&&v| v < threshold).count();
        let dark_ratio = dark as f32 / roi.len() as f32;

        edge_density > self.min_edge_density
            && dark_ratio > self.dark_ratio_range.0
            && dark_ratio < self.dark_ratio_range.1
    }
}

impl DetectorAdapter for ContourAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        let binary = otsu_binarize(frame.gray(), frame.width(), frame.height());
        let closed = close(&binary, self.close_radius, self.close_iterations);

        let detections = find_regions(&closed)
            .into_iter()
            .filter(|region| self.is_candidate_shape(region))
            .filter(|region| self.looks_like_code(frame, region))
            .map(|region| {
                let bbox: BoundingBox = region.bbox();
                RawDetection::new(bbox, self.confidence, NAME).with_code_type("QRCODE")
            })
            .collect();
        Ok(detections)
    }
}

fn crop_gray(frame: &Frame, region: &Region) -> Vec<u8> {
    let gray = frame.gray();
    let mut roi = Vec::with_capacity(region.width() * region.height());
    for y in region.min_y..=region.max_y {
        let row = y * frame.width();
        roi.extend_from_slice(&gray[row + region.min_x..=row + region.max_x]);
    }
    roi
}

/// Count interior pixels whose 3×3 Sobel magnitude reaches `magnitude`.
fn edge_pixels(gray: &[u8], width: usize, height: usize, magnitude: f32) -> usize {
    if width < 3 || height < 3 {
        return 0;
    }
    let at = |x: usize, y: usize| gray[y * width + x] as f32;
    let mut count = 0usize;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            if (gx * gx + gy * gy).sqrt() >= magnitude {
                count += 1;
            }
        }
    }
    count
}
