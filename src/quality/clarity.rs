use super::ClarityThresholds;
use crate::models::{BoundingBox, ClarityClass, Frame};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clarity {
    /// Population variance of the Laplacian response
    pub score: f64,
    pub class: ClarityClass,
    /// Mean 3×3 Sobel gradient magnitude
    pub sobel: f64,
}

impl Clarity {
    fn degenerate() -> Self {
        Self {
            score: 0.0,
            class: ClarityClass::HeavyBlur,
            sobel: 0.0,
        }
    }
}

/// Map a Laplacian variance to a class; every boundary is strict.
pub fn classify(score: f64, thresholds: &ClarityThresholds) -> ClarityClass {
    if score > thresholds.clear {
        ClarityClass::Clear
    } else if score > thresholds.slight_blur {
        ClarityClass::SlightBlur
    } else if score > thresholds.medium_blur {
        ClarityClass::MediumBlur
    } else {
        ClarityClass::HeavyBlur
    }
}

/// Sharpness of the grayscale region under `bbox`, clipped to the frame.
///
/// Borders of the crop are mirrored without repeating the edge pixel.
pub fn clarity(frame: &Frame, bbox: &BoundingBox, thresholds: &ClarityThresholds) -> Clarity {
    let Some((x0, y0, x1, y1)) = bbox.clip(frame.width(), frame.height()) else {
        return Clarity::degenerate();
    };
    let roi = Roi::crop(frame.gray(), frame.width(), x0, y0, x1, y1);

    let score = laplacian_variance(&roi);
    if !score.is_finite() {
        return Clarity::degenerate();
    }
    Clarity {
        score,
        class: classify(score, thresholds),
        sobel: sobel_mean(&roi),
    }
}

struct Roi {
    pixels: Vec<f64>,
    width: usize,
    height: usize,
}

impl Roi {
    fn crop(gray: &[u8], stride: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        let mut pixels = Vec::with_capacity((x1 - x0) * (y1 - y0));
        for y in y0..y1 {
            pixels.extend(gray[y * stride + x0..y * stride + x1].iter().map(|&v| v as f64));
        }
        Self {
            pixels,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Pixel at a possibly out-of-range coordinate, mirrored inward.
    #[inline]
    fn at(&self, x: isize, y: isize) -> f64 {
        let x = reflect101(x, self.width);
        let y = reflect101(y, self.height);
        self.pixels[y * self.width + x]
    }
}

#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    // A single reflection suffices for the 3×3 kernels used here
    if i < 0 {
        i = -i;
    }
    if i >= n {
        i = 2 * n - 2 - i;
    }
    i.clamp(0, n - 1) as usize
}

fn laplacian_variance(roi: &Roi) -> f64 {
    let count = roi.pixels.len() as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..roi.height as isize {
        for x in 0..roi.width as isize {
            let response = roi.at(x - 1, y) + roi.at(x + 1, y) + roi.at(x, y - 1) + roi.at(x, y + 1)
                - 4.0 * roi.at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }
    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

fn sobel_mean(roi: &Roi) -> f64 {
    let mut total = 0.0;
    for y in 0..roi.height as isize {
        for x in 0..roi.width as isize {
            let gx = (roi.at(x + 1, y - 1) + 2.0 * roi.at(x + 1, y) + roi.at(x + 1, y + 1))
                - (roi.at(x - 1, y - 1) + 2.0 * roi.at(x - 1, y) + roi.at(x - 1, y + 1));
            let gy = (roi.at(x - 1, y + 1) + 2.0 * roi.at(x, y + 1) + roi.at(x + 1, y + 1))
                - (roi.at(x - 1, y - 1) + 2.0 * roi.at(x, y - 1) + roi.at(x + 1, y - 1));
            total += (gx * gx + gy * gy).sqrt();
        }
    }
    total / roi.pixels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ClarityThresholds {
        ClarityThresholds::default()
    }

    #[test]
    fn test_boundaries_fall_into_blurrier_class() {
        let t = thresholds();
        assert_eq!(classify(500.0, &t), ClarityClass::SlightBlur);
        assert_eq!(classify(500.01, &t), ClarityClass::Clear);
        assert_eq!(classify(200.0, &t), ClarityClass::MediumBlur);
        assert_eq!(classify(50.0, &t), ClarityClass::HeavyBlur);
        assert_eq!(classify(50.5, &t), ClarityClass::MediumBlur);
        assert_eq!(classify(0.0, &t), ClarityClass::HeavyBlur);
    }

    #[test]
    fn test_flat_region_is_heavy_blur() {
        let frame = Frame::filled(50, 50, [120, 120, 120]);
        let c = clarity(&frame, &BoundingBox::new(10, 10, 20, 20), &thresholds());
        assert_eq!(c.score, 0.0);
        assert_eq!(c.sobel, 0.0);
        assert_eq!(c.class, ClarityClass::HeavyBlur);
    }

    #[test]
    fn test_checkerboard_is_clear() {
        let mut frame = Frame::filled(40, 40, [255, 255, 255]);
        for y in 0..40 {
            for x in 0..40 {
                if (x + y) % 2 == 0 {
                    frame.set_pixel(x, y, [0, 0, 0]);
                }
            }
        }
        let c = clarity(&frame, &BoundingBox::new(0, 0, 40, 40), &thresholds());
        // White maps to luma 254, so every response is ±1016
        assert!((c.score - 1016.0 * 1016.0).abs() < 1e-6, "score {}", c.score);
        assert_eq!(c.class, ClarityClass::Clear);
    }

    #[test]
    fn test_degenerate_boxes() {
        let frame = Frame::filled(20, 20, [0, 0, 0]);
        for bbox in [
            BoundingBox::new(5, 5, 0, 5),
            BoundingBox::new(100, 100, 10, 10),
            BoundingBox::new(-30, -30, 10, 10),
        ] {
            let c = clarity(&frame, &bbox, &thresholds());
            assert_eq!(c.score, 0.0);
            assert_eq!(c.class, ClarityClass::HeavyBlur);
        }
    }

    #[test]
    fn test_single_pixel_region() {
        let frame = Frame::filled(5, 5, [10, 200, 30]);
        let c = clarity(&frame, &BoundingBox::new(2, 2, 1, 1), &thresholds());
        assert_eq!(c.score, 0.0);
        assert!(c.sobel.is_finite());
    }

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-1, 2), 1);
        assert_eq!(reflect101(-1, 1), 0);
    }

    #[test]
    fn test_step_edge_has_sobel_response() {
        let mut frame = Frame::filled(20, 20, [0, 0, 0]);
        frame.fill_rect(10, 0, 10, 20, [255, 255, 255]);
        let c = clarity(&frame, &BoundingBox::new(0, 0, 20, 20), &thresholds());
        assert!(c.sobel > 0.0);
        assert!(c.score > 0.0);
    }
}
