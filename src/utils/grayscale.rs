/// Color conversions shared by detectors and the quality analyzer.
///
/// Luminance uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8,
/// i.e. the BT.601 weights 0.299/0.587/0.114 in 8.8 fixed point.
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Convert a packed RGB image to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let pixel_count = width * height;
    rgb.chunks_exact(3)
        .take(pixel_count)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Convert RGB to grayscale using parallel processing
/// Processes rows in parallel for multi-core speedup
pub fn rgb_to_grayscale_parallel(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * 3;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 3;
            *out = luma(rgb[idx], rgb[idx + 1], rgb[idx + 2]);
        }
    });

    gray
}

/// Convert one RGB pixel to HSV on the 8-bit OpenCV scale:
/// H in [0, 180), S and V in [0, 255].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [f64; 3] {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    // Half-degree hue so it fits a byte; 180 wraps back to 0
    let h8 = (h / 2.0).round() % 180.0;
    [h8, s.round(), v]
}
