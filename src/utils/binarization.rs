use crate::models::BitMatrix;

/// Convert grayscale image to binary using Otsu's thresholding method
/// Returns a BitMatrix where true = black, false = white
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let threshold = otsu_threshold(gray);
    threshold_binarize(gray, width, height, threshold)
}

/// Otsu's optimal threshold: pixels strictly below it form the dark class.
pub fn otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    if total == 0.0 {
        return 128;
    }
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(intensity, &count)| intensity as f64 * count as f64)
        .sum();

    let mut dark_pixels = 0.0f64;
    let mut dark_sum = 0.0f64;
    let mut max_variance = 0.0f64;
    let mut optimal_threshold = 128u8;

    // Threshold t puts intensities [0, t) in the dark class
    for threshold in 1..=255usize {
        let count = histogram[threshold - 1] as f64;
        dark_pixels += count;
        dark_sum += (threshold - 1) as f64 * count;

        let light_pixels = total - dark_pixels;
        if dark_pixels == 0.0 || light_pixels == 0.0 {
            continue;
        }

        let dark_mean = dark_sum / dark_pixels;
        let light_mean = (total_sum - dark_sum) / light_pixels;
        let variance =
            (dark_pixels / total) * (light_pixels / total) * (dark_mean - light_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Simple global threshold binarization
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    BitMatrix::from_fn(width, height, |x, y| gray[y * width + x] < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarize() {
        let gray = vec![100, 150, 200, 50]; // 2x2 image
        let binary = threshold_binarize(&gray, 2, 2, 128);

        // Pixels < 128 should be black (true)
        assert!(binary.get(0, 0)); // 100 < 128
        assert!(!binary.get(1, 0)); // 150 >= 128
        assert!(!binary.get(0, 1)); // 200 >= 128
        assert!(binary.get(1, 1)); // 50 < 128
    }

    #[test]
    fn test_otsu_binarize() {
        // Create a simple two-class image
        let mut gray = vec![50u8; 50]; // Dark class
        gray.extend(vec![200u8; 50]); // Light class

        let binary = otsu_binarize(&gray, 10, 10);

        // Top half should be black (true), bottom half white (false)
        assert!(binary.get(0, 0));
        assert!(!binary.get(0, 7));
    }

    #[test]
    fn test_otsu_uniform_image() {
        // Single class: no split improves variance, default threshold stands
        let gray = vec![200u8; 64];
        assert_eq!(otsu_threshold(&gray), 128);
        assert_eq!(otsu_threshold(&[]), 128);
    }
}
