//! Image processing helpers for the built-in detectors and quality metrics
//!
//! - Grayscale and HSV conversion
//! - Binarization (Otsu's method and fixed threshold)
//! - Binary morphology (dilate, erode, close)

pub mod binarization;
pub mod grayscale;
pub mod morphology;
