use std::sync::OnceLock;

use crate::error::AnalysisError;
use crate::utils::grayscale::{rgb_to_grayscale, rgb_to_grayscale_parallel};

/// Frames at or above this many pixels are converted to grayscale row-parallel.
const PARALLEL_GRAY_PIXELS: usize = 1 << 20;

/// Decoded RGB image handed to detectors and the quality analyzer.
///
/// The grayscale plane is computed on first use and shared by every
/// consumer of the frame.
#[derive(Debug)]
pub struct Frame {
    width: usize,
    height: usize,
    rgb: Vec<u8>,
    gray: OnceLock<Vec<u8>>,
}

impl Frame {
    /// Wrap a packed RGB buffer (3 bytes per pixel, row-major).
    pub fn from_rgb(rgb: Vec<u8>, width: usize, height: usize) -> Result<Self, AnalysisError> {
        let expected = width * height * 3;
        if rgb.len() != expected {
            return Err(AnalysisError::InvalidBuffer {
                expected,
                actual: rgb.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgb,
            gray: OnceLock::new(),
        })
    }

    /// Frame of a single color
    pub fn filled(width: usize, height: usize, color: [u8; 3]) -> Self {
        let rgb = color.repeat(width * height);
        Self {
            width,
            height,
            rgb,
            gray: OnceLock::new(),
        }
    }

    /// Take ownership of a decoded `image` buffer.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width: width as usize,
            height: height as usize,
            rgb: img.into_raw(),
            gray: OnceLock::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total pixel count
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Raw RGB bytes
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// RGB value at (x, y); panics when out of bounds
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.rgb[idx], self.rgb[idx + 1], self.rgb[idx + 2]]
    }

    /// Overwrite one pixel; used when composing synthetic frames.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) * 3;
        self.rgb[idx..idx + 3].copy_from_slice(&color);
        self.gray = OnceLock::new();
    }

    /// Paint an axis-aligned rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: [u8; 3]) {
        let x1 = (x + w).min(self.width);
        let y1 = (y + h).min(self.height);
        for yy in y.min(self.height)..y1 {
            for xx in x.min(self.width)..x1 {
                let idx = (yy * self.width + xx) * 3;
                self.rgb[idx..idx + 3].copy_from_slice(&color);
            }
        }
        self.gray = OnceLock::new();
    }

    /// Grayscale plane, one byte per pixel
    pub fn gray(&self) -> &[u8] {
        self.gray.get_or_init(|| {
            if self.width * self.height >= PARALLEL_GRAY_PIXELS {
                rgb_to_grayscale_parallel(&self.rgb, self.width, self.height)
            } else {
                rgb_to_grayscale(&self.rgb, self.width, self.height)
            }
        })
    }
}
