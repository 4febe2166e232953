use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle.
///
/// `x`/`y` may lie outside the image (detectors report what they see);
/// extents are unsigned so a box can never have negative area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl BoundingBox {
    /// Create a box from its top-left corner and extents
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a box from two corners, normalizing their order.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self {
            x: left,
            y: top,
            width: (right as i64 - left as i64) as u32,
            height: (bottom as i64 - top as i64) as u32,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Area in pixels
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when the box covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlapping area with another box (0 when disjoint)
    pub fn intersection_area(&self, other: &BoundingBox) -> u64 {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0;
        }
        ((right - left) * (bottom - top)) as u64
    }

    /// Grow the box by `pad` pixels on every side.
    pub fn expand(&self, pad: u32) -> Self {
        Self {
            x: self.x.saturating_sub(pad as i32),
            y: self.y.saturating_sub(pad as i32),
            width: self.width.saturating_add(pad.saturating_mul(2)),
            height: self.height.saturating_add(pad.saturating_mul(2)),
        }
    }

    /// Clip to a `width`×`height` image.
    ///
    /// Returns pixel ranges `(x0, y0, x1, y1)` with exclusive ends, or `None`
    /// when nothing of the box lies inside the image.
    pub fn clip(&self, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
        let x0 = (self.x as i64).clamp(0, width as i64);
        let y0 = (self.y as i64).clamp(0, height as i64);
        let x1 = self.right().clamp(0, width as i64);
        let y1 = self.bottom().clamp(0, height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}
