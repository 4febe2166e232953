use crate::models::{BoundingBox, ContrastClass, Frame};
use crate::utils::grayscale::rgb_to_hsv;

const GRAY_WEIGHT: f64 = 0.3;
const RGB_WEIGHT: f64 = 0.4;
const HSV_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contrast {
    pub score: f64,
    pub class: ContrastClass,
    /// |mean gray(box) - mean gray(margin)|
    pub gray: f64,
    /// Euclidean distance between mean RGB colors
    pub rgb: f64,
    /// Euclidean distance between mean HSV colors (8-bit scale)
    pub hsv: f64,
}

impl Contrast {
    fn degenerate() -> Self {
        Self {
            score: 0.0,
            class: ContrastClass::Similar,
            gray: 0.0,
            rgb: 0.0,
            hsv: 0.0,
        }
    }
}

/// Running channel sums for one region.
#[derive(Default)]
struct Means {
    count: u64,
    gray: f64,
    rgb: [f64; 3],
    hsv: [f64; 3],
}

impl Means {
    fn add(&mut self, gray: u8, [r, g, b]: [u8; 3]) {
        self.count += 1;
        self.gray += gray as f64;
        for (sum, v) in self.rgb.iter_mut().zip([r, g, b]) {
            *sum += v as f64;
        }
        for (sum, v) in self.hsv.iter_mut().zip(rgb_to_hsv(r, g, b)) {
            *sum += v;
        }
    }

    fn finish(mut self) -> Option<Self> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        self.gray /= n;
        self.rgb.iter_mut().for_each(|v| *v /= n);
        self.hsv.iter_mut().for_each(|v| *v /= n);
        Some(self)
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Color separation between the box and a ring of `margin` pixels around it.
///
/// Both regions are clipped to the frame and the ring never includes box
/// pixels. When either region is empty the result is 0 and `Similar`.
pub fn contrast(frame: &Frame, bbox: &BoundingBox, margin: u32, threshold: f64) -> Contrast {
    let (width, height) = (frame.width(), frame.height());
    let Some((bx0, by0, bx1, by1)) = bbox.clip(width, height) else {
        return Contrast::degenerate();
    };
    let Some((mx0, my0, mx1, my1)) = bbox.expand(margin).clip(width, height) else {
        return Contrast::degenerate();
    };

    let gray = frame.gray();
    let mut inside = Means::default();
    let mut ring = Means::default();
    for y in my0..my1 {
        for x in mx0..mx1 {
            let in_box = (bx0..bx1).contains(&x) && (by0..by1).contains(&y);
            let target = if in_box { &mut inside } else { &mut ring };
            target.add(gray[y * width + x], frame.pixel(x, y));
        }
    }

    let (Some(inside), Some(ring)) = (inside.finish(), ring.finish()) else {
        return Contrast::degenerate();
    };

    let gray = (inside.gray - ring.gray).abs();
    let rgb = distance(&inside.rgb, &ring.rgb);
    let hsv = distance(&inside.hsv, &ring.hsv);
    let score = GRAY_WEIGHT * gray + RGB_WEIGHT * rgb + HSV_WEIGHT * hsv;
    if !score.is_finite() {
        return Contrast::degenerate();
    }

    Contrast {
        score,
        class: if score > threshold {
            ContrastClass::Distinct
        } else {
            ContrastClass::Similar
        },
        gray,
        rgb,
        hsv,
    }
}
