/// Binary morphology on [`BitMatrix`] with square structuring elements.
///
/// Both operations are separable (row pass then column pass), so a
/// `(2r+1)×(2r+1)` kernel costs O(r) per pixel instead of O(r²).
use crate::models::BitMatrix;

/// Set a pixel when any pixel within `radius` (Chebyshev) is set.
pub fn dilate(matrix: &BitMatrix, radius: usize) -> BitMatrix {
    if radius == 0 {
        return matrix.clone();
    }
    let (w, h) = (matrix.width(), matrix.height());
    let rows = BitMatrix::from_fn(w, h, |x, y| {
        let x0 = x.saturating_sub(radius);
        let x1 = (x + radius).min(w.saturating_sub(1));
        (x0..=x1).any(|xx| matrix.get(xx, y))
    });
    BitMatrix::from_fn(w, h, |x, y| {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(h.saturating_sub(1));
        (y0..=y1).any(|yy| rows.get(x, yy))
    })
}

/// Keep a pixel only when every in-image pixel within `radius` is set.
///
/// Pixels outside the image do not erode the border.
pub fn erode(matrix: &BitMatrix, radius: usize) -> BitMatrix {
    if radius == 0 {
        return matrix.clone();
    }
    let (w, h) = (matrix.width(), matrix.height());
    let rows = BitMatrix::from_fn(w, h, |x, y| {
        let x0 = x.saturating_sub(radius);
        let x1 = (x + radius).min(w.saturating_sub(1));
        (x0..=x1).all(|xx| matrix.get(xx, y))
    });
    BitMatrix::from_fn(w, h, |x, y| {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(h.saturating_sub(1));
        (y0..=y1).all(|yy| rows.get(x, yy))
    })
}

/// Morphological closing: `iterations` dilations followed by as many erosions.
pub fn close(matrix: &BitMatrix, radius: usize, iterations: usize) -> BitMatrix {
    let mut out = matrix.clone();
    for _ in 0..iterations {
        out = dilate(&out, radius);
    }
    for _ in 0..iterations {
        out = erode(&out, radius);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dilate_single_pixel() {
        let mut m = BitMatrix::new(7, 7);
        m.set(3, 3, true);
        let d = dilate(&m, 1);
        assert_eq!(d.count_set(0, 0, 7, 7), 9);
        assert!(d.get(2, 2) && d.get(4, 4));
        assert!(!d.get(1, 3));
    }

    #[test]
    fn test_erode_removes_speck() {
        let mut m = BitMatrix::from_fn(9, 9, |x, y| (2..7).contains(&x) && (2..7).contains(&y));
        m.set(0, 8, true);
        let e = erode(&m, 1);
        assert!(!e.get(0, 8));
        assert_eq!(e.count_set(0, 0, 9, 9), 9);
    }

    #[test]
    fn test_close_fills_gaps() {
        // Vertical stripes two pixels apart merge into one block
        let m = BitMatrix::from_fn(20, 10, |x, _| x % 3 == 0 && x < 18);
        let closed = close(&m, 2, 1);
        assert_eq!(closed.count_set(0, 0, 16, 10), 160);
        assert!(!closed.get(19, 5));
    }
}
