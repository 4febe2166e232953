use crate::models::BoundingBox;

/// Intersection over union of two boxes.
///
/// 0 when the boxes do not overlap or either has zero area; 1 for a
/// non-degenerate box compared with itself. Symmetric in its arguments.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection_area(b);
    if intersection == 0 {
        return 0.0;
    }
    let union = a.area() + b.area() - intersection;
    intersection as f64 / union as f64
}
