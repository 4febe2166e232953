//! The four cluster reduction policies.
//!
//! All of them produce boxes by truncating means toward zero, take the
//! payload and code type together from one winning member, and report the
//! distinct contributing detectors.

use log::debug;

use super::FusionConfig;
use super::cluster::{Cluster, build_clusters};
use super::overlap::iou;
use crate::models::{BoundingBox, FusedDetection, FusionStrategy, RawDetection};

/// Keep clusters with at least `min_votes` members.
pub fn voting(detections: Vec<RawDetection>, config: &FusionConfig) -> Vec<FusedDetection> {
    build_clusters(detections, config.cluster_iou_threshold)
        .into_iter()
        .filter(|cluster| cluster.len() >= config.min_votes)
        .map(|cluster| merge_equal(&cluster, FusionStrategy::Voting))
        .collect()
}

/// Keep every cluster, merged by per-detector weight.
pub fn weighted(detections: Vec<RawDetection>, config: &FusionConfig) -> Vec<FusedDetection> {
    build_clusters(detections, config.cluster_iou_threshold)
        .into_iter()
        .map(|cluster| merge_weighted(&cluster, config))
        .collect()
}

/// Deduplicate the raw pool at `iou > dedup_iou_threshold`.
///
/// A duplicate with higher confidence replaces the accepted detection and
/// moves to the end of the output; a tie keeps the earlier one.
pub fn union(detections: Vec<RawDetection>, config: &FusionConfig) -> Vec<FusedDetection> {
    let mut accepted: Vec<RawDetection> = Vec::new();

    for detection in detections {
        let duplicate = accepted
            .iter()
            .position(|kept| iou(&kept.bbox, &detection.bbox) > config.dedup_iou_threshold);
        match duplicate {
            Some(index) => {
                if detection.confidence > accepted[index].confidence {
                    accepted.remove(index);
                    accepted.push(detection);
                }
            }
            None => accepted.push(detection),
        }
    }

    accepted
        .into_iter()
        .map(|detection| FusedDetection::standalone(detection, FusionStrategy::Union))
        .collect()
}

/// Keep clusters seen by at least `min(enabled_detectors, min_votes)`
/// distinct detectors.
pub fn intersection(
    detections: Vec<RawDetection>,
    config: &FusionConfig,
    enabled_detectors: usize,
) -> Vec<FusedDetection> {
    let required = enabled_detectors.min(config.min_votes);
    debug!("intersection requires {} distinct detectors", required);

    build_clusters(detections, config.cluster_iou_threshold)
        .into_iter()
        .filter(|cluster| cluster.detectors().len() >= required)
        .map(|cluster| merge_equal(&cluster, FusionStrategy::Intersection))
        .collect()
}

/// Equal-weight merge shared by voting and intersection.
fn merge_equal(cluster: &Cluster, method: FusionStrategy) -> FusedDetection {
    let members = cluster.members();
    let n = members.len() as f64;

    let bbox = mean_box(members.iter().map(|d| (&d.bbox, 1.0)));
    let confidence = members.iter().map(|d| d.confidence as f64).sum::<f64>() / n;
    let winner = first_max_by(members, |d| d.confidence as f64);

    FusedDetection {
        bbox,
        confidence: confidence as f32,
        payload: winner.payload.clone(),
        code_type: winner.code_type.clone(),
        contributing_detectors: cluster.detectors(),
        vote_count: cluster.len(),
        fusion_method: method,
    }
}

fn merge_weighted(cluster: &Cluster, config: &FusionConfig) -> FusedDetection {
    let members = cluster.members();
    let mut weights: Vec<f64> = members
        .iter()
        .map(|d| config.weight_of(&d.detector_id) as f64)
        .collect();

    // All-zero weights degrade to an equal-weight merge.
    if weights.iter().sum::<f64>() <= 0.0 {
        weights.iter_mut().for_each(|w| *w = 1.0);
    }
    let total: f64 = weights.iter().sum();

    let bbox = mean_box(members.iter().zip(&weights).map(|(d, &w)| (&d.bbox, w)));
    let confidence = members
        .iter()
        .zip(&weights)
        .map(|(d, w)| d.confidence as f64 * w)
        .sum::<f64>()
        / total;

    let winner = first_max_by(members, |d| config.weight_of(&d.detector_id) as f64);

    FusedDetection {
        bbox,
        confidence: confidence as f32,
        payload: winner.payload.clone(),
        code_type: winner.code_type.clone(),
        contributing_detectors: cluster.detectors(),
        vote_count: cluster.len(),
        fusion_method: FusionStrategy::Weighted,
    }
}

/// Component-wise weighted mean, truncated toward zero.
fn mean_box<'a>(boxes: impl Iterator<Item = (&'a BoundingBox, f64)>) -> BoundingBox {
    let mut sums = [0.0f64; 4];
    let mut total = 0.0f64;
    for (b, w) in boxes {
        sums[0] += b.x as f64 * w;
        sums[1] += b.y as f64 * w;
        sums[2] += b.width as f64 * w;
        sums[3] += b.height as f64 * w;
        total += w;
    }
    if total <= 0.0 {
        return BoundingBox::default();
    }
    BoundingBox::new(
        (sums[0] / total).trunc() as i32,
        (sums[1] / total).trunc() as i32,
        (sums[2] / total).trunc() as u32,
        (sums[3] / total).trunc() as u32,
    )
}

/// Highest-keyed element, the earliest one on ties.
fn first_max_by<T>(items: &[T], key: impl Fn(&T) -> f64) -> &T {
    let mut best = &items[0];
    let mut best_key = key(best);
    for item in &items[1..] {
        let k = key(item);
        if k > best_key {
            best = item;
            best_key = k;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(b: BoundingBox, confidence: f32, id: &str) -> RawDetection {
        RawDetection::new(b, confidence, id)
    }

    fn config(strategy: FusionStrategy) -> FusionConfig {
        FusionConfig {
            strategy,
            ..FusionConfig::default()
        }
    }

    #[test]
    fn test_mean_box_truncates() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(2, 2, 14, 14);
        assert_eq!(
            mean_box([(&a, 1.0), (&b, 1.0)].into_iter()),
            BoundingBox::new(1, 1, 12, 12)
        );
        let c = BoundingBox::new(1, 1, 11, 11);
        // (0 + 1) / 2 = 0.5 → 0, (10 + 11) / 2 = 10.5 → 10
        assert_eq!(
            mean_box([(&a, 1.0), (&c, 1.0)].into_iter()),
            BoundingBox::new(0, 0, 10, 10)
        );
    }

    #[test]
    fn test_mean_box_truncates_negative_toward_zero() {
        let a = BoundingBox::new(-3, 0, 4, 4);
        let b = BoundingBox::new(0, 0, 4, 4);
        assert_eq!(mean_box([(&a, 1.0), (&b, 1.0)].into_iter()).x, -1);
    }

    #[test]
    fn test_voting_drops_small_clusters() {
        let cfg = config(FusionStrategy::Voting);
        let fused = voting(
            vec![
                det(BoundingBox::new(0, 0, 20, 20), 0.9, "a"),
                det(BoundingBox::new(2, 2, 22, 22), 0.7, "b"),
                det(BoundingBox::new(200, 200, 10, 10), 1.0, "c"),
            ],
            &cfg,
        );
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].bbox, BoundingBox::new(1, 1, 21, 21));
        assert_eq!(fused[0].vote_count, 2);
        assert!((fused[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(fused[0].fusion_method, FusionStrategy::Voting);
    }

    #[test]
    fn test_voting_same_detector_counts_twice() {
        let cfg = config(FusionStrategy::Voting);
        let fused = voting(
            vec![
                det(BoundingBox::new(0, 0, 10, 10), 0.5, "a"),
                det(BoundingBox::new(0, 0, 10, 10), 0.5, "a"),
            ],
            &cfg,
        );
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].vote_count, 2);
        assert_eq!(fused[0].contributing_detectors.len(), 1);
    }

    #[test]
    fn test_voting_payload_from_first_most_confident() {
        let cfg = config(FusionStrategy::Voting);
        let b = BoundingBox::new(0, 0, 10, 10);
        let fused = voting(
            vec![
                det(b, 0.6, "contour"),
                det(b, 0.9, "decoder").with_payload("first").with_code_type("QRCODE"),
                det(b, 0.9, "other").with_payload("second"),
            ],
            &cfg,
        );
        assert_eq!(fused[0].payload.as_deref(), Some("first"));
        assert_eq!(fused[0].code_type.as_deref(), Some("QRCODE"));
        assert_eq!(fused[0].vote_count, 3);
    }

    #[test]
    fn test_weighted_keeps_singletons_and_uses_weights() {
        let cfg = config(FusionStrategy::Weighted);
        let fused = weighted(
            vec![
                det(BoundingBox::new(0, 0, 100, 100), 1.0, "decoder").with_payload("hi"),
                det(BoundingBox::new(10, 10, 100, 100), 0.5, "contour"),
                det(BoundingBox::new(500, 500, 50, 50), 0.7, "contour"),
            ],
            &cfg,
        );
        assert_eq!(fused.len(), 2);

        // weights 0.9 and 0.6: x = 6 / 1.5 = 4, conf = (0.9 + 0.3) / 1.5 = 0.8
        assert_eq!(fused[0].bbox, BoundingBox::new(4, 4, 100, 100));
        assert!((fused[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(fused[0].payload.as_deref(), Some("hi"));
        assert_eq!(fused[0].vote_count, 2);

        assert_eq!(fused[1].vote_count, 1);
        assert_eq!(fused[1].bbox, BoundingBox::new(500, 500, 50, 50));
        assert!((fused[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_payload_from_highest_weight_not_confidence() {
        let cfg = config(FusionStrategy::Weighted);
        let b = BoundingBox::new(0, 0, 10, 10);
        let fused = weighted(
            vec![
                det(b, 1.0, "contour").with_payload("low"),
                det(b, 0.1, "decoder").with_payload("high"),
            ],
            &cfg,
        );
        assert_eq!(fused[0].payload.as_deref(), Some("high"));
    }

    #[test]
    fn test_weighted_zero_weights_fall_back_to_equal() {
        let mut cfg = config(FusionStrategy::Weighted);
        cfg.detector_weights.clear();
        cfg.default_detector_weight = 0.0;
        let fused = weighted(
            vec![
                det(BoundingBox::new(0, 0, 20, 20), 0.9, "a"),
                det(BoundingBox::new(2, 2, 22, 22), 0.7, "b"),
            ],
            &cfg,
        );
        assert_eq!(fused[0].bbox, BoundingBox::new(1, 1, 21, 21));
        assert!((fused[0].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_union_dedup_threshold_is_strict() {
        let cfg = config(FusionStrategy::Union);
        let a = BoundingBox::new(0, 0, 10, 10);
        // exactly 0.7: 70 / 100 with a contained 7×10 box
        let b = BoundingBox::new(0, 0, 7, 10);
        let fused = union(vec![det(a, 0.5, "x"), det(b, 0.9, "y")], &cfg);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_union_replacement_moves_to_end() {
        let cfg = config(FusionStrategy::Union);
        let a = BoundingBox::new(0, 0, 10, 10);
        let far = BoundingBox::new(100, 100, 10, 10);
        let fused = union(
            vec![det(a, 0.5, "x"), det(far, 0.5, "x"), det(a, 0.9, "y"), det(a, 0.9, "z")],
            &cfg,
        );
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].bbox, far);
        assert_eq!(fused[1].contributing_detectors.iter().next().map(String::as_str), Some("y"));
        assert!(fused.iter().all(|f| f.vote_count == 1));
    }

    #[test]
    fn test_intersection_counts_distinct_detectors() {
        let cfg = config(FusionStrategy::Intersection);
        let b = BoundingBox::new(0, 0, 10, 10);
        let same = intersection(vec![det(b, 0.5, "a"), det(b, 0.5, "a")], &cfg, 3);
        assert!(same.is_empty());

        let mixed = intersection(vec![det(b, 0.5, "a"), det(b, 0.7, "b")], &cfg, 3);
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].fusion_method, FusionStrategy::Intersection);
        assert!((mixed[0].confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_intersection_floor_with_single_enabled_detector() {
        let cfg = config(FusionStrategy::Intersection);
        let b = BoundingBox::new(0, 0, 10, 10);
        let fused = intersection(vec![det(b, 0.5, "a")], &cfg, 1);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].vote_count, 1);
    }

    #[test]
    fn test_first_max_by_prefers_earliest() {
        let values = [1.0, 3.0, 2.0, 3.0];
        let best = first_max_by(&values, |v| *v);
        assert!(std::ptr::eq(best, &values[1]));
    }
}
