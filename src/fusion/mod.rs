//! Detection fusion: overlap matching, clustering and the four policies.

pub mod cluster;
pub mod overlap;
pub mod strategies;

use std::collections::BTreeMap;

use log::debug;

use crate::models::{FusedDetection, FusionStrategy, RawDetection};

pub use cluster::{Cluster, build_clusters};
pub use overlap::iou;

/// Detector name reserved for payload decoders
pub const DECODER: &str = "decoder";

/// Parameters of one fusion run.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    pub strategy: FusionStrategy,
    /// Minimum cluster size (voting) or distinct detector floor (intersection)
    pub min_votes: usize,
    /// Inclusive IoU needed to join a cluster
    pub cluster_iou_threshold: f64,
    /// Exclusive IoU above which union treats two detections as duplicates
    pub dedup_iou_threshold: f64,
    /// Static priority per detector name
    pub detector_weights: BTreeMap<String, f32>,
    /// Weight for detectors missing from `detector_weights`
    pub default_detector_weight: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        let detector_weights = [
            (DECODER, 0.9),
            (crate::detector::finder::NAME, 0.85),
            (crate::detector::contour::NAME, 0.6),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            strategy: FusionStrategy::Voting,
            min_votes: 2,
            cluster_iou_threshold: 0.5,
            dedup_iou_threshold: 0.7,
            detector_weights,
            default_detector_weight: 0.5,
        }
    }
}

impl FusionConfig {
    pub fn weight_of(&self, detector: &str) -> f32 {
        self.detector_weights
            .get(detector)
            .copied()
            .unwrap_or(self.default_detector_weight)
    }
}

/// Reduce the pooled detections of one image with the configured policy.
///
/// `detections` must be in adapter registration order, then within-adapter
/// order; clustering is order dependent. `enabled_detectors` is the number
/// of configured adapters, used by the intersection floor.
pub fn fuse(
    detections: Vec<RawDetection>,
    config: &FusionConfig,
    enabled_detectors: usize,
) -> Vec<FusedDetection> {
    let pooled = detections.len();
    let fused = match config.strategy {
        FusionStrategy::Voting => strategies::voting(detections, config),
        FusionStrategy::Weighted => strategies::weighted(detections, config),
        FusionStrategy::Union => strategies::union(detections, config),
        FusionStrategy::Intersection => {
            strategies::intersection(detections, config, enabled_detectors)
        }
    };
    debug!(
        "{} fusion: {} raw -> {} fused",
        config.strategy,
        pooled,
        fused.len()
    );
    fused
}
