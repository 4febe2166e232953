use std::collections::BTreeSet;

use super::overlap::iou;
use crate::models::RawDetection;

/// Detections that cover the same region, in pooling order.
///
/// The first member is the cluster's anchor: later detections join by
/// overlapping it, not by overlapping the cluster as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    members: Vec<RawDetection>,
}

impl Cluster {
    fn new(anchor: RawDetection) -> Self {
        Self {
            members: vec![anchor],
        }
    }

    pub fn anchor(&self) -> &RawDetection {
        &self.members[0]
    }

    pub fn members(&self) -> &[RawDetection] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Clusters are never empty; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Distinct detector names among the members
    pub fn detectors(&self) -> BTreeSet<String> {
        self.members.iter().map(|d| d.detector_id.clone()).collect()
    }
}

/// Greedy single-pass clustering.
///
/// Each detection is compared with the anchor of every existing cluster in
/// creation order and joins the first one with `iou >= threshold`;
/// otherwise it opens a new cluster. The result depends on input order and
/// is first-match, not best-match.
pub fn build_clusters(detections: Vec<RawDetection>, threshold: f64) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for detection in detections {
        match clusters
            .iter_mut()
            .find(|cluster| iou(&cluster.anchor().bbox, &detection.bbox) >= threshold)
        {
            Some(cluster) => cluster.members.push(detection),
            None => clusters.push(Cluster::new(detection)),
        }
    }

    clusters
}
