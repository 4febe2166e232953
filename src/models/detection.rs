use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::BoundingBox;
use crate::error::ConfigError;

/// One candidate region reported by a single detector adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Region in image pixels
    pub bbox: BoundingBox,
    /// Detector confidence, always within [0, 1]
    pub confidence: f32,
    /// Name of the adapter that produced the candidate
    pub detector_id: String,
    /// Decoded payload, when the detector decodes
    pub payload: Option<String>,
    /// Symbology reported alongside the payload (e.g. `QRCODE`)
    pub code_type: Option<String>,
}

impl RawDetection {
    /// Create a candidate; the confidence is clamped into [0, 1] and NaN maps to 0.
    pub fn new(bbox: BoundingBox, confidence: f32, detector_id: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            bbox,
            confidence,
            detector_id: detector_id.into(),
            payload: None,
            code_type: None,
        }
    }

    /// Attach a decoded payload
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Attach a symbology label
    pub fn with_code_type(mut self, code_type: impl Into<String>) -> Self {
        self.code_type = Some(code_type.into());
        self
    }
}

/// Policy used to reconcile detections from several adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionStrategy {
    /// Keep clusters corroborated by at least `min_votes` detections
    #[default]
    Voting,
    /// Keep every cluster, merged by per-detector weight
    Weighted,
    /// Keep every distinct detection after IoU deduplication
    Union,
    /// Keep clusters seen by enough distinct detectors
    Intersection,
}

impl FusionStrategy {
    /// All strategies, in declaration order
    pub const ALL: [FusionStrategy; 4] = [
        FusionStrategy::Voting,
        FusionStrategy::Weighted,
        FusionStrategy::Union,
        FusionStrategy::Intersection,
    ];

    /// Lowercase name used in configuration and output
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionStrategy::Voting => "voting",
            FusionStrategy::Weighted => "weighted",
            FusionStrategy::Union => "union",
            FusionStrategy::Intersection => "intersection",
        }
    }
}

impl fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FusionStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

/// Authoritative detection produced by the fusion engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedDetection {
    /// Merged region
    pub bbox: BoundingBox,
    /// Merged confidence
    pub confidence: f32,
    /// Payload chosen from the winning member
    pub payload: Option<String>,
    /// Symbology chosen from the winning member
    pub code_type: Option<String>,
    /// Distinct adapters that contributed; never empty
    pub contributing_detectors: BTreeSet<String>,
    /// Size of the originating cluster (1 for union results)
    pub vote_count: usize,
    /// Policy that produced this detection
    pub fusion_method: FusionStrategy,
}

impl FusedDetection {
    /// Promote a single raw detection unchanged.
    pub fn standalone(detection: RawDetection, method: FusionStrategy) -> Self {
        let mut contributing_detectors = BTreeSet::new();
        contributing_detectors.insert(detection.detector_id);
        Self {
            bbox: detection.bbox,
            confidence: detection.confidence,
            payload: detection.payload,
            code_type: detection.code_type,
            contributing_detectors,
            vote_count: 1,
            fusion_method: method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let b = BoundingBox::new(0, 0, 1, 1);
        assert_eq!(RawDetection::new(b, 1.7, "a").confidence, 1.0);
        assert_eq!(RawDetection::new(b, -0.2, "a").confidence, 0.0);
        assert_eq!(RawDetection::new(b, f32::NAN, "a").confidence, 0.0);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Voting".parse::<FusionStrategy>().unwrap(), FusionStrategy::Voting);
        assert_eq!(
            " intersection ".parse::<FusionStrategy>().unwrap(),
            FusionStrategy::Intersection
        );
        assert!(matches!(
            "majority".parse::<FusionStrategy>(),
            Err(ConfigError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_standalone_keeps_detector() {
        let raw = RawDetection::new(BoundingBox::new(1, 2, 3, 4), 0.4, "contour").with_payload("hi");
        let fused = FusedDetection::standalone(raw, FusionStrategy::Union);
        assert_eq!(fused.vote_count, 1);
        assert_eq!(fused.payload.as_deref(), Some("hi"));
        assert!(fused.contributing_detectors.contains("contour"));
    }
}
