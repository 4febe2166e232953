//! Per-image pipeline: detectors → clustering/fusion → quality analysis.

use log::debug;

use crate::config::AnalyzerConfig;
use crate::detector::{DetectorAdapter, DetectorSet};
use crate::error::{ConfigError, DetectorError};
use crate::fusion::fuse;
use crate::models::{AnalysisRecord, Frame};
use crate::quality;

/// Everything produced for one frame.
#[derive(Debug, Default)]
pub struct FrameAnalysis {
    pub records: Vec<AnalysisRecord>,
    /// Adapters that failed on this frame (already logged)
    pub detector_failures: Vec<DetectorError>,
}

/// Immutable per-run analyzer; safe to share across worker threads.
pub struct Analyzer {
    config: AnalyzerConfig,
    detectors: DetectorSet,
}

impl Analyzer {
    /// Validate the configuration and build the enabled built-in adapters.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        Self::with_adapters(config, Vec::new())
    }

    /// Like [`Analyzer::from_config`], with caller-supplied adapters taking
    /// precedence over built-ins of the same name.
    pub fn with_adapters(
        config: AnalyzerConfig,
        adapters: Vec<Box<dyn DetectorAdapter>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let detectors = DetectorSet::from_enabled(&config.enabled_detectors, adapters)?;
        Ok(Self { config, detectors })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// Analyze a frame. No surviving detection is an empty result, not an error.
    pub fn analyze(&self, frame: &Frame) -> Vec<AnalysisRecord> {
        self.analyze_detailed(frame).records
    }

    pub fn analyze_detailed(&self, frame: &Frame) -> FrameAnalysis {
        let pool = self.detectors.run(frame);
        let fused = fuse(pool.detections, &self.config.fusion, self.detectors.len());

        let records: Vec<AnalysisRecord> = fused
            .into_iter()
            .map(|detection| {
                let metrics = quality::analyze(frame, &detection.bbox, &self.config.quality);
                AnalysisRecord::new(detection, metrics)
            })
            .collect();
        debug!(
            "{}x{} frame: {} records, {} detector failures",
            frame.width(),
            frame.height(),
            records.len(),
            pool.failures.len()
        );

        FrameAnalysis {
            records,
            detector_failures: pool.failures,
        }
    }
}
