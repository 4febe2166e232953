//! Analyzer configuration.
//!
//! Layering: optional TOML file (every key optional) → built-in defaults →
//! `QR_FUSION_*` environment overrides → validation. The result is an
//! immutable value passed by reference to every component.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::fusion::FusionConfig;
use crate::models::FusionStrategy;
use crate::quality::{ClarityThresholds, QualityConfig};

pub const ENV_STRATEGY: &str = "QR_FUSION_STRATEGY";
pub const ENV_MIN_VOTES: &str = "QR_FUSION_MIN_VOTES";
pub const ENV_DETECTORS: &str = "QR_FUSION_DETECTORS";

const DEFAULT_DETECTORS: [&str; 2] = [crate::detector::finder::NAME, crate::detector::contour::NAME];

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnalyzerConfigFile {
    enabled_detectors: Option<Vec<String>>,
    fusion_strategy: Option<String>,
    min_votes: Option<usize>,
    cluster_iou_threshold: Option<f64>,
    dedup_iou_threshold: Option<f64>,
    detector_weights: Option<BTreeMap<String, f32>>,
    default_detector_weight: Option<f32>,
    clarity_thresholds: Option<ClarityThresholdsFile>,
    contrast_threshold: Option<f64>,
    area_threshold_percent: Option<f64>,
    contrast_margin_px: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ClarityThresholdsFile {
    clear: Option<f64>,
    slight_blur: Option<f64>,
    medium_blur: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Adapter names, in pooling order
    pub enabled_detectors: Vec<String>,
    pub fusion: FusionConfig,
    pub quality: QualityConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled_detectors: DEFAULT_DETECTORS.iter().map(|s| s.to_string()).collect(),
            fusion: FusionConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Full layering: file (if any), defaults, environment, validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a TOML file; keys it omits keep their defaults. Not validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: AnalyzerConfigFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_file_values(file)
    }

    /// Parse TOML text directly. Not validated.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: AnalyzerConfigFile = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        Self::from_file_values(file)
    }

    fn from_file_values(file: AnalyzerConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let strategy = match file.fusion_strategy.as_deref() {
            Some(name) => name.parse()?,
            None => defaults.fusion.strategy,
        };

        // File weights refine the defaults rather than replacing them
        let mut detector_weights = defaults.fusion.detector_weights;
        detector_weights.extend(file.detector_weights.unwrap_or_default());

        let fusion = FusionConfig {
            strategy,
            min_votes: file.min_votes.unwrap_or(defaults.fusion.min_votes),
            cluster_iou_threshold: file
                .cluster_iou_threshold
                .unwrap_or(defaults.fusion.cluster_iou_threshold),
            dedup_iou_threshold: file
                .dedup_iou_threshold
                .unwrap_or(defaults.fusion.dedup_iou_threshold),
            detector_weights,
            default_detector_weight: file
                .default_detector_weight
                .unwrap_or(defaults.fusion.default_detector_weight),
        };

        let clarity_file = file.clarity_thresholds.unwrap_or_default();
        let clarity_defaults = defaults.quality.clarity_thresholds;
        let quality = QualityConfig {
            clarity_thresholds: ClarityThresholds {
                clear: clarity_file.clear.unwrap_or(clarity_defaults.clear),
                slight_blur: clarity_file.slight_blur.unwrap_or(clarity_defaults.slight_blur),
                medium_blur: clarity_file.medium_blur.unwrap_or(clarity_defaults.medium_blur),
            },
            contrast_threshold: file
                .contrast_threshold
                .unwrap_or(defaults.quality.contrast_threshold),
            area_threshold_percent: file
                .area_threshold_percent
                .unwrap_or(defaults.quality.area_threshold_percent),
            contrast_margin_px: file
                .contrast_margin_px
                .unwrap_or(defaults.quality.contrast_margin_px),
        };

        Ok(Self {
            enabled_detectors: file
                .enabled_detectors
                .map(|names| clean_names(names.iter().map(String::as_str)))
                .unwrap_or(defaults.enabled_detectors),
            fusion,
            quality,
        })
    }

    /// Apply `QR_FUSION_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup; blank values are ignored.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(strategy) = value(ENV_STRATEGY) {
            self.fusion.strategy = strategy.parse()?;
        }
        if let Some(min_votes) = value(ENV_MIN_VOTES) {
            self.fusion.min_votes = min_votes.trim().parse().map_err(|_| {
                invalid(ENV_MIN_VOTES, format!("'{}' is not a non-negative integer", min_votes))
            })?;
        }
        if let Some(detectors) = value(ENV_DETECTORS) {
            self.enabled_detectors = clean_names(detectors.split(','));
        }
        Ok(())
    }

    /// Reject configurations that cannot run; called before any image.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled_detectors.is_empty() {
            return Err(ConfigError::NoDetectors);
        }

        let fusion = &self.fusion;
        if fusion.min_votes == 0 {
            return Err(invalid("min_votes", "must be at least 1"));
        }
        check_unit_interval("cluster_iou_threshold", fusion.cluster_iou_threshold)?;
        check_unit_interval("dedup_iou_threshold", fusion.dedup_iou_threshold)?;
        for (name, weight) in &fusion.detector_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(invalid(
                    "detector_weights",
                    format!("weight for '{}' must be a finite non-negative number", name),
                ));
            }
        }
        check_non_negative("default_detector_weight", fusion.default_detector_weight as f64)?;

        let quality = &self.quality;
        let clarity = &quality.clarity_thresholds;
        check_non_negative("clarity_thresholds.clear", clarity.clear)?;
        check_non_negative("clarity_thresholds.slight_blur", clarity.slight_blur)?;
        check_non_negative("clarity_thresholds.medium_blur", clarity.medium_blur)?;
        if !(clarity.clear > clarity.slight_blur && clarity.slight_blur > clarity.medium_blur) {
            return Err(invalid(
                "clarity_thresholds",
                "must be strictly descending: clear > slight_blur > medium_blur",
            ));
        }
        check_non_negative("contrast_threshold", quality.contrast_threshold)?;
        check_non_negative("area_threshold_percent", quality.area_threshold_percent)?;
        Ok(())
    }

    /// Replace the fusion policy by name.
    pub fn set_strategy(&mut self, name: &str) -> Result<(), ConfigError> {
        self.fusion.strategy = name.parse::<FusionStrategy>()?;
        Ok(())
    }
}

fn clean_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{} is outside (0, 1]", value)))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{} is not a finite non-negative number", value)))
    }
}
