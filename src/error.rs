//! Error types.
//!
//! Only [`ConfigError`] is fatal, and only at startup. Detector and
//! per-image failures are downgraded by the pipeline and the batch runner.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid or unreadable configuration; aborts before any image is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown fusion strategy '{0}' (expected voting, weighted, union or intersection)")]
    UnknownStrategy(String),
    #[error("no detectors enabled")]
    NoDetectors,
    #[error("detector '{0}' is enabled but no adapter is registered under that name")]
    UnknownDetector(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single detector adapter; never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectorError {
    #[error("detector '{0}' is unavailable")]
    Unavailable(String),
    #[error("detector '{name}' failed: {reason}")]
    Failed { name: String, reason: String },
    #[error("detector '{0}' panicked")]
    Panicked(String),
}

/// Failure to obtain an analyzable image; becomes a per-image error marker.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to load image {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },
    #[error("image {0} has zero area")]
    EmptyImage(String),
}

/// Failure to persist a batch report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
