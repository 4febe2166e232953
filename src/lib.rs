//! qr_fusion - multi-detector QR region fusion and scan-quality analysis
//!
//! Several independent detectors look for QR-like regions in an image.
//! Their candidates are clustered by box overlap and reconciled by one of
//! four fusion policies (voting, weighted, union, intersection). Every
//! surviving region is then scored for relative size, sharpness and
//! background contrast, which is what triages real-world scan failures.
//!
//! ```no_run
//! use qr_fusion::{Analyzer, AnalyzerConfig};
//!
//! let analyzer = Analyzer::from_config(AnalyzerConfig::default())?;
//! let frame = qr_fusion::tools::load_frame("photo.jpg")?;
//! for record in analyzer.analyze(&frame) {
//!     println!("{:?} {}", record.bbox, record.clarity_class.as_str());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Batch orchestration, distribution summary and JSON report
pub mod batch;
/// Layered analyzer configuration (TOML file, environment, validation)
pub mod config;
/// Detector adapter trait, detector set and built-in adapters
pub mod detector;
/// Error types
pub mod error;
/// Overlap matching, clustering and fusion policies
pub mod fusion;
/// Core data structures (boxes, detections, frames, records)
pub mod models;
/// Per-image pipeline
pub mod pipeline;
/// Area, clarity and contrast metrics
pub mod quality;
/// Image loading and dataset iteration
pub mod tools;
/// Image processing helpers (grayscale, binarization, morphology)
pub mod utils;

pub use batch::{BatchReport, BatchRunner, CancelFlag, DistributionSummary, ImageOutcome};
pub use config::AnalyzerConfig;
pub use detector::{DetectorAdapter, DetectorSet, ExternalAdapter};
pub use error::{AnalysisError, ConfigError, DetectorError, ReportError};
pub use fusion::{FusionConfig, fuse, iou};
pub use models::{
    AnalysisRecord, BoundingBox, ClarityClass, ContrastClass, Frame, FusedDetection,
    FusionStrategy, QualityMetrics, RawDetection,
};
pub use pipeline::Analyzer;
pub use quality::{ClarityThresholds, QualityConfig};
