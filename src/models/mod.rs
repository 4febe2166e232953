//! Data types shared across detection, fusion and quality analysis

pub mod bbox;
pub mod detection;
pub mod frame;
pub mod matrix;
pub mod quality;
pub mod record;

pub use bbox::BoundingBox;
pub use detection::{FusedDetection, FusionStrategy, RawDetection};
pub use frame::Frame;
pub use matrix::BitMatrix;
pub use quality::{ClarityClass, ContrastClass, QualityMetrics};
pub use record::AnalysisRecord;
