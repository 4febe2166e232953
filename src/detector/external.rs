use std::fmt;

use super::DetectorAdapter;
use crate::error::DetectorError;
use crate::models::{Frame, RawDetection};

type DetectFn = dyn Fn(&Frame) -> Result<Vec<RawDetection>, DetectorError> + Send + Sync;

/// Adapter around a caller-supplied detection function.
///
/// This is how payload decoders and learned models join the ensemble:
/// wrap the library call in a closure and register it under a name that
/// `enabled_detectors` (and optionally `detector_weights`) refers to.
/// Decoders with no native confidence should report 1.0.
pub struct ExternalAdapter {
    name: String,
    detect_fn: Option<Box<DetectFn>>,
}

impl ExternalAdapter {
    pub fn new<F>(name: impl Into<String>, detect_fn: F) -> Self
    where
        F: Fn(&Frame) -> Result<Vec<RawDetection>, DetectorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            detect_fn: Some(Box::new(detect_fn)),
        }
    }

    /// Placeholder for a detector that failed to initialize (missing model
    /// weights, absent library). Every call reports `Unavailable`.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detect_fn: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.detect_fn.is_some()
    }
}

impl fmt::Debug for ExternalAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalAdapter")
            .field("name", &self.name)
            .field("available", &self.is_available())
            .finish()
    }
}

impl DetectorAdapter for ExternalAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        match &self.detect_fn {
            Some(detect_fn) => detect_fn(frame),
            None => Err(DetectorError::Unavailable(self.name.clone())),
        }
    }
}
