//! Detector adapters
//!
//! Every detection mechanism, built-in or external, sits behind the
//! [`DetectorAdapter`] trait. The fusion engine only ever sees the pooled
//! [`RawDetection`] lists that a [`DetectorSet`] produces.
//!
//! Built-in adapters:
//! - `finder`: 1:1:3:1:1 finder-pattern scanning, three patterns per symbol
//! - `contour`: closed dark blobs that look like a code (square, busy, half dark)
//!
//! Payload decoders and learned models plug in through [`ExternalAdapter`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use log::{debug, warn};

use crate::error::{ConfigError, DetectorError};
use crate::models::{Frame, RawDetection};

/// Connected-component labelling used by the contour adapter
pub mod connected_components;
/// Contour/blob heuristic adapter
pub mod contour;
/// Closure-backed adapter for black-box detectors
pub mod external;
/// Finder-pattern adapter
pub mod finder;

pub use contour::ContourAdapter;
pub use external::ExternalAdapter;
pub use finder::FinderAdapter;

/// A single detection mechanism.
///
/// Adapters must be reentrant: the batch runner shares one instance across
/// worker threads. Adapters wrapping non-reentrant libraries serialize
/// internally.
pub trait DetectorAdapter: Send + Sync {
    /// Identifier stamped on every detection this adapter emits.
    fn name(&self) -> &str;

    /// Find candidate regions in a frame.
    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError>;
}

/// Construct a built-in adapter by name.
pub fn builtin(name: &str) -> Option<Box<dyn DetectorAdapter>> {
    match name {
        finder::NAME => Some(Box::new(FinderAdapter::default())),
        contour::NAME => Some(Box::new(ContourAdapter::default())),
        _ => None,
    }
}

/// Output of running every adapter on one frame.
#[derive(Debug, Default)]
pub struct DetectionPool {
    /// All candidates in registration order, then within-adapter order
    pub detections: Vec<RawDetection>,
    /// Adapters that failed on this frame
    pub failures: Vec<DetectorError>,
}

/// Ordered collection of enabled adapters.
#[derive(Default)]
pub struct DetectorSet {
    adapters: Vec<Box<dyn DetectorAdapter>>,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set for the enabled names, in the order given.
    ///
    /// `extra` adapters take precedence over built-ins of the same name;
    /// extra adapters whose name is not enabled are dropped.
    pub fn from_enabled(
        enabled: &[String],
        extra: Vec<Box<dyn DetectorAdapter>>,
    ) -> Result<Self, ConfigError> {
        if enabled.is_empty() {
            return Err(ConfigError::NoDetectors);
        }

        let mut extra: Vec<Option<Box<dyn DetectorAdapter>>> = extra.into_iter().map(Some).collect();
        let mut set = Self::new();
        for name in enabled {
            if set.names().any(|existing| existing == name) {
                continue;
            }
            let supplied = extra
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|a| a.name() == name))
                .and_then(Option::take);
            let adapter = match supplied {
                Some(adapter) => adapter,
                None => builtin(name).ok_or_else(|| ConfigError::UnknownDetector(name.clone()))?,
            };
            set.register(adapter);
        }
        Ok(set)
    }

    /// Append an adapter; registration order is pooling order.
    pub fn register(&mut self, adapter: Box<dyn DetectorAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Registered adapter names, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|adapter| adapter.name())
    }

    /// Run every adapter on the frame and pool their candidates.
    ///
    /// A failing or panicking adapter contributes nothing and is logged;
    /// the remaining adapters still run.
    pub fn run(&self, frame: &Frame) -> DetectionPool {
        let mut pool = DetectionPool::default();

        for adapter in &self.adapters {
            let name = adapter.name();
            let outcome = catch_unwind(AssertUnwindSafe(|| adapter.detect(frame)))
                .unwrap_or_else(|_| Err(DetectorError::Panicked(name.to_string())));

            match outcome {
                Ok(mut detections) => {
                    debug!("detector {} found {} candidates", name, detections.len());
                    for detection in &mut detections {
                        if detection.detector_id != name {
                            detection.detector_id = name.to_string();
                        }
                    }
                    pool.detections.extend(detections);
                }
                Err(err) => {
                    warn!("{}; continuing without it", err);
                    pool.failures.push(err);
                }
            }
        }

        pool
    }
}
