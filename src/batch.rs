//! Batch orchestration over many images.
//!
//! Images are independent, so they are analyzed on a fixed-size rayon pool
//! in any order; the only shared state is the report accumulator behind a
//! mutex. A failed image becomes an error marker and never affects its
//! siblings. Cancellation stops new images from starting; everything that
//! already finished stays in the report.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, ConfigError, ReportError};
use crate::models::{AnalysisRecord, ClarityClass, ContrastClass, Frame};
use crate::pipeline::Analyzer;
use crate::tools::load_frame;

/// Shared stop request, checked before each image starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result for one image: its records, or an error marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageOutcome {
    Records(Vec<AnalysisRecord>),
    Failed { error: String },
}

impl ImageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ImageOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaDistribution {
    pub larger: usize,
    pub smaller_or_equal: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClarityDistribution {
    pub clear: usize,
    pub slight_blur: usize,
    pub medium_blur: usize,
    pub heavy_blur: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContrastDistribution {
    pub distinct: usize,
    pub similar: usize,
}

/// Aggregate counts over successfully analyzed images only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub images_processed: usize,
    pub images_failed: usize,
    pub total_qr_codes: usize,
    pub average_qr_per_image: f64,
    pub area_distribution: AreaDistribution,
    pub clarity_distribution: ClarityDistribution,
    pub contrast_distribution: ContrastDistribution,
}

impl DistributionSummary {
    fn add_success(&mut self, records: &[AnalysisRecord]) {
        self.images_processed += 1;
        self.total_qr_codes += records.len();
        for record in records {
            if record.area_larger_than_5_percent {
                self.area_distribution.larger += 1;
            } else {
                self.area_distribution.smaller_or_equal += 1;
            }
            let clarity = &mut self.clarity_distribution;
            match record.clarity_class {
                ClarityClass::Clear => clarity.clear += 1,
                ClarityClass::SlightBlur => clarity.slight_blur += 1,
                ClarityClass::MediumBlur => clarity.medium_blur += 1,
                ClarityClass::HeavyBlur => clarity.heavy_blur += 1,
            }
            match record.color_contrast_class {
                ContrastClass::Distinct => self.contrast_distribution.distinct += 1,
                ContrastClass::Similar => self.contrast_distribution.similar += 1,
            }
        }
        self.average_qr_per_image = self.total_qr_codes as f64 / self.images_processed as f64;
    }

    fn add_failure(&mut self) {
        self.images_failed += 1;
    }
}

/// Per-image outcomes plus aggregate distributions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: BTreeMap<String, ImageOutcome>,
    pub summary: DistributionSummary,
    /// True when some images were never started because of cancellation
    pub cancelled: bool,
}

impl BatchReport {
    /// Record one image; an id already present is ignored.
    pub fn insert(&mut self, id: impl Into<String>, outcome: Result<Vec<AnalysisRecord>, String>) {
        let id = id.into();
        if self.results.contains_key(&id) {
            debug!("duplicate image id {} ignored", id);
            return;
        }
        let outcome = match outcome {
            Ok(records) => {
                self.summary.add_success(&records);
                ImageOutcome::Records(records)
            }
            Err(error) => {
                self.summary.add_failure();
                ImageOutcome::Failed { error }
            }
        };
        self.results.insert(id, outcome);
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &[AnalysisRecord])> {
        self.results.iter().filter_map(|(id, outcome)| match outcome {
            ImageOutcome::Records(records) => Some((id.as_str(), records.as_slice())),
            ImageOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|(id, outcome)| match outcome {
            ImageOutcome::Failed { error } => Some((id.as_str(), error.as_str())),
            ImageOutcome::Records(_) => None,
        })
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Runs an [`Analyzer`] over many images on a dedicated worker pool.
pub struct BatchRunner {
    analyzer: Analyzer,
    pool: rayon::ThreadPool,
    cancel: CancelFlag,
}

impl BatchRunner {
    /// `workers = None` uses the available parallelism.
    pub fn new(analyzer: Analyzer, workers: Option<usize>) -> Result<Self, ConfigError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("qrfusion-{}", i));
        match workers {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "workers",
                    reason: "must be at least 1".to_string(),
                });
            }
            Some(n) => builder = builder.num_threads(n),
            None => {}
        }
        Ok(Self {
            analyzer,
            pool: builder.build()?,
            cancel: CancelFlag::new(),
        })
    }

    /// Handle for stopping the batch from another thread (e.g. a signal handler).
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Analyze image files; the report is keyed by the path as given.
    pub fn run(&self, paths: &[PathBuf]) -> BatchReport {
        let ids: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        self.run_with_loader(&ids, |id| load_frame(id))
    }

    /// Analyze images obtained from `loader`, keyed by `ids`.
    pub fn run_with_loader<L>(&self, ids: &[String], loader: L) -> BatchReport
    where
        L: Fn(&str) -> Result<Frame, AnalysisError> + Sync,
    {
        let mut seen = HashSet::new();
        let ids: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();
        let total = ids.len();
        info!("analyzing {} images on {} workers", total, self.workers());

        let report = Mutex::new(BatchReport::default());
        let skipped = AtomicBool::new(false);
        let done = AtomicUsize::new(0);

        self.pool.install(|| {
            ids.par_iter().for_each(|&id| {
                if self.cancel.is_cancelled() {
                    skipped.store(true, Ordering::SeqCst);
                    return;
                }

                let outcome = self.analyze_one(id, &loader);
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("[{}/{}] {}", finished, total, id);

                let mut guard = match report.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.insert(id, outcome);
            });
        });

        let mut report = match report.into_inner() {
            Ok(report) => report,
            Err(poisoned) => poisoned.into_inner(),
        };
        report.cancelled = skipped.load(Ordering::SeqCst);
        if report.cancelled {
            warn!(
                "batch cancelled after {} of {} images",
                report.results.len(),
                total
            );
        }
        info!(
            "batch finished: {} processed, {} failed, {} codes",
            report.summary.images_processed,
            report.summary.images_failed,
            report.summary.total_qr_codes
        );
        report
    }

    fn analyze_one<L>(&self, id: &str, loader: &L) -> Result<Vec<AnalysisRecord>, String>
    where
        L: Fn(&str) -> Result<Frame, AnalysisError> + Sync,
    {
        let frame = loader(id).map_err(|err| {
            warn!("skipping {}: {}", id, err);
            err.to_string()
        })?;
        catch_unwind(AssertUnwindSafe(|| self.analyzer.analyze(&frame))).map_err(|_| {
            warn!("analysis of {} panicked", id);
            format!("analysis of {} panicked", id)
        })
    }
}
