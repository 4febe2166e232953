//! Batch runs over real files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use qr_fusion::tools::dataset_iter;
use qr_fusion::{
    Analyzer, AnalyzerConfig, BatchReport, BatchRunner, BoundingBox, ExternalAdapter, Frame,
    FusionStrategy, ImageOutcome, RawDetection,
};

/// White image with a black square; the square is what the stub detector reports.
fn write_png(path: &Path, size: u32, square: u32) {
    let img = image::RgbImage::from_fn(size, size, |x, y| {
        if x >= 10 && y >= 10 && x < 10 + square && y < 10 + square {
            image::Rgb([0, 0, 0])
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    img.save(path).unwrap();
}

/// Reports the bounding box of all dark pixels, if any.
fn dark_box_analyzer() -> Analyzer {
    let mut cfg = AnalyzerConfig {
        enabled_detectors: vec!["dark".to_string()],
        ..AnalyzerConfig::default()
    };
    cfg.fusion.strategy = FusionStrategy::Weighted;

    let adapter = ExternalAdapter::new("dark", |frame: &Frame| {
        let gray = frame.gray();
        let (mut x0, mut y0, mut x1, mut y1) = (usize::MAX, usize::MAX, 0, 0);
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if gray[y * frame.width() + x] < 128 {
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x + 1);
                    y1 = y1.max(y + 1);
                }
            }
        }
        if x0 == usize::MAX {
            return Ok(Vec::new());
        }
        let bbox = BoundingBox::from_corners(x0 as i32, y0 as i32, x1 as i32, y1 as i32);
        Ok(vec![RawDetection::new(bbox, 1.0, "dark")])
    });
    Analyzer::with_adapters(cfg, vec![Box::new(adapter)]).unwrap()
}

fn dataset() -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("big.png"), 100, 50);
    write_png(&dir.path().join("small.png"), 100, 10);
    write_png(&dir.path().join("blank.png"), 100, 0);
    fs::write(dir.path().join("corrupt.png"), b"\x89PNG but not really").unwrap();
    let paths = dataset_iter(dir.path(), None).collect();
    (dir, paths)
}

#[test]
fn unreadable_image_becomes_error_marker() {
    let (_dir, paths) = dataset();
    assert_eq!(paths.len(), 4);

    let runner = BatchRunner::new(dark_box_analyzer(), Some(3)).unwrap();
    let report = runner.run(&paths);

    assert!(!report.cancelled);
    assert_eq!(report.results.len(), 4);
    assert_eq!(report.successes().count(), 3);
    assert_eq!(report.failures().count(), 1);

    let (failed_id, _) = report.failures().next().unwrap();
    assert!(failed_id.ends_with("corrupt.png"));

    let summary = &report.summary;
    assert_eq!(summary.images_processed, 3);
    assert_eq!(summary.images_failed, 1);
    // big and small each hold one square; blank holds none
    assert_eq!(summary.total_qr_codes, 2);
    assert!((summary.average_qr_per_image - 2.0 / 3.0).abs() < 1e-12);
    // 50×50 of 100×100 is 25%; 10×10 is exactly 1%
    assert_eq!(summary.area_distribution.larger, 1);
    assert_eq!(summary.area_distribution.smaller_or_equal, 1);
    assert_eq!(
        summary.contrast_distribution.distinct + summary.contrast_distribution.similar,
        2
    );
    let clarity = &summary.clarity_distribution;
    assert_eq!(
        clarity.clear + clarity.slight_blur + clarity.medium_blur + clarity.heavy_blur,
        2
    );
}

#[test]
fn blank_image_has_empty_record_list() {
    let (_dir, paths) = dataset();
    let runner = BatchRunner::new(dark_box_analyzer(), Some(1)).unwrap();
    let report = runner.run(&paths);

    let blank = report
        .results
        .iter()
        .find(|(id, _)| id.ends_with("blank.png"))
        .map(|(_, outcome)| outcome)
        .unwrap();
    assert_eq!(blank, &ImageOutcome::Records(Vec::new()));
}

#[test]
fn saved_report_round_trips() {
    let (dir, paths) = dataset();
    let runner = BatchRunner::new(dark_box_analyzer(), None).unwrap();
    let report = runner.run(&paths);

    let out = dir.path().join("report.json");
    report.save_json(&out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let corrupt_key = paths
        .iter()
        .find(|p| p.ends_with("corrupt.png"))
        .unwrap()
        .display()
        .to_string();
    assert!(value["results"][&corrupt_key]["error"].is_string());
    assert_eq!(value["summary"]["images_processed"], 3);

    let back: BatchReport = serde_json::from_str(&text).unwrap();
    assert_eq!(back.summary.total_qr_codes, report.summary.total_qr_codes);
    assert_eq!(back.summary.area_distribution, report.summary.area_distribution);
    assert_eq!(back.results.len(), 4);
}

#[test]
fn results_are_independent_of_worker_count() {
    let (_dir, paths) = dataset();
    let serial = BatchRunner::new(dark_box_analyzer(), Some(1)).unwrap().run(&paths);
    let parallel = BatchRunner::new(dark_box_analyzer(), Some(4)).unwrap().run(&paths);
    assert_eq!(serial, parallel);
}
