/// Finder-pattern adapter: 1:1:3:1:1 run-length scanning plus triple grouping
use super::DetectorAdapter;
use crate::error::DetectorError;
use crate::models::{BitMatrix, BoundingBox, Frame, RawDetection};
use crate::utils::binarization::otsu_binarize;

/// Adapter name used in configuration and output
pub const NAME: &str = "finder";

/// Fixed confidence: the adapter has no native score
const DEFAULT_CONFIDENCE: f32 = 0.85;
/// Caps the O(n³) triple search on noisy frames
const DEFAULT_MAX_PATTERNS: usize = 60;
/// Half the finder pattern width, in modules
const FINDER_HALF_MODULES: f32 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    pub x: f32,
    pub y: f32,
    pub module_size: f32,
}

impl FinderPattern {
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self { x, y, module_size }
    }

    fn distance(&self, other: &FinderPattern) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Locates QR symbols by their three position markers.
#[derive(Debug, Clone)]
pub struct FinderAdapter {
    confidence: f32,
    max_patterns: usize,
}

impl Default for FinderAdapter {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            max_patterns: DEFAULT_MAX_PATTERNS,
        }
    }
}

impl FinderAdapter {
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Symbol boxes found in a binarized frame, clipped to its bounds
    pub fn locate(&self, binary: &BitMatrix) -> Vec<BoundingBox> {
        let mut patterns = scan_patterns(binary);
        if patterns.len() > self.max_patterns {
            // Keep the largest markers; small ones are mostly texture noise
            patterns.sort_by(|a, b| b.module_size.total_cmp(&a.module_size));
            patterns.truncate(self.max_patterns);
        }

        group_patterns(&patterns)
            .into_iter()
            .filter_map(|[a, b, c]| {
                symbol_box(&patterns[a], &patterns[b], &patterns[c], binary.width(), binary.height())
            })
            .collect()
    }
}

impl DetectorAdapter for FinderAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        let binary = otsu_binarize(frame.gray(), frame.width(), frame.height());
        Ok(self
            .locate(&binary)
            .into_iter()
            .map(|bbox| RawDetection::new(bbox, self.confidence, NAME).with_code_type("QRCODE"))
            .collect())
    }
}

/// Scan every row for dark-light-dark-light-dark runs in 1:1:3:1:1 ratio.
pub fn scan_patterns(matrix: &BitMatrix) -> Vec<FinderPattern> {
    let mut candidates = Vec::new();
    for y in 0..matrix.height() {
        if !has_significant_edges(matrix, y) {
            continue;
        }
        candidates.extend(scan_row(matrix, y));
    }
    merge_candidates(candidates)
}

/// Check if row has enough edge transitions to potentially contain patterns
fn has_significant_edges(matrix: &BitMatrix, y: usize) -> bool {
    // Sample every 4th pixel to check for edges quickly
    let mut transitions = 0;
    let sample_step = 4;
    let mut prev_color = matrix.get(0, y);

    for x in (sample_step..matrix.width()).step_by(sample_step) {
        let color = matrix.get(x, y);
        if color != prev_color {
            transitions += 1;
            prev_color = color;
            if transitions >= 3 {
                return true;
            }
        }
    }

    transitions >= 2
}

fn scan_row(matrix: &BitMatrix, y: usize) -> Vec<FinderPattern> {
    const MAX_PATTERNS_PER_ROW: usize = 5;

    let mut candidates = Vec::new();
    let mut run_lengths: Vec<usize> = Vec::new();
    let mut run_colors: Vec<bool> = Vec::new();
    let mut run_start = 0usize;
    let mut current_color = matrix.get(0, y);

    // One step past the edge closes a run touching the right border
    for x in 1..=matrix.width() {
        let color = if x < matrix.width() {
            matrix.get(x, y)
        } else {
            !current_color
        };
        if color == current_color {
            continue;
        }

        run_lengths.push(x - run_start);
        run_colors.push(current_color);
        run_start = x;
        current_color = color;

        if run_colors.len() < 5 {
            continue;
        }
        let end = run_colors.len();
        let colors = &run_colors[end - 5..end];
        let lengths = &run_lengths[end - 5..end];

        // Pattern should be: black-white-black-white-black
        if colors[0] && !colors[1] && colors[2] && !colors[3] && colors[4] && quick_ratio_check(lengths) {
            if let Some(pattern) = check_pattern(lengths, x, y) {
                candidates.push(pattern);
                if candidates.len() >= MAX_PATTERNS_PER_ROW {
                    break;
                }
            }
        }
    }

    candidates
}

/// Integer pre-check before the floating-point ratio test
fn quick_ratio_check(lengths: &[usize]) -> bool {
    let (b1, w1, b2, w2, b3) = (lengths[0], lengths[1], lengths[2], lengths[3], lengths[4]);
    let total = b1 + w1 + b2 + w2 + b3;

    // Minimum 7 modules at 3 pixels each
    if total < 21 {
        return false;
    }

    // Center black roughly 3x the outer blacks
    let outer_min = b1.min(b3);
    if b2 < outer_min * 2 || b2 > outer_min * 5 {
        return false;
    }

    let outer_avg = (b1 + b3 + w1 + w2) / 4;
    let w1_ok = w1 >= outer_avg / 2 && w1 <= outer_avg * 2;
    let w2_ok = w2 >= outer_avg / 2 && w2 <= outer_avg * 2;
    w1_ok && w2_ok
}

fn check_pattern(lengths: &[usize], end_x: usize, y: usize) -> Option<FinderPattern> {
    const TOL: f32 = 0.5;

    let total: usize = lengths.iter().sum();
    let unit = total as f32 / 7.0;
    let expected = [1.0, 1.0, 3.0, 1.0, 1.0];

    let fits = lengths
        .iter()
        .zip(expected)
        .all(|(&len, modules)| (len as f32 / unit - modules).abs() <= TOL);
    if !fits {
        return None;
    }

    let (b2, w2, b3) = (lengths[2], lengths[3], lengths[4]);
    let center_x = end_x as f32 - b3 as f32 - w2 as f32 - b2 as f32 / 2.0;
    Some(FinderPattern::new(center_x, y as f32, unit))
}

/// Collapse per-row hits of the same marker into one pattern.
fn merge_candidates(candidates: Vec<FinderPattern>) -> Vec<FinderPattern> {
    const MERGE_DIST: f32 = 5.0;

    let mut merged: Vec<FinderPattern> = Vec::new();
    for candidate in candidates {
        match merged
            .iter_mut()
            .find(|existing| existing.distance(&candidate) < MERGE_DIST)
        {
            Some(existing) => {
                *existing = FinderPattern::new(
                    (existing.x + candidate.x) / 2.0,
                    (existing.y + candidate.y) / 2.0,
                    (existing.module_size + candidate.module_size) / 2.0,
                );
            }
            None => merged.push(candidate),
        }
    }
    merged
}

/// Greedily pick disjoint triples that look like the three corners of one symbol.
fn group_patterns(patterns: &[FinderPattern]) -> Vec<[usize; 3]> {
    let mut groups = Vec::new();
    let mut used = vec![false; patterns.len()];
    let n = patterns.len();

    for i in 0..n {
        if used[i] {
            continue;
        }
        'search: for j in (i + 1)..n {
            if used[j] {
                continue;
            }
            for k in (j + 1)..n {
                if used[k] {
                    continue;
                }
                if is_plausible_triple(&patterns[i], &patterns[j], &patterns[k]) {
                    groups.push([i, j, k]);
                    used[i] = true;
                    used[j] = true;
                    used[k] = true;
                    break 'search;
                }
            }
        }
    }

    groups
}

fn is_plausible_triple(pi: &FinderPattern, pj: &FinderPattern, pk: &FinderPattern) -> bool {
    let sizes = [pi.module_size, pj.module_size, pk.module_size];
    let min_size = sizes.iter().copied().fold(f32::INFINITY, f32::min);
    let max_size = sizes.iter().copied().fold(0.0f32, f32::max);
    if min_size <= 0.0 || max_size / min_size > 1.5 {
        return false;
    }

    let d_ij = pi.distance(pj);
    let d_ik = pi.distance(pk);
    let d_jk = pj.distance(pk);
    let min_d = d_ij.min(d_ik).min(d_jk);
    let max_d = d_ij.max(d_ik).max(d_jk);

    let avg_module = (sizes[0] + sizes[1] + sizes[2]) / 3.0;
    if min_d < avg_module * 3.0 || max_d / min_d > 5.0 {
        return false;
    }

    // One corner must be close to a right angle
    let (a2, b2, c2) = (d_ij * d_ij, d_ik * d_ik, d_jk * d_jk);
    let cos_i = (a2 + b2 - c2) / (2.0 * d_ij * d_ik);
    let cos_j = (a2 + c2 - b2) / (2.0 * d_ij * d_jk);
    let cos_k = (b2 + c2 - a2) / (2.0 * d_ik * d_jk);
    cos_i.abs() < 0.3 || cos_j.abs() < 0.3 || cos_k.abs() < 0.3
}

/// Box around three marker centres, grown by half a marker and clipped.
fn symbol_box(
    a: &FinderPattern,
    b: &FinderPattern,
    c: &FinderPattern,
    width: usize,
    height: usize,
) -> Option<BoundingBox> {
    let pad = FINDER_HALF_MODULES * (a.module_size + b.module_size + c.module_size) / 3.0;
    let min_x = (a.x.min(b.x).min(c.x) - pad).max(0.0);
    let min_y = (a.y.min(b.y).min(c.y) - pad).max(0.0);
    let max_x = (a.x.max(b.x).max(c.x) + pad).min(width as f32);
    let max_y = (a.y.max(b.y).max(c.y) + pad).min(height as f32);
    if max_x <= min_x || max_y <= min_y {
        return None;
    }
    Some(BoundingBox::from_corners(
        min_x.round() as i32,
        min_y.round() as i32,
        max_x.round() as i32,
        max_y.round() as i32,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fusion::iou;

    /// Draw a 7×7-module position marker with its top-left corner at (x, y).
    pub(crate) fn draw_marker(frame: &mut Frame, x: usize, y: usize, module: usize) {
        let black = [0, 0, 0];
        let white = [255, 255, 255];
        frame.fill_rect(x, y, 7 * module, 7 * module, black);
        frame.fill_rect(x + module, y + module, 5 * module, 5 * module, white);
        frame.fill_rect(x + 2 * module, y + 2 * module, 3 * module, 3 * module, black);
    }

    /// 21-module symbol with only its position markers drawn.
    pub(crate) fn draw_symbol(frame: &mut Frame, x: usize, y: usize, module: usize) {
        draw_marker(frame, x, y, module);
        draw_marker(frame, x + 14 * module, y, module);
        draw_marker(frame, x, y + 14 * module, module);
    }

    #[test]
    fn test_simple_line_pattern() {
        let mut matrix = BitMatrix::new(25, 10);
        let y = 5;
        let unit = 3;
        let x_start = 2;

        // Black(3) - White(3) - Black(9) - White(3) - Black(3)
        for x in x_start..x_start + unit {
            matrix.set(x, y, true);
        }
        for x in x_start + 2 * unit..x_start + 5 * unit {
            matrix.set(x, y, true);
        }
        for x in x_start + 6 * unit..x_start + 7 * unit {
            matrix.set(x, y, true);
        }

        let patterns = scan_patterns(&matrix);
        let expected_center = x_start as f32 + 3.5 * unit as f32;
        assert!(
            patterns.iter().any(|p| (p.x - expected_center).abs() < 3.0),
            "Should find pattern near x={}, got centers: {:?}",
            expected_center,
            patterns.iter().map(|p| p.x).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_quick_ratio_check() {
        // Valid pattern: 3-3-9-3-3 (unit = 3)
        assert!(quick_ratio_check(&[3, 3, 9, 3, 3]));
        // Too small
        assert!(!quick_ratio_check(&[1, 1, 3, 1, 1]));
        // Bad ratios - center not 3x
        assert!(!quick_ratio_check(&[3, 3, 5, 3, 3]));
    }

    #[test]
    fn test_detects_synthetic_symbol() {
        let mut frame = Frame::filled(200, 200, [255, 255, 255]);
        draw_symbol(&mut frame, 50, 60, 4);

        let found = FinderAdapter::default().detect(&frame).unwrap();
        assert_eq!(found.len(), 1, "got {:?}", found);
        let truth = BoundingBox::new(50, 60, 84, 84);
        assert!(iou(&found[0].bbox, &truth) > 0.75, "box {:?}", found[0].bbox);
        assert_eq!(found[0].confidence, DEFAULT_CONFIDENCE);
        assert_eq!(found[0].detector_id, NAME);
        assert!(found[0].payload.is_none());
    }

    #[test]
    fn test_blank_frame_has_no_symbols() {
        let frame = Frame::filled(64, 64, [255, 255, 255]);
        assert!(FinderAdapter::default().detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_two_markers_are_not_a_symbol() {
        let mut frame = Frame::filled(200, 200, [255, 255, 255]);
        draw_marker(&mut frame, 20, 20, 4);
        draw_marker(&mut frame, 120, 20, 4);
        assert!(FinderAdapter::default().detect(&frame).unwrap().is_empty());
    }
}
