//! Image loading and dataset discovery for the CLI and batch runner

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use log::debug;

use crate::error::AnalysisError;
use crate::models::Frame;

/// Extensions picked up when scanning a dataset directory
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Longest-side cap from `QR_MAX_DIM`; unset, unparsable or 0 disables it.
pub fn max_dim_from_env() -> Option<u32> {
    env::var("QR_MAX_DIM")
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|&v| v > 0)
}

/// Decode an image file into a frame, honouring `QR_MAX_DIM`.
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<Frame, AnalysisError> {
    load_frame_with_max_dim(path, max_dim_from_env())
}

/// Decode an image file, downscaling so the longest side is at most `max_dim`.
pub fn load_frame_with_max_dim<P: AsRef<Path>>(
    path: P,
    max_dim: Option<u32>,
) -> Result<Frame, AnalysisError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| AnalysisError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let (orig_w, orig_h) = img.dimensions();
    let rgb = match max_dim {
        Some(max_dim) if orig_w.max(orig_h) > max_dim => {
            debug!(
                "downscaling {} from {}x{} to fit {}",
                path.display(),
                orig_w,
                orig_h,
                max_dim
            );
            img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
                .to_rgb8()
        }
        _ => img.to_rgb8(),
    };

    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(AnalysisError::EmptyImage(path.display().to_string()));
    }
    Ok(Frame::from_rgb_image(rgb))
}

/// Image files under `root` (recursively), sorted, optionally truncated.
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("skipping {}: {}", dir.display(), err);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_image(&path) {
                images.push(path);
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_dataset_iter_sorted_recursive_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_png(&dir.path().join("b.png"), 2, 2);
        write_png(&dir.path().join("nested").join("c.PNG"), 2, 2);
        write_png(&dir.path().join("a.png"), 2, 2);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let all: Vec<PathBuf> = dataset_iter(dir.path(), None).collect();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0] <= w[1]));

        let limited: Vec<PathBuf> = dataset_iter(dir.path(), Some(1)).collect();
        assert_eq!(limited, vec![dir.path().join("a.png")]);
    }

    #[test]
    fn test_load_frame_downscales() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        write_png(&path, 40, 20);

        let frame = load_frame_with_max_dim(&path, Some(10)).unwrap();
        assert_eq!((frame.width(), frame.height()), (10, 5));
        assert_eq!(frame.pixel(0, 0), [10, 20, 30]);

        let full = load_frame_with_max_dim(&path, None).unwrap();
        assert_eq!((full.width(), full.height()), (40, 20));
    }

    #[test]
    fn test_load_frame_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            load_frame_with_max_dim(&path, None),
            Err(AnalysisError::Load { .. })
        ));
    }
}
