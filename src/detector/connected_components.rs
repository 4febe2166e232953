/// Connected components over a binarized image.
/// Finds foreground regions with their bounding boxes and pixel counts.
use std::collections::HashMap;

use crate::models::{BitMatrix, BoundingBox};

/// Union-Find data structure
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        // Path compression
        let mut node = x;
        while self.parent[node as usize] != root {
            let next = self.parent[node as usize];
            self.parent[node as usize] = root;
            node = next;
        }
        root
    }

    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            self.parent[root_x as usize] = root_y;
        }
    }
}

/// One 8-connected foreground region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    /// Number of foreground pixels in the region
    pub pixel_count: usize,
}

impl Region {
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x as i32,
            self.min_y as i32,
            self.width() as u32,
            self.height() as u32,
        )
    }
}

/// Find 8-connected foreground regions, ordered by first pixel in raster order.
pub fn find_regions(matrix: &BitMatrix) -> Vec<Region> {
    let width = matrix.width();
    let height = matrix.height();

    // Label 0 means background; labels start at 1
    let mut labels = vec![0u32; width * height];
    let mut next_label = 1u32;
    let mut uf = UnionFind::new(width * height + 1);

    // First pass: provisional labels
    for y in 0..height {
        for x in 0..width {
            if !matrix.get(x, y) {
                continue;
            }

            let mut neighbors = [0u32; 4];
            if x > 0 {
                neighbors[0] = labels[y * width + x - 1];
            }
            if y > 0 {
                neighbors[1] = labels[(y - 1) * width + x];
                if x > 0 {
                    neighbors[2] = labels[(y - 1) * width + x - 1];
                }
                if x + 1 < width {
                    neighbors[3] = labels[(y - 1) * width + x + 1];
                }
            }

            let idx = y * width + x;
            match neighbors.iter().copied().filter(|&l| l != 0).min() {
                None => {
                    labels[idx] = next_label;
                    next_label += 1;
                }
                Some(min_label) => {
                    labels[idx] = min_label;
                    for &l in &neighbors {
                        if l != 0 && l != min_label {
                            uf.union(min_label, l);
                        }
                    }
                }
            }
        }
    }

    // Second pass: resolve roots and accumulate extents
    let mut order: Vec<u32> = Vec::new();
    let mut regions: HashMap<u32, Region> = HashMap::new();

    for y in 0..height {
        for x in 0..width {
            let label = labels[y * width + x];
            if label == 0 {
                continue;
            }
            let root = uf.find(label);

            let entry = regions.entry(root).or_insert_with(|| {
                order.push(root);
                Region {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    pixel_count: 0,
                }
            });
            entry.min_x = entry.min_x.min(x);
            entry.min_y = entry.min_y.min(y);
            entry.max_x = entry.max_x.max(x);
            entry.max_y = entry.max_y.max(y);
            entry.pixel_count += 1;
        }
    }

    order.iter().filter_map(|root| regions.get(root).copied()).collect()
}
