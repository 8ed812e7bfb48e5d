//! Body extraction: turns the foreground mask into candidate body regions.
//!
//! Connected components over the mask (8-connectivity), a size filter, and
//! a two-peak split for blobs that plausibly hold two people walking close
//! together. On an 8x8 grid the flood fill and the split are a handful of
//! array scans, so everything is implemented directly.

use crate::config::BodyConfig;
use crate::constants::GRID_SIZE;
use crate::frame::{CellMask, Delta};
use nalgebra::Point2;

/// Inclusive bounding rectangle on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

/// One candidate body in the current frame.
///
/// The centroid is sub-cell: the temperature-weighted mean of the region's
/// cell coordinates, with `x` along the traversal axis (columns) and `y`
/// along the lateral axis (rows).
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub centroid: Point2<f32>,
    /// Mean temperature excess over the region's cells
    pub mean_temp: f32,
    /// Peak temperature excess over the region's cells
    pub peak_temp: f32,
    /// The region's cells as (row, col), row-major
    pub cells: Vec<(usize, usize)>,
}

impl Detection {
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Mask-to-detections extractor
#[derive(Debug)]
pub struct BodyExtractor {
    min_body_cells: usize,
    max_body_cells: usize,
    single_body_cells: usize,
    min_peak_separation: usize,
}

impl BodyExtractor {
    #[must_use]
    pub fn new(config: &BodyConfig) -> Self {
        Self {
            min_body_cells: config.min_body_cells,
            max_body_cells: config.max_body_cells,
            single_body_cells: config.single_body_cells,
            min_peak_separation: config.min_peak_separation,
        }
    }

    /// Extract the frame's detections from the refined mask and delta.
    ///
    /// Detections are returned in row-major order of their first cell and
    /// have pairwise disjoint cell sets.
    pub fn extract(&self, mask: &CellMask, delta: &Delta) -> Vec<Detection> {
        let mut detections = Vec::new();

        for component in connected_components(mask) {
            if component.len() < self.min_body_cells || component.len() > self.max_body_cells {
                continue;
            }

            if component.len() > self.single_body_cells || self.is_bimodal(&component, delta) {
                if let Some((first, second)) = self.split_component(&component, delta) {
                    detections.push(build_detection(first, delta));
                    detections.push(build_detection(second, delta));
                    continue;
                }
            }

            detections.push(build_detection(component, delta));
        }

        detections
    }

    /// Whether the component's delta surface has two distinct local maxima
    /// far enough apart to be two bodies.
    fn is_bimodal(&self, cells: &[(usize, usize)], delta: &Delta) -> bool {
        let peaks = local_maxima(cells, delta);
        for (i, &a) in peaks.iter().enumerate() {
            for &b in &peaks[i + 1..] {
                if chebyshev(a, b) >= self.min_peak_separation {
                    return true;
                }
            }
        }
        false
    }

    /// Partition the component between its two hottest sufficiently
    /// separated cells. Returns `None` when no second peak exists or a
    /// child would be smaller than a plausible body.
    fn split_component(
        &self,
        cells: &[(usize, usize)],
        delta: &Delta,
    ) -> Option<(Vec<(usize, usize)>, Vec<(usize, usize)>)> {
        let first = hottest(cells, delta)?;
        let second = hottest(
            &cells
                .iter()
                .copied()
                .filter(|&c| chebyshev(c, first) >= self.min_peak_separation)
                .collect::<Vec<_>>(),
            delta,
        )?;

        let mut first_cells = Vec::new();
        let mut second_cells = Vec::new();
        for &cell in cells {
            let to_first = euclidean_sq(cell, first);
            let to_second = euclidean_sq(cell, second);
            let nearer_first = if to_first == to_second {
                // Equidistant cells go to the hotter peak
                delta[first] >= delta[second]
            } else {
                to_first < to_second
            };
            if nearer_first {
                first_cells.push(cell);
            } else {
                second_cells.push(cell);
            }
        }

        if first_cells.len() < self.min_body_cells || second_cells.len() < self.min_body_cells {
            return None;
        }
        Some((first_cells, second_cells))
    }
}

/// Connected components of the mask under 8-connectivity, each in
/// row-major cell order, discovered in row-major order of their seeds.
fn connected_components(mask: &CellMask) -> Vec<Vec<(usize, usize)>> {
    let mut visited = [[false; GRID_SIZE]; GRID_SIZE];
    let mut components = Vec::new();

    for (seed_row, seed_col) in mask.iter() {
        if visited[seed_row][seed_col] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![(seed_row, seed_col)];
        visited[seed_row][seed_col] = true;
        while let Some((row, col)) = stack.pop() {
            component.push((row, col));
            for dr in -1_isize..=1 {
                for dc in -1_isize..=1 {
                    let (nr, nc) = (row as isize + dr, col as isize + dc);
                    if nr < 0 || nc < 0 || nr >= GRID_SIZE as isize || nc >= GRID_SIZE as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if mask.contains(nr, nc) && !visited[nr][nc] {
                        visited[nr][nc] = true;
                        stack.push((nr, nc));
                    }
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    components
}

/// Cells that are strict local maxima of delta within the component.
fn local_maxima(cells: &[(usize, usize)], delta: &Delta) -> Vec<(usize, usize)> {
    cells
        .iter()
        .copied()
        .filter(|&(row, col)| {
            cells.iter().all(|&(or, oc)| {
                let adjacent = (or, oc) != (row, col)
                    && or.abs_diff(row) <= 1
                    && oc.abs_diff(col) <= 1;
                !adjacent || delta[(or, oc)] < delta[(row, col)]
            })
        })
        .collect()
}

/// The hottest cell of the set; row-major first on ties. `None` if empty.
fn hottest(cells: &[(usize, usize)], delta: &Delta) -> Option<(usize, usize)> {
    cells
        .iter()
        .copied()
        .max_by(|&a, &b| delta[a].total_cmp(&delta[b]).then(b.cmp(&a)))
}

fn chebyshev(a: (usize, usize), b: (usize, usize)) -> usize {
    a.0.abs_diff(b.0).max(a.1.abs_diff(b.1))
}

fn euclidean_sq(a: (usize, usize), b: (usize, usize)) -> usize {
    let dr = a.0.abs_diff(b.0);
    let dc = a.1.abs_diff(b.1);
    dr * dr + dc * dc
}

/// Build a detection from a region's cells.
fn build_detection(cells: Vec<(usize, usize)>, delta: &Delta) -> Detection {
    let mut bbox = BoundingBox {
        min_row: GRID_SIZE,
        min_col: GRID_SIZE,
        max_row: 0,
        max_col: 0,
    };
    let mut weight_sum = 0.0_f32;
    let mut weighted = Point2::new(0.0_f32, 0.0);
    let mut mean = 0.0_f32;
    let mut peak = f32::NEG_INFINITY;

    for &(row, col) in &cells {
        bbox.min_row = bbox.min_row.min(row);
        bbox.min_col = bbox.min_col.min(col);
        bbox.max_row = bbox.max_row.max(row);
        bbox.max_col = bbox.max_col.max(col);

        let excess = delta[(row, col)];
        weight_sum += excess;
        weighted.x += excess * col as f32;
        weighted.y += excess * row as f32;
        mean += excess;
        peak = peak.max(excess);
    }
    let count = cells.len() as f32;
    mean /= count;

    let centroid = if weight_sum > 0.0 {
        Point2::new(weighted.x / weight_sum, weighted.y / weight_sum)
    } else {
        // Degenerate weights: fall back to the geometric centroid
        let sum = cells
            .iter()
            .fold((0.0_f32, 0.0_f32), |acc, &(row, col)| (acc.0 + col as f32, acc.1 + row as f32));
        Point2::new(sum.0 / count, sum.1 / count)
    };

    Detection {
        bbox,
        centroid,
        mean_temp: mean,
        peak_temp: peak,
        cells,
    }
}
