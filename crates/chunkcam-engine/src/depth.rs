//! Depth and collision sampling
//!
//! A [`DepthProvider`] answers "how low may the cutter go here", a
//! [`SilhouetteProvider`] answers "does this swept footprint stay inside the
//! material". Both present a blocking contract to the engine.

use chunkcam_core::Point2;
use chunkcam_settings::HeightMapSpec;

use crate::geometry::{Footprint, Region};

/// Maximum safe cutter Z at a position.
///
/// `f64::NEG_INFINITY` means the position places no constraint on the cut
/// and the layer depth applies.
pub trait DepthProvider: Send + Sync {
    fn sample_depth(&self, x: f64, y: f64) -> f64;

    fn sample_depth_batch(&self, points: &[Point2]) -> Vec<f64> {
        points.iter().map(|p| self.sample_depth(p.x, p.y)).collect()
    }
}

/// Flat stock without a floor; every position may reach layer depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatStock;

impl DepthProvider for FlatStock {
    fn sample_depth(&self, _x: f64, _y: f64) -> f64 {
        f64::NEG_INFINITY
    }
}

/// Grid of floor heights sampled under a flat cutter.
///
/// Heights are stored row-major (`row * columns + column`), cell `(0, 0)`
/// centred on `origin`. Outside the grid there is no floor.
#[derive(Debug, Clone)]
pub struct HeightMap {
    origin: Point2,
    resolution: f64,
    columns: usize,
    rows: usize,
    heights: Vec<f64>,
    cutter_radius: f64,
}

impl HeightMap {
    pub fn new(spec: &HeightMapSpec, cutter_radius: f64) -> Self {
        debug_assert_eq!(spec.heights.len(), spec.columns * spec.rows);
        Self {
            origin: spec.origin,
            resolution: spec.resolution,
            columns: spec.columns,
            rows: spec.rows,
            heights: spec.heights.clone(),
            cutter_radius,
        }
    }

    /// Height of the cell containing `(x, y)`, if it lies on the grid.
    pub fn get_height(&self, x: f64, y: f64) -> Option<f64> {
        let px = ((x - self.origin.x) / self.resolution).round() as isize;
        let py = ((y - self.origin.y) / self.resolution).round() as isize;
        self.get_height_at_cell(px, py)
    }

    fn get_height_at_cell(&self, px: isize, py: isize) -> Option<f64> {
        if px < 0 || py < 0 || px >= self.columns as isize || py >= self.rows as isize {
            return None;
        }
        self.heights.get(py as usize * self.columns + px as usize).copied()
    }

    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

impl DepthProvider for HeightMap {
    fn sample_depth(&self, x: f64, y: f64) -> f64 {
        let reach = (self.cutter_radius / self.resolution).ceil() as isize;
        let cx = ((x - self.origin.x) / self.resolution).round() as isize;
        let cy = ((y - self.origin.y) / self.resolution).round() as isize;
        let r2 = self.cutter_radius * self.cutter_radius;
        let mut z = f64::NEG_INFINITY;
        for py in (cy - reach)..=(cy + reach) {
            for px in (cx - reach)..=(cx + reach) {
                let Some(h) = self.get_height_at_cell(px, py) else {
                    continue;
                };
                let dx = self.origin.x + px as f64 * self.resolution - x;
                let dy = self.origin.y + py as f64 * self.resolution - y;
                if dx * dx + dy * dy <= r2 {
                    z = z.max(h);
                }
            }
        }
        z
    }
}

/// Answers whether a swept footprint lies inside the material silhouette.
pub trait SilhouetteProvider: Send + Sync {
    fn silhouette_contains(&self, footprint: &Footprint) -> bool;
}

/// Accepts every footprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl SilhouetteProvider for Unbounded {
    fn silhouette_contains(&self, _footprint: &Footprint) -> bool {
        true
    }
}

/// Material silhouette given as a region.
///
/// A footprint is contained when its spine lies inside the region and keeps
/// at least the footprint radius from every boundary edge.
#[derive(Debug, Clone)]
pub struct RegionSilhouette {
    region: Region,
}

impl RegionSilhouette {
    pub fn new(region: Region) -> Self {
        Self { region }
    }
}

impl SilhouetteProvider for RegionSilhouette {
    fn silhouette_contains(&self, footprint: &Footprint) -> bool {
        if footprint.spine.is_empty() {
            return false;
        }
        if !footprint.spine.iter().all(|p| self.region.contains(*p)) {
            return false;
        }
        footprint
            .segments()
            .into_iter()
            .all(|(a, b)| self.region.segment_distance_to_boundary(a, b) >= footprint.radius)
    }
}
