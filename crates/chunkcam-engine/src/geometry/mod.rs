//! Planar geometry consumed by the engine
//!
//! - [`Polygon2`] / [`Region`]: rings with holes and multi-polygons
//! - [`Footprint`]: swept disk used to validate entry and exit moves
//! - [`GeometryProvider`]: offset, boolean, containment and intersection
//! - [`ContourGeometry`]: the provider backed by `cavalier_contours` and `csgrs`

mod contour;
mod region;

pub use chunkcam_settings::JoinStyle;
pub use contour::ContourGeometry;
pub use region::{Footprint, Polygon2, Region};

pub(crate) use region::{point_in_ring, segment_distance, segment_intersection, signed_area};

use crate::error::Result;
use chunkcam_core::Point2;

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

/// Polygon engine the chunk engine relies on.
///
/// Calls may be slow on large inputs; they are the engine's only blocking
/// points apart from depth sampling.
pub trait GeometryProvider: Send + Sync {
    /// Offset every ring of `region`. Positive distances grow the region,
    /// negative distances shrink it. The result may be empty.
    fn offset(
        &self,
        region: &Region,
        distance: f64,
        join: JoinStyle,
        mitre_limit: f64,
    ) -> Result<Region>;

    fn boolean(&self, a: &Region, b: &Region, op: BooleanOp) -> Result<Region>;

    fn contains(&self, region: &Region, point: Point2) -> bool {
        region.contains(point)
    }

    /// Crossings of segment `a`-`b` with the region boundary, unordered.
    fn intersection(&self, region: &Region, a: Point2, b: Point2) -> Vec<Point2> {
        region.boundary_intersections(a, b)
    }
}
