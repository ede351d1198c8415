use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use chunkcam_core::{GeometryError, Point2};
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use tracing::debug;

use super::region::signed_area;
use super::{BooleanOp, GeometryProvider, JoinStyle, Polygon2, Region};
use crate::error::Result;

/// Geometry provider built on `cavalier_contours` offsets and `csgrs` booleans.
///
/// Offsets are computed per ring; arc joins produced by the offset are
/// flattened into `circle_segments` per full turn, replaced by a chord for
/// bevel joins or by the tangent intersection for mitre joins.
#[derive(Debug, Clone, Copy)]
pub struct ContourGeometry {
    circle_segments: u32,
}

impl ContourGeometry {
    pub fn new(circle_segments: u32) -> Self {
        Self {
            circle_segments: circle_segments.max(4),
        }
    }

    fn ring_polyline(ring: &[Point2]) -> Polyline<f64> {
        let mut vertices = ring.to_vec();
        // clockwise, so a negative offset shrinks the enclosed area
        if signed_area(&vertices) > 0.0 {
            vertices.reverse();
        }
        let mut polyline = Polyline::new();
        for p in vertices {
            polyline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
        }
        polyline.set_is_closed(true);
        polyline
    }

    fn flatten(&self, polyline: &Polyline<f64>, join: JoinStyle, mitre_limit: f64) -> Vec<Point2> {
        let vertices = &polyline.vertex_data;
        let n = vertices.len();
        let mut ring = Vec::with_capacity(n);
        for i in 0..n {
            let v = vertices[i];
            let p0 = Point2::new(v.x, v.y);
            ring.push(p0);
            if v.bulge.abs() <= 1e-12 || (i + 1 == n && !polyline.is_closed()) {
                continue;
            }
            let next = vertices[(i + 1) % n];
            self.flatten_join(p0, Point2::new(next.x, next.y), v.bulge, join, mitre_limit, &mut ring);
        }
        ring
    }

    /// Pushes the interior points that replace the arc `p0`-`p1` of `bulge`.
    fn flatten_join(
        &self,
        p0: Point2,
        p1: Point2,
        bulge: f64,
        join: JoinStyle,
        mitre_limit: f64,
        out: &mut Vec<Point2>,
    ) {
        let chord = p1 - p0;
        let length = chord.length();
        if length <= 1e-12 {
            return;
        }
        let sweep = 4.0 * bulge.atan();
        let half = sweep / 2.0;
        let radius = length / (2.0 * half.sin().abs());
        let left = chord.perp() * (1.0 / length);
        let center = p0.lerp(&p1, 0.5) + left * ((length / 2.0) / half.tan());
        let start = p0 - center;

        match join {
            JoinStyle::Bevel => {}
            JoinStyle::Mitre => {
                let ratio = 1.0 / half.cos();
                if half.abs() < std::f64::consts::FRAC_PI_2 && ratio <= mitre_limit {
                    if let Some(dir) = start.rotated(half).normalized() {
                        out.push(center + dir * (radius * ratio));
                    }
                }
            }
            JoinStyle::Round => {
                let steps = ((sweep.abs() / std::f64::consts::TAU) * self.circle_segments as f64)
                    .ceil()
                    .max(1.0) as usize;
                for k in 1..steps {
                    let angle = sweep * k as f64 / steps as f64;
                    out.push(center + start.rotated(angle));
                }
            }
        }
    }

    fn offset_ring(
        &self,
        ring: &[Point2],
        distance: f64,
        join: JoinStyle,
        mitre_limit: f64,
    ) -> Vec<Vec<Point2>> {
        Self::ring_polyline(ring)
            .parallel_offset(distance)
            .iter()
            .map(|pline| self.flatten(pline, join, mitre_limit))
            .filter(|r| r.len() >= 3)
            .collect()
    }

    fn to_sketch(region: &Region) -> Sketch<()> {
        let mut sketch: Sketch<()> = Sketch::new();
        for polygon in &region.polygons {
            let mut part = Sketch::polygon(&Self::coords(&polygon.exterior), None);
            for hole in &polygon.holes {
                part = part.difference(&Sketch::polygon(&Self::coords(hole), None));
            }
            sketch = sketch.union(&part);
        }
        sketch
    }

    fn union_rings(rings: &[Vec<Point2>]) -> Sketch<()> {
        let mut sketch: Sketch<()> = Sketch::new();
        for ring in rings {
            sketch = sketch.union(&Sketch::polygon(&Self::coords(ring), None));
        }
        sketch
    }

    fn coords(ring: &[Point2]) -> Vec<[f64; 2]> {
        ring.iter().map(|p| [p.x, p.y]).collect()
    }

    fn from_sketch(sketch: &Sketch<()>) -> Region {
        let multipolygon = sketch.to_multipolygon();
        let polygons = multipolygon
            .0
            .iter()
            .map(|poly| {
                let exterior: Vec<Point2> = poly
                    .exterior()
                    .0
                    .iter()
                    .map(|c| Point2::new(c.x, c.y))
                    .collect();
                let holes: Vec<Vec<Point2>> = poly
                    .interiors()
                    .iter()
                    .map(|ring| ring.0.iter().map(|c| Point2::new(c.x, c.y)).collect())
                    .collect();
                Polygon2::with_holes(&exterior, &holes)
            })
            .filter(|p| p.area() > 1e-12)
            .collect();
        Region::new(polygons)
    }

    fn validate(region: &Region) -> Result<()> {
        for ring in region.rings() {
            if ring.len() < 3 {
                return Err(GeometryError::DegenerateRing {
                    vertices: ring.len(),
                }
                .into());
            }
            if let Some(p) = ring.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(GeometryError::NonFinite { x: p.x, y: p.y }.into());
            }
        }
        Ok(())
    }
}

impl Default for ContourGeometry {
    fn default() -> Self {
        Self::new(32)
    }
}

impl GeometryProvider for ContourGeometry {
    fn offset(
        &self,
        region: &Region,
        distance: f64,
        join: JoinStyle,
        mitre_limit: f64,
    ) -> Result<Region> {
        Self::validate(region)?;
        if distance == 0.0 || region.is_empty() {
            return Ok(region.clone());
        }

        let mut result: Sketch<()> = Sketch::new();
        for polygon in &region.polygons {
            let exteriors = self.offset_ring(&polygon.exterior, distance, join, mitre_limit);
            if exteriors.is_empty() {
                continue;
            }
            let mut part = Self::union_rings(&exteriors);
            for hole in &polygon.holes {
                let grown = self.offset_ring(hole, -distance, join, mitre_limit);
                if !grown.is_empty() {
                    part = part.difference(&Self::union_rings(&grown));
                }
            }
            result = result.union(&part);
        }

        let region = Self::from_sketch(&result);
        debug!(
            "Offset by {:.4} produced {} polygons",
            distance,
            region.polygons.len()
        );
        Ok(region)
    }

    fn boolean(&self, a: &Region, b: &Region, op: BooleanOp) -> Result<Region> {
        Self::validate(a)?;
        Self::validate(b)?;
        let sketch_a = Self::to_sketch(a);
        let sketch_b = Self::to_sketch(b);
        let combined = match op {
            BooleanOp::Union => sketch_a.union(&sketch_b),
            BooleanOp::Difference => sketch_a.difference(&sketch_b),
            BooleanOp::Intersection => sketch_a.intersection(&sketch_b),
        };
        Ok(Self::from_sketch(&combined))
    }
}
