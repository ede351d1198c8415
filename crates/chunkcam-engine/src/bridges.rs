//! Bridge (tab) insertion
//!
//! Raises the cut to the bridge height wherever a pass crosses a tab, so
//! the part stays attached to the stock, and collects the raised spans as a
//! separate tab curve.

use chunkcam_core::{Bounds2, Point2, Point3, EPSILON};
use std::f64::consts::PI;
use tracing::debug;

use crate::chunk::Chunk;
use crate::depth::DepthProvider;
use crate::error::Result;
use crate::geometry::{BooleanOp, GeometryProvider, Polygon2, Region};

/// Zones the tool must not cut below the bridge height.
#[derive(Debug, Clone)]
pub struct BridgeRegion {
    region: Region,
    bounds: Option<Bounds2>,
    height: f64,
}

impl BridgeRegion {
    /// Region with an absolute bridge Z.
    pub fn new(region: Region, height: f64) -> Self {
        let bounds = region.bounds();
        Self {
            region,
            bounds,
            height,
        }
    }

    /// Absolute bridge Z for a tab `bridge_height` tall standing on the end
    /// depth, never above the start depth.
    pub fn absolute_height(start_depth: f64, end_depth: f64, bridge_height: f64) -> f64 {
        start_depth.min(end_depth + bridge_height.abs())
    }

    /// Buffers tab polylines to capsules `width` wide and unions them with
    /// any explicit tab polygons.
    pub fn from_tabs(
        tabs: &[Vec<Point2>],
        polygons: &[Polygon2],
        width: f64,
        height: f64,
        circle_segments: u32,
        geometry: &dyn GeometryProvider,
    ) -> Result<Self> {
        let radius = width / 2.0;
        let mut region = Region::new(polygons.to_vec());
        for tab in tabs {
            let pieces: Vec<Polygon2> = match tab.len() {
                0 => continue,
                1 => vec![Polygon2::circle(tab[0], radius, circle_segments)],
                _ => tab
                    .windows(2)
                    .map(|w| capsule(w[0], w[1], radius, circle_segments))
                    .collect(),
            };
            for piece in pieces {
                region = geometry.boolean(&region, &Region::new(vec![piece]), BooleanOp::Union)?;
            }
        }
        debug!(
            "Bridge region built from {} tabs: {} polygons at Z {:.4}",
            tabs.len(),
            region.polygons.len(),
            height
        );
        Ok(Self::new(region, height))
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    fn may_touch(&self, chunk: &Chunk) -> bool {
        match (self.bounds, chunk.bounds_2d()) {
            (Some(region), Some(path)) => region.intersects(&path),
            _ => false,
        }
    }
}

/// Stadium around segment `a`-`b`.
fn capsule(a: Point2, b: Point2, radius: f64, circle_segments: u32) -> Polygon2 {
    let Some(dir) = (b - a).normalized() else {
        return Polygon2::circle(a, radius, circle_segments);
    };
    let normal = dir.perp();
    let base = normal.y.atan2(normal.x);
    let steps = (circle_segments / 2).max(2);
    let mut ring = Vec::with_capacity(2 * steps as usize + 2);
    for (center, offset) in [(b, 0.0), (a, PI)] {
        for k in 0..=steps {
            let angle = base + offset - PI * k as f64 / steps as f64;
            ring.push(Point2::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            ));
        }
    }
    Polygon2::new(&ring)
}

/// Rewrites `chunk` so it never cuts below the bridge height inside the
/// bridge region. Returns the number of inserted points.
///
/// Segments that start and end at or above the bridge height pass through
/// untouched. Crossing points get the interpolated pass Z, raised to the
/// sampled floor, paired with a point at the bridge height; the pair order
/// makes the tool climb when entering and drop when leaving.
///
/// Whether a stretch of a segment lies inside the region is decided at its
/// midpoint, so crossings at a pass vertex and grazing touches of a tab
/// corner are counted once or not at all.
pub fn insert_bridges(
    chunk: &mut Chunk,
    bridges: &BridgeRegion,
    geometry: &dyn GeometryProvider,
    depth: &dyn DepthProvider,
) -> usize {
    let height = bridges.height;
    let n = chunk.len();
    if n == 0 || !bridges.may_touch(chunk) || chunk.points().iter().all(|p| p.z >= height) {
        return 0;
    }
    let points = chunk.points().to_vec();
    let region = &bridges.region;

    let mut entries: Vec<(Point3, usize)> = Vec::with_capacity(n + 8);
    let mut crossings: Vec<(usize, usize)> = Vec::new();
    // Inside state at the end of the previous segment; None after a run
    // above the bridge height.
    let mut carried: Option<bool> = None;

    for i in 0..n {
        let p1 = points[i];
        let p2 = points[(i + 1).min(n - 1)];
        if p1.z >= height && p2.z >= height {
            entries.push((p1, i));
            carried = None;
            continue;
        }

        let origin = p1.xy();
        let span = p1.xy_distance_to(&p2);
        // Hits at either end belong to the vertex, not the segment.
        let mut hits: Vec<(f64, Point2)> = geometry
            .intersection(region, origin, p2.xy())
            .into_iter()
            .map(|hit| (hit.distance_to(&origin), hit))
            .filter(|(d, _)| *d > EPSILON && *d < span - EPSILON)
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.dedup_by(|later, earlier| later.0 - earlier.0 <= EPSILON);

        let mut inside = if span <= EPSILON {
            carried.unwrap_or_else(|| geometry.contains(region, origin))
        } else {
            let first = hits.first().map_or(span, |h| h.0);
            geometry.contains(region, origin.lerp(&p2.xy(), first / 2.0 / span))
        };

        match carried {
            Some(was_inside) if was_inside != inside => {
                push_crossing(&mut entries, &mut crossings, p1, height, inside, i);
            }
            _ if inside => entries.push((p1.with_z(p1.z.max(height)), i)),
            _ => entries.push((p1, i)),
        }

        for (k, &(d, hit)) in hits.iter().enumerate() {
            let next = hits.get(k + 1).map_or(span, |h| h.0);
            let after = geometry.contains(region, origin.lerp(&p2.xy(), (d + next) / 2.0 / span));
            if after == inside {
                continue;
            }
            let collision_z = p1.z + (p2.z - p1.z) * d / span;
            push_crossing(
                &mut entries,
                &mut crossings,
                hit.with_z(collision_z),
                height,
                after,
                i,
            );
            inside = after;
        }
        carried = Some(inside);
    }

    if !crossings.is_empty() {
        let xy: Vec<Point2> = crossings.iter().map(|(low, _)| entries[*low].0.xy()).collect();
        let floors = depth.sample_depth_batch(&xy);
        for ((low, high), floor) in crossings.iter().zip(floors) {
            let z = entries[*low].0.z.max(floor);
            entries[*low].0.z = z;
            entries[*high].0.z = z.max(height);
        }
    }

    let inserted = entries.len() - n;
    chunk.rebuild(entries);
    inserted
}

/// Appends a low/high pair at `at`, ordered so the tool climbs when
/// `entering` and drops otherwise, and records it as (low, high).
fn push_crossing(
    entries: &mut Vec<(Point3, usize)>,
    crossings: &mut Vec<(usize, usize)>,
    at: Point3,
    height: f64,
    entering: bool,
    source: usize,
) {
    let high = at.with_z(at.z.max(height));
    if entering {
        entries.push((at, source));
        entries.push((high, source));
        crossings.push((entries.len() - 2, entries.len() - 1));
    } else {
        entries.push((high, source));
        entries.push((at, source));
        crossings.push((entries.len() - 1, entries.len() - 2));
    }
}

/// Runs of consecutive points sitting exactly at `height`, with segments
/// longer than `max_segment` subdivided.
pub fn extract_tab_curve<'a>(
    chunks: impl IntoIterator<Item = &'a Chunk>,
    height: f64,
    max_segment: f64,
) -> Vec<Vec<Point3>> {
    let mut runs = Vec::new();
    for chunk in chunks {
        let mut run: Vec<Point3> = Vec::new();
        for p in chunk.points() {
            if p.z == height {
                if let Some(prev) = run.last().copied() {
                    let steps = if max_segment > 0.0 {
                        (prev.distance_to(p) / max_segment).ceil() as usize
                    } else {
                        1
                    };
                    for k in 1..steps {
                        run.push(prev.lerp(p, k as f64 / steps as f64));
                    }
                }
                run.push(*p);
            } else if !run.is_empty() {
                runs.push(std::mem::take(&mut run));
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::FlatStock;
    use crate::geometry::ContourGeometry;

    fn tab_region() -> BridgeRegion {
        BridgeRegion::new(Region::new(vec![Polygon2::rectangle(4.0, -1.0, 2.0, 2.0)]), -2.0)
    }

    fn assert_near(a: Point3, b: Point3) {
        assert!(a.distance_to(&b) < 1e-9, "{a:?} != {b:?}");
    }

    fn line(z: f64) -> Chunk {
        Chunk::from_points(
            vec![Point3::new(0.0, 0.0, z), Point3::new(10.0, 0.0, z)],
            false,
        )
    }

    #[test]
    fn test_absolute_height() {
        assert_eq!(BridgeRegion::absolute_height(0.0, -5.0, 1.0), -4.0);
        assert_eq!(BridgeRegion::absolute_height(0.0, -5.0, 9.0), 0.0);
    }

    #[test]
    fn test_line_through_tab_lifts() {
        let mut chunk = line(-5.0);
        let inserted = insert_bridges(
            &mut chunk,
            &tab_region(),
            &ContourGeometry::default(),
            &FlatStock,
        );
        assert_eq!(inserted, 4);
        let pts = chunk.points();
        assert_near(pts[1], Point3::new(4.0, 0.0, -5.0));
        assert_near(pts[2], Point3::new(4.0, 0.0, -2.0));
        assert_near(pts[3], Point3::new(6.0, 0.0, -2.0));
        assert_near(pts[4], Point3::new(6.0, 0.0, -5.0));
    }

    #[test]
    fn test_start_inside_is_raised() {
        let mut chunk = Chunk::from_points(
            vec![Point3::new(5.0, 0.0, -5.0), Point3::new(10.0, 0.0, -5.0)],
            false,
        );
        let inserted = insert_bridges(
            &mut chunk,
            &tab_region(),
            &ContourGeometry::default(),
            &FlatStock,
        );
        assert_eq!(inserted, 2);
        let pts = chunk.points();
        assert_eq!(pts[0].z, -2.0);
        assert_near(pts[1], Point3::new(6.0, 0.0, -2.0));
        assert_near(pts[2], Point3::new(6.0, 0.0, -5.0));
    }

    #[test]
    fn test_vertex_on_tab_edge_crosses_once() {
        let mut chunk = Chunk::from_points(
            vec![
                Point3::new(0.0, 0.0, -5.0),
                Point3::new(4.0, 0.0, -5.0),
                Point3::new(10.0, 0.0, -5.0),
            ],
            false,
        );
        let inserted = insert_bridges(
            &mut chunk,
            &tab_region(),
            &ContourGeometry::default(),
            &FlatStock,
        );
        assert_eq!(inserted, 3);
        let pts = chunk.points();
        assert_eq!(pts.len(), 6);
        assert_near(pts[1], Point3::new(4.0, 0.0, -5.0));
        assert_near(pts[2], Point3::new(4.0, 0.0, -2.0));
        assert_near(pts[3], Point3::new(6.0, 0.0, -2.0));
        assert_near(pts[4], Point3::new(6.0, 0.0, -5.0));
        assert_near(pts[5], Point3::new(10.0, 0.0, -5.0));
        for w in pts.windows(2) {
            let mid = w[0].lerp(&w[1], 0.5);
            if mid.x > 4.0 && mid.x < 6.0 {
                assert!(mid.z >= -2.0, "cuts through tab: {:?} -> {:?}", w[0], w[1]);
            }
        }
    }

    #[test]
    fn test_refined_line_stays_on_tab() {
        let mut chunk = line(-5.0);
        chunk.refine(1.0);
        insert_bridges(
            &mut chunk,
            &tab_region(),
            &ContourGeometry::default(),
            &FlatStock,
        );
        let pts = chunk.points();
        for w in pts.windows(2) {
            let mid = w[0].lerp(&w[1], 0.5);
            if mid.x > 4.0 && mid.x < 6.0 {
                assert!(mid.z >= -2.0, "cuts through tab: {:?} -> {:?}", w[0], w[1]);
            }
        }
        for p in pts {
            if p.x < 4.0 - 1e-9 || p.x > 6.0 + 1e-9 {
                assert_eq!(p.z, -5.0);
            }
        }
        assert_near(*pts.last().unwrap(), Point3::new(10.0, 0.0, -5.0));
    }

    #[test]
    fn test_grazing_tab_corner_is_not_a_crossing() {
        // Touches the corner (6, 1) without entering
        let mut chunk = Chunk::from_points(
            vec![Point3::new(5.0, 2.0, -5.0), Point3::new(7.0, 0.0, -5.0)],
            false,
        );
        let inserted = insert_bridges(
            &mut chunk,
            &tab_region(),
            &ContourGeometry::default(),
            &FlatStock,
        );
        assert_eq!(inserted, 0);
        assert!(chunk.points().iter().all(|p| p.z == -5.0));
    }

    #[test]
    fn test_above_bridge_unchanged() {
        let mut chunk = line(-1.0);
        let before = chunk.points().to_vec();
        let inserted = insert_bridges(
            &mut chunk,
            &tab_region(),
            &ContourGeometry::default(),
            &FlatStock,
        );
        assert_eq!(inserted, 0);
        assert_eq!(chunk.points(), before.as_slice());
    }

    #[test]
    fn test_tab_curve_runs() {
        let mut chunk = line(-5.0);
        insert_bridges(
            &mut chunk,
            &tab_region(),
            &ContourGeometry::default(),
            &FlatStock,
        );
        let curve = extract_tab_curve([&chunk], -2.0, 0.5);
        assert_eq!(curve.len(), 1);
        assert_near(curve[0][0], Point3::new(4.0, 0.0, -2.0));
        assert_near(curve[0][4], Point3::new(6.0, 0.0, -2.0));
        assert_eq!(curve[0].len(), 5);
    }

    #[test]
    fn test_tabs_buffer_to_capsules() {
        let bridges = BridgeRegion::from_tabs(
            &[vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)]],
            &[],
            2.0,
            -2.0,
            64,
            &ContourGeometry::default(),
        )
        .unwrap();
        let area = bridges.region().area();
        // 10 x 2 body plus a unit disk
        assert!((area - (20.0 + PI)).abs() < 0.05);
        assert!(bridges.region().contains(Point2::new(5.0, 0.9)));
        assert!(!bridges.region().contains(Point2::new(5.0, 1.1)));
    }
}
