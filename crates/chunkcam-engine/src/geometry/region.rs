use chunkcam_core::{Bounds2, Point2, EPSILON};
use chunkcam_settings::PolygonSpec;

/// Signed area of a ring; positive for counter-clockwise rings.
pub(crate) fn signed_area(ring: &[Point2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..ring.len() {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % ring.len()];
        area += p1.x * p2.y - p2.x * p1.y;
    }
    area * 0.5
}

/// Even-odd point containment against an implicitly closed ring.
pub(crate) fn point_in_ring(ring: &[Point2], p: Point2) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Intersection of segment `a`-`b` with edge `c`-`d`.
///
/// The edge is half-open (`d` excluded) so a segment passing through a ring
/// vertex is reported once. Collinear overlaps are not reported.
pub(crate) fn segment_intersection(a: Point2, b: Point2, c: Point2, d: Point2) -> Option<Point2> {
    let r = b - a;
    let s = d - c;
    let denom = r.cross(&s);
    if denom.abs() <= EPSILON * r.length().max(1.0) * s.length().max(1.0) {
        return None;
    }
    let qp = c - a;
    let t = qp.cross(&s) / denom;
    let u = qp.cross(&r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..1.0).contains(&u) {
        Some(a + r * t)
    } else {
        None
    }
}

/// Shortest distance between segments `a`-`b` and `c`-`d`.
pub(crate) fn segment_distance(a: Point2, b: Point2, c: Point2, d: Point2) -> f64 {
    let r = b - a;
    let s = d - c;
    let denom = r.cross(&s);
    if denom.abs() > f64::EPSILON {
        let qp = c - a;
        let t = qp.cross(&s) / denom;
        let u = qp.cross(&r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            return 0.0;
        }
    }
    a.distance_to_segment(&c, &d)
        .min(b.distance_to_segment(&c, &d))
        .min(c.distance_to_segment(&a, &b))
        .min(d.distance_to_segment(&a, &b))
}

/// Drops repeated consecutive vertices and the closing duplicate.
fn normalize_ring(points: &[Point2]) -> Vec<Point2> {
    let mut ring: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        if ring.last().map_or(true, |last| last.distance_to(p) > EPSILON) {
            ring.push(*p);
        }
    }
    while ring.len() > 1 && ring[0].distance_to(&ring[ring.len() - 1]) <= EPSILON {
        ring.pop();
    }
    ring
}

fn ring_edges(ring: &[Point2]) -> impl Iterator<Item = (Point2, Point2)> + '_ {
    (0..ring.len()).map(move |i| (ring[i], ring[(i + 1) % ring.len()]))
}

/// A polygon with holes. Rings are stored open, without a repeated first point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon2 {
    pub exterior: Vec<Point2>,
    pub holes: Vec<Vec<Point2>>,
}

impl Polygon2 {
    pub fn new(exterior: &[Point2]) -> Self {
        Self {
            exterior: normalize_ring(exterior),
            holes: Vec::new(),
        }
    }

    pub fn with_holes(exterior: &[Point2], holes: &[Vec<Point2>]) -> Self {
        Self {
            exterior: normalize_ring(exterior),
            holes: holes
                .iter()
                .map(|h| normalize_ring(h))
                .filter(|h| h.len() >= 3)
                .collect(),
        }
    }

    /// Axis-aligned rectangle.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(&[
            Point2::new(x, y),
            Point2::new(x + width, y),
            Point2::new(x + width, y + height),
            Point2::new(x, y + height),
        ])
    }

    /// Regular polygon approximating a circle.
    pub fn circle(center: Point2, radius: f64, segments: u32) -> Self {
        let n = segments.max(4);
        let ring: Vec<Point2> = (0..n)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / n as f64;
                Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect();
        Self::new(&ring)
    }

    /// Exterior followed by the holes.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point2>> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    pub fn contains(&self, p: Point2) -> bool {
        point_in_ring(&self.exterior, p) && !self.holes.iter().any(|h| point_in_ring(h, p))
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.exterior).abs()
            - self.holes.iter().map(|h| signed_area(h).abs()).sum::<f64>()
    }

    pub fn bounds(&self) -> Option<Bounds2> {
        Bounds2::from_points(self.exterior.iter().copied())
    }

    pub fn is_degenerate(&self) -> bool {
        self.exterior.len() < 3
    }
}

impl From<&PolygonSpec> for Polygon2 {
    fn from(spec: &PolygonSpec) -> Self {
        Polygon2::with_holes(&spec.exterior, &spec.holes)
    }
}

/// A set of polygons treated as one area.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    pub polygons: Vec<Polygon2>,
}

impl Region {
    pub fn new(polygons: Vec<Polygon2>) -> Self {
        Self {
            polygons: polygons.into_iter().filter(|p| !p.is_degenerate()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: &[PolygonSpec]) -> Self {
        Self::new(specs.iter().map(Polygon2::from).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point2>> {
        self.polygons.iter().flat_map(|p| p.rings())
    }

    pub fn contains(&self, p: Point2) -> bool {
        self.polygons.iter().any(|poly| poly.contains(p))
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon2::area).sum()
    }

    pub fn bounds(&self) -> Option<Bounds2> {
        Bounds2::from_points(self.polygons.iter().flat_map(|p| p.exterior.iter().copied()))
    }

    /// Crossings of segment `a`-`b` with every ring, in ring order.
    pub fn boundary_intersections(&self, a: Point2, b: Point2) -> Vec<Point2> {
        let mut hits = Vec::new();
        for ring in self.rings() {
            for (c, d) in ring_edges(ring) {
                if let Some(p) = segment_intersection(a, b, c, d) {
                    hits.push(p);
                }
            }
        }
        hits
    }

    /// Shortest distance from segment `a`-`b` to the region boundary.
    pub fn segment_distance_to_boundary(&self, a: Point2, b: Point2) -> f64 {
        self.rings()
            .flat_map(|ring| ring_edges(ring))
            .map(|(c, d)| segment_distance(a, b, c, d))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Area swept by a disk of `radius` moving along `spine`.
///
/// A single spine point is a circle, two points a capsule.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub spine: Vec<Point2>,
    pub radius: f64,
}

impl Footprint {
    pub fn circle(center: Point2, radius: f64) -> Self {
        Self {
            spine: vec![center],
            radius,
        }
    }

    pub fn capsule(a: Point2, b: Point2, radius: f64) -> Self {
        Self {
            spine: vec![a, b],
            radius,
        }
    }

    pub fn swept(spine: Vec<Point2>, radius: f64) -> Self {
        Self { spine, radius }
    }

    /// Spine segments; a single point yields one zero-length segment.
    pub fn segments(&self) -> Vec<(Point2, Point2)> {
        match self.spine.len() {
            0 => Vec::new(),
            1 => vec![(self.spine[0], self.spine[0])],
            _ => self.spine.windows(2).map(|w| (w[0], w[1])).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point2> {
        Polygon2::rectangle(x, y, size, size).exterior
    }

    #[test]
    fn test_closing_duplicate_dropped() {
        let mut ring = square(0.0, 0.0, 10.0);
        ring.push(ring[0]);
        let poly = Polygon2::new(&ring);
        assert_eq!(poly.exterior.len(), 4);
        assert!((poly.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_contains_respects_holes() {
        let poly = Polygon2::with_holes(&square(0.0, 0.0, 10.0), &[square(4.0, 4.0, 2.0)]);
        assert!(poly.contains(Point2::new(1.0, 1.0)));
        assert!(!poly.contains(Point2::new(5.0, 5.0)));
        assert!(!poly.contains(Point2::new(11.0, 5.0)));
    }

    #[test]
    fn test_segment_through_vertex_counted_once() {
        let region = Region::new(vec![Polygon2::new(&square(0.0, 0.0, 10.0))]);
        let hits = region.boundary_intersections(Point2::new(-5.0, -5.0), Point2::new(5.0, 5.0));
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance_to(&Point2::new(0.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_segment_crossing_twice() {
        let region = Region::new(vec![Polygon2::new(&square(0.0, 0.0, 10.0))]);
        let hits = region.boundary_intersections(Point2::new(-5.0, 5.0), Point2::new(15.0, 5.0));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_segment_distance() {
        let d = segment_distance(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, 2.0),
            Point2::new(5.0, 7.0),
        );
        assert!((d - 2.0).abs() < 1e-12);
        let crossing = segment_distance(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, -2.0),
            Point2::new(5.0, 7.0),
        );
        assert_eq!(crossing, 0.0);
    }

    #[test]
    fn test_orientation_sign() {
        let mut ring = square(0.0, 0.0, 2.0);
        assert!(signed_area(&ring) > 0.0);
        ring.reverse();
        assert!(signed_area(&ring) < 0.0);
    }
}
