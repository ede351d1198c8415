use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Planar coordinate (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Euclidean length when the point is used as a vector.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector, or `None` for a zero-length vector.
    pub fn normalized(&self) -> Option<Point2> {
        let len = self.length();
        if len <= f64::EPSILON {
            None
        } else {
            Some(Point2::new(self.x / len, self.y / len))
        }
    }

    /// Counter-clockwise perpendicular.
    pub fn perp(&self) -> Point2 {
        Point2::new(-self.y, self.x)
    }

    pub fn dot(&self, other: &Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(&self, other: &Point2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Rotates the vector counter-clockwise by `angle` radians.
    pub fn rotated(&self, angle: f64) -> Point2 {
        let (s, c) = angle.sin_cos();
        Point2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn with_z(&self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }

    /// Distance from this point to the segment `a`-`b`.
    pub fn distance_to_segment(&self, a: &Point2, b: &Point2) -> f64 {
        let ab = *b - *a;
        let len_sq = ab.dot(&ab);
        if len_sq <= f64::EPSILON {
            return self.distance_to(a);
        }
        let t = ((*self - *a).dot(&ab) / len_sq).clamp(0.0, 1.0);
        self.distance_to(&a.lerp(b, t))
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;

    fn mul(self, rhs: f64) -> Point2 {
        Point2::new(self.x * rhs, self.y * rhs)
    }
}

/// Spatial coordinate of a tool position (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn with_z(&self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }

    pub fn distance_to(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Planar distance, ignoring Z. Travel heuristics and ramp ratios use this.
    pub fn xy_distance_to(&self, other: &Point3) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        Point3::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    pub fn same_xy(&self, other: &Point3) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl From<(f64, f64, f64)> for Point3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Point3::new(x, y, z)
    }
}

/// Rotary axis angles (A, B, C) in degrees for multi-axis chunks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotationVector {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl RotationVector {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }
}

/// Axis-aligned planar bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub min: Point2,
    pub max: Point2,
}

impl Bounds2 {
    /// Bounding box of a point set; `None` when the set is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point2>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds2 {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        Some(bounds)
    }

    pub fn expanded(&self, margin: f64) -> Bounds2 {
        Bounds2 {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn intersects(&self, other: &Bounds2) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}
