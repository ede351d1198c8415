use chunkcam_core::{Point3, EPSILON};
use nalgebra::{Rotation2, Vector2};
use std::f64::consts::FRAC_PI_2;

/// Quarter arc leaving the end of `path` along its last direction, turning
/// left over a circle of `radius` and rising by `height`. Excludes the
/// path's last point.
pub(super) fn arc(path: &[Point3], radius: f64, height: f64, segments: u32) -> Option<Vec<Point3>> {
    if radius <= EPSILON {
        return None;
    }
    let last = *path.last()?;
    let prev = path
        .iter()
        .rev()
        .find(|p| p.xy_distance_to(&last) > EPSILON)?;
    let direction = (last.xy() - prev.xy()).normalized()?;
    let normal = direction.perp();
    let center = last.xy() + normal * radius;
    let start = Vector2::new(-normal.x * radius, -normal.y * radius);
    let steps = (segments / 4).max(2) as usize;

    Some(
        (1..=steps)
            .map(|k| {
                let t = k as f64 / steps as f64;
                let v = Rotation2::new(FRAC_PI_2 * t) * start;
                Point3::new(center.x + v.x, center.y + v.y, last.z + height * t)
            })
            .collect(),
    )
}
