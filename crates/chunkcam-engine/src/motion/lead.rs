use chunkcam_core::{Point2, Point3, EPSILON};
use nalgebra::Vector2;
use std::f64::consts::FRAC_PI_2;

use crate::chunk::Chunk;
use crate::geometry::signed_area;

/// Moves the start of a closed chunk `offset` along the loop.
pub(super) fn move_start(chunk: &mut Chunk, offset: f64) {
    if offset <= 0.0 || !chunk.is_closed() {
        return;
    }
    let index = chunk.break_at_distance(offset);
    chunk.rotate_start(index);
}

/// Wraps a closed `ring` in a lead-in and lead-out sharing one circle of
/// `radius` tangent to the ring at its start.
///
/// The circle sits inside the loop when `inside` is set and outside
/// otherwise. The lead-in is a quarter turn ending on the start point, the
/// lead-out a quarter turn leaving it, and a straight move across the
/// diameter returns to the lead-in start so the result is closed again.
pub(super) fn attach(ring: &[Point3], radius: f64, inside: bool, segments: u32) -> Vec<Point3> {
    let Some(start) = ring.first().copied() else {
        return Vec::new();
    };
    let Some(next) = ring.iter().find(|p| p.xy_distance_to(&start) > EPSILON) else {
        return ring.to_vec();
    };
    let Some(tangent) = (next.xy() - start.xy()).normalized() else {
        return ring.to_vec();
    };

    let xy: Vec<Point2> = ring.iter().map(Point3::xy).collect();
    let left_is_inside = signed_area(&xy) > 0.0;
    let side = if inside == left_is_inside {
        tangent.perp()
    } else {
        tangent.perp() * -1.0
    };
    let center = start.xy() + side * radius;
    let u = Vector2::new(-side.x, -side.y) * radius;
    let w = Vector2::new(tangent.x, tangent.y) * radius;
    let at = |angle: f64| {
        let v = u * angle.cos() + w * angle.sin();
        Point3::new(center.x + v.x, center.y + v.y, start.z)
    };

    let steps = (segments / 4).max(2) as usize;
    let mut out = Vec::with_capacity(ring.len() + 2 * steps + 1);
    out.extend((0..steps).map(|k| at(-FRAC_PI_2 + FRAC_PI_2 * k as f64 / steps as f64)));
    let lead_in_start = out[0];
    out.extend_from_slice(ring);
    out.extend((1..=steps).map(|k| at(FRAC_PI_2 * k as f64 / steps as f64)));
    out.push(lead_in_start);
    out
}
