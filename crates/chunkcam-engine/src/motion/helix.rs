use chunkcam_core::{Point2, Point3, EPSILON};
use chunkcam_settings::{CuttingParameters, MovementType, SpindleDirection};
use nalgebra::{Rotation2, Vector2};
use std::f64::consts::TAU;

use super::length_2d;

/// Helical descent onto the first point of a path.
pub(super) struct Helix {
    pub center: Point2,
    pub radius: f64,
    /// From the top of the helix down to the path's first Z, ending on the
    /// circle; the path's first point follows.
    pub points: Vec<Point3>,
}

/// Clockwise when the cut direction and spindle rotation say so.
fn clockwise(params: &CuttingParameters) -> bool {
    matches!(
        (params.movement, params.spindle_direction),
        (MovementType::Conventional, SpindleDirection::Cw)
            | (MovementType::Climb, SpindleDirection::Ccw)
            | (MovementType::Meander, SpindleDirection::Ccw)
    )
}

/// Builds the helix for `path`, or `None` when there is nothing to descend
/// or no room for a circle.
///
/// The radius is `helix_diameter_ratio * cutter_radius`, capped by the
/// radius of a circle as long as the path.
pub(super) fn build(path: &[Point3], zstart: f64, params: &CuttingParameters) -> Option<Helix> {
    let first = *path.first()?;
    let drop = zstart - first.z;
    let available = length_2d(path) / TAU;
    let radius = (params.helix_diameter_ratio * params.cutter_radius).min(available);
    let slope = params.ramp_in_radians().tan();
    if drop <= EPSILON || radius <= EPSILON || slope <= 0.0 {
        return None;
    }

    let revolutions = drop / (TAU * radius * slope);
    let steps = (revolutions * params.circle_segments as f64).ceil().max(1.0) as usize;
    let direction = if clockwise(params) { -1.0 } else { 1.0 };
    let sweep = direction * TAU * revolutions;
    let center = first.xy();
    let start = Vector2::new(radius, 0.0);

    let points = (0..=steps)
        .map(|k| {
            let t = k as f64 / steps as f64;
            let v = Rotation2::new(sweep * t) * start;
            Point3::new(center.x + v.x, center.y + v.y, zstart - drop * t)
        })
        .collect();
    Some(Helix {
        center,
        radius,
        points,
    })
}
