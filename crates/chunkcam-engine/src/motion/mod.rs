//! Motion shaping
//!
//! Entry and exit transforms applied to one pass right before it is cut:
//! lead-in/out arcs, helix or ramped entry, ramped exit, and a tangential
//! retract. Closed passes stay closed; when extra motion is attached the
//! loop is re-closed with a lift to the pass top, a traverse and a descent
//! onto the entry point.

mod helix;
mod lead;
mod ramp;
mod retract;

use chunkcam_core::{Point3, EPSILON};
use chunkcam_settings::CuttingParameters;
use tracing::{debug, warn};

use crate::depth::SilhouetteProvider;
use crate::error::{EngineWarning, WarningKind};
use crate::geometry::Footprint;
use crate::layers::ScheduledPass;

pub use ramp::{contour_ramp, zig_zag_ramp};

/// Planar length of a point list.
pub(crate) fn length_2d(points: &[Point3]) -> f64 {
    points.windows(2).map(|w| w[0].xy_distance_to(&w[1])).sum()
}

/// Prefix of `points` up to planar distance `distance`, ending on an
/// interpolated point. The whole list when it is shorter.
pub(crate) fn cut_at(points: &[Point3], distance: f64) -> Vec<Point3> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut out = vec![*first];
    let mut traveled = 0.0;
    for w in points.windows(2) {
        let d = w[0].xy_distance_to(&w[1]);
        if traveled + d >= distance {
            let t = if d > 0.0 { (distance - traveled) / d } else { 1.0 };
            out.push(w[0].lerp(&w[1], t));
            return out;
        }
        traveled += d;
        out.push(w[1]);
    }
    out
}

/// Re-closes a loop whose ends drifted apart.
fn close_loop(path: &mut Vec<Point3>, top: f64) {
    let (Some(first), Some(last)) = (path.first().copied(), path.last().copied()) else {
        return;
    };
    if first == last {
        return;
    }
    let top = top.max(last.z).max(first.z);
    for p in [last.with_z(top), first.with_z(top), first] {
        if path.last() != Some(&p) {
            path.push(p);
        }
    }
}

/// Applies the configured entry and exit motion to scheduled passes.
pub struct MotionShaper<'a> {
    params: &'a CuttingParameters,
    silhouette: &'a dyn SilhouetteProvider,
}

impl<'a> MotionShaper<'a> {
    pub fn new(params: &'a CuttingParameters, silhouette: &'a dyn SilhouetteProvider) -> Self {
        Self { params, silhouette }
    }

    /// Shapes `pass` in place. Multi-axis passes are left as they are.
    pub fn shape(&self, pass: &mut ScheduledPass, warnings: &mut Vec<EngineWarning>) {
        let params = self.params;
        let chunk = &mut pass.chunk;
        if chunk.len() < 2 || chunk.is_multi_axis() {
            return;
        }
        let closed = chunk.is_closed();
        let (zstart, zend) = (pass.layer.start, pass.layer.end);

        let leads = closed && params.lead_radius > EPSILON;
        if leads {
            lead::move_start(chunk, params.lead_start_offset);
        }
        let base = if leads {
            lead::attach(
                chunk.points(),
                params.lead_radius,
                !chunk.parents.is_empty(),
                params.circle_segments,
            )
        } else {
            chunk.points().to_vec()
        };

        let mut path = None;
        if params.helix_enter && pass.layer_index == 0 && chunk.children.is_empty() {
            if let Some(helix) = helix::build(&base, zstart, params) {
                let footprint = Footprint::circle(helix.center, helix.radius + params.cutter_radius);
                if self.silhouette.silhouette_contains(&footprint) {
                    let mut points = helix.points;
                    points.extend_from_slice(&base);
                    path = Some(points);
                } else {
                    let source = pass.sources[0];
                    warn!(
                        "Helix entry of radius {:.4} leaves the material for chunk {}, ramping instead",
                        helix.radius, source
                    );
                    warnings.push(EngineWarning::new(
                        WarningKind::HelixDidNotFit,
                        Some(source),
                        format!(
                            "helix of radius {:.4} on layer {} replaced by a zig-zag ramp",
                            helix.radius, pass.layer_index
                        ),
                    ));
                    path = Some(zig_zag_ramp(&base, zstart, zend, params.ramp_in_radians()));
                }
            }
        }
        let mut path = match path {
            Some(path) => path,
            None if params.ramp && closed => {
                contour_ramp(&base, zstart, zend, params.ramp_in_radians())
            }
            None if params.ramp => zig_zag_ramp(&base, zstart, zend, params.ramp_in_radians()),
            None => base.clone(),
        };

        if params.ramp_out {
            let angle = params.ramp_out_radians();
            let exit = if closed {
                ramp::contour_exit(&base, zend, zstart, angle)
            } else {
                ramp::tail_exit(&path, zend, zstart, angle)
            };
            path.extend(exit);
        }

        if params.retract_tangential && chunk.parents.len() <= 1 {
            if let Some(arc) = retract::arc(
                &path,
                params.retract_radius,
                params.retract_height,
                params.circle_segments,
            ) {
                let spine = path
                    .last()
                    .map(Point3::xy)
                    .into_iter()
                    .chain(arc.iter().map(Point3::xy))
                    .collect();
                if self
                    .silhouette
                    .silhouette_contains(&Footprint::swept(spine, params.cutter_radius))
                {
                    path.extend(arc);
                } else {
                    debug!("Tangential retract omitted for chunk {}", pass.sources[0]);
                }
            }
        }

        if closed {
            close_loop(&mut path, zstart);
        }
        chunk.replace_points(path);
    }
}
