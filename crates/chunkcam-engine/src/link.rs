//! Low linking
//!
//! Joins consecutive passes of one layer with a feed move at cutting depth
//! instead of a retract, when the gap between them is short and the link
//! stays inside the material silhouette.

use chunkcam_core::{Point2, Point3};
use chunkcam_settings::CuttingParameters;
use tracing::debug;

use crate::depth::{DepthProvider, SilhouetteProvider};
use crate::geometry::Footprint;
use crate::layers::ScheduledPass;

/// Straight link strictly between `from` and `to`, subdivided to
/// `max_segment` and raised to the sampled floor.
fn link_points(from: Point3, to: Point3, max_segment: f64, depth: &dyn DepthProvider) -> Vec<Point3> {
    let steps = if max_segment > 0.0 {
        (from.xy_distance_to(&to) / max_segment).ceil().max(1.0) as usize
    } else {
        1
    };
    let mut link: Vec<Point3> = (1..steps)
        .map(|k| from.lerp(&to, k as f64 / steps as f64))
        .collect();
    let xy: Vec<Point2> = link.iter().map(Point3::xy).collect();
    for (p, floor) in link.iter_mut().zip(depth.sample_depth_batch(&xy)) {
        p.z = p.z.max(floor);
    }
    link
}

/// Merges passes whose gap is below the merge distance. Returns the merged
/// passes and the number of links made.
///
/// Only neighbours on the same layer are joined; multi-axis passes are
/// never merged. A merged pass is open and lists every source chunk.
pub fn link_low(
    passes: Vec<ScheduledPass>,
    params: &CuttingParameters,
    depth: &dyn DepthProvider,
    silhouette: &dyn SilhouetteProvider,
) -> (Vec<ScheduledPass>, usize) {
    let merge_distance = params.effective_merge_distance();
    let mut out: Vec<ScheduledPass> = Vec::with_capacity(passes.len());
    let mut links = 0usize;

    for pass in passes {
        let Some(current) = out.last_mut() else {
            out.push(pass);
            continue;
        };
        let joinable = current.layer_index == pass.layer_index
            && !current.chunk.is_multi_axis()
            && !pass.chunk.is_multi_axis();
        let ends = current.chunk.last_point().zip(pass.chunk.first_point());
        let Some((from, to)) = ends.filter(|_| joinable) else {
            out.push(pass);
            continue;
        };
        let gap = from.xy_distance_to(&to);
        if gap >= merge_distance
            || !silhouette.silhouette_contains(&Footprint::capsule(
                from.xy(),
                to.xy(),
                params.cutter_radius,
            ))
        {
            out.push(pass);
            continue;
        }

        let link = link_points(from, to, params.max_segment_length, depth);
        current.chunk.append_linked(&link, &pass.chunk);
        current.sources.extend(pass.sources);
        links += 1;
    }

    debug!(
        "Low linking made {} links, {} passes remain (merge distance {:.4})",
        links,
        out.len(),
        merge_distance
    );
    (out, links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ChunkId};
    use crate::depth::{FlatStock, RegionSilhouette, Unbounded};
    use crate::geometry::{Polygon2, Region};
    use crate::layers::Layer;

    fn pass(id: usize, y: f64, layer_index: usize) -> ScheduledPass {
        ScheduledPass {
            chunk: Chunk::from_points(
                vec![Point3::new(0.0, y, -1.0), Point3::new(10.0, y, -1.0)],
                false,
            ),
            layer: Layer { start: 0.0, end: -1.0 },
            layer_index,
            sources: vec![ChunkId(id)],
        }
    }

    fn params() -> CuttingParameters {
        CuttingParameters {
            stay_low: true,
            merge_distance: Some(12.0),
            max_segment_length: 2.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_close_passes_merge() {
        let passes = vec![pass(0, 0.0, 0), pass(1, 1.0, 0)];
        let (out, links) = link_low(passes, &params(), &FlatStock, &Unbounded);
        assert_eq!(links, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sources, vec![ChunkId(0), ChunkId(1)]);
        let pts = out[0].chunk.points();
        // sqrt(101) mm back to the second line in five link segments
        assert_eq!(pts.len(), 2 + 4 + 2);
        assert!(pts.iter().all(|p| p.z == -1.0));
        assert!(!out[0].chunk.is_closed());
    }

    #[test]
    fn test_layers_are_not_merged() {
        let passes = vec![pass(0, 0.0, 0), pass(0, 0.0, 1)];
        let (out, links) = link_low(passes, &params(), &FlatStock, &Unbounded);
        assert_eq!(links, 0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_far_or_outside_links_rejected() {
        let mut p = params();
        p.merge_distance = Some(5.0);
        let (out, _) = link_low(vec![pass(0, 0.0, 0), pass(1, 1.0, 0)], &p, &FlatStock, &Unbounded);
        assert_eq!(out.len(), 2);

        let silhouette = RegionSilhouette::new(Region::new(vec![Polygon2::rectangle(
            -1.0, -1.0, 3.0, 3.0,
        )]));
        let (out, links) = link_low(
            vec![pass(0, 0.0, 0), pass(1, 1.0, 0)],
            &params(),
            &FlatStock,
            &silhouette,
        );
        assert_eq!(links, 0);
        assert_eq!(out.len(), 2);
    }
}
