//! Hierarchy resolution
//!
//! Builds the parent/child relation that forces enclosed chunks to be cut
//! before the chunks around them. Only `parents`, `children` and the
//! derived `material` region change; point data is never touched.

use tracing::{debug, warn};

use crate::chunk::{ChunkArena, ChunkId};
use crate::error::{EngineWarning, Result, WarningKind};
use crate::geometry::{BooleanOp, GeometryProvider, Polygon2, Region};

/// Ring a chunk is tested against: its recorded outline, or for closed
/// chunks without one, the ring its points trace.
fn containment_outline(arena: &ChunkArena, id: ChunkId) -> Option<Polygon2> {
    let chunk = &arena[id];
    if let Some(outline) = &chunk.outline {
        return Some(outline.clone());
    }
    if chunk.is_closed() && chunk.len() >= 4 {
        let ring: Vec<_> = chunk.points().iter().map(|p| p.xy()).collect();
        let polygon = Polygon2::new(&ring);
        if !polygon.is_degenerate() {
            return Some(polygon);
        }
    }
    None
}

/// Polygon containment policy.
///
/// A chunk is a candidate parent of another when its outline contains the
/// other's first point. Of several candidates only the innermost is kept:
/// the one whose own candidate count is one less than the child's. Chunks
/// with candidates but no innermost one become top-level and are reported.
///
/// Existing edges are replaced, so resolving twice gives the same edges.
pub fn resolve_polygon(
    arena: &mut ChunkArena,
    geometry: &dyn GeometryProvider,
    warnings: &mut Vec<EngineWarning>,
) -> Result<()> {
    arena.clear_edges();

    let outlines: Vec<Option<Region>> = arena
        .ids()
        .map(|id| containment_outline(arena, id).map(|o| Region::new(vec![o])))
        .collect();
    let bounds: Vec<_> = outlines
        .iter()
        .map(|o| o.as_ref().and_then(Region::bounds))
        .collect();

    let mut candidates: Vec<Vec<ChunkId>> = vec![Vec::new(); arena.len()];
    for child in arena.ids() {
        let Some(first) = arena[child].first_point().map(|p| p.xy()) else {
            continue;
        };
        for parent in arena.ids() {
            if parent == child {
                continue;
            }
            let (Some(outline), Some(b)) = (&outlines[parent.0], &bounds[parent.0]) else {
                continue;
            };
            if b.contains(&first) && geometry.contains(outline, first) {
                candidates[child.0].push(parent);
            }
        }
    }

    for child in arena.ids() {
        let raw = &candidates[child.0];
        if raw.is_empty() {
            continue;
        }
        let innermost = raw
            .iter()
            .copied()
            .find(|parent| candidates[parent.0].len() + 1 == raw.len());
        match innermost {
            Some(parent) => arena.add_edge(parent, child),
            None => {
                warn!(
                    "Chunk {} has {} containing candidates but no innermost parent, treating it as top-level",
                    child,
                    raw.len()
                );
                warnings.push(EngineWarning::new(
                    WarningKind::AmbiguousParent,
                    Some(child),
                    format!("{} containing candidates, none innermost", raw.len()),
                ));
            }
        }
    }

    debug_assert!(!arena.has_cycle(), "polygon hierarchy produced a cycle");

    for id in arena.ids().collect::<Vec<_>>() {
        let Some(own) = outlines[id.0].clone() else {
            continue;
        };
        let children: Vec<Polygon2> = arena[id]
            .children
            .iter()
            .filter_map(|c| outlines[c.0].as_ref())
            .flat_map(|r| r.polygons.iter().cloned())
            .collect();
        let material = if children.is_empty() {
            own
        } else {
            geometry.boolean(&own, &Region::new(children), BooleanOp::Difference)?
        };
        arena[id].material = Some(material);
    }

    debug!(
        "Polygon hierarchy resolved {} chunks, {} edges",
        arena.len(),
        arena.iter().map(|(_, c)| c.children.len()).sum::<usize>()
    );
    Ok(())
}

/// Distance containment policy.
///
/// Every chunk of `parents` passing within `limit` of a chunk of `children`
/// becomes its parent. Edges are added with set semantics, so repeating a
/// call leaves the relation unchanged.
pub fn resolve_distance(
    arena: &mut ChunkArena,
    parents: &[ChunkId],
    children: &[ChunkId],
    limit: f64,
) {
    let mut added = 0usize;
    for &child in children {
        for &parent in parents {
            if parent == child || arena[child].parents.contains(&parent) {
                continue;
            }
            if arena[parent].xy_distance_within(&arena[child], limit) {
                arena.add_edge(parent, child);
                added += 1;
            }
        }
    }
    debug_assert!(!arena.has_cycle(), "distance hierarchy produced a cycle");
    debug!(
        "Distance hierarchy added {} edges between {} parents and {} children within {:.4}",
        added,
        parents.len(),
        children.len(),
        limit
    );
}
