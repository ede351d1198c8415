//! Chunk construction from planar geometry
//!
//! Turns regions into closed chunks: profile contours offset by the cutter
//! radius, or pocket rings produced by successive inward offsetting. Also
//! prepares everything the pipeline needs for a [`JobConfig`].

use chunkcam_settings::{CutSide, CuttingParameters, HierarchyPolicy, JobConfig, PocketDirection, Strategy};
use tracing::{debug, info};

use crate::bridges::BridgeRegion;
use crate::chunk::{Chunk, ChunkArena, ChunkId};
use crate::depth::{DepthProvider, FlatStock, HeightMap, RegionSilhouette, SilhouetteProvider, Unbounded};
use crate::error::{EngineError, Result};
use crate::geometry::{GeometryProvider, Region};
use crate::pipeline::{EngineRequest, HierarchyPlan};

/// Upper bound on pocket offset levels, guarding against offsets that never
/// empty the region.
const MAX_POCKET_LEVELS: usize = 10_000;

/// One closed chunk per ring (exteriors and holes) of `region`, at `z`.
pub fn chunks_from_region(arena: &mut ChunkArena, region: &Region, z: f64) -> Vec<ChunkId> {
    region
        .rings()
        .map(|ring| arena.push(Chunk::from_ring(ring, z)))
        .collect()
}

/// Tool-centre region for profiling `region` on `side`.
pub fn profile_region(
    region: &Region,
    side: CutSide,
    params: &CuttingParameters,
    geometry: &dyn GeometryProvider,
) -> Result<Region> {
    let distance = match side {
        CutSide::Outside => params.cutter_radius,
        CutSide::Inside => -params.cutter_radius,
        CutSide::On => return Ok(region.clone()),
    };
    geometry.offset(region, distance, params.join_style, params.mitre_limit)
}

/// Pocket rings of `region`, outermost level first.
///
/// Level `k` is `region` shrunk by `cutter_radius + k * distance_between_paths`;
/// offsetting stops at the first empty level.
pub fn offset_rings(
    arena: &mut ChunkArena,
    region: &Region,
    params: &CuttingParameters,
    geometry: &dyn GeometryProvider,
    z: f64,
) -> Result<Vec<Vec<ChunkId>>> {
    if !(params.distance_between_paths > 0.0) {
        return Err(EngineError::invalid_parameter(
            "distance_between_paths",
            "must be > 0 for pocketing",
        ));
    }
    let mut levels = Vec::new();
    for k in 0..MAX_POCKET_LEVELS {
        let distance = params.cutter_radius + k as f64 * params.distance_between_paths;
        let level = geometry.offset(region, -distance, params.join_style, params.mitre_limit)?;
        if level.is_empty() {
            break;
        }
        levels.push(chunks_from_region(arena, &level, z));
    }
    debug!(
        "Pocket offsetting produced {} levels, {} rings",
        levels.len(),
        levels.iter().map(Vec::len).sum::<usize>()
    );
    Ok(levels)
}

/// Parent and child sets linking consecutive pocket levels.
///
/// Inside-out cuts the innermost ring first, so inner levels are children
/// of the level around them; outside-in reverses the relation.
pub fn level_pairs(levels: &[Vec<ChunkId>], direction: PocketDirection) -> Vec<(Vec<ChunkId>, Vec<ChunkId>)> {
    levels
        .windows(2)
        .map(|w| match direction {
            PocketDirection::InsideOut => (w[0].clone(), w[1].clone()),
            PocketDirection::OutsideIn => (w[1].clone(), w[0].clone()),
        })
        .collect()
}

/// Everything needed to run the engine on one job.
pub struct JobPlan {
    pub arena: ChunkArena,
    pub request: EngineRequest,
    pub depth: Box<dyn DepthProvider>,
    pub silhouette: Box<dyn SilhouetteProvider>,
}

/// Builds chunks, hierarchy plan, bridges and samplers for `job`.
///
/// Profiles use polygon containment; a distance policy on a profile leaves
/// the chunks unrelated. Pockets default to distance containment between
/// consecutive ring levels.
pub fn plan_job(job: &JobConfig, geometry: &dyn GeometryProvider) -> Result<JobPlan> {
    let params = &job.params;
    let region = Region::from_specs(&job.polygons);
    let mut arena = ChunkArena::new();

    let hierarchy = match job.strategy {
        Strategy::Profile => {
            let contour = profile_region(&region, job.cut_side, params, geometry)?;
            chunks_from_region(&mut arena, &contour, job.start_depth);
            match job.hierarchy_policy() {
                HierarchyPolicy::Polygon => HierarchyPlan::Polygon,
                HierarchyPolicy::Distance => HierarchyPlan::Keep,
            }
        }
        Strategy::Pocket => {
            let levels = offset_rings(&mut arena, &region, params, geometry, job.start_depth)?;
            match job.hierarchy_policy() {
                HierarchyPolicy::Polygon => HierarchyPlan::Polygon,
                HierarchyPolicy::Distance => {
                    HierarchyPlan::Distance(level_pairs(&levels, job.pocket_direction))
                }
            }
        }
    };

    let bridges = if params.use_bridges && !job.tabs.is_empty() {
        let height =
            BridgeRegion::absolute_height(job.start_depth, job.end_depth, params.bridge_height);
        Some(BridgeRegion::from_tabs(
            &job.tabs,
            &[],
            params.bridge_width,
            height,
            params.circle_segments,
            geometry,
        )?)
    } else {
        None
    };

    let depth: Box<dyn DepthProvider> = match &job.heightmap {
        Some(map) => Box::new(HeightMap::new(map, params.cutter_radius)),
        None => Box::new(FlatStock),
    };
    let silhouette: Box<dyn SilhouetteProvider> = if job.silhouette.is_empty() {
        Box::new(Unbounded)
    } else {
        Box::new(RegionSilhouette::new(Region::from_specs(&job.silhouette)))
    };

    info!(
        "Job '{}' planned: {:?} strategy, {} chunks, bridges {}",
        job.name,
        job.strategy,
        arena.len(),
        if bridges.is_some() { "on" } else { "off" }
    );

    let mut request = EngineRequest::new(job.start_depth, job.end_depth)
        .with_start_position(job.start_position)
        .with_hierarchy(hierarchy);
    if let Some(bridges) = bridges {
        request = request.with_bridges(bridges);
    }
    Ok(JobPlan {
        arena,
        request,
        depth,
        silhouette,
    })
}
