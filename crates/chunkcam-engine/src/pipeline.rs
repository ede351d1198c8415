//! Engine pipeline
//!
//! Runs one operation over a chunk arena: refine, hierarchy, sequencing,
//! layer scheduling, low linking, bridging, motion shaping and simplify.
//! Every stage is reported to the [`ProgressListener`] and cancellation is
//! checked between chunks and layers.

use chunkcam_core::{
    CancellationToken, NullListener, OperationId, Point3, ProgressListener, Stage,
};
use chunkcam_settings::CuttingParameters;
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::bridges::{extract_tab_curve, insert_bridges, BridgeRegion};
use crate::chunk::{Chunk, ChunkArena, ChunkId};
use crate::depth::{DepthProvider, FlatStock, SilhouetteProvider, Unbounded};
use crate::error::{EngineError, EngineWarning, Result};
use crate::geometry::GeometryProvider;
use crate::hierarchy::{resolve_distance, resolve_polygon};
use crate::layers::{compute_layers, schedule, ScheduledPass};
use crate::link::link_low;
use crate::motion::MotionShaper;
use crate::sequencer::Sequencer;

/// How the hierarchy stage relates the chunks.
#[derive(Debug, Clone, Default)]
pub enum HierarchyPlan {
    /// Keep the edges already in the arena.
    #[default]
    Keep,
    /// Polygon containment over every chunk.
    Polygon,
    /// Distance containment for each `(parents, children)` pair.
    Distance(Vec<(Vec<ChunkId>, Vec<ChunkId>)>),
}

/// Per-operation inputs besides the chunks.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub start_depth: f64,
    pub end_depth: f64,
    pub start_position: Point3,
    pub hierarchy: HierarchyPlan,
    pub bridges: Option<BridgeRegion>,
    pub keep_in_subtree: bool,
}

impl EngineRequest {
    pub fn new(start_depth: f64, end_depth: f64) -> Self {
        Self {
            start_depth,
            end_depth,
            start_position: Point3::default(),
            hierarchy: HierarchyPlan::Keep,
            bridges: None,
            keep_in_subtree: false,
        }
    }

    pub fn with_start_position(mut self, position: Point3) -> Self {
        self.start_position = position;
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: HierarchyPlan) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn with_bridges(mut self, bridges: BridgeRegion) -> Self {
        self.bridges = Some(bridges);
        self
    }

    pub fn keep_in_subtree(mut self, enabled: bool) -> Self {
        self.keep_in_subtree = enabled;
        self
    }
}

/// Summary counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineStats {
    pub chunks: usize,
    pub passes: usize,
    pub layers: usize,
    pub links: usize,
    pub bridge_points: usize,
    pub cut_length: f64,
}

/// Ordered passes ready for emission, plus the side channels.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub operation: OperationId,
    /// Passes in cut order.
    pub passes: Vec<ScheduledPass>,
    /// Polylines at the bridge height, for manufacturing the tabs.
    pub tab_curve: Vec<Vec<Point3>>,
    pub warnings: Vec<EngineWarning>,
    pub stats: EngineStats,
}

impl EngineOutput {
    /// Chunks in cut order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.passes.iter().map(|p| &p.chunk)
    }
}

/// The chunk engine, configured once per operation.
pub struct ChunkEngine<'a> {
    params: &'a CuttingParameters,
    geometry: &'a dyn GeometryProvider,
    depth: &'a dyn DepthProvider,
    silhouette: &'a dyn SilhouetteProvider,
    listener: &'a dyn ProgressListener,
    cancel: CancellationToken,
}

impl<'a> ChunkEngine<'a> {
    /// Engine over flat stock without a silhouette.
    pub fn new(params: &'a CuttingParameters, geometry: &'a dyn GeometryProvider) -> Self {
        Self {
            params,
            geometry,
            depth: &FlatStock,
            silhouette: &Unbounded,
            listener: &NullListener,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_depth(mut self, depth: &'a dyn DepthProvider) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_silhouette(mut self, silhouette: &'a dyn SilhouetteProvider) -> Self {
        self.silhouette = silhouette;
        self
    }

    pub fn with_listener(mut self, listener: &'a dyn ProgressListener) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn each_pass(
        &self,
        stage: Stage,
        passes: &mut [ScheduledPass],
        mut f: impl FnMut(&mut ScheduledPass),
    ) -> Result<()> {
        let total = passes.len();
        self.listener.on_stage_started(stage, total);
        for (i, pass) in passes.iter_mut().enumerate() {
            self.check_cancelled()?;
            f(pass);
            self.listener.on_progress(stage, i + 1, total);
        }
        self.listener.on_stage_finished(stage);
        Ok(())
    }

    /// Computes the ordered passes for the chunks of `arena`.
    ///
    /// The arena receives the hierarchy edges and the sequencer's
    /// re-indexing; pass point data lives in the output only.
    pub fn run(&self, arena: &mut ChunkArena, request: &EngineRequest) -> Result<EngineOutput> {
        let operation = OperationId::new();
        let span = info_span!("chunk_engine", operation = %operation);
        let _enter = span.enter();

        let params = self.params;
        let layers = compute_layers(request.start_depth, request.end_depth, params)?;
        params
            .validate()
            .map_err(|e| EngineError::invalid_parameter("params", e.to_string()))?;
        info!(
            "Computing paths for {} chunks from {:.4} to {:.4} in {} layers",
            arena.len(),
            request.start_depth,
            request.end_depth,
            layers.len()
        );
        let mut warnings = Vec::new();

        // refine
        if params.max_segment_length > 0.0 {
            let total = arena.len();
            self.listener.on_stage_started(Stage::Refine, total);
            for (i, chunk) in arena.iter_mut().enumerate() {
                chunk.refine(params.max_segment_length);
                self.listener.on_progress(Stage::Refine, i + 1, total);
            }
            self.listener.on_stage_finished(Stage::Refine);
        }

        // hierarchy
        self.check_cancelled()?;
        self.listener.on_stage_started(Stage::Hierarchy, arena.len());
        match &request.hierarchy {
            HierarchyPlan::Keep => {}
            HierarchyPlan::Polygon => resolve_polygon(arena, self.geometry, &mut warnings)?,
            HierarchyPlan::Distance(pairs) => {
                let count = arena.len();
                if pairs
                    .iter()
                    .flat_map(|(p, c)| p.iter().chain(c))
                    .any(|id| id.0 >= count)
                {
                    return Err(EngineError::invalid_parameter(
                        "hierarchy",
                        "distance pairs name chunks outside the arena",
                    ));
                }
                for (parents, children) in pairs {
                    resolve_distance(arena, parents, children, params.hierarchy_distance());
                }
            }
        }
        self.listener.on_stage_finished(Stage::Hierarchy);

        // sequence
        let total = arena.len();
        self.listener.on_stage_started(Stage::Sequence, total);
        let order = {
            let mut sequencer = Sequencer::new(arena, request.start_position, params.movement)
                .keep_in_subtree(request.keep_in_subtree)
                .with_cancellation(&self.cancel);
            let mut order = Vec::with_capacity(total);
            while let Some(id) = sequencer.next()? {
                order.push(id);
                self.listener.on_progress(Stage::Sequence, order.len(), total);
            }
            order
        };
        self.listener.on_stage_finished(Stage::Sequence);

        // layers
        self.listener.on_stage_started(Stage::Layers, layers.len());
        let passes = schedule(arena, &order, &layers, params, self.depth, Some(&self.cancel))?;
        self.listener.on_stage_finished(Stage::Layers);

        // link
        let (mut passes, links) = if params.stay_low {
            self.listener.on_stage_started(Stage::Link, passes.len());
            let linked = link_low(passes, params, self.depth, self.silhouette);
            self.listener.on_stage_finished(Stage::Link);
            linked
        } else {
            (passes, 0)
        };

        // bridges
        let mut bridge_points = 0;
        let mut tab_curve = Vec::new();
        if let Some(bridges) = &request.bridges {
            self.each_pass(Stage::Bridges, &mut passes, |pass| {
                bridge_points += insert_bridges(&mut pass.chunk, bridges, self.geometry, self.depth);
            })?;
            tab_curve = extract_tab_curve(
                passes.iter().map(|p| &p.chunk),
                bridges.height(),
                params.bridge_width,
            );
            debug!(
                "Bridges inserted {} points, tab curve has {} runs",
                bridge_points,
                tab_curve.len()
            );
        }

        // shape
        let shaper = MotionShaper::new(params, self.silhouette);
        self.each_pass(Stage::Shape, &mut passes, |pass| shaper.shape(pass, &mut warnings))?;

        // simplify
        if params.simplify_tolerance > 0.0 {
            self.each_pass(Stage::Simplify, &mut passes, |pass| {
                pass.chunk.simplify(params.simplify_tolerance)
            })?;
        }

        let stats = EngineStats {
            chunks: arena.len(),
            passes: passes.len(),
            layers: layers.len(),
            links,
            bridge_points,
            cut_length: passes.iter().map(|p| p.chunk.length()).sum(),
        };
        info!(
            "Computed {} passes, {:.3} mm of cut, {} warnings",
            stats.passes,
            stats.cut_length,
            warnings.len()
        );
        Ok(EngineOutput {
            operation,
            passes,
            tab_curve,
            warnings,
            stats,
        })
    }
}
