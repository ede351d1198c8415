//! Layer scheduling
//!
//! Splits the depth range into stepdown layers and replicates the sequenced
//! chunks across them, depth-first (every layer of one chunk before the
//! next chunk) or layer-first (every chunk of one layer before the next
//! layer). Each pass is a deep copy; the sequenced chunks are never changed.

use chunkcam_core::{CancellationToken, Point2};
use chunkcam_settings::{CuttingParameters, MovementType};
use serde::Serialize;
use tracing::debug;

use crate::chunk::{Chunk, ChunkArena, ChunkId};
use crate::depth::DepthProvider;
use crate::error::{EngineError, Result};

/// One depth pass `[start, end]`, `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Layer {
    pub start: f64,
    pub end: f64,
}

/// Upper bound on the layers one depth range may be split into.
pub const MAX_LAYERS: usize = 100_000;

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Layers covering `[end, start]` from the top down.
///
/// `start <= end` is a configuration error. Without layers the whole range
/// is one layer; otherwise each layer is at most `stepdown` deep, and a
/// layer that rounding collapses to zero depth is dropped. A stepdown that
/// would need more than [`MAX_LAYERS`] layers is rejected.
pub fn compute_layers(start: f64, end: f64, params: &CuttingParameters) -> Result<Vec<Layer>> {
    if !(start > end) {
        return Err(EngineError::InvalidDepthRange { start, end });
    }
    if !params.use_layers {
        return Ok(vec![Layer { start, end }]);
    }
    if !(params.stepdown > 0.0) {
        return Err(EngineError::invalid_parameter(
            "stepdown",
            "must be > 0 when layers are used",
        ));
    }

    let count = ((start - end) / params.stepdown).ceil();
    if !count.is_finite() || count > MAX_LAYERS as f64 {
        return Err(EngineError::invalid_parameter(
            "stepdown",
            format!(
                "{} splits {:.4}..{:.4} into more than {} layers",
                params.stepdown, start, end, MAX_LAYERS
            ),
        ));
    }
    let count = count as usize;
    let mut layers = Vec::with_capacity(count);
    let mut layer_start = start;
    for i in 0..count {
        let raw = start - (i + 1) as f64 * params.stepdown;
        let layer_end = if raw <= end { end } else { round6(raw).max(end) };
        if (layer_start * 1e8) as i64 != (layer_end * 1e8) as i64 {
            layers.push(Layer {
                start: layer_start,
                end: layer_end,
            });
        }
        layer_start = layer_end;
    }
    debug!(
        "Depth {:.4}..{:.4} split into {} layers of {:.4}",
        start,
        end,
        layers.len(),
        params.stepdown
    );
    Ok(layers)
}

/// A chunk copy bound to one layer.
#[derive(Debug, Clone)]
pub struct ScheduledPass {
    pub chunk: Chunk,
    pub layer: Layer,
    /// Position of the layer in the layer list.
    pub layer_index: usize,
    /// Sequenced chunks this pass was made from; several after low linking.
    pub sources: Vec<ChunkId>,
}

impl ScheduledPass {
    pub fn source(&self) -> ChunkId {
        self.sources[0]
    }

    pub fn is_first_layer(&self) -> bool {
        self.layer_index == 0
    }
}

/// Copies `chunk` for `layer` and stamps its Z: the layer end, raised to
/// the sampled floor and the chunk's own depth limit.
fn stamp(chunk: &Chunk, layer: Layer, depth: &dyn DepthProvider) -> Chunk {
    let mut copy = chunk.clone();
    let xy: Vec<Point2> = copy.points().iter().map(|p| p.xy()).collect();
    let sampled = depth.sample_depth_batch(&xy);
    debug_assert_eq!(sampled.len(), xy.len());
    let floor = copy.depth.unwrap_or(f64::NEG_INFINITY);
    let zs: Vec<f64> = sampled
        .iter()
        .map(|s| layer.end.max(*s).max(floor))
        .collect();
    copy.set_points_z(&zs);
    copy.zstart = layer.start;
    copy.zend = layer.end;
    copy
}

/// Replicates `order` across `layers`.
///
/// Cancellation is checked before every layer.
pub fn schedule(
    arena: &ChunkArena,
    order: &[ChunkId],
    layers: &[Layer],
    params: &CuttingParameters,
    depth: &dyn DepthProvider,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<ScheduledPass>> {
    let check = || {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    };
    let meander = params.movement == MovementType::Meander;
    let mut passes = Vec::with_capacity(order.len() * layers.len());

    if params.first_down {
        for &id in order {
            let source = &arena[id];
            for (index, layer) in layers.iter().enumerate() {
                check()?;
                let mut chunk = stamp(source, *layer, depth);
                if meander && !chunk.is_closed() && index % 2 == 1 {
                    chunk.reverse();
                }
                passes.push(ScheduledPass {
                    chunk,
                    layer: *layer,
                    layer_index: index,
                    sources: vec![id],
                });
            }
        }
    } else {
        for (index, layer) in layers.iter().enumerate() {
            check()?;
            for &id in order {
                passes.push(ScheduledPass {
                    chunk: stamp(&arena[id], *layer, depth),
                    layer: *layer,
                    layer_index: index,
                    sources: vec![id],
                });
            }
        }
    }

    debug!(
        "Scheduled {} passes for {} chunks over {} layers",
        passes.len(),
        order.len(),
        layers.len()
    );
    Ok(passes)
}
