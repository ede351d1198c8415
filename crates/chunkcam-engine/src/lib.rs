//! # chunkcam Engine
//!
//! Turns offset contours into an ordered set of safe, continuously milled
//! tool motions.
//!
//! ## Stages
//!
//! - **Hierarchy** ([`hierarchy`]): parent/child relations forcing enclosed
//!   chunks to be cut before the chunks around them, by polygon containment
//!   or by distance between successive offset rings
//! - **Sequencing** ([`sequencer`]): greedy nearest-entry ordering honouring
//!   the hierarchy
//! - **Layers** ([`layers`]): stepdown layers and depth-first or layer-first
//!   replication with Z stamped from the depth provider
//! - **Low linking** ([`link`]): feed moves at depth between close passes
//! - **Bridges** ([`bridges`]): tabs left standing across the bridge region
//! - **Motion shaping** ([`motion`]): lead-in/out, helix and ramp entry, ramp
//!   exit and tangential retract
//!
//! [`ChunkEngine`] runs them in order over a [`ChunkArena`].

pub mod bridges;
pub mod builder;
pub mod chunk;
pub mod depth;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod layers;
pub mod link;
pub mod motion;
pub mod pipeline;
pub mod sequencer;

pub use bridges::{extract_tab_curve, insert_bridges, BridgeRegion};
pub use builder::{chunks_from_region, level_pairs, offset_rings, plan_job, profile_region, JobPlan};
pub use chunk::{Chunk, ChunkArena, ChunkId, ChunkIds};
pub use depth::{DepthProvider, FlatStock, HeightMap, RegionSilhouette, SilhouetteProvider, Unbounded};
pub use error::{EngineError, EngineWarning, Result, WarningKind};
pub use geometry::{BooleanOp, ContourGeometry, Footprint, GeometryProvider, JoinStyle, Polygon2, Region};
pub use hierarchy::{resolve_distance, resolve_polygon};
pub use layers::{compute_layers, schedule, Layer, ScheduledPass};
pub use link::link_low;
pub use motion::MotionShaper;
pub use pipeline::{ChunkEngine, EngineOutput, EngineRequest, EngineStats, HierarchyPlan};
pub use sequencer::Sequencer;
