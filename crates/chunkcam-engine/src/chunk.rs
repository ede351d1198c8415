//! Chunk model
//!
//! A [`Chunk`] is one continuous tool motion: an ordered list of points,
//! open or closed, with optional multi-axis arrays kept index-aligned with
//! the points. Chunks live in a [`ChunkArena`] owned by one operation;
//! parent/child relations are arena indices, never owning references.

use chunkcam_core::{Bounds2, Point2, Point3, RotationVector};
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::geometry::{Polygon2, Region};

/// Index of a chunk in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkId(pub usize);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type ChunkIds = SmallVec<[ChunkId; 4]>;

/// Inserts `id` unless already present.
pub(crate) fn insert_unique(set: &mut ChunkIds, id: ChunkId) {
    if !set.contains(&id) {
        set.push(id);
    }
}

/// One continuous tool motion.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    points: Vec<Point3>,
    startpoints: Vec<Point3>,
    endpoints: Vec<Point3>,
    rotations: Vec<RotationVector>,
    closed: bool,
    length: f64,
    /// Floor below which this chunk is never stamped.
    pub depth: Option<f64>,
    /// Top of the pass this chunk belongs to.
    pub zstart: f64,
    /// Bottom of the pass this chunk belongs to.
    pub zend: f64,
    pub parents: ChunkIds,
    pub children: ChunkIds,
    /// Ring used for polygon containment; kept unchanged while points move.
    pub outline: Option<Polygon2>,
    /// Outline minus the outlines of the children, set by the resolver.
    pub material: Option<Region>,
}

impl Chunk {
    /// Builds a chunk, appending the first point when a closed chunk does not
    /// end where it starts.
    pub fn from_points(points: Vec<Point3>, closed: bool) -> Self {
        let mut chunk = Chunk {
            points,
            closed,
            ..Default::default()
        };
        if closed {
            if let (Some(first), Some(last)) = (chunk.points.first(), chunk.points.last()) {
                if first != last {
                    let first = *first;
                    chunk.points.push(first);
                }
            }
        }
        chunk.update_length();
        chunk
    }

    /// Builds a multi-axis chunk. The arrays must be as long as `points`.
    pub fn multi_axis(
        points: Vec<Point3>,
        startpoints: Vec<Point3>,
        endpoints: Vec<Point3>,
        rotations: Vec<RotationVector>,
        closed: bool,
    ) -> Self {
        debug_assert_eq!(startpoints.len(), points.len());
        debug_assert_eq!(endpoints.len(), points.len());
        debug_assert_eq!(rotations.len(), points.len());
        let mut chunk = Chunk {
            points,
            startpoints,
            endpoints,
            rotations,
            closed,
            ..Default::default()
        };
        if closed && chunk.points.len() > 1 && chunk.points.first() != chunk.points.last() {
            let entries = (0..chunk.points.len())
                .map(|i| (chunk.points[i], i))
                .chain(std::iter::once((chunk.points[0], 0)))
                .collect();
            chunk.rebuild(entries);
        }
        chunk.update_length();
        chunk
    }

    /// Closed chunk tracing a ring at height `z`, with the ring as outline.
    pub fn from_ring(ring: &[Point2], z: f64) -> Self {
        let points = ring.iter().map(|p| p.with_z(z)).collect();
        let mut chunk = Chunk::from_points(points, true);
        chunk.outline = Some(Polygon2::new(ring));
        chunk
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn startpoints(&self) -> &[Point3] {
        &self.startpoints
    }

    pub fn endpoints(&self) -> &[Point3] {
        &self.endpoints
    }

    pub fn rotations(&self) -> &[RotationVector] {
        &self.rotations
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_multi_axis(&self) -> bool {
        !self.rotations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_point(&self) -> Option<Point3> {
        self.points.first().copied()
    }

    pub fn last_point(&self) -> Option<Point3> {
        self.points.last().copied()
    }

    /// Cached 3D length of the point list.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Planar length of the point list.
    pub fn length_2d(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].xy_distance_to(&w[1]))
            .sum()
    }

    fn update_length(&mut self) {
        self.length = self.points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
    }

    /// Replaces the points. Each entry names the source index whose
    /// multi-axis attributes the new point inherits.
    pub(crate) fn rebuild(&mut self, entries: Vec<(Point3, usize)>) {
        if self.is_multi_axis() {
            self.startpoints = entries.iter().map(|(_, i)| self.startpoints[*i]).collect();
            self.endpoints = entries.iter().map(|(_, i)| self.endpoints[*i]).collect();
            self.rotations = entries.iter().map(|(_, i)| self.rotations[*i]).collect();
        }
        self.points = entries.into_iter().map(|(p, _)| p).collect();
        self.update_length();
        self.debug_check();
    }

    /// Replaces the points of a single-axis chunk.
    pub(crate) fn replace_points(&mut self, points: Vec<Point3>) {
        debug_assert!(!self.is_multi_axis());
        self.points = points;
        self.update_length();
        self.debug_check();
    }

    /// Points paired with their own index, ready for [`Chunk::rebuild`].
    pub(crate) fn indexed(&self) -> Vec<(Point3, usize)> {
        self.points.iter().copied().enumerate().map(|(i, p)| (p, i)).collect()
    }

    fn debug_check(&self) {
        if self.is_multi_axis() {
            debug_assert_eq!(self.startpoints.len(), self.points.len());
            debug_assert_eq!(self.endpoints.len(), self.points.len());
            debug_assert_eq!(self.rotations.len(), self.points.len());
        }
        debug_assert!(
            !self.closed || self.points.first() == self.points.last(),
            "closed chunk does not end where it starts"
        );
        debug_assert!(self.points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
        self.startpoints.reverse();
        self.endpoints.reverse();
        self.rotations.reverse();
    }

    /// Re-indexes a closed chunk to start at vertex `index`.
    pub fn rotate_start(&mut self, index: usize) {
        debug_assert!(self.closed);
        let n = self.points.len();
        if !self.closed || n < 3 || index == 0 || index >= n - 1 {
            return;
        }
        let entries = (index..n)
            .chain(1..=index)
            .map(|i| (self.points[i], i))
            .collect();
        self.rebuild(entries);
    }

    /// Index and planar distance of the vertex nearest to `pos`; first wins
    /// on ties. The closing duplicate of a closed chunk is never returned.
    pub fn nearest_vertex(&self, pos: &Point3) -> Option<(usize, f64)> {
        let usable = if self.closed && self.points.len() > 1 {
            self.points.len() - 1
        } else {
            self.points.len()
        };
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.points[..usable].iter().enumerate() {
            let d = pos.xy_distance_to(p);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best
    }

    pub fn set_z(&mut self, z: f64) {
        for p in &mut self.points {
            p.z = z;
        }
        self.update_length();
    }

    /// Raises every point below `z` to `z`.
    pub fn clamp_z_min(&mut self, z: f64) {
        for p in &mut self.points {
            p.z = p.z.max(z);
        }
        self.update_length();
    }

    /// Sets every point's Z from `zs`, which must match the point count.
    pub fn set_points_z(&mut self, zs: &[f64]) {
        debug_assert_eq!(zs.len(), self.points.len());
        for (p, z) in self.points.iter_mut().zip(zs) {
            p.z = *z;
        }
        self.update_length();
    }

    /// Ensures a vertex exists at planar distance `distance` along the chunk
    /// and returns its index. Distances past the end return the last index.
    pub fn break_at_distance(&mut self, distance: f64) -> usize {
        if self.points.is_empty() {
            return 0;
        }
        let mut traveled = 0.0;
        for i in 1..self.points.len() {
            let a = self.points[i - 1];
            let b = self.points[i];
            let d = a.xy_distance_to(&b);
            if traveled + d >= distance {
                let t = if d > 0.0 { (distance - traveled) / d } else { 0.0 };
                if t <= 1e-9 {
                    return i - 1;
                }
                if t >= 1.0 - 1e-9 {
                    return i;
                }
                let mut entries = self.indexed();
                entries.insert(i, (a.lerp(&b, t), i - 1));
                self.rebuild(entries);
                return i;
            }
            traveled += d;
        }
        self.points.len() - 1
    }

    /// Subdivides segments longer than `max_segment`.
    pub fn refine(&mut self, max_segment: f64) {
        if max_segment <= 0.0 || self.points.len() < 2 {
            return;
        }
        let mut entries = Vec::with_capacity(self.points.len());
        entries.push((self.points[0], 0));
        for i in 1..self.points.len() {
            let a = self.points[i - 1];
            let b = self.points[i];
            let steps = (a.xy_distance_to(&b) / max_segment).ceil() as usize;
            for k in 1..steps {
                entries.push((a.lerp(&b, k as f64 / steps as f64), i - 1));
            }
            entries.push((b, i));
        }
        if entries.len() != self.points.len() {
            self.rebuild(entries);
        }
    }

    /// Drops interior points lying within `tolerance` of the line through
    /// their kept neighbours. First and last points always survive.
    pub fn simplify(&mut self, tolerance: f64) {
        if tolerance <= 0.0 || self.points.len() < 3 || self.is_multi_axis() {
            return;
        }
        let mut entries = vec![(self.points[0], 0)];
        for i in 1..self.points.len() - 1 {
            let prev = entries[entries.len() - 1].0;
            let p = self.points[i];
            let next = self.points[i + 1];
            if p != prev && distance_to_line_3d(&p, &prev, &next) > tolerance {
                entries.push((p, i));
            }
        }
        let last = self.points.len() - 1;
        entries.push((self.points[last], last));
        if entries.len() != self.points.len() {
            self.rebuild(entries);
        }
    }

    pub fn bounds_2d(&self) -> Option<Bounds2> {
        Bounds2::from_points(self.points.iter().map(Point3::xy))
    }

    /// Whether any part of this chunk passes within `limit` of `other`,
    /// measured in the plane between the two polylines.
    pub fn xy_distance_within(&self, other: &Chunk, limit: f64) -> bool {
        let (Some(a), Some(b)) = (self.bounds_2d(), other.bounds_2d()) else {
            return false;
        };
        if !a.expanded(limit).intersects(&b) {
            return false;
        }
        let segs_a = segments_2d(&self.points);
        let segs_b = segments_2d(&other.points);
        segs_a.iter().any(|(p, q)| {
            segs_b
                .iter()
                .any(|(r, s)| crate::geometry::segment_distance(*p, *q, *r, *s) <= limit)
        })
    }

    /// Appends `other` after this chunk, joined by `link`. The result is open.
    pub(crate) fn append_linked(&mut self, link: &[Point3], other: &Chunk) {
        debug_assert!(!self.is_multi_axis() && !other.is_multi_axis());
        self.points.extend_from_slice(link);
        self.points.extend_from_slice(&other.points);
        self.closed = false;
        self.update_length();
    }

    /// Marks the chunk closed or open; closing requires matching ends.
    pub(crate) fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
        self.debug_check();
    }
}

fn segments_2d(points: &[Point3]) -> Vec<(Point2, Point2)> {
    match points.len() {
        0 => Vec::new(),
        1 => vec![(points[0].xy(), points[0].xy())],
        _ => points.windows(2).map(|w| (w[0].xy(), w[1].xy())).collect(),
    }
}

fn distance_to_line_3d(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = (b.x - a.x, b.y - a.y, b.z - a.z);
    let ap = (p.x - a.x, p.y - a.y, p.z - a.z);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1 + ab.2 * ab.2;
    if len_sq <= f64::EPSILON {
        return p.distance_to(a);
    }
    let t = ((ap.0 * ab.0 + ap.1 * ab.1 + ap.2 * ab.2) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&a.lerp(b, t))
}

/// Owns every chunk of one operation.
#[derive(Debug, Clone, Default)]
pub struct ChunkArena {
    chunks: Vec<Chunk>,
}

impl ChunkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Chunk) -> ChunkId {
        self.chunks.push(chunk);
        ChunkId(self.chunks.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id.0)
    }

    pub fn get_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.chunks.get_mut(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = ChunkId> {
        (0..self.chunks.len()).map(ChunkId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.chunks.iter().enumerate().map(|(i, c)| (ChunkId(i), c))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.iter_mut()
    }

    /// Records `child` as cut before `parent`.
    pub fn add_edge(&mut self, parent: ChunkId, child: ChunkId) {
        debug_assert_ne!(parent, child);
        insert_unique(&mut self.chunks[parent.0].children, child);
        insert_unique(&mut self.chunks[child.0].parents, parent);
    }

    pub fn clear_edges(&mut self) {
        for chunk in &mut self.chunks {
            chunk.parents.clear();
            chunk.children.clear();
        }
    }

    /// Every descendant of `id`, depth-first, each listed once.
    pub fn descendants(&self, id: ChunkId) -> Vec<ChunkId> {
        let mut seen = vec![false; self.chunks.len()];
        let mut out = Vec::new();
        let mut stack: Vec<ChunkId> = self.chunks[id.0].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if std::mem::replace(&mut seen[next.0], true) {
                continue;
            }
            out.push(next);
            stack.extend(self.chunks[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Whether the child relation contains a cycle.
    pub fn has_cycle(&self) -> bool {
        // 0 = unseen, 1 = on stack, 2 = done
        let mut state = vec![0u8; self.chunks.len()];
        for root in 0..self.chunks.len() {
            if state[root] != 0 {
                continue;
            }
            let mut stack = vec![(root, 0usize)];
            state[root] = 1;
            while let Some((node, next_child)) = stack.pop() {
                let children = &self.chunks[node].children;
                if next_child < children.len() {
                    stack.push((node, next_child + 1));
                    let child = children[next_child].0;
                    match state[child] {
                        0 => {
                            state[child] = 1;
                            stack.push((child, 0));
                        }
                        1 => return true,
                        _ => {}
                    }
                } else {
                    state[node] = 2;
                }
            }
        }
        false
    }

    /// Snapshot of every chunk's `(parents, children)`, for comparisons.
    pub fn edges(&self) -> Vec<(Vec<ChunkId>, Vec<ChunkId>)> {
        self.chunks
            .iter()
            .map(|c| (c.parents.to_vec(), c.children.to_vec()))
            .collect()
    }
}

impl Index<ChunkId> for ChunkArena {
    type Output = Chunk;

    fn index(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id.0]
    }
}

impl IndexMut<ChunkId> for ChunkArena {
    fn index_mut(&mut self, id: ChunkId) -> &mut Chunk {
        &mut self.chunks[id.0]
    }
}
