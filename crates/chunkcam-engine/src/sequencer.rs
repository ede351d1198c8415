//! Travel ordering
//!
//! Linearizes the hierarchy into a cut order: children before parents, and
//! among the chunks that may be cut next, the one nearest the tool. Closed
//! chunks are re-indexed to start at their nearest vertex; open chunks are
//! reversed under meander movement when their end is nearer.

use chunkcam_core::{CancellationToken, Point3};
use chunkcam_settings::MovementType;
use tracing::debug;

use crate::chunk::{ChunkArena, ChunkId};
use crate::error::{EngineError, Result};

/// Greedy nearest-neighbour sequencer over one arena.
///
/// The visited set belongs to the sequencer, so a new sequencer over the
/// same arena starts fresh.
pub struct Sequencer<'a> {
    arena: &'a mut ChunkArena,
    visited: Vec<bool>,
    remaining: usize,
    pos: Point3,
    movement: MovementType,
    keep_in_subtree: bool,
    last: Option<ChunkId>,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Sequencer<'a> {
    pub fn new(arena: &'a mut ChunkArena, start: Point3, movement: MovementType) -> Self {
        let count = arena.len();
        Self {
            arena,
            visited: vec![false; count],
            remaining: count,
            pos: start,
            movement,
            keep_in_subtree: false,
            last: None,
            cancel: None,
        }
    }

    /// Prefer the unfinished subtree of the last chunk's parents before
    /// searching the whole arena.
    pub fn keep_in_subtree(mut self, enabled: bool) -> Self {
        self.keep_in_subtree = enabled;
        self
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Current tool position.
    pub fn position(&self) -> Point3 {
        self.pos
    }

    pub fn is_visited(&self, id: ChunkId) -> bool {
        self.visited[id.0]
    }

    /// Unvisited, with every child already visited.
    pub fn is_millable(&self, id: ChunkId) -> bool {
        !self.visited[id.0] && self.arena[id].children.iter().all(|c| self.visited[c.0])
    }

    /// First unvisited chunk at or below `root` whose children are all
    /// visited, searched depth-first in child order.
    pub fn next_unvisited_descendant(&self, root: ChunkId) -> Option<ChunkId> {
        let mut seen = vec![false; self.arena.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.visited[id.0] || std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            let open: Vec<ChunkId> = self.arena[id]
                .children
                .iter()
                .copied()
                .filter(|c| !self.visited[c.0])
                .collect();
            if open.is_empty() {
                return Some(id);
            }
            stack.extend(open.into_iter().rev());
        }
        None
    }

    fn entry_distance(&self, id: ChunkId) -> f64 {
        let chunk = &self.arena[id];
        if chunk.is_closed() {
            return chunk
                .nearest_vertex(&self.pos)
                .map_or(f64::INFINITY, |(_, d)| d);
        }
        let (Some(first), Some(last)) = (chunk.first_point(), chunk.last_point()) else {
            return f64::INFINITY;
        };
        let to_start = self.pos.xy_distance_to(&first);
        if self.movement == MovementType::Meander {
            to_start.min(self.pos.xy_distance_to(&last))
        } else {
            to_start
        }
    }

    fn subtree_candidates(&self) -> Vec<ChunkId> {
        let Some(last) = self.last else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for &parent in &self.arena[last].parents {
            if self.visited[parent.0] {
                continue;
            }
            for id in std::iter::once(parent).chain(self.arena.descendants(parent)) {
                if self.is_millable(id) && !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out.sort();
        out
    }

    fn orient(&mut self, id: ChunkId) {
        let pos = self.pos;
        let meander = self.movement == MovementType::Meander;
        let chunk = &mut self.arena[id];
        if chunk.is_closed() {
            if let Some((index, _)) = chunk.nearest_vertex(&pos) {
                chunk.rotate_start(index);
            }
        } else if meander {
            if let (Some(first), Some(last)) = (chunk.first_point(), chunk.last_point()) {
                if pos.xy_distance_to(&last) < pos.xy_distance_to(&first) {
                    chunk.reverse();
                }
            }
        }
    }

    /// Picks, orients and marks the next chunk to cut.
    pub fn next(&mut self) -> Result<Option<ChunkId>> {
        if self.cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }
        if self.remaining == 0 {
            return Ok(None);
        }

        let mut candidates = if self.keep_in_subtree {
            self.subtree_candidates()
        } else {
            Vec::new()
        };
        if candidates.is_empty() {
            candidates = self.arena.ids().filter(|id| self.is_millable(*id)).collect();
        }
        if candidates.is_empty() {
            debug_assert!(false, "cyclic hierarchy left chunks unreachable");
            candidates = self.arena.ids().filter(|id| !self.visited[id.0]).collect();
        }

        let mut best: Option<(ChunkId, f64)> = None;
        for id in candidates {
            let d = self.entry_distance(id);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        let Some((id, distance)) = best else {
            return Ok(None);
        };

        self.orient(id);
        self.visited[id.0] = true;
        self.remaining -= 1;
        self.last = Some(id);
        if let Some(last) = self.arena[id].last_point() {
            self.pos = last;
        }
        debug!("Sequenced chunk {} at travel {:.4}", id, distance);
        Ok(Some(id))
    }

    /// Full cut order; identical to calling [`Sequencer::next`] until exhausted.
    pub fn sequence(mut self) -> Result<Vec<ChunkId>> {
        let mut order = Vec::with_capacity(self.remaining);
        while let Some(id) = self.next()? {
            order.push(id);
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::geometry::Polygon2;

    fn square(x: f64, y: f64, size: f64) -> Chunk {
        Chunk::from_ring(&Polygon2::rectangle(x, y, size, size).exterior, 0.0)
    }

    fn line(a: (f64, f64), b: (f64, f64)) -> Chunk {
        Chunk::from_points(
            vec![Point3::new(a.0, a.1, 0.0), Point3::new(b.0, b.1, 0.0)],
            false,
        )
    }

    #[test]
    fn test_children_first_then_nearest() {
        let mut arena = ChunkArena::new();
        let outer = arena.push(square(0.0, 0.0, 20.0));
        let inner = arena.push(square(5.0, 5.0, 5.0));
        let far = arena.push(square(100.0, 0.0, 5.0));
        arena.add_edge(outer, inner);

        let order = Sequencer::new(&mut arena, Point3::new(0.0, 0.0, 0.0), MovementType::Climb)
            .sequence()
            .unwrap();
        assert_eq!(order, vec![inner, outer, far]);
    }

    #[test]
    fn test_closed_chunk_reindexed_to_nearest_vertex() {
        let mut arena = ChunkArena::new();
        let id = arena.push(square(0.0, 0.0, 10.0));
        Sequencer::new(&mut arena, Point3::new(12.0, 11.0, 5.0), MovementType::Climb)
            .sequence()
            .unwrap();
        let chunk = &arena[id];
        assert_eq!(chunk.first_point(), Some(Point3::new(10.0, 10.0, 0.0)));
        assert_eq!(chunk.first_point(), chunk.last_point());
    }

    #[test]
    fn test_meander_reverses_open_chunks() {
        let mut arena = ChunkArena::new();
        let a = arena.push(line((0.0, 0.0), (10.0, 0.0)));
        let b = arena.push(line((0.0, 1.0), (10.0, 1.0)));
        let order = Sequencer::new(&mut arena, Point3::new(0.0, 0.0, 0.0), MovementType::Meander)
            .sequence()
            .unwrap();
        assert_eq!(order, vec![a, b]);
        assert_eq!(arena[b].first_point(), Some(Point3::new(10.0, 1.0, 0.0)));

        let mut arena = ChunkArena::new();
        arena.push(line((0.0, 0.0), (10.0, 0.0)));
        let b = arena.push(line((0.0, 1.0), (10.0, 1.0)));
        Sequencer::new(&mut arena, Point3::new(0.0, 0.0, 0.0), MovementType::Climb)
            .sequence()
            .unwrap();
        assert_eq!(arena[b].first_point(), Some(Point3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_ties_break_by_input_order() {
        let mut arena = ChunkArena::new();
        let a = arena.push(line((5.0, 0.0), (6.0, 0.0)));
        let b = arena.push(line((-5.0, 0.0), (-6.0, 0.0)));
        let order = Sequencer::new(&mut arena, Point3::new(0.0, 0.0, 0.0), MovementType::Climb)
            .sequence()
            .unwrap();
        assert_eq!(order[0], a);
        assert_eq!(order[1], b);
    }

    #[test]
    fn test_incremental_matches_batch() {
        let build = || {
            let mut arena = ChunkArena::new();
            let outer = arena.push(square(0.0, 0.0, 30.0));
            let mid = arena.push(square(5.0, 5.0, 20.0));
            let inner = arena.push(square(10.0, 10.0, 5.0));
            let side = arena.push(square(40.0, 0.0, 5.0));
            arena.add_edge(outer, mid);
            arena.add_edge(mid, inner);
            let _ = side;
            arena
        };
        let mut batch_arena = build();
        let batch = Sequencer::new(&mut batch_arena, Point3::default(), MovementType::Climb)
            .sequence()
            .unwrap();

        let mut arena = build();
        let mut sequencer = Sequencer::new(&mut arena, Point3::default(), MovementType::Climb);
        assert_eq!(sequencer.next_unvisited_descendant(ChunkId(0)), Some(ChunkId(2)));
        let mut incremental = Vec::new();
        while let Some(id) = sequencer.next().unwrap() {
            incremental.push(id);
        }
        assert_eq!(batch, incremental);
        assert_eq!(batch[0], ChunkId(2));
    }

    #[test]
    fn test_keep_in_subtree_finishes_parent_first() {
        let mut arena = ChunkArena::new();
        // two islands inside a big outline, plus a chunk close to the first island
        let outer = arena.push(square(0.0, 0.0, 100.0));
        let island_a = arena.push(square(10.0, 10.0, 5.0));
        let island_b = arena.push(square(80.0, 80.0, 5.0));
        let neighbour = arena.push(square(-20.0, 10.0, 5.0));
        arena.add_edge(outer, island_a);
        arena.add_edge(outer, island_b);

        let order = Sequencer::new(&mut arena, Point3::new(10.0, 10.0, 0.0), MovementType::Climb)
            .keep_in_subtree(true)
            .sequence()
            .unwrap();
        assert_eq!(order, vec![island_a, island_b, outer, neighbour]);
    }

    #[test]
    fn test_cancellation_between_chunks() {
        let mut arena = ChunkArena::new();
        arena.push(square(0.0, 0.0, 1.0));
        let token = CancellationToken::new();
        token.cancel();
        let err = Sequencer::new(&mut arena, Point3::default(), MovementType::Climb)
            .with_cancellation(&token)
            .sequence()
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
