use chunkcam_core::{Point2, Point3};
use chunkcam_engine::motion::zig_zag_ramp;
use chunkcam_engine::{
    compute_layers, insert_bridges, resolve_polygon, BridgeRegion, Chunk, ChunkArena, ChunkEngine,
    ChunkId, ContourGeometry, EngineRequest, FlatStock, HierarchyPlan, Polygon2, Region, Sequencer,
};
use chunkcam_settings::{CuttingParameters, MovementType};
use proptest::prelude::*;

fn squares() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((0.0..80.0f64, 0.0..80.0f64, 1.0..60.0f64), 1..12)
}

fn arena_of(squares: &[(f64, f64, f64)]) -> ChunkArena {
    let mut arena = ChunkArena::new();
    for &(x, y, size) in squares {
        arena.push(Chunk::from_ring(
            &Polygon2::rectangle(x, y, size, size).exterior,
            0.0,
        ));
    }
    arena
}

fn tab() -> BridgeRegion {
    BridgeRegion::new(
        Region::new(vec![Polygon2::rectangle(4.0, -1.0, 2.0, 2.0)]),
        -2.0,
    )
}

proptest! {
    #[test]
    fn prop_hierarchy_is_idempotent(squares in squares()) {
        let geometry = ContourGeometry::default();
        let mut arena = arena_of(&squares);
        let mut warnings = Vec::new();
        resolve_polygon(&mut arena, &geometry, &mut warnings).unwrap();
        let first = arena.edges();
        let points: Vec<Vec<Point3>> = arena.iter().map(|(_, c)| c.points().to_vec()).collect();
        resolve_polygon(&mut arena, &geometry, &mut warnings).unwrap();
        prop_assert_eq!(first, arena.edges());
        let again: Vec<Vec<Point3>> = arena.iter().map(|(_, c)| c.points().to_vec()).collect();
        prop_assert_eq!(points, again);
        prop_assert!(!arena.has_cycle());
    }

    #[test]
    fn prop_no_child_is_skipped(squares in squares(), sx in -20.0..100.0f64, sy in -20.0..100.0f64) {
        let mut arena = arena_of(&squares);
        let mut warnings = Vec::new();
        resolve_polygon(&mut arena, &ContourGeometry::default(), &mut warnings).unwrap();
        let descendants: Vec<Vec<ChunkId>> = arena.ids().map(|id| arena.descendants(id)).collect();

        let order = Sequencer::new(&mut arena, Point3::new(sx, sy, 0.0), MovementType::Climb)
            .sequence()
            .unwrap();
        prop_assert_eq!(order.len(), squares.len());
        let position = |id: ChunkId| order.iter().position(|o| *o == id).unwrap();
        for id in order.iter().copied() {
            for d in &descendants[id.0] {
                prop_assert!(position(*d) < position(id));
            }
        }
    }

    #[test]
    fn prop_closed_chunks_stay_closed(
        size in 5.0..40.0f64,
        ramp in any::<bool>(),
        ramp_out in any::<bool>(),
        helix in any::<bool>(),
        retract in any::<bool>(),
        lead in prop::option::of(0.5..2.0f64),
        bridges in any::<bool>(),
        first_down in any::<bool>(),
    ) {
        let params = CuttingParameters {
            ramp,
            ramp_out,
            helix_enter: helix,
            retract_tangential: retract,
            lead_radius: lead.unwrap_or(0.0),
            lead_start_offset: 1.0,
            first_down,
            max_segment_length: 3.0,
            ..Default::default()
        };
        let geometry = ContourGeometry::default();
        let mut arena = arena_of(&[(0.0, 0.0, size), (size / 4.0, size / 4.0, size / 2.0)]);
        let mut request = EngineRequest::new(0.0, -3.0).with_hierarchy(HierarchyPlan::Polygon);
        if bridges {
            request = request.with_bridges(BridgeRegion::new(
                Region::new(vec![Polygon2::rectangle(-2.0, size / 2.0 - 1.0, 4.0, 2.0)]),
                -2.0,
            ));
        }
        let output = ChunkEngine::new(&params, &geometry).run(&mut arena, &request).unwrap();
        prop_assert_eq!(output.passes.len(), 6);
        for pass in &output.passes {
            prop_assert!(pass.chunk.is_closed());
            prop_assert_eq!(pass.chunk.first_point(), pass.chunk.last_point());
        }
    }

    #[test]
    fn prop_layers_cover_range(start in -20.0..20.0f64, depth in 0.01..30.0f64, stepdown in 0.05..5.0f64) {
        let end = start - depth;
        let params = CuttingParameters { stepdown, ..Default::default() };
        let layers = compute_layers(start, end, &params).unwrap();
        prop_assert!(!layers.is_empty());
        prop_assert_eq!(layers[0].start, start);
        prop_assert_eq!(layers[layers.len() - 1].end, end);
        for layer in &layers {
            prop_assert!(layer.start > layer.end);
            prop_assert!(layer.start - layer.end <= stepdown + 1e-6);
        }
        for w in layers.windows(2) {
            prop_assert_eq!(w[0].end, w[1].start);
        }
    }

    #[test]
    fn prop_bridges_ignore_high_paths(
        ys in prop::collection::vec(-3.0..3.0f64, 2..10),
        lift in 0.0..5.0f64,
    ) {
        let bridges = tab();
        let points: Vec<Point3> = ys
            .iter()
            .enumerate()
            .map(|(i, y)| Point3::new(i as f64 * 1.3, *y, bridges.height() + lift))
            .collect();
        let mut chunk = Chunk::from_points(points.clone(), false);
        let inserted = insert_bridges(&mut chunk, &bridges, &ContourGeometry::default(), &FlatStock);
        prop_assert_eq!(inserted, 0);
        prop_assert_eq!(chunk.points(), points.as_slice());
    }

    #[test]
    fn prop_single_crossing_adds_two_points(y in -0.9..0.9f64, x_end in 4.1..5.9f64, z in -6.0..-2.5f64) {
        let bridges = tab();
        let mut chunk = Chunk::from_points(
            vec![Point3::new(0.0, y, z), Point3::new(x_end, y, z)],
            false,
        );
        let inserted = insert_bridges(&mut chunk, &bridges, &ContourGeometry::default(), &FlatStock);
        prop_assert_eq!(inserted, 2);
        let region = bridges.region();
        for p in chunk.points() {
            let inside = region.contains(p.xy())
                && region.segment_distance_to_boundary(p.xy(), p.xy()) > 1e-6;
            if inside {
                prop_assert!(p.z >= bridges.height());
            }
        }
        prop_assert_eq!(chunk.last_point().map(|p| p.z), Some(bridges.height()));
    }

    #[test]
    fn prop_refined_pass_never_cuts_through_tab(
        y in -0.9..0.9f64,
        step in prop::sample::select(vec![0.25, 0.5, 1.0, 2.0]),
        z in -6.0..-2.5f64,
    ) {
        let bridges = tab();
        let mut chunk = Chunk::from_points(
            vec![Point3::new(0.0, y, z), Point3::new(10.0, y, z)],
            false,
        );
        chunk.refine(step);
        insert_bridges(&mut chunk, &bridges, &ContourGeometry::default(), &FlatStock);
        for w in chunk.points().windows(2) {
            let mid = w[0].lerp(&w[1], 0.5);
            if mid.x > 4.0 + 1e-9 && mid.x < 6.0 - 1e-9 {
                prop_assert!(mid.z >= bridges.height(), "{:?} -> {:?}", w[0], w[1]);
            }
        }
        prop_assert_eq!(chunk.last_point().map(|p| p.z), Some(z));
    }

    #[test]
    fn prop_zig_zag_ramp_descends(
        xs in prop::collection::vec(0.5..8.0f64, 1..8),
        drop in 0.1..10.0f64,
        angle_deg in 5.0..80.0f64,
    ) {
        let zend = -drop;
        let mut points = vec![Point3::new(0.0, 0.0, zend)];
        let mut x = 0.0;
        for (i, dx) in xs.iter().enumerate() {
            x += dx;
            points.push(Point3::new(x, (i % 2) as f64, zend));
        }
        let out = zig_zag_ramp(&points, 0.0, zend, angle_deg.to_radians());
        prop_assert_eq!(out[0].z, 0.0);
        for w in out.windows(2) {
            prop_assert!(w[1].z <= w[0].z + 1e-12);
        }
        prop_assert!(out.iter().all(|p| p.z >= zend));
        prop_assert_eq!(out.last().map(|p| p.xy()), points.last().map(|p| p.xy()));
    }
}

#[test]
fn test_start_inside_tab_is_raised() {
    let bridges = tab();
    let mut chunk = Chunk::from_points(
        vec![Point3::new(5.0, 0.0, -4.0), Point3::new(5.0, 8.0, -4.0)],
        false,
    );
    insert_bridges(&mut chunk, &bridges, &ContourGeometry::default(), &FlatStock);
    assert_eq!(chunk.first_point().map(|p| p.z), Some(-2.0));
    assert_eq!(chunk.len(), 4);
    assert!(chunk.points()[1].xy().distance_to(&Point2::new(5.0, 1.0)) < 1e-9);
}
