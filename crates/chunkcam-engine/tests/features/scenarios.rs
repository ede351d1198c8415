use chunkcam_core::Point3;
use chunkcam_engine::{
    compute_layers, resolve_polygon, Chunk, ChunkArena, ChunkEngine, ContourGeometry,
    EngineRequest, HeightMap, HierarchyPlan, Layer, Polygon2, Sequencer,
};
use chunkcam_settings::{CuttingParameters, HeightMapSpec, MovementType};

fn square_chunk(x: f64, y: f64, size: f64) -> Chunk {
    Chunk::from_ring(&Polygon2::rectangle(x, y, size, size).exterior, 0.0)
}

#[test]
fn test_scenario_depth_first_square() {
    let params = CuttingParameters {
        stepdown: 2.0,
        use_layers: true,
        first_down: true,
        ..Default::default()
    };
    let geometry = ContourGeometry::default();
    let mut arena = ChunkArena::new();
    let square = arena.push(Chunk::from_points(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ],
        true,
    ));
    let far = arena.push(square_chunk(100.0, 0.0, 10.0));

    assert_eq!(
        compute_layers(0.0, -6.0, &params).unwrap(),
        vec![
            Layer { start: 0.0, end: -2.0 },
            Layer { start: -2.0, end: -4.0 },
            Layer { start: -4.0, end: -6.0 },
        ]
    );

    let output = ChunkEngine::new(&params, &geometry)
        .run(&mut arena, &EngineRequest::new(0.0, -6.0))
        .unwrap();

    let sources: Vec<_> = output.passes.iter().map(|p| p.source()).collect();
    assert_eq!(sources, vec![square, square, square, far, far, far]);
    for (pass, z) in output.passes[..3].iter().zip([-2.0, -4.0, -6.0]) {
        assert!(pass.chunk.points().iter().all(|p| p.z == z));
        assert_eq!(pass.chunk.len(), 5);
        assert_eq!(pass.chunk.first_point(), pass.chunk.last_point());
    }
    // the arena chunk keeps its original height
    assert!(arena[square].points().iter().all(|p| p.z == 0.0));
}

#[test]
fn test_scenario_inner_square_first() {
    let mut arena = ChunkArena::new();
    let outer = arena.push(square_chunk(0.0, 0.0, 20.0));
    let inner = arena.push(square_chunk(7.5, 7.5, 5.0));
    let mut warnings = Vec::new();
    resolve_polygon(&mut arena, &ContourGeometry::default(), &mut warnings).unwrap();

    assert!(arena[outer].children.contains(&inner));
    assert!(arena[inner].parents.contains(&outer));

    let order = Sequencer::new(&mut arena, Point3::new(-50.0, -50.0, 0.0), MovementType::Climb)
        .sequence()
        .unwrap();
    assert_eq!(order, vec![inner, outer]);
}

#[test]
fn test_heightmap_floor_lifts_pass() {
    let params = CuttingParameters {
        cutter_radius: 0.1,
        stepdown: 5.0,
        ..Default::default()
    };
    // 3 x 3 grid at 5 mm pitch with a raised centre column
    let spec = HeightMapSpec {
        origin: chunkcam_core::Point2::new(0.0, 0.0),
        resolution: 5.0,
        columns: 3,
        rows: 3,
        heights: vec![-5.0, -1.0, -5.0, -5.0, -1.0, -5.0, -5.0, -1.0, -5.0],
    };
    let map = HeightMap::new(&spec, params.cutter_radius);
    let geometry = ContourGeometry::default();
    let mut arena = ChunkArena::new();
    arena.push(Chunk::from_points(
        vec![Point3::new(0.0, 5.0, 0.0), Point3::new(5.0, 5.0, 0.0), Point3::new(10.0, 5.0, 0.0)],
        false,
    ));
    let output = ChunkEngine::new(&params, &geometry)
        .with_depth(&map)
        .run(&mut arena, &EngineRequest::new(0.0, -4.0).with_hierarchy(HierarchyPlan::Keep))
        .unwrap();
    let zs: Vec<f64> = output.passes[0].chunk.points().iter().map(|p| p.z).collect();
    assert_eq!(zs, vec![-4.0, -1.0, -4.0]);
}
