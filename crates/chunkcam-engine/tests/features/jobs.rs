use chunkcam_core::{Point2, Point3};
use chunkcam_engine::{plan_job, ChunkEngine, ContourGeometry, EngineError};
use chunkcam_settings::{CuttingParameters, JobConfig, PolygonSpec, Strategy};
use tempfile::tempdir;

fn width(pass: &chunkcam_engine::ScheduledPass) -> f64 {
    pass.chunk.bounds_2d().map(|b| b.width()).unwrap_or(0.0)
}

fn run(job: &JobConfig) -> chunkcam_engine::Result<chunkcam_engine::EngineOutput> {
    let geometry = ContourGeometry::default();
    let mut plan = plan_job(job, &geometry)?;
    ChunkEngine::new(&job.params, &geometry)
        .with_depth(plan.depth.as_ref())
        .with_silhouette(plan.silhouette.as_ref())
        .run(&mut plan.arena, &plan.request)
}

#[test]
fn test_saved_job_runs_the_same() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pocket.json");
    let job = JobConfig {
        name: "pocket".to_string(),
        strategy: Strategy::Pocket,
        polygons: vec![PolygonSpec::rectangle(0.0, 0.0, 12.0, 12.0)],
        ..Default::default()
    };
    job.save_to_file(&path).unwrap();
    let loaded = JobConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, job);

    let a = run(&job).unwrap();
    let b = run(&loaded).unwrap();
    assert_eq!(a.stats, b.stats);
    assert_ne!(a.operation, b.operation);
}

#[test]
fn test_pocket_cuts_innermost_ring_first() {
    let job = JobConfig {
        strategy: Strategy::Pocket,
        polygons: vec![PolygonSpec::rectangle(0.0, 0.0, 30.0, 30.0)],
        ..Default::default()
    };
    let output = run(&job).unwrap();

    assert_eq!(output.stats.layers, 3);
    assert_eq!(output.stats.passes, output.stats.chunks * 3);
    assert!(output.passes.iter().all(|p| p.chunk.is_closed()));
    let first = width(&output.passes[0]);
    assert!(output.passes.iter().all(|p| width(p) >= first - 1e-9));
    assert!(first < 1.0);
    // the outermost ring comes last on every layer
    let last = output.passes.last().unwrap();
    assert!((width(last) - 27.0).abs() < 1e-6);
}

#[test]
fn test_profile_tab_leaves_bridge() {
    let job = JobConfig {
        polygons: vec![PolygonSpec::rectangle(0.0, 0.0, 20.0, 20.0)],
        tabs: vec![vec![Point2::new(-4.0, 10.0), Point2::new(1.0, 10.0)]],
        start_position: Point3::new(-10.0, -10.0, 5.0),
        params: CuttingParameters {
            use_bridges: true,
            bridge_width: 2.0,
            bridge_height: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let output = run(&job).unwrap();

    assert_eq!(output.stats.passes, 3);
    assert!(output.stats.bridge_points > 0);
    assert!(!output.tab_curve.is_empty());
    assert!(output.tab_curve.iter().flatten().all(|p| p.z == -2.0));
    // the deepest pass climbs over the tab on the left edge
    let deepest = &output.passes[2];
    assert!(deepest
        .chunk
        .points()
        .iter()
        .filter(|p| (p.x + 1.5).abs() < 1e-6 && p.y > 9.5 && p.y < 10.5)
        .all(|p| p.z >= -2.0));
    assert!(deepest.chunk.points().iter().any(|p| p.z == -3.0));
}

#[test]
fn test_inverted_job_depths_are_rejected() {
    let job = JobConfig {
        start_depth: -3.0,
        end_depth: 0.0,
        polygons: vec![PolygonSpec::rectangle(0.0, 0.0, 5.0, 5.0)],
        ..Default::default()
    };
    let err = run(&job).unwrap_err();
    assert!(matches!(err, EngineError::InvalidDepthRange { .. }));
    assert!(err.is_configuration_error());
}
