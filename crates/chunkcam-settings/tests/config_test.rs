use chunkcam_core::Point2;
use chunkcam_settings::{
    CuttingParameters, HierarchyPolicy, JobConfig, JoinStyle, MovementType, PolygonSpec,
    SettingsError, Strategy,
};
use tempfile::TempDir;

fn sample_job() -> JobConfig {
    let mut job = JobConfig::new();
    job.name = "plate".to_string();
    job.end_depth = -6.0;
    job.params.stepdown = 2.0;
    job.params.movement = MovementType::Meander;
    job.polygons.push(
        PolygonSpec::rectangle(0.0, 0.0, 20.0, 20.0).with_hole(vec![
            Point2::new(5.0, 5.0),
            Point2::new(10.0, 5.0),
            Point2::new(10.0, 10.0),
        ]),
    );
    job.tabs.push(vec![Point2::new(-2.0, 10.0), Point2::new(2.0, 10.0)]);
    job
}

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("job.json");
    let job = sample_job();

    job.save_to_file(&path).unwrap();
    let loaded = JobConfig::load_from_file(&path).unwrap();

    assert_eq!(loaded, job);
}

#[test]
fn test_toml_parameters_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("job.toml");
    std::fs::write(
        &path,
        r#"
name = "toml job"
start_depth = 0.0
end_depth = -4.0
strategy = "pocket"

[params]
cutter_radius = 3.0
join_style = "mitre"
stepdown = 1.5
ramp = true

[[polygons]]
exterior = [{ x = 0.0, y = 0.0 }, { x = 30.0, y = 0.0 }, { x = 30.0, y = 30.0 }]
"#,
    )
    .unwrap();

    let job = JobConfig::load_from_file(&path).unwrap();

    assert_eq!(job.name, "toml job");
    assert_eq!(job.strategy, Strategy::Pocket);
    assert_eq!(job.hierarchy_policy(), HierarchyPolicy::Distance);
    assert_eq!(job.params.join_style, JoinStyle::Mitre);
    assert_eq!(job.params.cutter_radius, 3.0);
    assert!(job.params.ramp);
    // unspecified fields keep their defaults
    assert_eq!(job.params.circle_segments, 32);
    assert_eq!(job.polygons[0].exterior.len(), 3);
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("job.yaml");
    let err = sample_job().save_to_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Config(_)));
}

#[test]
fn test_invalid_job_is_not_saved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("job.json");
    let mut job = sample_job();
    job.params.cutter_radius = 0.0;

    let err = job.save_to_file(&path).unwrap_err();
    assert!(err.is_invalid_setting());
    assert!(!path.exists());
}

#[test]
fn test_parameter_validation() {
    let mut params = CuttingParameters::default();
    assert!(params.validate().is_ok());

    params.ramp_in_angle = 90.0;
    assert!(matches!(
        params.validate().unwrap_err(),
        SettingsError::Config(_)
    ));

    let mut params = CuttingParameters::default();
    params.stepdown = 0.0;
    assert!(params.validate().is_err());
    params.use_layers = false;
    assert!(params.validate().is_ok());

    let mut params = CuttingParameters::default();
    params.circle_segments = 3;
    assert!(params.validate().is_err());
}

#[test]
fn test_derived_distances() {
    let mut params = CuttingParameters::default();
    params.distance_between_paths = 1.0;
    assert_eq!(params.hierarchy_distance(), 2.0);
    assert_eq!(params.effective_merge_distance(), 3.0);

    params.parallel_step_back = true;
    assert_eq!(params.hierarchy_distance(), 4.0);
    assert_eq!(params.effective_merge_distance(), 6.0);

    params.merge_distance = Some(0.5);
    assert_eq!(params.effective_merge_distance(), 1.0);
}

#[test]
fn test_degenerate_polygon_rejected() {
    let mut job = sample_job();
    job.polygons
        .push(PolygonSpec::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]));
    assert!(job.validate().is_err());
}

#[test]
fn test_missing_job_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let err = JobConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Read { .. }));
    assert!(err.to_string().contains("absent.json"));
}
