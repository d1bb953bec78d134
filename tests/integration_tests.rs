use std::fs;
use std::path::Path;
use tempfile::TempDir;
use trainplan::{
    build_timeline, calculate_combined_metrics_dynamic, load_traces, FileTraceLoader, InMemoryTraceLoader, PlannerConfig,
    PowerProfile, PowerZone, Scenario, ScenarioComparison, ScenarioReport, TargetIntensityProjector, TargetTssRule,
    WorkoutTrace,
};

/// Integration tests that exercise the complete planning workflow

fn write_library(dir: &Path) {
    fs::write(
        dir.join("endurance.json"),
        r#"{"time": [0, 3600], "value": [0.6], "type": ["FTP"]}"#,
    )
    .unwrap();
    fs::write(
        dir.join("tempo.json"),
        r#"{"indoor": {"time": [0, 1800], "value": [0.8], "type": ["FTP"]},
            "outdoor": {"time": [0, 2400], "value": [0.7], "type": ["FTP"]}}"#,
    )
    .unwrap();
    fs::write(
        dir.join("zeroed.json"),
        r#"{"indoor": {"time": [0, 900], "value": [0.0]},
            "outdoor": {"time": [0, 1800], "value": [0.8]}}"#,
    )
    .unwrap();
    fs::write(dir.join("corrupt.json"), r#"{"time": "soon"}"#).unwrap();
}

fn legacy_profile() -> PowerProfile {
    serde_json::from_str(r#"{"powerProfile": {"ftp": 250, "nm": 1000, "ac": 500, "map": 350, "targetIntensity": 90}}"#)
        .unwrap()
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_complete_scenario_workflow() {
    let library = TempDir::new().unwrap();
    write_library(library.path());

    let scenario: Scenario = serde_json::from_str(
        r#"{"name": "Base week", "workouts": ["endurance", "corrupt", "tempo", "missing"]}"#,
    )
    .unwrap();
    scenario.validate(10).unwrap();

    let config = PlannerConfig::default();
    let profile = legacy_profile();
    let loader = FileTraceLoader::new(library.path());

    let metrics = calculate_combined_metrics_dynamic(&loader, &scenario.workouts, &profile, &config).await;

    assert_eq!(metrics.workout_count, 2);
    assert_eq!(metrics.total_duration, 5400.0);
    assert_eq!(metrics.total_elapsed_duration, 6000.0);
    assert_eq!(metrics.total_tss, 36.0 + 32.0);
    assert!((metrics.average_if - 0.6667).abs() < 1e-3);
    assert!((metrics.average_np - 166.667).abs() < 1e-2);

    let traces = load_traces(&loader, &scenario.workouts, config.loading.max_concurrent_loads).await;
    let report = ScenarioReport::build(&scenario.name, &scenario.workouts, &traces, &profile, None, &config);

    assert_eq!(report.metrics, metrics);
    assert_eq!(report.projection.target_intensity, 90.0);
    assert!(report.workouts[1].metrics.is_none());
    assert!(report.workouts[3].metrics.is_none());

    // 0.6 × 0.9 = 54% and 0.8 × 0.9 = 72%
    assert_eq!(report.zones.seconds_in(PowerZone::Recovery), 3600.0);
    assert_eq!(report.zones.seconds_in(PowerZone::Endurance), 1800.0);
}

#[tokio::test]
async fn test_zeroed_indoor_variant_falls_back_to_outdoor() {
    let library = TempDir::new().unwrap();
    write_library(library.path());

    let traces = load_traces(&FileTraceLoader::new(library.path()), &ids(&["zeroed"]), 1).await;
    assert_eq!(traces[0].as_ref().unwrap().duration(), 1800.0);
}

#[tokio::test]
async fn test_every_load_failing_resolves_to_zero_metrics() {
    let empty = TempDir::new().unwrap();
    let loader = FileTraceLoader::new(empty.path());

    let metrics =
        calculate_combined_metrics_dynamic(&loader, &ids(&["a", "b"]), &legacy_profile(), &PlannerConfig::default())
            .await;

    assert_eq!(metrics.workout_count, 0);
    assert_eq!(metrics.total_duration, 0.0);
    assert_eq!(metrics.total_elapsed_duration, 0.0);
    assert_eq!(metrics.total_tss, 0.0);
    assert_eq!(metrics.average_if, 0.0);
    assert_eq!(metrics.average_np, 0.0);
}

#[tokio::test]
async fn test_reordering_keeps_totals_but_changes_timeline() {
    let bundle = InMemoryTraceLoader::from_bundle_json(
        r#"{
            "easy": {"time": [0, 3600], "value": [0.5]},
            "hard": {"time": [0, 600, 1200], "value": [1.1, 0.6]}
        }"#,
    )
    .unwrap();
    let profile = PowerProfile::new(250.0, 1000.0, 500.0, 350.0);
    let config = PlannerConfig::default();

    let mut scenario = Scenario::new("Order");
    scenario.add_workout("easy", config.scenario.max_workouts).unwrap();
    scenario.add_workout("hard", config.scenario.max_workouts).unwrap();

    let before = calculate_combined_metrics_dynamic(&bundle, &scenario.workouts, &profile, &config).await;
    let traces_before: Vec<WorkoutTrace> = load_traces(&bundle, &scenario.workouts, 2).await.into_iter().flatten().collect();

    scenario.move_workout(1, 0).unwrap();

    let after = calculate_combined_metrics_dynamic(&bundle, &scenario.workouts, &profile, &config).await;
    let traces_after: Vec<WorkoutTrace> = load_traces(&bundle, &scenario.workouts, 2).await.into_iter().flatten().collect();

    assert_eq!(before.total_tss, after.total_tss);
    assert_eq!(before.total_duration, after.total_duration);
    assert!((before.average_np - after.average_np).abs() < 1e-9);

    let timeline_before = build_timeline(&traces_before, 1.0);
    let timeline_after = build_timeline(&traces_after, 1.0);
    assert_eq!(timeline_before[0].power_percent, 50.0);
    assert!((timeline_after[0].power_percent - 110.0).abs() < 1e-9);
    assert_eq!(timeline_after[2].time, 1200.0);
}

#[tokio::test]
async fn test_scenario_comparison_and_projection_rules() {
    let mut bundle = InMemoryTraceLoader::new();
    bundle.insert("steady", WorkoutTrace::ftp_relative(vec![0.0, 3600.0], vec![0.8]));
    bundle.insert("long", WorkoutTrace::ftp_relative(vec![0.0, 7200.0], vec![0.8]));

    let profile = PowerProfile::new(250.0, 1000.0, 500.0, 350.0);
    let config = PlannerConfig::default();

    let short = calculate_combined_metrics_dynamic(&bundle, &ids(&["steady"]), &profile, &config).await;
    let long = calculate_combined_metrics_dynamic(&bundle, &ids(&["steady", "long"]), &profile, &config).await;

    let comparison = ScenarioComparison::between(&short, &long);
    assert_eq!(comparison.tss_delta, 128.0);
    assert_eq!(comparison.elapsed_duration_delta, 7200.0 + 600.0);
    assert!(comparison.is_harder());

    // At 50%: r² scaling quarters TSS, linear scaling halves it
    let squared = TargetIntensityProjector::new(70.0, TargetTssRule::FromTargetIf).project(&long, 50.0);
    let linear = TargetIntensityProjector::new(70.0, TargetTssRule::Linear).project(&long, 50.0);
    assert!((squared.target_tss - 48.0).abs() < 1e-9);
    assert!((linear.target_tss - 96.0).abs() < 1e-9);
}

#[test]
fn test_scenario_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scenario.json");

    let mut scenario = Scenario::new("Saved");
    scenario.add_workout("endurance", 10).unwrap();
    scenario.add_workout("tempo", 10).unwrap();
    fs::write(&path, serde_json::to_string_pretty(&scenario).unwrap()).unwrap();

    let loaded: Scenario = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded, scenario);
    assert_eq!(loaded.stored_selections().len(), 2);
}

#[test]
fn test_text_report_file_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.txt");

    let traces = vec![Some(WorkoutTrace::ftp_relative(vec![0.0, 3600.0], vec![0.75]))];
    let report = ScenarioReport::build(
        "Printable",
        &ids(&["one"]),
        &traces,
        &PowerProfile::new(200.0, 0.0, 0.0, 0.0),
        Some(100.0),
        &PlannerConfig::default(),
    );

    let mut file = fs::File::create(&path).unwrap();
    report.write_text(&mut file).unwrap();
    drop(file);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("SCENARIO: Printable"));
    assert!(text.contains("Total TSS: 56"));
    assert!(text.contains("Moving time: 01:00:00"));
}
