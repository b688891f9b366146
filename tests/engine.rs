use std::path::PathBuf;

use grazstock::{
    engine::{EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    systems::{ManagementSystem, ReportingSystem, StockSystem, WeatherSystem},
};
use tempfile::tempdir;

fn scenario() -> Scenario {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/merino_flock.yaml")
        .expect("scenario parses")
}

fn build_engine(seed: u64, snapshot_dir: PathBuf, snapshot_interval: u64) -> EngineBuilder {
    let settings = EngineSettings {
        scenario_name: "merino_flock".into(),
        seed,
        snapshot_interval_days: snapshot_interval,
        snapshot_dir,
    };
    EngineBuilder::new(settings)
        .with_system(WeatherSystem::new())
        .with_system(ManagementSystem::new())
        .with_system(StockSystem::new())
        .with_system(ReportingSystem::new(30))
}

#[test]
fn engine_runs_deterministically() {
    let scenario = scenario();
    let temp = tempdir().expect("tempdir");
    let days = 40;

    let mut world_a = scenario.build_world().unwrap();
    let mut engine_a = build_engine(scenario.seed, temp.path().to_path_buf(), 0).build();
    engine_a.run(&mut world_a, days).unwrap();

    let mut world_b = scenario.build_world().unwrap();
    let mut engine_b = build_engine(scenario.seed, temp.path().to_path_buf(), 0).build();
    engine_b.run(&mut world_b, days).unwrap();

    let a = serde_json::to_string(&world_a.snapshot("a")).unwrap();
    let b = serde_json::to_string(&world_b.snapshot("a")).unwrap();
    assert_eq!(a, b);
    assert_eq!(world_a.day(), days);
}

#[test]
fn engine_runs_hook_each_day() {
    let scenario = scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf(), 0).build();

    let mut days = Vec::new();
    engine
        .run_with_hook(&mut world, 6, |snapshot| days.push(snapshot.day))
        .expect("run succeeds");

    assert_eq!(days, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(world.history().len(), 6);
    assert_eq!(world.history()[0].day, 0);
}

#[test]
fn snapshots_are_written_on_interval() {
    let scenario = scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf(), 10).build();
    engine.run(&mut world, 20).unwrap();

    let dir = temp.path().join("merino_flock");
    assert!(dir.join("day_000010.json").exists());
    assert!(dir.join("day_000020.json").exists());
    assert!(!dir.join("day_000005.json").exists());

    let data = std::fs::read_to_string(dir.join("day_000020.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&data).unwrap();
    assert_eq!(json["day"], 20);
    assert_eq!(json["date"], "2024-04-29");
    assert_eq!(json["paddocks"].as_array().map(Vec::len), Some(2));
}

#[test]
fn scheduled_events_change_the_herd() {
    let scenario = scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf(), 0).build();

    engine.run(&mut world, 30).unwrap();
    let home = world.herd().paddock_index("home").unwrap();
    assert_eq!(world.wool().greasy, 0.0);

    engine.run(&mut world, 31).unwrap();
    assert!(world.wool().greasy > 0.0);
    assert!(world.wool().clean < world.wool().greasy);
    assert_eq!(world.herd().cohort(0).unwrap().paddock, home);
}

#[test]
fn stock_live_through_the_run() {
    let scenario = scenario();
    let mut world = scenario.build_world().unwrap();
    let temp = tempdir().expect("tempdir");
    let mut engine = build_engine(scenario.seed, temp.path().to_path_buf(), 0).build();
    engine.run(&mut world, scenario.days(None)).unwrap();

    let totals = world.herd().herd_totals();
    assert!(totals.head > 0);
    // 50 wethers are sold on day 100
    assert!(totals.head <= 550);
    assert!(world.history().iter().all(|h| h.substeps >= 1));
    assert!(world.weather().max_t < 19.0);
}
