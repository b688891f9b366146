use std::path::PathBuf;

use grazstock::{
    config::LoggingConfig,
    genotype::CondScoreSystem,
    scenario::{ManagementAction, ScenarioLoader},
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn scenario_path() -> PathBuf {
    PathBuf::from("scenarios/merino_flock.yaml")
}

#[test]
fn scenario_loader_reads_fixture() {
    let scenario = scenario_loader().load(scenario_path()).expect("scenario parses");
    assert_eq!(scenario.name, "merino_flock");
    assert_eq!(scenario.start_date.to_string(), "2024-04-09");
    assert_eq!(scenario.days(None), 120);
    assert_eq!(scenario.days(Some(7)), 7);
    assert_eq!(scenario.paddocks.len(), 2);
    assert_eq!(scenario.groups.len(), 1);
    assert_eq!(scenario.cohorts.len(), 1);
    assert_eq!(scenario.events.len(), 4);
    assert_eq!(scenario.logging, LoggingConfig::default());
    assert_eq!(scenario.model.condition_score_system, CondScoreSystem::OneToFive);
    assert!(matches!(scenario.events[3].action, ManagementAction::Sell { group: Some(0), number: 50 }));
}

#[test]
fn missing_file_names_the_path() {
    let err = scenario_loader().load("scenarios/nowhere.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("nowhere.yaml"));
}

#[test]
fn build_world_places_stock() {
    let scenario = scenario_loader().load(scenario_path()).unwrap();
    let world = scenario.build_world().expect("world builds");
    let herd = world.herd();
    assert_eq!(herd.paddocks().len(), 2);

    let wethers = herd.cohort(0).unwrap();
    assert_eq!(wethers.no_animals(), 200);
    assert_eq!(herd.paddocks()[wethers.paddock].name, "back");
    assert_eq!(herd.sex_string(0, true).unwrap(), "wethers");

    let totals = herd.herd_totals();
    assert_eq!(totals.head, 600);
    assert!(herd.cohorts()[1..].iter().all(|c| c.tag == 1));
    assert!(herd.cohorts()[1..].iter().any(|c| c.is_pregnant()));
    assert_eq!(world.day(), 0);
    assert_eq!(world.day_of_year(), 100);
}

#[test]
fn unknown_genotype_fails_with_context() {
    let mut scenario = scenario_loader().load(scenario_path()).unwrap();
    scenario.groups[0].purchase.genotype = "Wiltipoll".to_string();
    let err = scenario.build_world().err().expect("build fails");
    let message = format!("{err:#}");
    assert!(message.contains("Failed to add group 0"));
    assert!(message.contains("Wiltipoll"));
}
