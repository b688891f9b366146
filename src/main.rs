use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use grazstock::{
    config::init_logging,
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{ManagementSystem, ReportingSystem, StockSystem, WeatherSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Grazing livestock population runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/merino_flock.yaml")]
    scenario: PathBuf,

    /// Override the number of days simulated (uses scenario default when omitted)
    #[arg(long)]
    days: Option<u64>,

    /// Override snapshot interval in days
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Log filter, overriding the scenario's logging level
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;

    let mut logging = scenario.logging.clone();
    if let Some(level) = cli.log_level {
        logging.level = level;
    }
    init_logging(&logging);

    let mut world = scenario.build_world()?;
    let days = scenario.days(cli.days);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_days);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_days: snapshot_interval,
        snapshot_dir,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(WeatherSystem::new())
        .with_system(ManagementSystem::new())
        .with_system(StockSystem::new())
        .with_system(ReportingSystem::new(logging.report_interval_days))
        .build();

    engine.run(&mut world, days)?;
    let totals = world.herd().herd_totals();
    let wool = world.wool();
    info!(
        scenario = %scenario.name,
        days,
        head = totals.head,
        young = totals.young,
        greasy_wool = wool.greasy,
        "scenario complete"
    );
    println!(
        "Scenario '{}' completed for {} days. Final head count: {} adults, {} young",
        scenario.name, days, totals.head, totals.young
    );
    Ok(())
}
