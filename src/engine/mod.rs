use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::{
    rng::{RngManager, SystemRng},
    snapshot::SnapshotWriter,
    world::{World, WorldSnapshot},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_days: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_days,
            ),
            settings: self.settings,
        }
    }
}

/// Runs the daily systems in order over a world, one simulated day per step.
pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn run(&mut self, world: &mut World, days: u64) -> Result<()> {
        self.run_with_hook(world, days, |_| {})
    }

    /// As [`Engine::run`], handing a snapshot of the world to `hook` after each day.
    pub fn run_with_hook<F>(&mut self, world: &mut World, days: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&WorldSnapshot),
    {
        info!(
            scenario = %self.settings.scenario_name,
            start = %world.date(),
            days,
            groups = world.herd().count(),
            "starting run"
        );
        for _ in 0..days {
            self.step(world)?;
            hook(&world.snapshot(&self.settings.scenario_name));
        }
        info!(
            scenario = %self.settings.scenario_name,
            end = %world.date(),
            head = world.total_head(),
            "run finished"
        );
        Ok(())
    }

    fn step(&mut self, world: &mut World) -> Result<()> {
        let day = world.day();
        let date = world.date();
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                day,
                date,
                scenario_name: &self.settings.scenario_name,
            };
            system
                .run(&ctx, world, &mut rng_stream)
                .with_context(|| format!("{} system failed on {date}", system.name()))?;
        }
        world.advance_time();
        self.snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;
        Ok(())
    }
}

pub struct SystemContext<'a> {
    /// Days since the start of the run.
    pub day: u64,
    pub date: NaiveDate,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
