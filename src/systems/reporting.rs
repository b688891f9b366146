use anyhow::Result;
use tracing::info;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{HerdSummary, World},
};

/// Records the day's herd totals and logs a summary every `interval_days`.
pub struct ReportingSystem {
    interval_days: u64,
}

impl ReportingSystem {
    pub fn new(interval_days: u64) -> Self {
        Self { interval_days }
    }
}

impl Default for ReportingSystem {
    fn default() -> Self {
        Self::new(30)
    }
}

impl System for ReportingSystem {
    fn name(&self) -> &str {
        "reporting"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let totals = world.herd.herd_totals();
        let stats = &world.last_day;
        let summary = HerdSummary {
            day: ctx.day,
            date: ctx.date,
            totals,
            substeps: stats.substeps.iter().sum(),
            rdp_retries: stats.rdp_retries,
        };
        world.record(summary);

        if self.interval_days > 0 && ctx.day % self.interval_days == 0 {
            let mean_weight = if totals.head + totals.young > 0 {
                totals.live_weight / (totals.head + totals.young) as f64
            } else {
                0.0
            };
            info!(
                scenario = ctx.scenario_name,
                date = %ctx.date,
                groups = totals.groups,
                head = totals.head,
                young = totals.young,
                mean_weight,
                dse = totals.dse,
                intake = totals.intake,
                deaths = totals.deaths,
                "herd summary"
            );
        }
        Ok(())
    }
}
