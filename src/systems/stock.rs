use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Advances every cohort by one day of grazing, growth and ageing.
pub struct StockSystem;

impl StockSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StockSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for StockSystem {
    fn name(&self) -> &str {
        "stock"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let weather = world.weather;
        let stats = world.herd.dynamics(&weather, rng)?;
        if stats.rdp_retries > 0 {
            debug!(
                day = ctx.day,
                paddocks = stats.rdp_retries,
                "grazing replayed for a degradable protein shortfall"
            );
        }
        debug!(
            day = ctx.day,
            substeps = ?stats.substeps,
            new_groups = stats.new_groups,
            "stock advanced"
        );
        world.last_day = stats;
        Ok(())
    }
}
