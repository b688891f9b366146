use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Sets today's weather and adds the day's pasture growth to each paddock.
pub struct WeatherSystem;

impl WeatherSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WeatherSystem {
    fn name(&self) -> &str {
        "weather"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let day_of_year = world.day_of_year();
        world.weather = world.climate.weather_for(ctx.day, day_of_year, world.latitude());
        for (idx, growth) in world.pasture_growth.iter().enumerate() {
            let Some(paddock) = world.herd.paddock_mut(idx) else {
                continue;
            };
            for (forage, &green) in paddock.forages.iter_mut().zip(growth) {
                if green > 0.0 {
                    forage.regrow(green);
                }
            }
        }
        Ok(())
    }
}
