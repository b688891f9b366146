use serde::{Deserialize, Serialize};

use crate::numerics::day_length;

/// Daily weather as seen by the animals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub day_of_year: u32,
    /// Decimal degrees, negative in the southern hemisphere.
    pub latitude: f64,
    pub min_t: f64,
    pub max_t: f64,
    /// mm
    pub rain: f64,
    /// Mean wind speed (m/s).
    pub wind: f64,
}

impl Default for DailyWeather {
    fn default() -> Self {
        Self {
            day_of_year: 1,
            latitude: -35.0,
            min_t: 10.0,
            max_t: 24.0,
            rain: 0.0,
            wind: 2.0,
        }
    }
}

impl DailyWeather {
    pub fn mean_t(&self) -> f64 {
        0.5 * (self.min_t + self.max_t)
    }

    pub fn day_length(&self) -> f64 {
        day_length(self.day_of_year, self.latitude, -6.0)
    }

    /// Chill index (kJ/m^2/h) experienced by newborn lambs.
    pub fn chill_index(&self, chill_c: &[f64; 8]) -> f64 {
        chill_c[1]
            + (chill_c[2] + chill_c[3] * self.wind.max(0.0).sqrt()) * (chill_c[4] - self.mean_t())
            + chill_c[5] * (1.0 - (-chill_c[6] * self.rain.min(chill_c[7])).exp())
    }
}
