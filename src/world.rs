use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::{
    cohort::FleeceCut,
    population::{DayStats, HerdTotals, PopulationManager},
    scenario::{ScheduledEvent, WeatherSpec},
    weather::DailyWeather,
};

/// Summaries older than this many days are dropped from the history.
const HISTORY_DAYS: usize = 3660;

/// One day's herd totals as recorded by the reporting system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HerdSummary {
    pub day: u64,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: HerdTotals,
    pub substeps: usize,
    pub rdp_retries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSnapshot {
    pub index: usize,
    pub breed: String,
    pub sex: String,
    pub tag: u32,
    pub paddock: String,
    pub number: u32,
    pub age_days: u32,
    pub live_weight: f64,
    pub condition_score: f64,
    pub fleece_weight: f64,
    pub days_pregnant: u32,
    pub foetuses: usize,
    pub days_lactating: u32,
    pub young: u32,
    pub young_weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaddockSnapshot {
    pub name: String,
    pub area: f64,
    /// kg/ha
    pub green: f64,
    /// kg/ha
    pub dead: f64,
    /// kg
    pub supplement: f64,
    pub stocking_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub day: u64,
    pub date: NaiveDate,
    pub weather: DailyWeather,
    pub totals: HerdTotals,
    pub wool: WoolTally,
    pub groups: Vec<GroupSnapshot>,
    pub paddocks: Vec<PaddockSnapshot>,
}

/// Wool removed at shearing since the start of the run (kg).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WoolTally {
    pub greasy: f64,
    pub clean: f64,
}

impl WoolTally {
    pub fn add(&mut self, cut: FleeceCut) {
        self.greasy += cut.greasy;
        self.clean += cut.clean;
    }
}

/// Everything the daily systems read and write.
pub struct World {
    day: u64,
    start_date: NaiveDate,
    latitude: f64,
    pub(crate) weather: DailyWeather,
    pub(crate) climate: WeatherSpec,
    /// Daily growth (kg/ha) of each forage in each paddock, in paddock order.
    pub(crate) pasture_growth: Vec<Vec<f64>>,
    pub(crate) herd: PopulationManager,
    pub(crate) events: Vec<ScheduledEvent>,
    pub(crate) last_day: DayStats,
    pub(crate) wool: WoolTally,
    history: Vec<HerdSummary>,
}

impl World {
    pub fn new(start_date: NaiveDate, latitude: f64, climate: WeatherSpec, herd: PopulationManager) -> Self {
        let mut world = Self {
            day: 0,
            start_date,
            latitude,
            weather: DailyWeather::default(),
            climate,
            pasture_growth: Vec::new(),
            herd,
            events: Vec::new(),
            last_day: DayStats::default(),
            wool: WoolTally::default(),
            history: Vec::new(),
        };
        world.weather = world.climate.weather_for(0, world.day_of_year(), latitude);
        world
    }

    pub fn with_events(mut self, events: Vec<ScheduledEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_pasture_growth(mut self, growth: Vec<Vec<f64>>) -> Self {
        self.pasture_growth = growth;
        self
    }

    /// Days simulated so far.
    pub fn day(&self) -> u64 {
        self.day
    }

    pub fn date(&self) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(self.day))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn day_of_year(&self) -> u32 {
        self.date().ordinal()
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn weather(&self) -> &DailyWeather {
        &self.weather
    }

    pub fn herd(&self) -> &PopulationManager {
        &self.herd
    }

    pub fn herd_mut(&mut self) -> &mut PopulationManager {
        &mut self.herd
    }

    pub fn last_day(&self) -> &DayStats {
        &self.last_day
    }

    pub fn wool(&self) -> WoolTally {
        self.wool
    }

    pub fn history(&self) -> &[HerdSummary] {
        &self.history
    }

    pub fn record(&mut self, summary: HerdSummary) {
        self.history.push(summary);
        if self.history.len() > HISTORY_DAYS {
            let excess = self.history.len() - HISTORY_DAYS;
            self.history.drain(..excess);
        }
    }

    pub fn advance_time(&mut self) {
        self.day += 1;
    }

    pub fn total_head(&self) -> u32 {
        self.herd.herd_totals().head
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let herd = &self.herd;
        let system = herd.cond_system();
        let paddocks = herd.paddocks();
        let groups = herd
            .cohorts()
            .iter()
            .enumerate()
            .map(|(index, cohort)| GroupSnapshot {
                index,
                breed: cohort.breed().to_string(),
                sex: cohort.sex_string(true),
                tag: cohort.tag,
                paddock: paddocks
                    .get(cohort.paddock)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                number: cohort.no_animals(),
                age_days: cohort.age_days(),
                live_weight: cohort.live_weight(),
                condition_score: cohort.condition_score(system),
                fleece_weight: cohort.fleece_weight(),
                days_pregnant: cohort.days_pregnant(),
                foetuses: cohort.no_foetuses(),
                days_lactating: cohort.days_lactating(),
                young: cohort.young().map_or(0, |y| y.no_animals()),
                young_weight: cohort.young().map(|y| y.live_weight()),
            })
            .collect();
        let paddocks = paddocks
            .iter()
            .map(|paddock| PaddockSnapshot {
                name: paddock.name.clone(),
                area: paddock.area,
                green: paddock.forages.iter().map(|f| f.availability.total_green).sum(),
                dead: paddock.forages.iter().map(|f| f.availability.total_dead).sum(),
                supplement: paddock.supplement_offered(),
                stocking_rate: herd.return_mass_per_area(&paddock.name, "dse/ha").unwrap_or(0.0),
            })
            .collect();
        WorldSnapshot {
            scenario: scenario.to_string(),
            day: self.day,
            date: self.date(),
            weather: self.weather,
            totals: herd.herd_totals(),
            wool: self.wool,
            groups,
            paddocks,
        }
    }
}
