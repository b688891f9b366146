use std::{
    f64::consts::PI,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    config::{LoggingConfig, ModelConfig},
    forage::{ForageProvider, Supplement},
    genotype::{GenotypeOverrides, GenotypeRegistry},
    paddock::{Paddock, SupplementStore},
    population::{CohortTargets, GroupSelector, PopulationManager, Purchase},
    weather::DailyWeather,
    world::World,
};

fn default_snapshot_interval_days() -> u64 {
    30
}

fn default_latitude() -> f64 {
    -35.0
}

fn default_forage_name() -> String {
    "pasture".to_string()
}

fn default_feed() -> String {
    "grain".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub days: Option<u64>,
    #[serde(default = "default_snapshot_interval_days")]
    pub snapshot_interval_days: u64,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub weather: WeatherSpec,
    #[serde(default)]
    pub genotypes: Vec<GenotypeOverrides>,
    pub paddocks: Vec<PaddockSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub cohorts: Vec<CohortTargets>,
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

/// Daily weather, either a constant climate with an optional annual temperature cycle
/// or a recorded series repeated from the first day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSpec {
    pub min_t: f64,
    pub max_t: f64,
    pub rain: f64,
    pub wind: f64,
    /// Half the difference (°C) between mid-summer and mid-winter mean temperature.
    pub seasonal_amplitude: f64,
    pub series: Vec<WeatherRecord>,
}

impl Default for WeatherSpec {
    fn default() -> Self {
        Self {
            min_t: 8.0,
            max_t: 20.0,
            rain: 1.5,
            wind: 2.0,
            seasonal_amplitude: 0.0,
            series: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub min_t: f64,
    pub max_t: f64,
    #[serde(default)]
    pub rain: f64,
    #[serde(default)]
    pub wind: f64,
}

impl WeatherSpec {
    pub fn weather_for(&self, day: u64, day_of_year: u32, latitude: f64) -> DailyWeather {
        if !self.series.is_empty() {
            let record = self.series[(day % self.series.len() as u64) as usize];
            return DailyWeather {
                day_of_year,
                latitude,
                min_t: record.min_t,
                max_t: record.max_t,
                rain: record.rain,
                wind: record.wind,
            };
        }
        // warmest in mid-January south of the equator, mid-July north of it
        let warmest = if latitude < 0.0 { 15.0 } else { 196.0 };
        let shift = self.seasonal_amplitude * (2.0 * PI * (day_of_year as f64 - warmest) / 365.25).cos();
        DailyWeather {
            day_of_year,
            latitude,
            min_t: self.min_t + shift,
            max_t: self.max_t + shift,
            rain: self.rain,
            wind: self.wind,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaddockSpec {
    pub name: String,
    /// ha
    pub area: f64,
    #[serde(default)]
    pub slope: f64,
    #[serde(default)]
    pub waterlog: f64,
    #[serde(default)]
    pub forages: Vec<ForageSpec>,
    #[serde(default)]
    pub supplements: Vec<SupplementStore>,
    #[serde(default)]
    pub feed_first: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForageSpec {
    #[serde(default = "default_forage_name")]
    pub name: String,
    /// kg/ha
    pub green: f64,
    /// kg/ha
    #[serde(default)]
    pub dead: f64,
    #[serde(default)]
    pub legume: f64,
    /// Daily regrowth (kg/ha).
    #[serde(default)]
    pub growth: f64,
}

impl PaddockSpec {
    fn to_paddock(&self) -> Paddock {
        let mut paddock = Paddock::new(&self.name, self.area);
        paddock.slope = self.slope;
        paddock.waterlog = self.waterlog;
        paddock.feed_first = self.feed_first;
        paddock.supplements = self.supplements.clone();
        for forage in &self.forages {
            paddock = paddock.with_forage(ForageProvider::pasture(
                &forage.name,
                forage.green,
                forage.dead,
                forage.legume,
            ));
        }
        paddock
    }
}

/// An explicitly described group of animals, optionally placed in a named paddock.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    #[serde(flatten)]
    pub purchase: Purchase,
    #[serde(default)]
    pub paddock: Option<String>,
}

impl GroupSpec {
    pub fn add_to(&self, herd: &mut PopulationManager) -> Result<Option<usize>> {
        let Some(index) = herd.buy(&self.purchase)? else {
            return Ok(None);
        };
        if let Some(paddock) = &self.paddock {
            herd.move_to(GroupSelector::One(index), paddock)?;
        }
        Ok(Some(index))
    }
}

/// A management action taken on `day` (counted from zero) and, when `every` is
/// given, repeated at that interval until `until`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledEvent {
    pub day: u64,
    #[serde(default)]
    pub every: Option<u64>,
    #[serde(default)]
    pub until: Option<u64>,
    #[serde(flatten)]
    pub action: ManagementAction,
}

impl ScheduledEvent {
    pub fn is_due(&self, day: u64) -> bool {
        if day < self.day || self.until.is_some_and(|last| day > last) {
            return false;
        }
        match self.every {
            Some(every) if every > 0 => (day - self.day) % every == 0,
            _ => day == self.day,
        }
    }
}

/// Group indices are zero-based; a missing `group` applies the action to every group.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ManagementAction {
    Buy(GroupSpec),
    AddCohorts(CohortTargets),
    Sell {
        group: Option<usize>,
        number: u32,
    },
    Wean {
        group: Option<usize>,
        number: u32,
        #[serde(default = "default_true")]
        females: bool,
        #[serde(default = "default_true")]
        males: bool,
    },
    DryOff {
        group: Option<usize>,
        number: u32,
    },
    Split {
        group: usize,
        keep: u32,
    },
    SplitByWeight {
        group: Option<usize>,
        live_weight: f64,
    },
    SplitByYoung {
        group: Option<usize>,
    },
    Move {
        group: Option<usize>,
        paddock: String,
    },
    Tag {
        group: Option<usize>,
        tag: u32,
    },
    SortByTag,
    Join {
        group: Option<usize>,
        sire: String,
        days: u32,
    },
    Shear {
        group: Option<usize>,
        #[serde(default = "default_true")]
        adults: bool,
        #[serde(default)]
        young: bool,
    },
    Feed {
        paddock: String,
        /// Fresh weight (kg).
        amount: f64,
        /// "grain" or "hay" when no full description is given.
        #[serde(default = "default_feed")]
        feed: String,
        #[serde(default)]
        supplement: Option<Supplement>,
        #[serde(default)]
        feed_first: bool,
    },
    ClearFeed {
        paddock: String,
    },
    Castrate {
        group: Option<usize>,
        number: u32,
    },
}

impl ManagementAction {
    pub fn label(&self) -> &'static str {
        match self {
            ManagementAction::Buy(_) => "buy",
            ManagementAction::AddCohorts(_) => "add_cohorts",
            ManagementAction::Sell { .. } => "sell",
            ManagementAction::Wean { .. } => "wean",
            ManagementAction::DryOff { .. } => "dry_off",
            ManagementAction::Split { .. } => "split",
            ManagementAction::SplitByWeight { .. } => "split_by_weight",
            ManagementAction::SplitByYoung { .. } => "split_by_young",
            ManagementAction::Move { .. } => "move",
            ManagementAction::Tag { .. } => "tag",
            ManagementAction::SortByTag => "sort_by_tag",
            ManagementAction::Join { .. } => "join",
            ManagementAction::Shear { .. } => "shear",
            ManagementAction::Feed { .. } => "feed",
            ManagementAction::ClearFeed { .. } => "clear_feed",
            ManagementAction::Castrate { .. } => "castrate",
        }
    }
}

/// Resolves a feed named in a scenario file.
pub fn named_supplement(name: &str) -> Result<Supplement> {
    match name.trim().to_ascii_lowercase().as_str() {
        "grain" => Ok(Supplement::grain()),
        "hay" => Ok(Supplement::hay()),
        other => bail!("Supplement \"{other}\" is not known"),
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_world(&self) -> Result<World> {
        let mut registry = GenotypeRegistry::with_builtin_breeds();
        for overrides in &self.genotypes {
            registry
                .apply(overrides)
                .with_context(|| format!("Failed to define genotype {}", overrides.name))?;
        }

        let mut herd = PopulationManager::new(registry, self.model.condition_score_system);
        let mut growth: Vec<Vec<f64>> = Vec::with_capacity(self.paddocks.len());
        for spec in &self.paddocks {
            herd.add_paddock(spec.to_paddock());
            growth.push(spec.forages.iter().map(|f| f.growth).collect());
        }

        for (idx, group) in self.groups.iter().enumerate() {
            group
                .add_to(&mut herd)
                .with_context(|| format!("Failed to add group {idx} ({})", group.purchase.genotype))?;
        }

        let day_of_year = self.start_date.ordinal();
        for targets in &self.cohorts {
            herd.add_cohorts(targets, day_of_year, self.latitude)
                .with_context(|| format!("Failed to build {} cohorts", targets.genotype))?;
        }

        Ok(World::new(self.start_date, self.latitude, self.weather.clone(), herd)
            .with_events(self.events.clone())
            .with_pasture_growth(growth))
    }

    pub fn days(&self, override_days: Option<u64>) -> u64 {
        override_days.or(self.days).unwrap_or(365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeating_event_is_due_on_interval() {
        let event: ScheduledEvent = serde_yaml::from_str(
            "day: 10\nevery: 7\nuntil: 30\naction: feed\npaddock: home\namount: 50.0\n",
        )
        .unwrap();
        assert!(!event.is_due(9));
        assert!(event.is_due(10));
        assert!(!event.is_due(11));
        assert!(event.is_due(24));
        assert!(!event.is_due(31));
        assert!(matches!(event.action, ManagementAction::Feed { ref feed, .. } if feed == "grain"));
    }

    #[test]
    fn group_selector_defaults_to_all() {
        let event: ScheduledEvent = serde_yaml::from_str("day: 3\naction: shear\n").unwrap();
        match event.action {
            ManagementAction::Shear { group, adults, young } => {
                assert_eq!(GroupSelector::from(group), GroupSelector::All);
                assert!(adults);
                assert!(!young);
            }
            other => panic!("unexpected action {}", other.label()),
        }
    }

    #[test]
    fn buy_event_reads_purchase_fields() {
        let event: ScheduledEvent = serde_yaml::from_str(
            "day: 0\naction: buy\ngenotype: Merino\nsex: wether\nnumber: 40\npaddock: back\n",
        )
        .unwrap();
        let ManagementAction::Buy(group) = event.action else {
            panic!("expected a purchase");
        };
        assert_eq!(group.purchase.number, 40);
        assert_eq!(group.purchase.sex, "wether");
        assert_eq!(group.purchase.age_months, 24.0);
        assert_eq!(group.paddock.as_deref(), Some("back"));
    }

    #[test]
    fn seasonal_cycle_peaks_in_summer() {
        let spec = WeatherSpec {
            seasonal_amplitude: 6.0,
            ..WeatherSpec::default()
        };
        let summer = spec.weather_for(0, 15, -35.0);
        let winter = spec.weather_for(0, 197, -35.0);
        assert!((summer.max_t - 26.0).abs() < 1e-9);
        assert!(winter.max_t < 14.1);
        let north = spec.weather_for(0, 196, 40.0);
        assert!((north.max_t - 26.0).abs() < 1e-9);
    }

    #[test]
    fn recorded_series_repeats() {
        let spec = WeatherSpec {
            series: vec![
                WeatherRecord { min_t: 1.0, max_t: 10.0, rain: 0.0, wind: 1.0 },
                WeatherRecord { min_t: 2.0, max_t: 12.0, rain: 5.0, wind: 3.0 },
            ],
            ..WeatherSpec::default()
        };
        assert_eq!(spec.weather_for(3, 100, -35.0).rain, 5.0);
        assert_eq!(spec.weather_for(4, 101, -35.0).min_t, 1.0);
    }

    #[test]
    fn unknown_feed_is_rejected() {
        assert_eq!(named_supplement("Hay").unwrap().name, "hay");
        assert!(named_supplement("silage").is_err());
    }
}
