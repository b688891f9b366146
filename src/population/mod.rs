//! The herd: an ordered list of cohorts and the paddocks they occupy.
//!
//! Cohort order is significant. Cohorts in a paddock graze in list order, so the same
//! order gives bit-identical results across runs.

mod cohorts;
mod dynamics;
mod management;

use serde::Serialize;

use crate::cohort::{AnimalCohort, GrazingSite};
use crate::error::{StockError, StockResult};
use crate::excretion::Excretion;
use crate::genotype::{CondScoreSystem, GenotypeRegistry};
use crate::paddock::Paddock;

pub use cohorts::{CohortPlan, CohortTargets};
pub use dynamics::{step_length, DayStats};
pub use management::Purchase;

/// Live weight (kg) equivalent to one dry sheep equivalent per hectare.
const WEIGHT2DSE: f64 = 0.02;

/// Which cohorts a management operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GroupSelector {
    #[default]
    All,
    One(usize),
}

impl From<Option<usize>> for GroupSelector {
    fn from(index: Option<usize>) -> Self {
        index.map_or(GroupSelector::All, GroupSelector::One)
    }
}

/// Whole-herd totals for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HerdTotals {
    pub groups: usize,
    pub head: u32,
    pub young: u32,
    pub live_weight: f64,
    pub dse: f64,
    /// kg/day
    pub methane: f64,
    /// kg DM/day, herbage and supplement
    pub intake: f64,
    pub deaths: u32,
}

#[derive(Debug, Clone)]
pub struct PopulationManager {
    cohorts: Vec<AnimalCohort>,
    paddocks: Vec<Paddock>,
    registry: GenotypeRegistry,
    cond_system: CondScoreSystem,
}

impl PopulationManager {
    pub fn new(registry: GenotypeRegistry, cond_system: CondScoreSystem) -> Self {
        Self {
            cohorts: Vec::new(),
            paddocks: Vec::new(),
            registry,
            cond_system,
        }
    }

    pub fn registry(&self) -> &GenotypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut GenotypeRegistry {
        &mut self.registry
    }

    pub fn cond_system(&self) -> CondScoreSystem {
        self.cond_system
    }

    pub fn count(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    pub fn cohorts(&self) -> &[AnimalCohort] {
        &self.cohorts
    }

    pub fn cohort(&self, index: usize) -> StockResult<&AnimalCohort> {
        self.cohorts.get(index).ok_or(StockError::InvalidGroup(index))
    }

    pub fn cohort_mut(&mut self, index: usize) -> StockResult<&mut AnimalCohort> {
        self.cohorts.get_mut(index).ok_or(StockError::InvalidGroup(index))
    }

    pub fn paddocks(&self) -> &[Paddock] {
        &self.paddocks
    }

    pub fn paddock_mut(&mut self, index: usize) -> Option<&mut Paddock> {
        self.paddocks.get_mut(index)
    }

    pub fn add_paddock(&mut self, paddock: Paddock) -> usize {
        self.paddocks.push(paddock);
        self.paddocks.len() - 1
    }

    /// Index of the paddock called `name`, ignoring case.
    pub fn paddock_index(&self, name: &str) -> StockResult<usize> {
        self.paddocks
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| StockError::UnknownPaddock(name.to_string()))
    }

    /// The paddock new stock goes into: the first named paddock, else the first one. An
    /// unnamed one-hectare paddock is created when there are none.
    pub(crate) fn default_paddock(&mut self) -> usize {
        if self.paddocks.is_empty() {
            self.paddocks.push(Paddock::new("", 1.0));
        }
        self.paddocks.iter().position(|p| !p.name.is_empty()).unwrap_or(0)
    }

    fn resolve_paddock(&mut self, name: Option<&str>) -> StockResult<usize> {
        match name {
            Some(name) if !name.is_empty() => self.paddock_index(name),
            _ => Ok(self.default_paddock()),
        }
    }

    /// Appends `cohort` in paddock `paddock` with tag `tag` and returns its index.
    pub fn add(&mut self, mut cohort: AnimalCohort, paddock: usize, tag: u32) -> StockResult<usize> {
        let Some(padd) = self.paddocks.get(paddock) else {
            return Err(StockError::UnknownPaddock(paddock.to_string()));
        };
        cohort.paddock = paddock;
        cohort.tag = tag;
        cohort.set_forage_inputs(padd.forage_inputs(), self.site(paddock));
        self.cohorts.push(cohort);
        Ok(self.cohorts.len() - 1)
    }

    pub fn delete(&mut self, index: usize) -> StockResult<AnimalCohort> {
        if index >= self.cohorts.len() {
            return Err(StockError::InvalidGroup(index));
        }
        Ok(self.cohorts.remove(index))
    }

    /// Indices chosen by `selector`, in list order.
    pub(crate) fn selected(&self, selector: GroupSelector) -> StockResult<Vec<usize>> {
        match selector {
            GroupSelector::All => Ok((0..self.cohorts.len()).collect()),
            GroupSelector::One(index) if index < self.cohorts.len() => Ok(vec![index]),
            GroupSelector::One(index) => Err(StockError::InvalidGroup(index)),
        }
    }

    fn site(&self, paddock: usize) -> GrazingSite {
        let Some(padd) = self.paddocks.get(paddock) else {
            return GrazingSite::default();
        };
        let head: u32 = self
            .cohorts
            .iter()
            .filter(|c| c.paddock == paddock)
            .map(|c| c.no_animals())
            .sum();
        GrazingSite {
            steepness: padd.steepness(),
            waterlog: padd.waterlog,
            animals_per_ha: head as f64 / padd.area,
        }
    }

    pub fn highest_tag(&self) -> u32 {
        self.cohorts.iter().map(|c| c.tag).max().unwrap_or(0)
    }

    /// Stable sort of the cohorts by tag.
    pub fn sort_by_tag(&mut self) {
        self.cohorts.sort_by_key(|c| c.tag);
    }

    // Reporting -----------------------------------------------------------------

    /// Live weight of stock in a paddock (young included), in `unit`: `kg/ha`,
    /// `kg/m^2`, `dse/ha` or `g/m^2`.
    pub fn return_mass_per_area(&self, paddock: &str, unit: &str) -> StockResult<f64> {
        let index = self.paddock_index(paddock)?;
        let mass: f64 = self
            .cohorts
            .iter()
            .filter(|c| c.paddock == index)
            .map(|c| {
                let own = c.no_animals() as f64 * c.live_weight();
                own + c.young().map_or(0.0, |y| y.no_animals() as f64 * y.live_weight())
            })
            .sum();
        let kg_per_ha = mass / self.paddocks[index].area;
        match unit {
            "kg/ha" => Ok(kg_per_ha),
            "kg/m^2" => Ok(kg_per_ha * 0.0001),
            "dse/ha" => Ok(kg_per_ha * WEIGHT2DSE),
            "g/m^2" => Ok(kg_per_ha * 0.1),
            other => Err(StockError::UnsupportedUnit(other.to_string())),
        }
    }

    /// Today's excreta (kg/ha) from stock in `paddock`, or over the whole farm.
    pub fn return_excretion(&self, paddock: Option<&str>) -> StockResult<Excretion> {
        let (index, area) = match paddock {
            Some(name) => {
                let index = self.paddock_index(name)?;
                (Some(index), self.paddocks[index].area)
            }
            None if self.paddocks.is_empty() => (None, 1.0),
            None => (None, self.paddocks.iter().map(|p| p.area).sum()),
        };
        let total = self
            .cohorts
            .iter()
            .filter(|c| index.map_or(true, |i| c.paddock == i))
            .fold(Excretion::default(), |acc, c| acc + c.excretion());
        Ok(total * (1.0 / area))
    }

    pub fn sex_string(&self, index: usize, plural: bool) -> StockResult<String> {
        Ok(self.cohort(index)?.sex_string(plural))
    }

    pub fn herd_totals(&self) -> HerdTotals {
        let mut totals = HerdTotals {
            groups: self.cohorts.len(),
            ..HerdTotals::default()
        };
        for cohort in &self.cohorts {
            let number = cohort.no_animals();
            totals.head += number;
            totals.live_weight += number as f64 * cohort.live_weight();
            totals.dse += cohort.dse();
            totals.methane += cohort.methane();
            totals.intake += number as f64 * cohort.total_intake_per_head();
            totals.deaths += cohort.deaths();
            if let Some(young) = cohort.young() {
                totals.young += young.no_animals();
                totals.live_weight += young.no_animals() as f64 * young.live_weight();
                totals.intake += young.no_animals() as f64 * young.total_intake_per_head();
                totals.deaths += young.deaths();
            }
        }
        totals
    }
}
