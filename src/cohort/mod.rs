//! Animal cohorts: groups of identical animals sharing a paddock and a tag.
//!
//! A lactating cohort owns its suckling offspring as a nested `young` cohort, which is
//! grazed, fed and aged together with its mothers.

mod intake;
mod lifecycle;
mod nutrition;

use std::sync::Arc;

use serde::Serialize;

use crate::error::{StockError, StockResult};
use crate::excretion::Excretion;
use crate::forage::{ForageAvailability, Supplement, DIG_CLASSES};
use crate::genotype::{condition_to_cond_score, AnimalKind, CondScoreSystem, Genotype, ReproType};
use crate::numerics::xdiv;

pub use intake::GrazingRates;
pub use lifecycle::FleeceCut;
pub use nutrition::{AnimalOutput, DietTally, Efficiencies, EnergyUse, MeIntake, ProteinUse};

/// ME intake of a 50 kg dry sheep at maintenance (MJ/day).
const DSE_REF_MEI: f64 = 8.8;
/// Days before term at which pregnancy is classed as late.
const LATE_PREG_DAYS: u32 = 42;

/// Systematic differences carried by animals split off a cohort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightDiffs {
    pub std_ref_wt: f64,
    pub base_weight: f64,
    pub fleece_wt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Lactation {
    lactating: bool,
    days: u32,
    no_offspring: usize,
    previous_offspring: usize,
    birth_condition: f64,
    adjust: f64,
    ratio: f64,
    prop_max_milk: f64,
    milk_energy: f64,
    milk_protein: f64,
    milk_yield: f64,
    dry_off_time: f64,
}

impl Default for Lactation {
    fn default() -> Self {
        Self {
            lactating: false,
            days: 0,
            no_offspring: 0,
            previous_offspring: 0,
            birth_condition: 0.0,
            adjust: 1.0,
            ratio: 1.0,
            prop_max_milk: 0.0,
            milk_energy: 0.0,
            milk_protein: 0.0,
            milk_yield: 0.0,
            dry_off_time: 0.0,
        }
    }
}

/// State captured before grazing so an RDP-limited day can be replayed.
#[derive(Debug, Clone, PartialEq)]
struct StateSnapshot {
    base_weight: f64,
    wool_wt: f64,
    fibre_diam: f64,
    foetal_weight: f64,
    lact_adjust: f64,
    lact_ratio: f64,
    pot_intake: f64,
}

/// Paddock conditions a cohort grazes under for the day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrazingSite {
    pub steepness: f64,
    pub waterlog: f64,
    pub animals_per_ha: f64,
}

impl Default for GrazingSite {
    fn default() -> Self {
        Self {
            steepness: 1.0,
            waterlog: 0.0,
            animals_per_ha: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimalCohort {
    genotype: Arc<Genotype>,
    repro: ReproType,
    male_no: u32,
    female_no: u32,
    age_days: u32,
    /// Index of the occupied paddock.
    pub paddock: usize,
    pub tag: u32,

    std_ref_wt: f64,
    birth_weight: f64,
    base_weight: f64,
    max_prev_weight: f64,
    normal_weight: f64,
    relative_size: f64,
    body_condition: f64,
    wool_wt: f64,
    fibre_diam: f64,
    weight_change: f64,
    greasy_fleece_growth: f64,

    mated_to: Option<Arc<Genotype>>,
    days_to_mate: i32,
    mate_cycle: i32,
    foetal_age: u32,
    no_foetuses: usize,
    foetal_weight: f64,

    lact: Lactation,
    /// True for offspring still drinking their mothers' milk.
    suckling: bool,
    is_young: bool,
    young: Option<Box<AnimalCohort>>,

    chill_index: Option<f64>,
    deaths: u32,

    pot_intake: f64,
    start_fu: f64,
    waterlog_scalar: f64,
    site: GrazingSite,
    initial_inputs: ForageAvailability,
    step_inputs: ForageAvailability,
    ration: Option<Supplement>,
    supp_fw_per_head: f64,
    milk_supply: (f64, f64),
    state: AnimalOutput,
    snapshot: Option<StateSnapshot>,
    rdp_factor: f64,
}

impl AnimalCohort {
    /// A non-pregnant, non-lactating cohort. `live_weight` includes `fleece_wt`.
    pub fn new(
        genotype: Arc<Genotype>,
        repro: ReproType,
        number: u32,
        age_days: u32,
        live_weight: f64,
        fleece_wt: f64,
    ) -> StockResult<Self> {
        if live_weight <= 0.0 {
            return Err(StockError::InvalidParameter {
                name: "live weight",
                value: live_weight,
            });
        }
        let fleece_wt = if genotype.kind == AnimalKind::Sheep {
            fleece_wt.max(0.0)
        } else {
            0.0
        };
        let (male_no, female_no) = if repro.is_male() { (number, 0) } else { (0, number) };
        let std_ref_wt = genotype.sex_std_ref_wt(repro);
        let birth_weight = genotype.std_birth_wt(1);
        let base_weight = (live_weight - fleece_wt).max(0.01 * std_ref_wt);
        let max_normal = genotype.max_normal_wt(std_ref_wt, birth_weight, age_days as f64);
        let fibre_diam = genotype.default_micron(age_days as f64, repro, DAYS_FOR_MICRON, fleece_wt);

        let mut cohort = Self {
            genotype,
            repro,
            male_no,
            female_no,
            age_days,
            paddock: 0,
            tag: 0,
            std_ref_wt,
            birth_weight,
            base_weight,
            max_prev_weight: base_weight.max(max_normal),
            normal_weight: 0.0,
            relative_size: 0.0,
            body_condition: 0.0,
            wool_wt: fleece_wt,
            fibre_diam,
            weight_change: 0.0,
            greasy_fleece_growth: 0.0,
            mated_to: None,
            days_to_mate: 0,
            mate_cycle: -1,
            foetal_age: 0,
            no_foetuses: 0,
            foetal_weight: 0.0,
            lact: Lactation::default(),
            suckling: false,
            is_young: false,
            young: None,
            chill_index: None,
            deaths: 0,
            pot_intake: 0.0,
            start_fu: 1.0,
            waterlog_scalar: 1.0,
            site: GrazingSite::default(),
            initial_inputs: ForageAvailability::default(),
            step_inputs: ForageAvailability::default(),
            ration: None,
            supp_fw_per_head: 0.0,
            milk_supply: (0.0, 0.0),
            state: AnimalOutput::default(),
            snapshot: None,
            rdp_factor: 1.0,
        };
        if cohort.genotype.kind == AnimalKind::Sheep {
            let wc = &cohort.genotype.wool_c;
            let age_factor = wc[5] + (1.0 - wc[5]) * (1.0 - (-wc[12] * age_days as f64).exp());
            cohort.greasy_fleece_growth =
                cohort.genotype.fleece_ratio * std_ref_wt * age_factor / crate::genotype::DAYS_PER_YEAR;
        }
        cohort.calculate_weights();
        Ok(cohort)
    }

    /// Places the females `days` into pregnancy with `foetuses` young each.
    pub fn set_pregnancy(&mut self, days: u32, foetuses: usize) {
        if self.repro.is_male() {
            return;
        }
        if days == 0 || foetuses == 0 {
            self.repro = ReproType::Empty;
            self.foetal_age = 0;
            self.no_foetuses = 0;
            self.foetal_weight = 0.0;
            return;
        }
        self.no_foetuses = foetuses.min(self.genotype.max_young.max(1));
        self.foetal_age = days;
        self.repro = if days + LATE_PREG_DAYS >= self.genotype.gestation() {
            ReproType::LatePreg
        } else {
            ReproType::EarlyPreg
        };
        self.foetal_weight = self.foetal_norm_wt();
    }

    /// Starts lactation `days` after birth. With `offspring > 0` a suckling young cohort
    /// is attached, weighing `young_weight` (defaults to the growth curve).
    pub fn set_lactation(
        &mut self,
        days: u32,
        offspring: usize,
        young_weight: Option<f64>,
        young_fleece: f64,
    ) -> StockResult<()> {
        if self.repro.is_male() || days == 0 {
            self.end_lactation();
            self.young = None;
            return Ok(());
        }
        self.lact.lactating = true;
        self.lact.days = days;
        self.lact.no_offspring = offspring;
        self.lact.birth_condition = self.body_condition;
        self.lact.adjust = 1.0;
        self.lact.ratio = 1.0;
        self.lact.prop_max_milk = 1.0;
        self.young = if offspring > 0 {
            let genotype = self.offspring_genotype()?;
            let number = self.female_no * offspring as u32;
            let weight = young_weight
                .unwrap_or_else(|| genotype.growth_curve(days as f64, ReproType::Male));
            Some(Box::new(Self::new_young(genotype, number, days, weight, young_fleece)?))
        } else {
            None
        };
        Ok(())
    }

    /// Sire genotype of the current or next pregnancy.
    pub fn set_mated_to(&mut self, sire: Option<Arc<Genotype>>) {
        self.mated_to = sire;
    }

    fn new_young(
        genotype: Arc<Genotype>,
        number: u32,
        age_days: u32,
        live_weight: f64,
        fleece_wt: f64,
    ) -> StockResult<Self> {
        let mut young = Self::new(genotype, ReproType::Male, number, age_days, live_weight, fleece_wt)?;
        young.male_no = number / 2;
        young.female_no = number - young.male_no;
        young.suckling = true;
        young.is_young = true;
        young.recompute_srw();
        young.max_prev_weight = young.base_weight;
        young.calculate_weights();
        Ok(young)
    }

    fn offspring_genotype(&self) -> StockResult<Arc<Genotype>> {
        match &self.mated_to {
            Some(sire) => Genotype::cross(None, &self.genotype, sire, 0.5, 0.5).map(Arc::new),
            None => Ok(Arc::clone(&self.genotype)),
        }
    }

    /// Mean standard reference weight over the sexes present.
    fn recompute_srw(&mut self) {
        let total = self.no_animals();
        if total == 0 {
            self.std_ref_wt = self.genotype.sex_std_ref_wt(self.repro);
            return;
        }
        let male_srw = self.genotype.sex_std_ref_wt(if self.repro.is_male() {
            self.repro
        } else {
            ReproType::Male
        });
        let female_srw = self.genotype.sex_std_ref_wt(ReproType::Empty);
        self.std_ref_wt =
            (male_srw * self.male_no as f64 + female_srw * self.female_no as f64) / total as f64;
    }

    pub(crate) fn calculate_weights(&mut self) {
        self.max_prev_weight = self.max_prev_weight.max(self.base_weight);
        let max_normal = self.max_normal_wt();
        let c3 = self.genotype.growth_c[3];
        self.normal_weight = max_normal.min(c3 * max_normal + (1.0 - c3) * self.max_prev_weight);
        self.relative_size = self.normal_weight / self.std_ref_wt;
        self.body_condition = self.base_weight / self.normal_weight;
    }

    fn max_normal_wt(&self) -> f64 {
        self.genotype
            .max_normal_wt(self.std_ref_wt, self.birth_weight, self.age_days as f64)
    }

    /// Adjusts the maximum previous weight so that the current base weight corresponds to
    /// relative condition `condition`.
    pub fn set_condition_at_weight(&mut self, condition: f64) {
        let max_norm = self.max_normal_wt();
        let c3 = self.genotype.growth_c[3];
        let max_prev = if self.base_weight >= max_norm {
            self.base_weight
        } else {
            let wanted = (self.base_weight - condition * c3 * max_norm) / (condition * (1.0 - c3));
            wanted.min(max_norm).max(self.base_weight)
        };
        self.max_prev_weight = max_prev;
        self.calculate_weights();
    }

    pub fn set_condition_score(&mut self, score: f64, system: CondScoreSystem) {
        self.base_weight =
            self.normal_weight * crate::genotype::cond_score_to_condition(score, system);
        self.calculate_weights();
    }

    // Reporting -----------------------------------------------------------------

    pub fn genotype(&self) -> &Arc<Genotype> {
        &self.genotype
    }

    pub fn breed(&self) -> &str {
        &self.genotype.name
    }

    pub fn kind(&self) -> AnimalKind {
        self.genotype.kind
    }

    pub fn repro(&self) -> ReproType {
        self.repro
    }

    pub fn no_animals(&self) -> u32 {
        self.male_no + self.female_no
    }

    pub fn male_no(&self) -> u32 {
        self.male_no
    }

    pub fn female_no(&self) -> u32 {
        self.female_no
    }

    pub fn age_days(&self) -> u32 {
        self.age_days
    }

    pub fn base_weight(&self) -> f64 {
        self.base_weight
    }

    pub fn fleece_weight(&self) -> f64 {
        self.wool_wt
    }

    pub fn fibre_diameter(&self) -> f64 {
        self.fibre_diam
    }

    pub fn live_weight(&self) -> f64 {
        self.base_weight + self.wool_wt + self.conceptus_wt()
    }

    pub fn std_ref_wt(&self) -> f64 {
        self.std_ref_wt
    }

    pub fn normal_weight(&self) -> f64 {
        self.normal_weight
    }

    pub fn relative_size(&self) -> f64 {
        self.relative_size
    }

    pub fn body_condition(&self) -> f64 {
        self.body_condition
    }

    pub fn condition_score(&self, system: CondScoreSystem) -> f64 {
        condition_to_cond_score(self.body_condition, system)
    }

    pub fn weight_change(&self) -> f64 {
        self.weight_change
    }

    pub fn is_pregnant(&self) -> bool {
        self.repro.is_pregnant()
    }

    pub fn days_pregnant(&self) -> u32 {
        if self.is_pregnant() {
            self.foetal_age
        } else {
            0
        }
    }

    pub fn no_foetuses(&self) -> usize {
        if self.is_pregnant() {
            self.no_foetuses
        } else {
            0
        }
    }

    pub fn is_lactating(&self) -> bool {
        self.lact.lactating
    }

    pub fn days_lactating(&self) -> u32 {
        if self.lact.lactating {
            self.lact.days
        } else {
            0
        }
    }

    pub fn no_offspring(&self) -> usize {
        if self.young.is_some() {
            self.lact.no_offspring
        } else {
            0
        }
    }

    pub fn young(&self) -> Option<&AnimalCohort> {
        self.young.as_deref()
    }

    pub fn is_suckling(&self) -> bool {
        self.suckling
    }

    pub fn mated_to(&self) -> Option<&Arc<Genotype>> {
        self.mated_to.as_ref()
    }

    pub fn milk_yield(&self) -> f64 {
        self.lact.milk_yield
    }

    pub fn potential_intake(&self) -> f64 {
        self.pot_intake
    }

    pub fn rdp_factor(&self) -> f64 {
        self.rdp_factor
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn output(&self) -> &AnimalOutput {
        &self.state
    }

    /// Dry sheep equivalents of the cohort including its young.
    pub fn dse(&self) -> f64 {
        let mut mei = self.state.me_intake.solid;
        if let Some(young) = &self.young {
            mei += self.lact.no_offspring as f64 * young.state.me_intake.solid;
        }
        self.no_animals() as f64 * mei / DSE_REF_MEI
    }

    /// Methane emitted by the cohort and its young today (kg).
    pub fn methane(&self) -> f64 {
        let own = self.no_animals() as f64 * self.state.methane;
        own + self.young.as_ref().map_or(0.0, |y| y.methane())
    }

    /// Total excretion of the cohort and its young today (kg).
    pub fn excretion(&self) -> Excretion {
        let own = self.state.excretion * self.no_animals() as f64;
        match &self.young {
            Some(young) => own + young.excretion(),
            None => own,
        }
    }

    /// Herbage eaten per head today by digestibility class (kg DM).
    pub fn herbage_intake_per_head(&self) -> [f64; DIG_CLASSES] {
        self.state.herbage_by_class
    }

    pub fn total_intake_per_head(&self) -> f64 {
        self.state.herbage.dm + self.state.supplement.dm
    }

    /// Sex label used in reports.
    pub fn sex_string(&self, plural: bool) -> String {
        let (singular, many) = match (self.genotype.kind, self.repro, self.is_young) {
            (AnimalKind::Sheep, _, true) => ("lamb", "lambs"),
            (AnimalKind::Cattle, _, true) => ("calf", "calves"),
            (AnimalKind::Sheep, ReproType::Male, _) => ("ram", "rams"),
            (AnimalKind::Sheep, ReproType::Castrated, _) => ("wether", "wethers"),
            (AnimalKind::Sheep, _, _) => ("ewe", "ewes"),
            (AnimalKind::Cattle, ReproType::Male, _) => ("bull", "bulls"),
            (AnimalKind::Cattle, ReproType::Castrated, _) => ("steer", "steers"),
            (AnimalKind::Cattle, _, _) if self.age_days < 2 * 365 && self.lact.previous_offspring == 0 && !self.lact.lactating => {
                ("heifer", "heifers")
            }
            (AnimalKind::Cattle, _, _) => ("cow", "cows"),
        };
        let label = if plural { many } else { singular };
        label.to_string()
    }

    fn conceptus_wt(&self) -> f64 {
        if !self.is_pregnant() {
            return 0.0;
        }
        self.conceptus_wt_at(self.foetal_age, self.foetal_weight)
    }

    fn conceptus_wt_at(&self, foetal_age: u32, foetal_weight: f64) -> f64 {
        let pc = &self.genotype.preg_c;
        let birth_wt = self.birth_weight_for_size();
        let norm = birth_wt * crate::numerics::gompertz(foetal_age as f64, pc[1], pc[2], pc[3]);
        self.no_foetuses as f64
            * (pc[5] * birth_wt * crate::numerics::gompertz(foetal_age as f64, pc[1], pc[6], pc[7])
                + foetal_weight
                - norm)
    }

    fn foetal_norm_wt(&self) -> f64 {
        let pc = &self.genotype.preg_c;
        self.birth_weight_for_size() * crate::numerics::gompertz(self.foetal_age as f64, pc[1], pc[2], pc[3])
    }

    fn birth_weight_for_size(&self) -> f64 {
        let p4 = self.genotype.preg_c[4];
        self.genotype.std_birth_wt(self.no_foetuses) * ((1.0 - p4) + p4 * self.relative_size)
    }

    // Population bookkeeping ----------------------------------------------------

    /// True when `other` may be merged into this cohort.
    pub fn similar(&self, other: &AnimalCohort) -> bool {
        let same = self.genotype.name == other.genotype.name
            && self.repro == other.repro
            && self.no_foetuses == other.no_foetuses
            && self.no_offspring() == other.no_offspring()
            && self.mate_cycle == other.mate_cycle
            && self.days_to_mate == other.days_to_mate
            && self.days_pregnant() == other.days_pregnant()
            && self.lact.lactating == other.lact.lactating
            && self.suckling == other.suckling
            && self.days_lactating().abs_diff(other.days_lactating()) < 7
            && self.young.is_some() == other.young.is_some();
        let same_age = if self.age_days < 365 {
            self.age_days == other.age_days
        } else {
            (self.age_days / 30).min(37) == (other.age_days / 30).min(37)
        };
        let same_young = match (&self.young, &other.young) {
            (Some(a), Some(b)) => a.repro == b.repro,
            _ => true,
        };
        same && same_age && same_young
    }

    /// Absorbs `other`, averaging state weighted by animal numbers.
    pub fn merge(&mut self, other: AnimalCohort) {
        let n1 = self.no_animals() as f64;
        let n2 = other.no_animals() as f64;
        let avg = |a: f64, b: f64| {
            if n1 + n2 > 0.0 {
                (a * n1 + b * n2) / (n1 + n2)
            } else {
                a
            }
        };

        self.age_days = avg(self.age_days as f64, other.age_days as f64).round() as u32;
        self.base_weight = avg(self.base_weight, other.base_weight);
        self.wool_wt = avg(self.wool_wt, other.wool_wt);
        self.greasy_fleece_growth = avg(self.greasy_fleece_growth, other.greasy_fleece_growth);
        self.fibre_diam = avg(self.fibre_diam, other.fibre_diam);
        self.weight_change = avg(self.weight_change, other.weight_change);
        self.max_prev_weight = avg(self.max_prev_weight, other.max_prev_weight);
        self.birth_weight = avg(self.birth_weight, other.birth_weight);
        self.std_ref_wt = avg(self.std_ref_wt, other.std_ref_wt);
        self.pot_intake = avg(self.pot_intake, other.pot_intake);

        if self.is_pregnant() {
            self.foetal_age = avg(self.foetal_age as f64, other.foetal_age as f64).round() as u32;
            self.foetal_weight = avg(self.foetal_weight, other.foetal_weight);
        }
        if self.lact.lactating {
            self.lact.days = avg(self.lact.days as f64, other.lact.days as f64).round() as u32;
            self.lact.milk_energy = avg(self.lact.milk_energy, other.lact.milk_energy);
            self.lact.milk_protein = avg(self.lact.milk_protein, other.lact.milk_protein);
            self.lact.milk_yield = avg(self.lact.milk_yield, other.lact.milk_yield);
            self.lact.ratio = avg(self.lact.ratio, other.lact.ratio);
        } else {
            self.lact.dry_off_time = avg(self.lact.dry_off_time, other.lact.dry_off_time);
            if self.lact.previous_offspring == 0 {
                self.lact.previous_offspring = other.lact.previous_offspring;
            }
        }
        self.lact.birth_condition = avg(self.lact.birth_condition, other.lact.birth_condition);
        self.lact.prop_max_milk = avg(self.lact.prop_max_milk, other.lact.prop_max_milk);
        self.lact.adjust = avg(self.lact.adjust, other.lact.adjust);

        self.male_no += other.male_no;
        self.female_no += other.female_no;
        self.deaths += other.deaths;
        self.calculate_weights();

        if let (Some(young), Some(other_young)) = (self.young.as_mut(), other.young) {
            young.merge(*other_young);
        }
    }

    /// Removes `number` animals (with their young) into a new cohort. `diffs` are added
    /// to the split-off animals and balanced in those remaining.
    pub fn split(&mut self, number: u32, diffs: WeightDiffs, young_diffs: WeightDiffs) -> StockResult<AnimalCohort> {
        let total = self.no_animals();
        if number > total {
            return Err(StockError::InvalidSplit {
                requested: number as i64,
                available: total,
            });
        }
        let (males, females) = if self.is_young {
            let males = (xdiv(number as f64 * self.male_no as f64, total as f64)).round() as u32;
            let males = males.min(self.male_no).max(number.saturating_sub(self.female_no));
            (males, number - males)
        } else if self.repro.is_male() {
            (number, 0)
        } else {
            (0, number)
        };
        let young_share = self
            .young
            .as_ref()
            .map(|y| (number as u64 * self.lact.no_offspring as u64).min(y.no_animals() as u64) as u32);
        let mut split = self.split_sex(males, females, diffs);
        if let (Some(young), Some(count)) = (self.young.as_mut(), young_share) {
            split.young = Some(Box::new(young.split(count, young_diffs, WeightDiffs::default())?));
        }
        Ok(split)
    }

    /// Moves exactly `males` and `females` into a new cohort without their young.
    pub(crate) fn split_sex(&mut self, males: u32, females: u32, diffs: WeightDiffs) -> AnimalCohort {
        let males = males.min(self.male_no);
        let females = females.min(self.female_no);
        let young = self.young.take();
        let mut split = self.clone();
        self.young = young;

        let before = self.no_animals() as f64;
        split.male_no = males;
        split.female_no = females;
        split.deaths = 0;
        self.male_no -= males;
        self.female_no -= females;

        let moved = (males + females) as f64;
        let left = self.no_animals() as f64;
        if moved > 0.0 && before > 0.0 {
            split.std_ref_wt += diffs.std_ref_wt;
            split.base_weight += diffs.base_weight;
            split.wool_wt = (split.wool_wt + diffs.fleece_wt).max(0.0);
            split.max_prev_weight = split.max_prev_weight.max(split.base_weight);
            if left > 0.0 {
                let ratio = moved / left;
                self.std_ref_wt -= diffs.std_ref_wt * ratio;
                self.base_weight -= diffs.base_weight * ratio;
                self.wool_wt = (self.wool_wt - diffs.fleece_wt * ratio).max(0.0);
            }
        }
        split.calculate_weights();
        self.calculate_weights();
        split
    }

    // Daily cycle ----------------------------------------------------------------

    /// Takes today's forage offer and grazing conditions.
    pub fn set_forage_inputs(&mut self, inputs: &ForageAvailability, site: GrazingSite) {
        self.initial_inputs = inputs.clone();
        self.step_inputs = inputs.clone();
        self.site = site;
        if let Some(young) = self.young.as_mut() {
            young.set_forage_inputs(inputs, site);
        }
    }

    /// Updates the forage remaining for the current grazing sub-step.
    pub fn set_step_inputs(&mut self, inputs: &ForageAvailability) {
        self.step_inputs = inputs.clone();
        if let Some(young) = self.young.as_mut() {
            young.set_step_inputs(inputs);
        }
    }

    /// Offers supplement for the current sub-step (`fresh_per_head` kg fresh weight).
    pub fn set_step_supplement(&mut self, ration: Option<&Supplement>, fresh_per_head: f64) {
        self.ration = ration.cloned();
        self.supp_fw_per_head = fresh_per_head;
    }

    pub fn initial_inputs(&self) -> &ForageAvailability {
        &self.initial_inputs
    }

    /// Captures the state that grazing and nutrition may need to replay.
    pub fn store_state(&mut self) {
        self.snapshot = Some(StateSnapshot {
            base_weight: self.base_weight,
            wool_wt: self.wool_wt,
            fibre_diam: self.fibre_diam,
            foetal_weight: self.foetal_weight,
            lact_adjust: self.lact.adjust,
            lact_ratio: self.lact.ratio,
            pot_intake: self.pot_intake,
        });
        if let Some(young) = self.young.as_mut() {
            young.store_state();
        }
    }

    /// Restores the stored state with potential intake scaled by the RDP shortfall.
    pub fn revert_state(&mut self) {
        if let Some(snapshot) = self.snapshot.clone() {
            self.base_weight = snapshot.base_weight;
            self.wool_wt = snapshot.wool_wt;
            self.fibre_diam = snapshot.fibre_diam;
            self.foetal_weight = snapshot.foetal_weight;
            self.lact.adjust = snapshot.lact_adjust;
            self.lact.ratio = snapshot.lact_ratio;
            self.pot_intake = snapshot.pot_intake * self.rdp_factor;
            self.calculate_weights();
        }
        self.step_inputs = self.initial_inputs.clone();
        self.reset_grazing();
        if let Some(young) = self.young.as_mut() {
            young.revert_state();
        }
    }
}

/// Fleece growth period assumed when a fibre diameter is not supplied.
const DAYS_FOR_MICRON: f64 = 365.0;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::genotype::GenotypeRegistry;

    pub(crate) fn merino() -> Arc<Genotype> {
        GenotypeRegistry::with_builtin_breeds().shared("Merino").unwrap()
    }

    pub(crate) fn ewes(number: u32) -> AnimalCohort {
        AnimalCohort::new(merino(), ReproType::Empty, number, 3 * 365, 52.0, 3.0).unwrap()
    }

    #[test]
    fn new_cohort_balances_weights() {
        let cohort = ewes(10);
        assert!((cohort.live_weight() - cohort.base_weight() - cohort.fleece_weight()).abs() < 1e-9);
        assert_eq!(cohort.female_no(), 10);
        assert!(cohort.body_condition() > 0.9 && cohort.body_condition() < 1.1);
    }

    #[test]
    fn merge_averages_by_numbers() {
        let mut a = AnimalCohort::new(merino(), ReproType::Castrated, 50, 800, 40.0, 0.0).unwrap();
        let b = AnimalCohort::new(merino(), ReproType::Castrated, 30, 800, 48.0, 0.0).unwrap();
        assert!(a.similar(&b));
        a.merge(b);
        assert_eq!(a.no_animals(), 80);
        assert!((a.live_weight() - 43.0).abs() < 1e-9);
    }

    #[test]
    fn dissimilar_sexes_do_not_merge() {
        let ewes = ewes(10);
        let wethers = AnimalCohort::new(merino(), ReproType::Castrated, 10, 3 * 365, 52.0, 3.0).unwrap();
        assert!(!ewes.similar(&wethers));
    }

    #[test]
    fn split_conserves_numbers_and_mean_weight() {
        let mut cohort = ewes(100);
        let mean = cohort.base_weight();
        let diffs = WeightDiffs {
            base_weight: 4.0,
            ..WeightDiffs::default()
        };
        let split = cohort.split(20, diffs, WeightDiffs::default()).unwrap();
        assert_eq!(split.no_animals() + cohort.no_animals(), 100);
        let total = split.base_weight() * 20.0 + cohort.base_weight() * 80.0;
        assert!((total / 100.0 - mean).abs() < 1e-9);
        assert!((split.base_weight() - mean - 4.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_split_is_rejected() {
        let mut cohort = ewes(5);
        assert_eq!(
            cohort.split(6, WeightDiffs::default(), WeightDiffs::default()).unwrap_err(),
            StockError::InvalidSplit {
                requested: 6,
                available: 5
            }
        );
    }

    #[test]
    fn lactating_split_takes_young_along() {
        let mut cohort = ewes(40);
        cohort.set_lactation(30, 2, None, 0.0).unwrap();
        assert_eq!(cohort.young().unwrap().no_animals(), 80);
        let split = cohort.split(10, WeightDiffs::default(), WeightDiffs::default()).unwrap();
        assert_eq!(split.young().unwrap().no_animals(), 20);
        assert_eq!(cohort.young().unwrap().no_animals(), 60);
    }

    #[test]
    fn condition_at_weight_sets_requested_condition() {
        let mut cohort = ewes(1);
        cohort.base_weight = 40.0;
        cohort.set_condition_at_weight(0.85);
        assert!((cohort.body_condition() - 0.85).abs() < 1e-6, "{}", cohort.body_condition());
    }

    #[test]
    fn pregnancy_adds_conceptus_to_live_weight() {
        let mut cohort = ewes(10);
        cohort.set_pregnancy(120, 2);
        assert_eq!(cohort.repro(), ReproType::LatePreg);
        assert!(cohort.live_weight() > cohort.base_weight() + cohort.fleece_weight());
    }

    #[test]
    fn sex_strings() {
        assert_eq!(ewes(1).sex_string(true), "ewes");
        let steer = AnimalCohort::new(
            GenotypeRegistry::with_builtin_breeds().shared("Angus").unwrap(),
            ReproType::Castrated,
            1,
            400,
            300.0,
            0.0,
        )
        .unwrap();
        assert_eq!(steer.sex_string(false), "steer");
    }
}
