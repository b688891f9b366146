//! Building a flock from aggregate demographic targets.
//!
//! The requested head count is spread over whole-year age classes by a survivorship
//! distribution, and the pregnancy and lactation rates are reached by fitting the body
//! condition (or, for sheep, the chill index at birth) that the conception model needs
//! to reproduce them.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PopulationManager;
use crate::cohort::AnimalCohort;
use crate::error::{StockError, StockResult};
use crate::genotype::{cond_score_to_condition, AnimalKind, Genotype, ReproType, DAYS_PER_YEAR};
use crate::numerics::{dim, sig, DAY2RAD, DEG2RAD};

const CONDITION_RANGE: (f64, f64) = (0.60, 1.40);
const CHILL_RANGE: (f64, f64) = (500.0, 2500.0);
/// Chill index assumed when lactation rates are fitted through condition.
const FIXED_CHILL: f64 = 800.0;
const RATE_TOLERANCE: f64 = 1.0e-5;
const BISECTION_LIMIT: usize = 200;
/// Oestrus cycles in the mating period behind a target rate.
const MATING_CYCLES: f64 = 2.5;
/// Latitude the day-length conception constants are set for.
const STD_LATITUDE: f64 = -35.0;

/// Aggregate description of a flock or herd to be broken into cohorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortTargets {
    pub genotype: String,
    pub repro: ReproType,
    pub number: u32,
    pub min_years: u32,
    pub max_years: u32,
    /// Added to every age class (days past the whole year).
    pub age_offset_days: u32,
    pub mean_live_weight: Option<f64>,
    pub cond_score: Option<f64>,
    pub mean_fleece: Option<f64>,
    /// Days since shearing. Zero with a mean fleece given derives it from the fleece.
    pub fleece_days: u32,
    pub mated_to: Option<String>,
    pub days_pregnant: u32,
    /// Proportion of the females that are pregnant.
    pub foetuses: f64,
    pub days_lactating: u32,
    /// Proportion of the females with young at foot.
    pub offspring: f64,
    pub offspring_weight: Option<f64>,
    pub offspring_fleece: f64,
    pub paddock: Option<String>,
    pub tag: u32,
}

impl Default for CohortTargets {
    fn default() -> Self {
        Self {
            genotype: String::new(),
            repro: ReproType::Empty,
            number: 0,
            min_years: 1,
            max_years: 1,
            age_offset_days: 0,
            mean_live_weight: None,
            cond_score: None,
            mean_fleece: None,
            fleece_days: 0,
            mated_to: None,
            days_pregnant: 0,
            foetuses: 0.0,
            days_lactating: 0,
            offspring: 0.0,
            offspring_weight: None,
            offspring_fleece: 0.0,
            paddock: None,
            tag: 0,
        }
    }
}

/// One whole-year age class of a planned flock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeClass {
    pub age_days: u32,
    pub propn: f64,
    pub base_weight: f64,
    pub fleece_wt: f64,
    /// Head by number of foetuses (rows) and number of young at foot (columns).
    pub numbers: [[u32; 4]; 4],
    #[serde(skip)]
    age_at_mating: f64,
    #[serde(skip)]
    size_at_mating: f64,
}

/// The age, pregnancy and lactation structure fitted to a set of targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortPlan {
    pub classes: Vec<AgeClass>,
    pub days_since_shearing: u32,
    /// Condition at mating that reproduces the pregnancy target.
    pub pregnancy_condition: Option<f64>,
    /// Pregnancy rate of the fitted model before rounding to whole animals.
    pub fitted_pregnancy: Option<f64>,
    pub lactation_condition: Option<f64>,
    pub chill_index: Option<f64>,
    pub fitted_lactation: Option<f64>,
}

impl CohortPlan {
    pub fn total(&self) -> u32 {
        self.classes
            .iter()
            .flat_map(|class| class.numbers.iter().flatten())
            .sum()
    }

    /// Share of the animals carrying at least one foetus.
    pub fn pregnancy_rate(&self) -> f64 {
        let pregnant: u32 = self
            .classes
            .iter()
            .flat_map(|class| class.numbers[1..].iter().flatten())
            .sum();
        share(pregnant, self.total())
    }

    /// Share of the animals with young at foot.
    pub fn lactation_rate(&self) -> f64 {
        let lactating: u32 = self
            .classes
            .iter()
            .flat_map(|class| class.numbers.iter().flat_map(|row| row[1..].iter()))
            .sum();
        share(lactating, self.total())
    }
}

fn share(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Proportions of mated females bearing 1, 2 or 3 young after a mating on `mate_doy`,
/// reduced by neonatal exposure losses when `chill` is positive.
pub(crate) fn offspring_rates(
    genotype: &Genotype,
    latitude: f64,
    mate_doy: u32,
    age_days: f64,
    size: f64,
    condition: f64,
    chill: f64,
) -> [f64; 4] {
    let max_young = genotype.max_young.min(3);
    let day_len_factor = (1.0 - (DAY2RAD * (mate_doy as f64 + 10.0)).sin()) * (DEG2RAD * latitude).sin()
        / (DEG2RAD * STD_LATITUDE).sin();

    let mut conceptions = [0.0; 4];
    for n in 1..=max_young {
        let sigs = genotype.conceive_sigs[n];
        let propn = if age_days > genotype.puberty[0] as f64 && sigs[0] < 5.0 {
            dim(1.0, genotype.day_length_const[n] * day_len_factor) * sig(size * condition, sigs)
        } else {
            0.0
        };
        if n == 1 {
            conceptions[n] = propn;
        } else {
            conceptions[n] = propn * conceptions[n - 1];
            conceptions[n - 1] -= conceptions[n];
        }
    }

    let empty = 1.0 - conceptions[1..=max_young].iter().sum::<f64>();
    let mut rates = [0.0; 4];
    if empty < 1.0 {
        for n in 1..=max_young {
            rates[n] = conceptions[n] * (1.0 - empty.powf(MATING_CYCLES)) / (1.0 - empty);
        }
    }

    if chill > 0.0 && genotype.kind == AnimalKind::Sheep {
        let ec = &genotype.exposure_consts;
        for (n, rate) in rates.iter_mut().enumerate().take(max_young + 1).skip(1) {
            let mut odds = ec[0] - ec[1] * condition + ec[2] * chill;
            if n > 1 {
                odds += ec[3];
            }
            let death_rate = odds.exp() / (1.0 + odds.exp());
            *rate *= 1.0 - death_rate;
        }
    }
    rates
}

/// Halves `[low, high]` until `f` is within tolerance of `target`. The interval must
/// bracket the target; `rising` gives the direction of `f`.
fn bisect(
    search: &'static str,
    target: f64,
    (mut low, mut high): (f64, f64),
    rising: bool,
    f: impl Fn(f64) -> f64,
) -> StockResult<f64> {
    for _ in 0..BISECTION_LIMIT {
        let mid = 0.5 * (low + high);
        let trial = f(mid);
        if (trial - target).abs() < RATE_TOLERANCE {
            return Ok(mid);
        }
        if (trial < target) == rising {
            low = mid;
        } else {
            high = mid;
        }
    }
    Err(StockError::SearchDidNotConverge { search, target })
}

/// Condition that reproduces `target`, clamped to the search range when the target
/// lies outside it.
fn fit_condition(search: &'static str, target: f64, f: impl Fn(f64) -> f64) -> StockResult<f64> {
    let (low, high) = CONDITION_RANGE;
    let (at_low, at_high) = (f(low), f(high));
    if at_low > target {
        warn!(search, target, rate = at_low, "target below reach, using lowest condition");
        Ok(low)
    } else if at_high < target {
        warn!(search, target, rate = at_high, "target beyond reach, using highest condition");
        Ok(high)
    } else {
        bisect(search, target, CONDITION_RANGE, true, f)
    }
}

struct RateModel<'a> {
    genotype: &'a Genotype,
    latitude: f64,
    mate_doy: u32,
}

impl RateModel<'_> {
    fn class_rates(&self, class: &AgeClass, condition: f64, chill: f64) -> [f64; 4] {
        offspring_rates(
            self.genotype,
            self.latitude,
            self.mate_doy,
            class.age_at_mating,
            class.size_at_mating,
            condition,
            chill,
        )
    }

    /// Flock-wide proportion bearing young at the given condition and chill index.
    fn flock_rate(&self, classes: &[AgeClass], condition: f64, chill: f64) -> f64 {
        classes
            .iter()
            .map(|class| class.propn * self.class_rates(class, condition, chill)[1..].iter().sum::<f64>())
            .sum()
    }
}

fn set_mating_age(classes: &mut [AgeClass], genotype: &Genotype, repro: ReproType, days_before: u32) {
    let srw = genotype.sex_std_ref_wt(repro);
    for class in classes {
        class.age_at_mating = class.age_days as f64 - days_before as f64;
        class.size_at_mating = genotype.growth_curve(class.age_at_mating.max(0.0), repro) / srw;
    }
}

/// Which young cells a class's animals are moved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// From `numbers[0][0]` into `numbers[n][0]`.
    Pregnancy,
    /// From `numbers[r][0]` into `numbers[r][n]` for every pregnancy row `r`.
    Lactation,
}

impl Axis {
    fn rows(self) -> &'static [usize] {
        match self {
            Axis::Pregnancy => &[0],
            Axis::Lactation => &[0, 1, 2, 3],
        }
    }

    fn cell(self, row: usize, young: usize) -> (usize, usize) {
        match self {
            Axis::Pregnancy => (young, row),
            Axis::Lactation => (row, young),
        }
    }
}

struct Quota {
    class: usize,
    row: usize,
    young: usize,
    whole: u32,
    fraction: f64,
}

/// Moves animals into the one, two and three young cells of each class in proportion to
/// that class's `rates`, so that exactly `total_moved` animals move. Whole parts are
/// assigned first and the remainder goes to the largest fractions.
fn apportion(classes: &mut [AgeClass], axis: Axis, rates: &[[f64; 4]], total_moved: u32) {
    let mut quotas = Vec::new();
    for (idx, class) in classes.iter().enumerate() {
        for &row in axis.rows() {
            let (a, b) = axis.cell(row, 0);
            let count = class.numbers[a][b] as f64;
            for young in 1..4 {
                let exact = count * rates[idx][young];
                quotas.push(Quota {
                    class: idx,
                    row,
                    young,
                    whole: exact.floor() as u32,
                    fraction: exact - exact.floor(),
                });
            }
        }
    }

    let source_left = |quotas: &[Quota], class: usize, row: usize| -> u32 {
        let (a, b) = axis.cell(row, 0);
        let used: u32 = quotas
            .iter()
            .filter(|q| q.class == class && q.row == row)
            .map(|q| q.whole)
            .sum();
        classes[class].numbers[a][b].saturating_sub(used)
    };

    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| quotas[b].fraction.total_cmp(&quotas[a].fraction));
    let assigned: u32 = quotas.iter().map(|q| q.whole).sum();

    let mut extra = total_moved.saturating_sub(assigned);
    while extra > 0 {
        let before = extra;
        for &idx in &order {
            if extra == 0 {
                break;
            }
            if source_left(&quotas, quotas[idx].class, quotas[idx].row) > 0 {
                quotas[idx].whole += 1;
                extra -= 1;
            }
        }
        if extra == before {
            break;
        }
    }

    let mut surplus = assigned.saturating_sub(total_moved);
    while surplus > 0 {
        let before = surplus;
        for &idx in order.iter().rev() {
            if surplus == 0 {
                break;
            }
            if quotas[idx].whole > 0 {
                quotas[idx].whole -= 1;
                surplus -= 1;
            }
        }
        if surplus == before {
            break;
        }
    }

    for quota in &quotas {
        let (sa, sb) = axis.cell(quota.row, 0);
        let (ta, tb) = axis.cell(quota.row, quota.young);
        let numbers = &mut classes[quota.class].numbers;
        numbers[sa][sb] -= quota.whole;
        numbers[ta][tb] += quota.whole;
    }
}

impl PopulationManager {
    /// Breaks `targets` into age, pregnancy and lactation classes without adding stock.
    pub fn plan_cohorts(&self, targets: &CohortTargets, day_of_year: u32, latitude: f64) -> StockResult<CohortPlan> {
        if targets.max_years < targets.min_years {
            return Err(StockError::InvalidParameter {
                name: "max years",
                value: targets.max_years as f64,
            });
        }
        let genotype = self.registry.shared(&targets.genotype)?;
        let repro = targets.repro;
        let class_count = (targets.max_years - targets.min_years + 1) as f64;
        let survival = 1.0 - genotype.annual_deaths(false)?;

        let days_since_shearing = match (genotype.kind, targets.mean_fleece) {
            (AnimalKind::Cattle, _) => 0,
            (_, Some(gfw)) if targets.fleece_days == 0 && genotype.potential_fleece_wt > 0.0 => {
                (DAYS_PER_YEAR * gfw / genotype.potential_fleece_wt) as u32
            }
            _ => targets.fleece_days,
        };

        let mut classes: Vec<AgeClass> = (targets.min_years..=targets.max_years)
            .map(|years| {
                let k = (years - targets.min_years) as f64;
                let propn = if survival >= 1.0 {
                    1.0 / class_count
                } else {
                    (1.0 - survival) * survival.powf(k) / (1.0 - survival.powf(class_count))
                };
                let age_days = (DAYS_PER_YEAR * years as f64) as u32 + targets.age_offset_days;
                AgeClass {
                    age_days,
                    propn,
                    base_weight: genotype.growth_curve(age_days as f64, repro),
                    fleece_wt: genotype.default_fleece(age_days as f64, repro, days_since_shearing as f64),
                    numbers: [[0; 4]; 4],
                    age_at_mating: 0.0,
                    size_at_mating: 0.0,
                }
            })
            .collect();

        let mean_normal: f64 = classes.iter().map(|c| c.propn * c.base_weight).sum();
        let mean_fleece: f64 = classes.iter().map(|c| c.propn * c.fleece_wt).sum();
        let fleece_scalar = match targets.mean_fleece {
            Some(gfw) if gfw > 0.0 && mean_fleece > 0.0 => gfw / mean_fleece,
            _ => 1.0,
        };
        let target_fleece = targets.mean_fleece.unwrap_or(mean_fleece);
        let base_scalar = match (targets.mean_live_weight, targets.cond_score) {
            (Some(live_weight), _) if mean_normal > 0.0 => (live_weight - target_fleece) / mean_normal,
            (None, Some(score)) => cond_score_to_condition(score, self.cond_system),
            _ => 1.0,
        };
        for class in &mut classes {
            class.base_weight *= base_scalar;
            class.fleece_wt *= fleece_scalar;
        }

        let mut assigned = 0;
        for class in &mut classes {
            class.numbers[0][0] = (class.propn * targets.number as f64) as u32;
            assigned += class.numbers[0][0];
        }
        for class in &mut classes {
            if assigned < targets.number {
                class.numbers[0][0] += 1;
                assigned += 1;
            }
        }

        let mut plan = CohortPlan {
            classes: Vec::new(),
            days_since_shearing,
            pregnancy_condition: None,
            fitted_pregnancy: None,
            lactation_condition: None,
            chill_index: None,
            fitted_lactation: None,
        };

        if !repro.is_male() {
            if targets.days_pregnant > 0 && targets.foetuses > 0.0 {
                let model = RateModel {
                    genotype: &genotype,
                    latitude,
                    mate_doy: 1 + (day_of_year as i64 - targets.days_pregnant as i64 + 364).rem_euclid(365) as u32,
                };
                set_mating_age(&mut classes, &genotype, repro, targets.days_pregnant);
                let condition = fit_condition("pregnancy rate", targets.foetuses, |cond| {
                    model.flock_rate(&classes, cond, 0.0)
                })?;
                plan.pregnancy_condition = Some(condition);
                let fitted = model.flock_rate(&classes, condition, 0.0);
                plan.fitted_pregnancy = Some(fitted);
                let rates: Vec<[f64; 4]> = classes.iter().map(|c| model.class_rates(c, condition, 0.0)).collect();
                let pregnant = (fitted * assigned as f64).round() as u32;
                apportion(&mut classes, Axis::Pregnancy, &rates, pregnant);
            }

            if targets.days_lactating > 0 && targets.offspring > 0.0 {
                let before = targets.days_lactating + genotype.gestation();
                let model = RateModel {
                    genotype: &genotype,
                    latitude,
                    mate_doy: 1 + (day_of_year as i64 - before as i64 + 729).rem_euclid(365) as u32,
                };
                set_mating_age(&mut classes, &genotype, repro, before);
                let target = targets.offspring;

                let mut fitted = None;
                if genotype.kind == AnimalKind::Sheep {
                    let at_low = model.flock_rate(&classes, 1.0, CHILL_RANGE.0);
                    let at_high = model.flock_rate(&classes, 1.0, CHILL_RANGE.1);
                    if at_high < target && at_low > target {
                        let chill = bisect("lactation chill index", target, CHILL_RANGE, false, |chill| {
                            model.flock_rate(&classes, 1.0, chill)
                        })?;
                        fitted = Some((1.0, chill));
                    }
                }
                let (condition, chill) = match fitted {
                    Some(found) => found,
                    None => {
                        debug!(target, "fitting lactation rate through condition");
                        let condition = fit_condition("lactation rate", target, |cond| {
                            model.flock_rate(&classes, cond, FIXED_CHILL)
                        })?;
                        (condition, FIXED_CHILL)
                    }
                };
                plan.lactation_condition = Some(condition);
                plan.chill_index = Some(chill);
                let fitted = model.flock_rate(&classes, condition, chill);
                plan.fitted_lactation = Some(fitted);
                let rates: Vec<[f64; 4]> = classes.iter().map(|c| model.class_rates(c, condition, chill)).collect();
                let suckling = (fitted * assigned as f64).round() as u32;
                apportion(&mut classes, Axis::Lactation, &rates, suckling);
            }
        }

        plan.classes = classes;
        Ok(plan)
    }

    /// Adds the cohorts planned for `targets` and returns their indices.
    pub fn add_cohorts(&mut self, targets: &CohortTargets, day_of_year: u32, latitude: f64) -> StockResult<Vec<usize>> {
        if targets.number == 0 {
            return Ok(Vec::new());
        }
        let plan = self.plan_cohorts(targets, day_of_year, latitude)?;
        let genotype = self.registry.shared(&targets.genotype)?;
        let sire = targets
            .mated_to
            .as_deref()
            .map(|name| self.registry.shared(name))
            .transpose()?;
        let cattle = genotype.kind == AnimalKind::Cattle;

        let mut built = Vec::new();
        for class in &plan.classes {
            for (preg, row) in class.numbers.iter().enumerate() {
                for (lact, &number) in row.iter().enumerate() {
                    if number == 0 {
                        continue;
                    }
                    let mut cohort = AnimalCohort::new(
                        genotype.clone(),
                        targets.repro,
                        number,
                        class.age_days,
                        class.base_weight + class.fleece_wt,
                        class.fleece_wt,
                    )?;
                    cohort.set_mated_to(sire.clone());
                    if preg > 0 {
                        cohort.set_pregnancy(targets.days_pregnant, preg);
                    }
                    let dry_cattle = cattle && targets.days_lactating > 0 && targets.offspring == 0.0;
                    if lact > 0 || dry_cattle {
                        cohort.set_lactation(
                            targets.days_lactating,
                            lact,
                            targets.offspring_weight,
                            targets.offspring_fleece,
                        )?;
                    }
                    built.push(cohort);
                }
            }
        }

        let paddock = self.resolve_paddock(targets.paddock.as_deref())?;
        let mut added = Vec::with_capacity(built.len());
        for cohort in built {
            added.push(self.add(cohort, paddock, targets.tag)?);
        }
        debug!(
            genotype = %targets.genotype,
            head = plan.total(),
            groups = added.len(),
            "cohorts added"
        );
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::tests::flock;

    fn breeding_ewes() -> CohortTargets {
        CohortTargets {
            genotype: "Merino".to_string(),
            number: 1000,
            min_years: 1,
            max_years: 5,
            mean_live_weight: Some(50.0),
            mean_fleece: Some(3.0),
            days_pregnant: 60,
            foetuses: 0.80,
            ..CohortTargets::default()
        }
    }

    #[test]
    fn age_classes_follow_survivorship() {
        let herd = flock();
        let plan = herd.plan_cohorts(&breeding_ewes(), 100, -35.0).unwrap();
        assert_eq!(plan.classes.len(), 5);
        let total_propn: f64 = plan.classes.iter().map(|c| c.propn).sum();
        assert!((total_propn - 1.0).abs() < 1e-9);
        for pair in plan.classes.windows(2) {
            assert!(pair[0].propn > pair[1].propn);
            assert!(pair[0].age_days < pair[1].age_days);
        }
        assert_eq!(plan.classes[0].age_days, 365);
    }

    #[test]
    fn pregnancy_target_is_fitted() {
        let herd = flock();
        let plan = herd.plan_cohorts(&breeding_ewes(), 100, -35.0).unwrap();
        assert_eq!(plan.total(), 1000);
        let fitted = plan.fitted_pregnancy.unwrap();
        assert!((fitted - 0.80).abs() < 1e-5, "fitted {fitted}");
        let condition = plan.pregnancy_condition.unwrap();
        assert!(condition > 0.6 && condition < 1.4);
        assert!((plan.pregnancy_rate() - 0.80).abs() < 1e-5, "rate {}", plan.pregnancy_rate());
        let pregnant: u32 = plan.classes.iter().flat_map(|c| c.numbers[1..].iter().flatten()).sum();
        assert_eq!(pregnant, 800);
    }

    #[test]
    fn unreachable_target_clamps_condition() {
        let herd = flock();
        let targets = CohortTargets {
            foetuses: 1.0,
            ..breeding_ewes()
        };
        let plan = herd.plan_cohorts(&targets, 100, -35.0).unwrap();
        assert_eq!(plan.pregnancy_condition, Some(1.4));
        assert_eq!(plan.total(), 1000);
    }

    #[test]
    fn lambing_rate_is_fitted_through_chill() {
        let herd = flock();
        let targets = CohortTargets {
            days_pregnant: 0,
            foetuses: 0.0,
            days_lactating: 30,
            offspring: 0.7,
            min_years: 2,
            max_years: 6,
            ..breeding_ewes()
        };
        let plan = herd.plan_cohorts(&targets, 200, -35.0).unwrap();
        let chill = plan.chill_index.unwrap();
        assert!(chill > 500.0 && chill < 2500.0);
        assert_eq!(plan.lactation_condition, Some(1.0));
        assert!((plan.fitted_lactation.unwrap() - 0.7).abs() < 1e-5);
        assert!((plan.lactation_rate() - 0.7).abs() < 1e-5, "rate {}", plan.lactation_rate());
        assert_eq!(plan.total(), 1000);
    }

    #[test]
    fn mean_weights_are_matched() {
        let herd = flock();
        let plan = herd.plan_cohorts(&breeding_ewes(), 100, -35.0).unwrap();
        let live: f64 = plan.classes.iter().map(|c| c.propn * (c.base_weight + c.fleece_wt)).sum();
        let fleece: f64 = plan.classes.iter().map(|c| c.propn * c.fleece_wt).sum();
        assert!((live - 50.0).abs() < 1e-6);
        assert!((fleece - 3.0).abs() < 1e-6);
    }

    #[test]
    fn add_cohorts_creates_pregnant_groups() {
        let mut herd = flock();
        let targets = CohortTargets {
            paddock: Some("back".to_string()),
            tag: 4,
            ..breeding_ewes()
        };
        let added = herd.add_cohorts(&targets, 100, -35.0).unwrap();
        assert_eq!(added.len(), herd.count());
        let head: u32 = herd.cohorts().iter().map(|c| c.no_animals()).sum();
        assert_eq!(head, 1000);
        assert!(herd.cohorts().iter().all(|c| c.paddock == 1 && c.tag == 4));
        let pregnant: u32 = herd
            .cohorts()
            .iter()
            .filter(|c| c.is_pregnant())
            .map(|c| c.no_animals())
            .sum();
        assert!((pregnant as f64 / 1000.0 - 0.80).abs() < 0.01);
        assert!(herd.cohorts().iter().filter(|c| c.is_pregnant()).all(|c| c.days_pregnant() == 60));
    }

    #[test]
    fn inverted_age_range_is_rejected() {
        let herd = flock();
        let targets = CohortTargets {
            min_years: 4,
            max_years: 2,
            ..breeding_ewes()
        };
        assert!(matches!(
            herd.plan_cohorts(&targets, 100, -35.0),
            Err(StockError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn unknown_sire_adds_nothing() {
        let mut herd = flock();
        let targets = CohortTargets {
            mated_to: Some("Dorper".to_string()),
            ..breeding_ewes()
        };
        assert_eq!(
            herd.add_cohorts(&targets, 100, -35.0).unwrap_err(),
            StockError::UnknownGenotype("Dorper".to_string())
        );
        assert!(herd.is_empty());
    }

    #[test]
    fn bisection_reports_missing_root() {
        let result = bisect("test", 0.5, (0.0, 1.0), true, |_| 0.0);
        assert!(matches!(result, Err(StockError::SearchDidNotConverge { search: "test", .. })));
    }
}
