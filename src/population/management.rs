//! Management operations on the herd: purchase, sale, splitting, weaning and husbandry.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GroupSelector, PopulationManager};
use crate::cohort::{AnimalCohort, FleeceCut, WeightDiffs};
use crate::error::{StockError, StockResult};
use crate::forage::Supplement;
use crate::genotype::{cond_score_to_condition, AnimalKind, ReproType, DAYS_PER_YEAR};
use crate::numerics::cum_normal;

const MONTH2DAY: f64 = DAYS_PER_YEAR / 12.0;
/// Coefficient of variation of live weight within a cohort.
const WEIGHT_CV: f64 = 0.10;
const WEIGHT_STEPS: usize = 20;
/// Lower limit (standard deviations) of the weight distribution integral.
const WEIGHT_TAIL_SD: f64 = -5.0;

/// Animals bought in from outside the farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Purchase {
    pub genotype: String,
    /// "ewe", "wether", "ram", "cow", "steer", "bull", ...
    pub sex: String,
    pub number: u32,
    pub age_months: f64,
    /// Live weight per head including fleece. Taken from the growth curve when absent.
    pub live_weight: Option<f64>,
    pub fleece_wt: f64,
    pub cond_score: Option<f64>,
    pub mated_to: Option<String>,
    pub days_pregnant: u32,
    pub days_lactating: u32,
    /// Foetuses carried by pregnant animals, or young at foot when not pregnant.
    pub young: usize,
    pub young_weight: Option<f64>,
    pub young_fleece: f64,
    pub tag: u32,
}

impl Default for Purchase {
    fn default() -> Self {
        Self {
            genotype: String::new(),
            sex: "female".to_string(),
            number: 0,
            age_months: 24.0,
            live_weight: None,
            fleece_wt: 0.0,
            cond_score: None,
            mated_to: None,
            days_pregnant: 0,
            days_lactating: 0,
            young: 0,
            young_weight: None,
            young_fleece: 0.0,
            tag: 0,
        }
    }
}

impl PopulationManager {
    /// Adds purchased stock to the default paddock. Returns the new cohort's index, or
    /// `None` when no animals were bought.
    pub fn buy(&mut self, purchase: &Purchase) -> StockResult<Option<usize>> {
        let repro: ReproType = purchase.sex.parse()?;
        if purchase.number == 0 {
            return Ok(None);
        }
        let genotype = self.registry.shared(&purchase.genotype)?;
        let sire = purchase
            .mated_to
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| self.registry.shared(name))
            .transpose()?;
        let age_days = (MONTH2DAY * purchase.age_months).round().max(0.0) as u32;
        let sheep = genotype.kind == AnimalKind::Sheep;

        let given_weight = purchase.live_weight.filter(|&w| w > 0.0);
        let live_weight = match given_weight {
            Some(weight) => weight,
            None => {
                let mut weight = genotype.growth_curve(age_days as f64, repro);
                if let Some(score) = purchase.cond_score.filter(|&s| s > 0.0) {
                    weight *= cond_score_to_condition(score, self.cond_system);
                }
                if sheep {
                    weight += purchase.fleece_wt;
                }
                weight
            }
        };

        let mut cohort = AnimalCohort::new(
            genotype.clone(),
            repro,
            purchase.number,
            age_days,
            live_weight,
            purchase.fleece_wt,
        )?;

        if let (Some(score), Some(_)) = (purchase.cond_score.filter(|&s| s > 0.0), given_weight) {
            let condition = cond_score_to_condition(score, self.cond_system);
            let (low, high) = genotype.weight_range_for_cond(repro, age_days as f64, condition);
            let base = cohort.base_weight();
            if base < low || base > high {
                return Err(StockError::PurchaseOutOfRange { score, low, high });
            }
            cohort.set_condition_at_weight(condition);
        }

        if repro == ReproType::Empty {
            let mut young = purchase.young;
            if purchase.days_lactating > 0 && sheep {
                young = young.max(1);
            }
            if purchase.days_pregnant > 0 {
                young = young.max(1);
            }
            let lactating = purchase.days_lactating > 0;
            let (foetuses, offspring) = match (purchase.days_pregnant > 0, lactating) {
                (true, true) if !sheep => (young.saturating_sub(1).min(2), 1),
                (true, true) => (young.min(3), 1),
                (true, false) => (young.min(3), 0),
                (false, _) => (0, young),
            };
            cohort.set_mated_to(sire);
            if foetuses > 0 {
                cohort.set_pregnancy(purchase.days_pregnant, foetuses);
            }
            if lactating {
                cohort.set_lactation(
                    purchase.days_lactating,
                    offspring,
                    purchase.young_weight.filter(|&w| w > 0.0),
                    purchase.young_fleece,
                )?;
            }
        }

        let paddock = self.default_paddock();
        let index = self.add(cohort, paddock, purchase.tag)?;
        debug!(genotype = %purchase.genotype, number = purchase.number, index, "stock bought");
        Ok(Some(index))
    }

    /// Sells `number` head from the selected cohorts, earliest first. Young at foot go
    /// with their mothers. Emptied cohorts are removed. Returns the number sold.
    pub fn sell(&mut self, selector: GroupSelector, number: u32) -> StockResult<u32> {
        let mut remaining = number;
        for idx in self.selected(selector)? {
            if remaining == 0 {
                break;
            }
            let cohort = &mut self.cohorts[idx];
            let sold = remaining.min(cohort.no_animals());
            cohort.split(sold, WeightDiffs::default(), WeightDiffs::default())?;
            remaining -= sold;
        }
        self.cohorts.retain(|c| c.no_animals() > 0);
        Ok(number - remaining)
    }

    /// Keeps `keep` animals in cohort `index` and moves the rest to a new cohort in the
    /// same paddock with the same tag. Returns the new cohort's index.
    pub fn split(&mut self, index: usize, keep: u32) -> StockResult<Option<usize>> {
        let cohort = self.cohort_mut(index)?;
        let excess = cohort.no_animals().saturating_sub(keep);
        if excess == 0 {
            return Ok(None);
        }
        let split = cohort.split(excess, WeightDiffs::default(), WeightDiffs::default())?;
        let (paddock, tag) = (cohort.paddock, cohort.tag);
        self.add(split, paddock, tag).map(Some)
    }

    /// Splits off the animals lighter than `live_weight`, assuming live weight is
    /// normally distributed within each cohort. The lighter animals carry a genetic
    /// difference in reference, base and fleece weight. Returns the new cohorts.
    pub fn split_by_weight(&mut self, selector: GroupSelector, live_weight: f64) -> StockResult<Vec<usize>> {
        let mut created = Vec::new();
        for idx in self.selected(selector)? {
            let cohort = &mut self.cohorts[idx];
            let number = cohort.no_animals();
            let mean_lw = cohort.live_weight();
            if number == 0 || mean_lw <= 0.0 {
                continue;
            }
            let split_sd = (live_weight - mean_lw) / (WEIGHT_CV * mean_lw);
            let remove_propn = cum_normal(split_sd);
            let to_remove = ((number as f64 * remove_propn).round() as u32).min(number);
            if to_remove == 0 {
                continue;
            }

            let mut diffs = WeightDiffs::default();
            if to_remove < number {
                let width = (split_sd - WEIGHT_TAIL_SD) / WEIGHT_STEPS as f64;
                let mut right = WEIGHT_TAIL_SD;
                let mut prev_cum = 0.0;
                let mut remove_lw = 0.0;
                for _ in 0..WEIGHT_STEPS {
                    right += width;
                    let cum = cum_normal(right);
                    remove_lw += (cum - prev_cum) * mean_lw * (1.0 + WEIGHT_CV * (right - 0.5 * width));
                    prev_cum = cum;
                }
                remove_lw /= remove_propn;
                let ratio = remove_lw / mean_lw - 1.0;
                diffs = WeightDiffs {
                    std_ref_wt: ratio * cohort.std_ref_wt(),
                    base_weight: ratio * cohort.base_weight(),
                    fleece_wt: ratio * cohort.fleece_weight(),
                };
            }

            let split = cohort.split(to_remove, diffs, WeightDiffs::default())?;
            let (paddock, tag) = (cohort.paddock, cohort.tag);
            created.push(self.add(split, paddock, tag)?);
        }
        Ok(created)
    }

    /// Separates mothers by the sex of their young at foot. Returns the new cohorts.
    pub fn split_by_young(&mut self, selector: GroupSelector) -> StockResult<Vec<usize>> {
        let mut created = Vec::new();
        for idx in self.selected(selector)? {
            let groups = self.cohorts[idx].split_young()?;
            let (paddock, tag) = (self.cohorts[idx].paddock, self.cohorts[idx].tag);
            for group in groups {
                created.push(self.add(group, paddock, tag)?);
            }
        }
        Ok(created)
    }

    /// Weans up to `number` young of the chosen sexes. Mothers beyond those needed are
    /// split off first. Weaners join their mothers' paddock and tag. Returns the number
    /// weaned.
    pub fn wean(&mut self, selector: GroupSelector, number: u32, females: bool, males: bool) -> StockResult<u32> {
        let mut remaining = number;
        let mut total = 0;
        for idx in self.selected(selector)? {
            let cohort = &self.cohorts[idx];
            let Some(young) = cohort.young() else {
                continue;
            };
            let available = match (females, males) {
                (true, true) => young.no_animals(),
                (false, true) => young.male_no(),
                (true, false) => young.female_no(),
                (false, false) => 0,
            };
            let to_wean = remaining.min(available);
            if to_wean == 0 {
                continue;
            }
            if to_wean == remaining {
                let offspring = cohort.no_offspring().max(1) as f64;
                let per_mother = if females && males { offspring } else { offspring / 2.0 };
                let mothers = (to_wean as f64 / per_mother).round() as u32;
                if mothers < cohort.no_animals() {
                    self.split(idx, mothers)?;
                }
            }

            let (mothers, weaned) = self.cohorts[idx].wean(females, males)?;
            let (paddock, tag) = (self.cohorts[idx].paddock, self.cohorts[idx].tag);
            for group in mothers.into_iter().chain(weaned) {
                self.add(group, paddock, tag)?;
            }
            remaining -= to_wean;
            total += to_wean;
        }
        Ok(total)
    }

    /// Ends lactation in up to `number` females whose young have been weaned.
    pub fn dry_off(&mut self, selector: GroupSelector, number: u32) -> StockResult<u32> {
        let mut remaining = number;
        let mut dried = 0;
        for idx in self.selected(selector)? {
            let cohort = &self.cohorts[idx];
            if !cohort.is_lactating() || cohort.young().is_some() {
                continue;
            }
            let count = remaining.min(cohort.female_no());
            if count == 0 {
                continue;
            }
            if count < cohort.female_no() {
                self.split(idx, count)?;
            }
            if self.cohorts[idx].dry_off() {
                dried += count;
            }
            remaining -= count;
        }
        Ok(dried)
    }

    /// Castrates up to `number` entire males: male young at foot, or the cohort itself
    /// when it is made up of entire males.
    pub fn castrate(&mut self, selector: GroupSelector, number: u32) -> StockResult<u32> {
        let mut remaining = number;
        let mut done = 0;
        for idx in self.selected(selector)? {
            if remaining == 0 {
                break;
            }
            let cohort = &self.cohorts[idx];
            let (entire, mothers_per_male) = match cohort.young() {
                Some(young) if young.repro() == ReproType::Male && young.male_no() > 0 => {
                    (young.male_no(), cohort.no_animals() as f64 / young.male_no() as f64)
                }
                None if cohort.repro() == ReproType::Male => (cohort.male_no(), 1.0),
                _ => continue,
            };
            let count = remaining.min(entire);
            if count < entire {
                let keep = ((count as f64 * mothers_per_male).round() as u32).max(1);
                self.split(idx, keep)?;
            }
            self.cohorts[idx].castrate();
            remaining -= count;
            done += count;
        }
        Ok(done)
    }

    /// Puts the selected females with sires of genotype `sire` for `days` days.
    pub fn join(&mut self, selector: GroupSelector, sire: &str, days: u32) -> StockResult<()> {
        let male = self.registry.shared(sire)?;
        for idx in self.selected(selector)? {
            self.cohorts[idx].join(&male, days)?;
        }
        Ok(())
    }

    /// Shears the selected cohorts and returns the wool removed.
    pub fn shear(&mut self, selector: GroupSelector, adults: bool, young: bool) -> StockResult<FleeceCut> {
        let mut cut = FleeceCut::default();
        for idx in self.selected(selector)? {
            let shorn = self.cohorts[idx].shear(adults, young);
            cut.greasy += shorn.greasy;
            cut.clean += shorn.clean;
        }
        Ok(cut)
    }

    pub fn move_to(&mut self, selector: GroupSelector, paddock: &str) -> StockResult<()> {
        let target = self.paddock_index(paddock)?;
        for idx in self.selected(selector)? {
            self.cohorts[idx].paddock = target;
        }
        Ok(())
    }

    pub fn set_tag(&mut self, selector: GroupSelector, tag: u32) -> StockResult<()> {
        for idx in self.selected(selector)? {
            self.cohorts[idx].tag = tag;
        }
        Ok(())
    }

    /// Offers `amount` kg of `supplement` in `paddock` for today.
    pub fn place_supplement(
        &mut self,
        paddock: &str,
        amount: f64,
        supplement: &Supplement,
        feed_first: bool,
    ) -> StockResult<()> {
        let index = self.paddock_index(paddock)?;
        self.paddocks[index].feed_supplement(amount, supplement, feed_first);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::tests::{ewes, flock};

    fn merino_ewes(number: u32) -> Purchase {
        Purchase {
            genotype: "Merino".to_string(),
            sex: "ewes".to_string(),
            number,
            age_months: 30.0,
            fleece_wt: 2.0,
            ..Purchase::default()
        }
    }

    #[test]
    fn bought_stock_go_to_first_named_paddock() {
        let mut herd = flock();
        let index = herd.buy(&merino_ewes(50)).unwrap().unwrap();
        let cohort = herd.cohort(index).unwrap();
        assert_eq!(cohort.paddock, 0);
        assert_eq!(cohort.tag, 0);
        assert_eq!(cohort.no_animals(), 50);
        assert_eq!(herd.buy(&merino_ewes(0)).unwrap(), None);
    }

    #[test]
    fn purchase_outside_condition_range_is_rejected() {
        let mut herd = flock();
        let purchase = Purchase {
            live_weight: Some(80.0),
            cond_score: Some(3.0),
            ..merino_ewes(20)
        };
        let err = herd.buy(&purchase).unwrap_err();
        assert!(matches!(err, StockError::PurchaseOutOfRange { .. }));
        assert!(err.to_string().starts_with("Purchased animals with condition score 3.0"));
        assert_eq!(herd.count(), 0);
    }

    #[test]
    fn purchase_condition_is_honoured() {
        let mut herd = flock();
        let genotype = herd.registry().shared("Merino").unwrap();
        let age = (MONTH2DAY * 30.0).round();
        let condition = cond_score_to_condition(2.5, herd.cond_system());
        let (low, high) = genotype.weight_range_for_cond(ReproType::Empty, age, condition);
        let purchase = Purchase {
            live_weight: Some(0.5 * (low + high) + 2.0),
            cond_score: Some(2.5),
            ..merino_ewes(20)
        };
        let index = herd.buy(&purchase).unwrap().unwrap();
        let cohort = herd.cohort(index).unwrap();
        assert!((cohort.body_condition() - condition).abs() < 1e-6);
    }

    #[test]
    fn unknown_sex_is_rejected() {
        let mut herd = flock();
        let purchase = Purchase {
            sex: "hermaphrodite".to_string(),
            ..merino_ewes(5)
        };
        assert_eq!(
            herd.buy(&purchase).unwrap_err(),
            StockError::InvalidSex("hermaphrodite".to_string())
        );
    }

    #[test]
    fn pregnant_lactating_purchase() {
        let mut herd = flock();
        let purchase = Purchase {
            days_pregnant: 40,
            days_lactating: 60,
            young: 2,
            ..merino_ewes(30)
        };
        let index = herd.buy(&purchase).unwrap().unwrap();
        let cohort = herd.cohort(index).unwrap();
        assert_eq!(cohort.no_foetuses(), 2);
        assert!(cohort.is_lactating());
        assert_eq!(cohort.young().map(|y| y.no_animals()), Some(30));
    }

    #[test]
    fn selling_across_groups() {
        let mut herd = flock();
        for number in [30, 20, 40] {
            let cohort = ewes(&herd, number);
            herd.add(cohort, 0, 0).unwrap();
        }
        assert_eq!(herd.sell(GroupSelector::All, 45).unwrap(), 45);
        let left: Vec<u32> = herd.cohorts().iter().map(|c| c.no_animals()).collect();
        assert_eq!(left, vec![5, 40]);
        assert_eq!(herd.sell(GroupSelector::One(1), 100).unwrap(), 40);
        assert_eq!(herd.count(), 1);
    }

    #[test]
    fn split_keeps_paddock_and_tag() {
        let mut herd = flock();
        let cohort = ewes(&herd, 60);
        herd.add(cohort, 1, 7).unwrap();
        let new = herd.split(0, 25).unwrap().unwrap();
        assert_eq!(herd.cohort(0).unwrap().no_animals(), 25);
        let split = herd.cohort(new).unwrap();
        assert_eq!(split.no_animals(), 35);
        assert_eq!((split.paddock, split.tag), (1, 7));
        assert_eq!(herd.split(0, 100).unwrap(), None);
    }

    #[test]
    fn split_by_weight_separates_light_animals() {
        let mut herd = flock();
        let cohort = ewes(&herd, 100);
        let mean = cohort.live_weight();
        herd.add(cohort, 0, 0).unwrap();
        let created = herd.split_by_weight(GroupSelector::One(0), mean).unwrap();
        assert_eq!(created.len(), 1);

        let heavy = herd.cohort(0).unwrap();
        let light = herd.cohort(created[0]).unwrap();
        assert_eq!(heavy.no_animals() + light.no_animals(), 100);
        assert_eq!(light.no_animals(), 50);
        assert!(light.live_weight() < mean && heavy.live_weight() > mean);
        // Mean light weight of a half-normal split is about 0.92 of the mean.
        assert!((light.live_weight() / mean - 0.92).abs() < 0.01);
        let total = heavy.live_weight() * 50.0 + light.live_weight() * 50.0;
        assert!((total - 100.0 * mean).abs() < 1e-6);
    }

    #[test]
    fn weaning_splits_off_surplus_mothers() {
        let mut herd = flock();
        let purchase = Purchase {
            days_lactating: 90,
            young: 1,
            ..merino_ewes(40)
        };
        herd.buy(&purchase).unwrap();
        let weaned = herd.wean(GroupSelector::All, 10, true, true).unwrap();
        assert_eq!(weaned, 10);

        let still_suckling: u32 = herd.cohorts().iter().filter_map(|c| c.young()).map(|y| y.no_animals()).sum();
        assert_eq!(still_suckling, 30);
        let weaners: u32 = herd
            .cohorts()
            .iter()
            .filter(|c| c.age_days() < 365)
            .map(|c| c.no_animals())
            .sum();
        assert_eq!(weaners, 10);
        let mothers: u32 = herd.cohorts().iter().filter(|c| c.age_days() > 365).map(|c| c.no_animals()).sum();
        assert_eq!(mothers, 40);
    }

    #[test]
    fn castration_counts_male_young() {
        let mut herd = flock();
        let purchase = Purchase {
            days_lactating: 30,
            young: 1,
            ..merino_ewes(40)
        };
        herd.buy(&purchase).unwrap();
        let males = herd.cohort(0).unwrap().young().map(|y| y.male_no()).unwrap();
        assert_eq!(herd.castrate(GroupSelector::All, 100).unwrap(), males);
        let young = herd.cohort(0).unwrap().young().unwrap();
        assert_eq!(young.repro(), ReproType::Castrated);
    }

    #[test]
    fn join_checks_species() {
        let mut herd = flock();
        let cohort = ewes(&herd, 10);
        herd.add(cohort, 0, 0).unwrap();
        herd.join(GroupSelector::All, "Border Leicester", 42).unwrap();
        assert_eq!(herd.cohort(0).unwrap().mated_to().map(|g| g.name.as_str()), Some("Border Leicester"));
        assert!(matches!(
            herd.join(GroupSelector::All, "Angus", 42),
            Err(StockError::SpeciesMismatch { .. })
        ));
    }

    #[test]
    fn shearing_returns_wool() {
        let mut herd = flock();
        let cohort = ewes(&herd, 10);
        herd.add(cohort, 0, 0).unwrap();
        let cut = herd.shear(GroupSelector::All, true, false).unwrap();
        assert!((cut.greasy - 20.0).abs() < 1e-9);
        assert!(cut.clean > 0.0 && cut.clean < cut.greasy);
        assert_eq!(herd.cohort(0).unwrap().fleece_weight(), 0.0);
    }

    #[test]
    fn moving_and_tagging() {
        let mut herd = flock();
        let cohort = ewes(&herd, 10);
        herd.add(cohort, 0, 0).unwrap();
        herd.move_to(GroupSelector::One(0), "Back").unwrap();
        herd.set_tag(GroupSelector::All, 9).unwrap();
        let cohort = herd.cohort(0).unwrap();
        assert_eq!((cohort.paddock, cohort.tag), (1, 9));
        assert!(matches!(herd.move_to(GroupSelector::All, "creek"), Err(StockError::UnknownPaddock(_))));
    }

    #[test]
    fn supplement_is_placed_in_paddock() {
        let mut herd = flock();
        herd.place_supplement("home", 250.0, &Supplement::grain(), true).unwrap();
        let home = &herd.paddocks()[0];
        assert!((home.supplement_offered() - 250.0).abs() < 1e-9);
        assert!(home.feed_first);
    }
}
