//! Ageing, mortality, reproduction and husbandry operations.

use std::sync::Arc;

use rand::Rng;

use super::{AnimalCohort, Lactation, WeightDiffs, LATE_PREG_DAYS};
use crate::error::{StockError, StockResult};
use crate::genotype::{AnimalKind, Genotype, ReproType};
use crate::numerics::{dim, ramp, sig, xdiv, DAY2RAD, DEG2RAD};
use crate::rng::RngExt;
use crate::weather::DailyWeather;

/// Age (days) from which young can stop suckling of their own accord.
const SELF_WEAN_AGE: u32 = 7;
/// Young stop suckling once milk supplies less than this share of their solid ME.
const SELF_WEAN_MILK_RATIO: f64 = 0.2;
/// Weight factor for the exponential smoothing of the chill index.
const CHILL_SMOOTHING: f64 = 1.0 / 17.0;

/// Fleece removed at shearing (kg, whole cohort).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FleeceCut {
    pub greasy: f64,
    pub clean: f64,
}

impl AnimalCohort {
    /// Advances the cohort one day: deaths, then ageing, mating, conception and birth.
    /// Returns any cohorts split off along the way.
    pub fn age<R: Rng + ?Sized>(&mut self, weather: &DailyWeather, rng: &mut R) -> StockResult<Vec<AnimalCohort>> {
        let chill = weather.chill_index(&self.genotype.chill_c);
        self.chill_index = Some(match self.chill_index {
            Some(old) => (1.0 - CHILL_SMOOTHING) * old + CHILL_SMOOTHING * chill,
            None => chill,
        });

        let mut split_off = self.kill(rng)?;
        self.check_self_weaning();

        let mut created = Vec::new();
        for cohort in std::iter::once(&mut *self).chain(split_off.iter_mut()) {
            cohort.advance_age();
            created.extend(cohort.reproduce(weather, rng)?);
        }
        split_off.extend(created);
        Ok(split_off)
    }

    /// Daily probability of death.
    fn death_rate(&self) -> f64 {
        let g = &self.genotype;
        let age = self.age_days as f64;
        let mut rate = if self.suckling || age >= g.mort_age[2] {
            g.mort_rate[1]
        } else if age < g.mort_age[1] {
            g.mort_rate[2]
        } else {
            g.mort_rate[2] + (g.mort_rate[1] - g.mort_rate[2]) * ramp(age, g.mort_age[1], g.mort_age[2])
        };
        let delta_normal = g.max_normal_wt(self.std_ref_wt, self.birth_weight, age + 1.0)
            - g.max_normal_wt(self.std_ref_wt, self.birth_weight, age);
        if !self.suckling
            && self.body_condition < g.mort_cond_const
            && self.weight_change < 0.2 * delta_normal
        {
            rate += g.mort_intensity * (g.mort_cond_const - self.body_condition);
        }
        rate.min(1.0)
    }

    /// Probability that a newborn lamb dies of exposure.
    fn exposure_mortality(&self, young: &AnimalCohort) -> f64 {
        let ec = &self.genotype.exposure_consts;
        if self.genotype.kind != AnimalKind::Sheep || young.age_days != 1 {
            return 0.0;
        }
        let chill = self.chill_index.unwrap_or(0.0);
        if chill <= 0.0 {
            return 0.0;
        }
        let mut logit = ec[0] - ec[1] * young.body_condition + ec[2] * chill;
        if self.lact.no_offspring > 1 {
            logit += ec[3];
        }
        1.0 / (1.0 + (-logit).exp())
    }

    fn kill<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StockResult<Vec<AnimalCohort>> {
        self.deaths = 0;
        if let Some(young) = self.young.as_mut() {
            young.deaths = 0;
        }
        let rate = self.death_rate();
        let male_deaths = rng.sample_proportion(self.male_no, rate);
        let female_deaths = rng.sample_proportion(self.female_no, rate);
        let young_losses = match &self.young {
            Some(young) => {
                let count = young.no_animals();
                let exposure = rng.sample_proportion(count, self.exposure_mortality(young));
                let natural = rng.sample_proportion(count - exposure, young.death_rate());
                exposure + natural
            }
            None => 0,
        };

        if male_deaths + female_deaths > 0 {
            let diffs = WeightDiffs {
                base_weight: -self.genotype.mort_wt_diff * self.base_weight,
                ..WeightDiffs::default()
            };
            let dead = self.split(male_deaths + female_deaths, diffs, WeightDiffs::default())?;
            self.deaths += dead.no_animals();
            if let (Some(young), Some(dead_young)) = (self.young.as_mut(), dead.young.as_ref()) {
                young.deaths += dead_young.no_animals();
            }
        }
        let orphan_losses = young_losses.saturating_sub(
            (female_deaths as u64 * self.lact.no_offspring as u64).min(u32::MAX as u64) as u32,
        );
        let mut split_off = Vec::new();
        if orphan_losses > 0 && self.young.is_some() {
            if let Some(group) = self.lose_young(orphan_losses)? {
                split_off.push(group);
            }
        }
        Ok(split_off)
    }

    /// Removes one young from each of `mothers` mothers, splitting those mothers into a
    /// new cohort with one fewer offspring.
    fn lose_young(&mut self, mothers: u32) -> StockResult<Option<AnimalCohort>> {
        let mothers = mothers.min(self.female_no);
        if mothers == 0 || self.lact.no_offspring == 0 {
            return Ok(None);
        }
        let mut group = self.split(mothers, WeightDiffs::default(), WeightDiffs::default())?;
        if let Some(young) = group.young.as_mut() {
            let dead = young.split(mothers.min(young.no_animals()), WeightDiffs::default(), WeightDiffs::default())?;
            young.deaths += dead.no_animals();
        }
        group.lact.no_offspring -= 1;
        if group.lact.no_offspring == 0 {
            group.young = None;
            if group.genotype.kind == AnimalKind::Sheep {
                group.end_lactation();
            }
        }
        Ok(Some(group))
    }

    fn check_self_weaning(&mut self) {
        if let Some(young) = self.young.as_mut() {
            if young.suckling
                && young.age_days >= SELF_WEAN_AGE
                && young.state.me_intake.milk < SELF_WEAN_MILK_RATIO * young.state.me_intake.solid
            {
                young.suckling = false;
            }
        }
    }

    fn advance_age(&mut self) {
        self.age_days += 1;
        if self.lact.lactating {
            self.lact.days += 1;
        } else if self.lact.dry_off_time > 0.0 {
            self.lact.dry_off_time += self.genotype.intake_c[19];
        }
        self.calculate_weights();
        if let Some(young) = self.young.as_mut() {
            young.advance_age();
        }
    }

    fn reproduce<R: Rng + ?Sized>(&mut self, weather: &DailyWeather, rng: &mut R) -> StockResult<Vec<AnimalCohort>> {
        let mut created = Vec::new();
        match self.repro {
            ReproType::Empty if self.mate_cycle >= 0 => {
                self.days_to_mate -= 1;
                if self.days_to_mate <= 0 {
                    self.mate_cycle = -1;
                } else {
                    self.mate_cycle = (self.mate_cycle + 1) % self.genotype.ovulation_period.max(1) as i32;
                }
                let lactating_ewes = self.genotype.kind == AnimalKind::Sheep && self.lact.lactating;
                if self.mate_cycle == 0 && !lactating_ewes {
                    created = self.conceive(weather, rng)?;
                }
            }
            ReproType::EarlyPreg | ReproType::LatePreg => {
                self.foetal_age += 1;
                let gestation = self.genotype.gestation();
                if self.foetal_age + LATE_PREG_DAYS >= gestation {
                    self.repro = ReproType::LatePreg;
                }
                if self.foetal_age >= gestation {
                    created.extend(self.give_birth()?);
                }
            }
            _ => {}
        }
        Ok(created)
    }

    /// Proportions of the females conceiving 1, 2 or 3 young at the current oestrus.
    pub fn conception_rates(&self, weather: &DailyWeather) -> [f64; 4] {
        let g = &self.genotype;
        let day_len_factor = (1.0 - (DAY2RAD * (weather.day_of_year as f64 + 10.0)).sin())
            * (weather.latitude * DEG2RAD).sin()
            / (-35.0 * DEG2RAD).sin();
        let size_cond = self.relative_size * self.body_condition;

        let mut at_least = [0.0; 5];
        for n in 1..=g.max_young.min(3) {
            let sigs = g.conceive_sigs[n];
            let propn = if sigs[0] < 5.0 {
                dim(1.0, g.day_length_const[n] * day_len_factor) * sig(size_cond, sigs)
            } else {
                0.0
            };
            at_least[n] = if n == 1 { propn } else { propn.min(at_least[n - 1]) };
        }
        let mut rates = [0.0; 4];
        for n in 1..=3 {
            rates[n] = dim(at_least[n], at_least[n + 1]);
        }
        rates
    }

    fn conceive<R: Rng + ?Sized>(&mut self, weather: &DailyWeather, rng: &mut R) -> StockResult<Vec<AnimalCohort>> {
        let rates = self.conception_rates(weather);
        let initial = self.female_no;
        let mut pregnant = Vec::new();
        for (n, rate) in rates.iter().enumerate().skip(1) {
            let number = rng.sample_proportion(initial, *rate).min(self.female_no);
            if number == 0 {
                continue;
            }
            let diffs = WeightDiffs {
                base_weight: self.genotype.fert_wt_diff,
                ..WeightDiffs::default()
            };
            let mut group = self.split(number, diffs, WeightDiffs::default())?;
            group.mate_cycle = -1;
            group.days_to_mate = 0;
            group.set_pregnancy(1, n);
            pregnant.push(group);
        }
        Ok(pregnant)
    }

    fn give_birth(&mut self) -> StockResult<Vec<AnimalCohort>> {
        let mut weaned = Vec::new();
        if let Some(previous) = self.young.take() {
            weaned.extend(previous.into_weaned());
        }
        let genotype = self.offspring_genotype()?;
        let offspring = self.no_foetuses;
        let birth_wt = self
            .foetal_weight
            .max(0.1 * genotype.std_birth_wt(offspring.max(1)));
        let number = self.female_no * offspring as u32;
        if number > 0 {
            let mut young = Self::new_young(genotype, number, 0, birth_wt, 0.0)?;
            young.birth_weight = birth_wt;
            young.max_prev_weight = birth_wt;
            young.calculate_weights();
            self.young = Some(Box::new(young));
        }
        self.lact = Lactation {
            lactating: true,
            days: 1,
            no_offspring: offspring,
            previous_offspring: offspring,
            birth_condition: self.body_condition,
            prop_max_milk: 1.0,
            ..Lactation::default()
        };
        self.repro = ReproType::Empty;
        self.foetal_age = 0;
        self.no_foetuses = 0;
        self.foetal_weight = 0.0;
        self.mated_to = None;
        self.calculate_weights();
        Ok(weaned)
    }

    pub(super) fn end_lactation(&mut self) {
        if self.lact.lactating {
            self.lact.previous_offspring = self.lact.no_offspring.max(self.lact.previous_offspring);
            self.lact.dry_off_time = self.lact.days as f64;
        }
        self.lact.lactating = false;
        self.lact.days = 0;
        self.lact.no_offspring = 0;
        self.lact.adjust = 1.0;
        self.lact.ratio = 1.0;
        self.lact.prop_max_milk = 0.0;
        self.lact.milk_energy = 0.0;
        self.lact.milk_protein = 0.0;
        self.lact.milk_yield = 0.0;
    }

    /// Turns detached young into independent cohorts, one per sex present.
    fn into_weaned(mut self) -> Vec<AnimalCohort> {
        self.suckling = false;
        self.is_young = false;
        self.milk_supply = (0.0, 0.0);
        let mut weaned = Vec::new();
        if self.female_no > 0 && self.male_no > 0 {
            let female_srw = self.genotype.sex_std_ref_wt(ReproType::Empty);
            let diffs = WeightDiffs {
                std_ref_wt: female_srw - self.std_ref_wt,
                base_weight: self.base_weight * (female_srw / self.std_ref_wt - 1.0),
                fleece_wt: 0.0,
            };
            let mut females = self.split_sex(0, self.female_no, diffs);
            females.repro = ReproType::Empty;
            females.recompute_srw();
            females.calculate_weights();
            weaned.push(females);
        } else if self.female_no > 0 {
            self.repro = ReproType::Empty;
        }
        if self.no_animals() > 0 {
            self.recompute_srw();
            self.calculate_weights();
            weaned.push(self);
        }
        weaned
    }

    fn after_weaning(&mut self) {
        if self.genotype.kind == AnimalKind::Sheep {
            self.end_lactation();
        }
    }

    /// Weans the young of the selected sexes. Returns mothers split off to keep young of
    /// the other sex, and the weaned cohorts.
    pub fn wean(&mut self, females: bool, males: bool) -> StockResult<(Vec<AnimalCohort>, Vec<AnimalCohort>)> {
        let Some(young) = self.young.as_ref() else {
            return Ok((Vec::new(), Vec::new()));
        };
        if !females && !males {
            return Ok((Vec::new(), Vec::new()));
        }
        let (young_males, young_females) = (young.male_no, young.female_no);
        let all = (males || young_males == 0) && (females || young_females == 0);

        let mut mothers = Vec::new();
        let mut weaned = Vec::new();
        let Some(mut young) = self.young.take() else {
            return Ok((mothers, weaned));
        };
        if !all {
            let kept = if males { young_females } else { young_males };
            let share = xdiv(kept as f64, (young_males + young_females) as f64);
            let keep_mothers = ((self.female_no as f64 * share).round() as u32)
                .clamp(1, self.female_no.max(1))
                .min(self.female_no);
            let mut keeping = self.split_sex(0, keep_mothers, WeightDiffs::default());
            let kept_young = if males {
                young.split_sex(0, young_females, WeightDiffs::default())
            } else {
                young.split_sex(young_males, 0, WeightDiffs::default())
            };
            keeping.young = Some(Box::new(kept_young));
            if keeping.no_animals() > 0 {
                mothers.push(keeping);
            }
        }
        weaned.extend(young.into_weaned());
        self.after_weaning();
        Ok((mothers, weaned))
    }

    /// Ends lactation in cohorts with no young at foot.
    pub fn dry_off(&mut self) -> bool {
        if self.young.is_none() && self.lact.lactating {
            self.end_lactation();
            true
        } else {
            false
        }
    }

    /// Castrates entire males, including male young at foot.
    pub fn castrate(&mut self) {
        if self.repro == ReproType::Male {
            self.repro = ReproType::Castrated;
            self.recompute_srw();
            self.calculate_weights();
        }
        if let Some(young) = self.young.as_mut() {
            young.castrate();
        }
    }

    /// Puts females with a sire of genotype `male` for `days` days.
    pub fn join(&mut self, male: &Arc<Genotype>, days: u32) -> StockResult<()> {
        if male.kind != self.genotype.kind {
            return Err(StockError::SpeciesMismatch {
                female: self.genotype.kind.to_string(),
                male: male.kind.to_string(),
            });
        }
        if self.repro != ReproType::Empty || self.age_days < self.genotype.puberty[0] {
            return Ok(());
        }
        self.mated_to = Some(Arc::clone(male));
        self.days_to_mate = days as i32;
        self.mate_cycle = if days > 0 {
            (self.genotype.ovulation_period / 2) as i32
        } else {
            -1
        };
        Ok(())
    }

    /// Removes the fleece from the adults and/or the young at foot.
    pub fn shear(&mut self, adults: bool, young: bool) -> FleeceCut {
        let mut cut = FleeceCut::default();
        if self.genotype.kind != AnimalKind::Sheep {
            return cut;
        }
        if adults {
            let number = self.no_animals() as f64;
            cut.greasy += number * self.wool_wt;
            cut.clean += number * self.wool_wt * self.genotype.wool_c[3];
            self.wool_wt = 0.0;
        }
        if young {
            if let Some(lambs) = self.young.as_mut() {
                let lamb_cut = lambs.shear(true, false);
                cut.greasy += lamb_cut.greasy;
                cut.clean += lamb_cut.clean;
            }
        }
        cut
    }

    /// Separates mothers by the sex of their young: single-bearing mothers of female
    /// young, then mothers of mixed twins and of female twins.
    pub fn split_young(&mut self) -> StockResult<Vec<AnimalCohort>> {
        let Some(young) = self.young.as_ref() else {
            return Ok(Vec::new());
        };
        let (males, females) = (young.male_no, young.female_no);
        if males == 0 || females == 0 {
            return Ok(Vec::new());
        }
        let mut groups = Vec::new();
        match self.lact.no_offspring {
            1 => groups.push(self.split_with_young(females, 0, females)?),
            2 => {
                let mut mixed = males.min(females);
                if (females - mixed) % 2 == 1 {
                    mixed -= 1;
                }
                let female_twins = (females - mixed) / 2;
                if mixed > 0 {
                    groups.push(self.split_with_young(mixed, mixed, mixed)?);
                }
                if female_twins > 0 {
                    groups.push(self.split_with_young(female_twins, 0, 2 * female_twins)?);
                }
            }
            _ => {}
        }
        Ok(groups)
    }

    fn split_with_young(&mut self, mothers: u32, young_males: u32, young_females: u32) -> StockResult<AnimalCohort> {
        let Some(mut young) = self.young.take() else {
            return Err(StockError::InvalidSplit {
                requested: mothers as i64,
                available: 0,
            });
        };
        if mothers > self.female_no {
            self.young = Some(young);
            return Err(StockError::InvalidSplit {
                requested: mothers as i64,
                available: self.female_no,
            });
        }
        let mut group = self.split_sex(0, mothers, WeightDiffs::default());
        group.young = Some(Box::new(young.split_sex(young_males, young_females, WeightDiffs::default())));
        self.young = Some(young);
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::super::tests::{ewes, merino};
    use super::*;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    #[test]
    fn ageing_advances_age_and_lactation() {
        let mut cohort = ewes(10);
        cohort.set_lactation(10, 1, None, 0.0).unwrap();
        let age = cohort.age_days();
        cohort.age(&DailyWeather::default(), &mut rng()).unwrap();
        assert_eq!(cohort.age_days(), age + 1);
        assert_eq!(cohort.days_lactating(), 11);
        assert_eq!(cohort.young().unwrap().age_days(), 11);
    }

    #[test]
    fn pregnancy_ends_in_birth() {
        let mut cohort = ewes(20);
        cohort.set_pregnancy(149, 2);
        cohort.age(&DailyWeather::default(), &mut rng()).unwrap();
        assert_eq!(cohort.repro(), ReproType::Empty);
        assert!(cohort.is_lactating());
        assert_eq!(cohort.no_offspring(), 2);
        let lambs = cohort.young().unwrap();
        assert_eq!(lambs.no_animals(), 2 * cohort.female_no());
        assert!(lambs.base_weight() > 2.0 && lambs.base_weight() < 6.0);
    }

    #[test]
    fn joined_ewes_conceive_within_two_cycles() {
        let mut cohort = ewes(200);
        cohort.set_condition_at_weight(1.1);
        cohort.join(&merino(), 40).unwrap();
        let mut pregnant = 0;
        let mut rng = rng();
        for _ in 0..40 {
            for group in cohort.age(&DailyWeather::default(), &mut rng).unwrap() {
                if group.is_pregnant() {
                    pregnant += group.female_no();
                }
            }
        }
        assert!(pregnant > 100, "{pregnant}");
        assert!(pregnant + cohort.female_no() <= 200);
    }

    #[test]
    fn cross_species_joining_is_rejected() {
        let mut cohort = ewes(5);
        let angus = crate::genotype::GenotypeRegistry::with_builtin_breeds()
            .shared("Angus")
            .unwrap();
        assert!(matches!(
            cohort.join(&angus, 30),
            Err(StockError::SpeciesMismatch { .. })
        ));
    }

    #[test]
    fn weaning_both_sexes_detaches_young() {
        let mut cohort = ewes(30);
        cohort.set_lactation(100, 1, None, 0.0).unwrap();
        let (mothers, weaned) = cohort.wean(true, true).unwrap();
        assert!(mothers.is_empty());
        assert_eq!(weaned.len(), 2);
        assert_eq!(weaned.iter().map(|w| w.no_animals()).sum::<u32>(), 30);
        assert!(weaned.iter().any(|w| w.repro() == ReproType::Empty));
        assert!(cohort.young().is_none());
        assert!(!cohort.is_lactating());
    }

    #[test]
    fn weaning_one_sex_keeps_the_other_at_foot() {
        let mut cohort = ewes(30);
        cohort.set_lactation(100, 1, None, 0.0).unwrap();
        let (mothers, weaned) = cohort.wean(false, true).unwrap();
        assert_eq!(weaned.len(), 1);
        assert_eq!(weaned[0].female_no(), 0);
        assert_eq!(mothers.len(), 1);
        assert_eq!(mothers[0].young().unwrap().male_no(), 0);
        assert_eq!(mothers[0].female_no() + cohort.female_no(), 30);
    }

    #[test]
    fn dry_off_needs_no_young() {
        let mut cohort = ewes(5);
        cohort.set_lactation(60, 1, None, 0.0).unwrap();
        assert!(!cohort.dry_off());
        cohort.wean(true, true).unwrap();
        assert!(!cohort.dry_off());

        let mut cows = AnimalCohort::new(
            crate::genotype::GenotypeRegistry::with_builtin_breeds().shared("Friesian").unwrap(),
            ReproType::Empty,
            10,
            4 * 365,
            550.0,
            0.0,
        )
        .unwrap();
        cows.set_lactation(200, 0, None, 0.0).unwrap();
        assert!(cows.dry_off());
        assert!(!cows.is_lactating());
    }

    #[test]
    fn castration_lowers_reference_weight() {
        let mut rams = AnimalCohort::new(merino(), ReproType::Male, 10, 400, 60.0, 2.0).unwrap();
        let srw = rams.std_ref_wt();
        rams.castrate();
        assert_eq!(rams.repro(), ReproType::Castrated);
        assert!(rams.std_ref_wt() < srw);
    }

    #[test]
    fn shearing_returns_the_fleece() {
        let mut cohort = ewes(10);
        let cut = cohort.shear(true, false);
        assert!((cut.greasy - 30.0).abs() < 1e-9);
        assert!((cut.clean - 30.0 * 0.7).abs() < 1e-9);
        assert_eq!(cohort.fleece_weight(), 0.0);
    }

    #[test]
    fn split_young_separates_single_mothers_by_lamb_sex() {
        let mut cohort = ewes(40);
        cohort.set_lactation(30, 1, None, 0.0).unwrap();
        let groups = cohort.split_young().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].young().unwrap().male_no(), 0);
        assert_eq!(cohort.young().unwrap().female_no(), 0);
        assert_eq!(groups[0].female_no() + cohort.female_no(), 40);
    }

    #[test]
    fn conception_rises_with_condition() {
        let mut thin = ewes(1);
        thin.set_condition_at_weight(0.8);
        let mut fat = ewes(1);
        fat.base_weight = fat.normal_weight() * 1.1;
        fat.calculate_weights();
        let weather = DailyWeather::default();
        let thin_total: f64 = thin.conception_rates(&weather).iter().sum();
        let fat_total: f64 = fat.conception_rates(&weather).iter().sum();
        assert!(fat_total > thin_total);
        assert!(fat_total <= 1.0);
    }
}
