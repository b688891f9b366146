//! The daily advance of the herd.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::PopulationManager;
use crate::cohort::{AnimalCohort, GrazingRates};
use crate::error::StockResult;
use crate::forage::{ForageAvailability, Supplement, DIG_CLASSES};
use crate::weather::DailyWeather;

const STEP_EPS: f64 = 1.0e-6;
/// Largest share of any digestibility class that may be eaten in one sub-step.
const MAX_CONSUMPTION: f64 = 0.20;
const MIN_STEP: f64 = 0.01;
const NEVER_EXHAUSTED: f64 = 9999.9;
const RDP_PASSES: usize = 2;

/// What happened during one call to [`PopulationManager::dynamics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayStats {
    /// Grazing sub-steps taken in each paddock (final pass).
    pub substeps: Vec<usize>,
    /// Largest share of any digestibility class removed in a single sub-step, per paddock.
    pub peak_offtake: Vec<f64>,
    /// Paddocks whose grazing was replayed for a degradable-protein shortfall.
    pub rdp_retries: usize,
    /// Cohorts split off by ageing (births, deaths, conceptions).
    pub new_groups: usize,
}

/// Length of the next grazing sub-step as a fraction of a day.
///
/// `rel_intake` is the relative intake of each class by a representative cohort,
/// `summed_pot_intake` the paddock's total potential intake (kg/day) and `inputs` the
/// forage currently on offer (kg/ha).
pub fn step_length(area: f64, summed_pot_intake: f64, rel_intake: &[f64; DIG_CLASSES], inputs: &ForageAvailability) -> f64 {
    if area <= 0.0 {
        return 1.0;
    }
    let mut time = NEVER_EXHAUSTED;
    for (class, ri) in inputs.herbage.iter().zip(rel_intake) {
        if class.biomass <= 0.0 {
            continue;
        }
        let rate = summed_pot_intake * ri / area;
        if rate > 0.0 {
            time = time.min(class.biomass / rate);
        }
    }
    (MAX_CONSUMPTION * time).clamp(MIN_STEP, 1.0)
}

impl PopulationManager {
    /// Advances the whole herd by one day: ageing, merging, grazing with the
    /// degradable-protein retry, then growth.
    pub fn dynamics<R: Rng + ?Sized>(&mut self, weather: &DailyWeather, rng: &mut R) -> StockResult<DayStats> {
        let mut stats = DayStats::default();

        for paddock in &mut self.paddocks {
            paddock.compute_totals();
        }
        self.set_initial_inputs();

        // Cohorts created while ageing are not aged again today.
        let existing = self.cohorts.len();
        for idx in 0..existing {
            let created = self.cohorts[idx].age(weather, rng)?;
            let (paddock, tag) = (self.cohorts[idx].paddock, self.cohorts[idx].tag);
            stats.new_groups += created.len();
            for cohort in created {
                self.add(cohort, paddock, tag)?;
            }
        }

        self.merge();

        for cohort in &mut self.cohorts {
            cohort.calculate_intake_limit(weather);
            cohort.store_state();
            cohort.start_grazing();
        }
        for (idx, paddock) in self.paddocks.iter_mut().enumerate() {
            paddock.summed_pot_intake = self
                .cohorts
                .iter()
                .filter(|c| c.paddock == idx)
                .map(AnimalCohort::total_pot_intake)
                .sum();
        }

        for idx in 0..self.paddocks.len() {
            let (substeps, retried, peak) = self.graze_paddock(idx, weather);
            stats.substeps.push(substeps);
            stats.peak_offtake.push(peak);
            if retried {
                stats.rdp_retries += 1;
            }
        }

        for cohort in &mut self.cohorts {
            cohort.complete_growth();
        }
        for paddock in &mut self.paddocks {
            paddock.apply_removal();
        }
        Ok(stats)
    }

    fn set_initial_inputs(&mut self) {
        for idx in 0..self.cohorts.len() {
            let paddock = self.cohorts[idx].paddock;
            let site = self.site(paddock);
            if let Some(padd) = self.paddocks.get(paddock) {
                let inputs = padd.forage_inputs().clone();
                self.cohorts[idx].set_forage_inputs(&inputs, site);
            }
        }
    }

    /// Drops empty cohorts, then folds each cohort into the first earlier one in the same
    /// paddock with the same tag that it is similar to.
    pub(crate) fn merge(&mut self) {
        let mut merged: Vec<AnimalCohort> = Vec::with_capacity(self.cohorts.len());
        for cohort in self.cohorts.drain(..).filter(|c| c.no_animals() > 0) {
            match merged
                .iter_mut()
                .find(|m| m.paddock == cohort.paddock && m.tag == cohort.tag && m.similar(&cohort))
            {
                Some(target) => target.merge(cohort),
                None => merged.push(cohort),
            }
        }
        self.cohorts = merged;
    }

    /// Runs the grazing sub-steps and nutrition for one paddock, replaying once if any
    /// cohort is short of degradable protein. Returns the sub-step count of the final
    /// pass, whether a replay happened and the pass's peak offtake share.
    fn graze_paddock(&mut self, paddock: usize, weather: &DailyWeather) -> (usize, bool, f64) {
        let members: Vec<usize> = (0..self.cohorts.len())
            .filter(|&i| self.cohorts[i].paddock == paddock)
            .collect();
        let Some(&first) = members.first() else {
            return (0, false, 0.0);
        };
        let feed_first = self.paddocks[paddock].feed_first;
        let ration = self.paddocks[paddock].ration().map(|(supplement, _)| supplement);

        let mut retried = false;
        let mut substeps = 0;
        let mut peak = 0.0;
        for pass in 1..=RDP_PASSES {
            substeps = 0;
            peak = 0.0;
            let mut elapsed = 0.0;
            while elapsed < 1.0 - STEP_EPS {
                let inputs = self.set_step_availability(paddock, &members, ration.as_ref());
                let padd = &self.paddocks[paddock];
                let area = padd.area;
                let rel_intake = self.cohorts[first].herbage_rel_intake();
                let dt = step_length(area, padd.summed_pot_intake, &rel_intake, &inputs).min(1.0 - elapsed);

                let mut removal = GrazingRates::default();
                for &idx in &members {
                    removal += self.cohorts[idx].graze(dt, feed_first);
                }
                for (class, eaten) in inputs.herbage.iter().zip(removal.herbage) {
                    if class.biomass > 0.0 {
                        peak = f64::max(peak, eaten / (class.biomass * area));
                    }
                }
                self.paddocks[paddock].add_removal(&removal.herbage, &removal.seed, removal.supplement);
                elapsed += dt;
                substeps += 1;
            }

            let mut min_rdp: f64 = 1.0;
            for &idx in &members {
                self.cohorts[idx].nutrition(weather);
                min_rdp = min_rdp.min(self.cohorts[idx].min_rdp_factor());
            }

            if pass == RDP_PASSES || min_rdp >= 1.0 {
                break;
            }
            debug!(
                paddock = %self.paddocks[paddock].name,
                rdp_factor = min_rdp,
                substeps,
                "degradable protein short, replaying grazing"
            );
            retried = true;
            self.paddocks[paddock].zero_removal();
            for &idx in &members {
                self.cohorts[idx].revert_state();
            }
        }
        (substeps, retried, peak)
    }

    /// Forage left after the removal so far, handed to every cohort in the paddock along
    /// with its share of the remaining supplement.
    fn set_step_availability(
        &mut self,
        paddock: usize,
        members: &[usize],
        ration: Option<&Supplement>,
    ) -> ForageAvailability {
        let padd = &self.paddocks[paddock];
        let area = padd.area;
        let herbage = padd.herbage_removed().map(|kg| kg / area);
        let seed = padd.seed_removed().map(|kg| kg / area);
        let inputs = padd.forage_inputs().less_removal(&herbage, &seed);
        let remaining = padd.supplement_remaining();
        let summed = padd.summed_pot_intake;
        for &idx in members {
            let cohort = &mut self.cohorts[idx];
            cohort.set_step_inputs(&inputs);
            cohort.set_supplement_share(ration, remaining, summed);
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::super::tests::{ewes, flock};
    use super::*;
    use crate::forage::{ForageProvider, HerbageClass, CLASS_DMD};
    use crate::paddock::Paddock;

    #[test]
    fn step_length_is_bounded() {
        let mut inputs = ForageAvailability::default();
        for (idx, class) in inputs.herbage.iter_mut().enumerate() {
            *class = HerbageClass::typical(100.0, CLASS_DMD[idx]);
        }
        let rel = [0.3, 0.3, 0.2, 0.1, 0.05, 0.05];
        assert_eq!(step_length(1.0, 0.0, &rel, &inputs), 1.0);
        assert_eq!(step_length(1.0, 1.0e6, &rel, &inputs), MIN_STEP);
        let dt = step_length(1.0, 200.0, &rel, &inputs);
        assert!(dt > MIN_STEP && dt < 1.0);
        for (class, ri) in inputs.herbage.iter().zip(rel) {
            assert!(dt * 200.0 * ri <= MAX_CONSUMPTION * class.biomass + 1e-9);
        }
    }

    #[test]
    fn heavy_stocking_takes_several_substeps() {
        let mut herd = flock();
        let small = herd.add_paddock(
            Paddock::new("yard", 0.1).with_forage(ForageProvider::pasture("pick", 1500.0, 0.0, 0.0)),
        );
        let cohort = ewes(&herd, 100);
        herd.add(cohort, small, 0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let stats = herd.dynamics(&DailyWeather::default(), &mut rng).unwrap();
        assert!(stats.substeps[small] > 1, "{:?}", stats.substeps);
        assert_eq!(stats.substeps[0], 0);
    }

    #[test]
    fn two_mobs_never_strip_a_class_in_one_substep() {
        let mut herd = flock();
        let plot = herd.add_paddock(
            Paddock::new("plot", 1.0).with_forage(ForageProvider::pasture("short", 1000.0, 300.0, 0.0)),
        );
        herd.add(ewes(&herd, 60), plot, 1).unwrap();
        herd.add(ewes(&herd, 40), plot, 2).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..3 {
            let stats = herd.dynamics(&DailyWeather::default(), &mut rng).unwrap();
            assert_eq!(herd.cohorts().iter().filter(|c| c.paddock == plot).count(), 2);
            assert!(stats.substeps[plot] > 1, "{:?}", stats.substeps);
            let peak = stats.peak_offtake[plot];
            assert!(peak > 0.0 && peak <= MAX_CONSUMPTION + 1e-9, "{peak}");
        }
    }

    #[test]
    fn grazing_removes_herbage_from_paddock() {
        let mut herd = flock();
        let cohort = ewes(&herd, 200);
        herd.add(cohort, 0, 0).unwrap();
        let before = herd.paddocks()[0].forages[0].availability.total_herbage();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        herd.dynamics(&DailyWeather::default(), &mut rng).unwrap();
        let after = herd.paddocks()[0].forages[0].availability.total_herbage();
        let eaten_kg = (before - after) * herd.paddocks()[0].area;
        let intake: f64 = herd.cohorts().iter().map(|c| c.no_animals() as f64 * c.output().herbage.dm).sum();
        assert!(eaten_kg > 0.0);
        assert!((eaten_kg - intake).abs() < 1e-6 * eaten_kg.max(1.0), "{eaten_kg} vs {intake}");
    }

    #[test]
    fn similar_cohorts_merge_after_ageing() {
        let mut herd = flock();
        let a = ewes(&herd, 50);
        let b = ewes(&herd, 30);
        let mean = (50.0 * a.base_weight() + 30.0 * b.base_weight()) / 80.0;
        herd.add(a, 0, 1).unwrap();
        herd.add(b, 0, 1).unwrap();
        herd.merge();
        assert_eq!(herd.count(), 1);
        assert_eq!(herd.cohorts()[0].no_animals(), 80);
        assert!((herd.cohorts()[0].base_weight() - mean).abs() < 1e-9);
    }

    #[test]
    fn different_tags_stay_apart() {
        let mut herd = flock();
        let a = ewes(&herd, 50);
        let b = ewes(&herd, 30);
        herd.add(a, 0, 1).unwrap();
        herd.add(b, 0, 2).unwrap();
        herd.merge();
        assert_eq!(herd.count(), 2);
    }

    #[test]
    fn mass_balance_holds_after_growth() {
        let mut herd = flock();
        let cohort = ewes(&herd, 60);
        herd.add(cohort, 1, 0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..10 {
            herd.dynamics(&DailyWeather::default(), &mut rng).unwrap();
        }
        for cohort in herd.cohorts() {
            let sum = cohort.base_weight() + cohort.fleece_weight();
            assert!((cohort.live_weight() - sum).abs() < 1e-6);
            assert!(cohort.rdp_factor() > 0.0 && cohort.rdp_factor() <= 1.0);
        }
    }

    #[test]
    fn same_seed_same_herd() {
        let run = |seed| {
            let mut herd = flock();
            let cohort = ewes(&herd, 300);
            herd.add(cohort, 0, 0).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for _ in 0..30 {
                herd.dynamics(&DailyWeather::default(), &mut rng).unwrap();
            }
            herd.herd_totals()
        };
        assert_eq!(run(9), run(9));
    }
}
