//! Potential intake and diet selection.

use std::ops::AddAssign;

use super::AnimalCohort;
use crate::forage::{HerbageClass, DIG_CLASSES};
use crate::numerics::{dim, ramp, wood, xdiv, VERY_SMALL};
use crate::weather::DailyWeather;

/// Feed removed by a cohort (and its young) during one grazing sub-step, in kg.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GrazingRates {
    pub herbage: [f64; DIG_CLASSES],
    pub seed: [f64; 2],
    pub supplement: f64,
}

impl AddAssign for GrazingRates {
    fn add_assign(&mut self, other: GrazingRates) {
        for (a, b) in self.herbage.iter_mut().zip(other.herbage) {
            *a += b;
        }
        for (a, b) in self.seed.iter_mut().zip(other.seed) {
            *a += b;
        }
        self.supplement += other.supplement;
    }
}

/// Intake per unit of potential intake.
#[derive(Debug, Clone, Copy, Default)]
struct RelIntake {
    herbage: [f64; DIG_CLASSES],
    seed: [f64; 2],
    supplement: f64,
    /// Fill left for later sub-steps after supplement fed ahead of pasture.
    start_fu: f64,
    supp_first: bool,
}

/// Herbage classes plus one extra slot that only receives supplement.
const FEED_SLOTS: usize = DIG_CLASSES + 1;

struct Selection<'a> {
    cohort: &'a AnimalCohort,
    fu: f64,
    rel_intake: [f64; FEED_SLOTS],
    supp_ri: f64,
    supp_rel_q: f64,
    rel_q: [f64; FEED_SLOTS],
    avail: [f64; FEED_SLOTS],
    height: [f64; FEED_SLOTS],
    total_feed: f64,
    supp_dm: f64,
    dt: f64,
}

impl Selection<'_> {
    fn relative_fill(&self, biomass: f64, height_ratio: f64) -> f64 {
        let gc = &self.cohort.genotype.graze_c;
        let height_factor = (1.0 - gc[12] + gc[12] * height_ratio).max(0.0);
        let size_factor = 1.0 + dim(gc[7], self.cohort.relative_size);
        let scaled = height_factor * size_factor * biomass;
        let propn_factor = 1.0 + gc[13] * xdiv(biomass, self.total_feed);
        let rate = 1.0 - (-propn_factor * gc[4] * scaled).exp();
        let time = 1.0 + gc[5] * (-propn_factor * (gc[6] * scaled).powi(2)).exp();
        self.fu * rate * time
    }

    fn eat_pasture(&mut self, slot: usize, biomass: f64) {
        let fill = self.relative_fill(biomass, self.height[slot]).min(self.fu);
        self.rel_intake[slot] += fill * self.rel_q[slot];
        self.fu = dim(self.fu, fill);
    }

    fn eat_supplement(&mut self, first: bool) {
        let cohort = self.cohort;
        let pot = cohort.pot_intake;
        let Some(ration) = cohort.ration.as_ref() else {
            return;
        };
        if pot < VERY_SMALL || self.supp_rel_q <= 0.0 {
            return;
        }
        let period = if first { 1.0 } else { self.dt };
        let mut fill = self.fu.min(self.supp_dm / (pot * period * self.supp_rel_q));
        if !ration.is_roughage && ration.me_dm > 0.0 {
            let gc = &cohort.genotype.graze_c;
            let limit = if cohort.lact.lactating { gc[20] } else { gc[11] };
            fill = fill.min(limit / ration.me_dm);
        }
        self.supp_ri += self.supp_rel_q * fill;
        self.fu = dim(self.fu, fill);
    }
}

impl AnimalCohort {
    /// Sets today's potential intake for the cohort and its young.
    pub fn calculate_intake_limit(&mut self, weather: &DailyWeather) {
        self.pot_intake = self.intake_limit(weather, None);
        let prop_max_milk = self.lact.prop_max_milk;
        if let Some(young) = self.young.as_mut() {
            young.pot_intake = young.intake_limit(weather, Some(prop_max_milk));
        }
    }

    fn intake_limit(&self, weather: &DailyWeather, mothers_prop_max_milk: Option<f64>) -> f64 {
        let ci = &self.genotype.intake_c;
        let z = self.relative_size;
        let bc = self.body_condition;

        let cond_factor = if bc > 1.0 {
            bc * (ci[20] - bc) / (ci[20] - 1.0)
        } else {
            1.0
        };
        let young_factor = match mothers_prop_max_milk {
            Some(prop_max) if self.suckling => {
                (1.0 - prop_max) / (1.0 + (-ci[3] * (self.age_days as f64 - ci[4])).exp())
            }
            _ => 1.0,
        };
        let heat_factor = if weather.min_t >= ci[7] {
            1.0 - ci[5] * dim(weather.mean_t(), ci[6])
        } else {
            1.0
        };
        let intake = ci[1]
            * self.std_ref_wt
            * z
            * (ci[2] - z)
            * cond_factor
            * young_factor
            * heat_factor
            * self.lactation_intake_factor();
        intake.max(0.0)
    }

    fn no_suckling(&self) -> usize {
        match &self.young {
            Some(young) if young.suckling => self.lact.no_offspring,
            _ => 0,
        }
    }

    fn lactation_intake_factor(&self) -> f64 {
        if self.repro.is_male() || self.is_young {
            return 1.0;
        }
        let ci = &self.genotype.intake_c;
        let (lact_num, lact_time, adjust) = if self.lact.lactating {
            (self.no_suckling(), self.lact.days as f64, self.lact.adjust)
        } else {
            (self.lact.previous_offspring, self.lact.dry_off_time, 1.0)
        };
        let shape = if self.no_suckling() > 0 { ci[9] } else { ci[21] };
        let cond = (1.0 - ci[15]) + ci[15] * self.lact.birth_condition;
        1.0 + self.genotype.intake_lact_c[lact_num.min(3)] * cond * wood(lact_time, ci[8], shape) * adjust
    }

    /// Prepares the cohort and its young for the first grazing sub-step of a day.
    pub fn start_grazing(&mut self) {
        let mei = self.state.me_intake.total;
        let waterlog = self.site.waterlog;
        self.waterlog_scalar = if mei > 0.0 && waterlog > 0.0 && self.site.steepness <= 1.0 {
            let gain_me = xdiv(self.state.energy.gain, self.state.effic.gain);
            dim(1.0, gain_me / mei * waterlog).min(1.0)
        } else {
            1.0
        };
        self.reset_grazing();
        if let Some(young) = self.young.as_mut() {
            young.start_grazing();
        }
    }

    pub(crate) fn reset_grazing(&mut self) {
        self.start_fu = 1.0;
        self.state.herbage = Default::default();
        self.state.supplement = Default::default();
        self.state.herbage_by_class = [0.0; DIG_CLASSES];
        self.state.seed = [0.0; 2];
    }

    /// Relative intake of each herbage class for a full day with no supplement, used to
    /// size the grazing sub-steps.
    pub fn herbage_rel_intake(&self) -> [f64; DIG_CLASSES] {
        self.relative_intake(1.0, false, false, false).herbage
    }

    fn relative_intake(&self, dt: f64, feed_first: bool, with_supplement: bool, waterlog: bool) -> RelIntake {
        let gc = &self.genotype.graze_c;
        let inputs = &self.step_inputs;

        let mut avail = [0.0; FEED_SLOTS];
        let mut height = [1.0; FEED_SLOTS];
        for (slot, class) in inputs.herbage.iter().enumerate() {
            avail[slot] = class.biomass;
            height[slot] = class.height_ratio;
        }
        for (seed, &slot) in inputs.seed.iter().zip(inputs.seed_class.iter()) {
            if seed.biomass > 0.0 && slot < DIG_CLASSES {
                let total = avail[slot] + seed.biomass;
                height[slot] = (height[slot] * avail[slot] + seed.height_ratio * seed.biomass) / total;
                avail[slot] = total;
            }
        }
        let total_feed: f64 = avail.iter().sum();

        let select_factor = (1.0 - inputs.legume_propn * (1.0 - inputs.legume_trop)) * inputs.select_factor;
        let mut rel_q = [1.0; FEED_SLOTS];
        for (slot, class) in inputs.herbage.iter().enumerate() {
            rel_q[slot] = (1.0 - gc[3] * dim(gc[1] - select_factor, class.dmd)).max(0.0);
        }

        let supp_dm = match &self.ration {
            Some(ration) if with_supplement => self.supp_fw_per_head * ration.dm_propn,
            _ => 0.0,
        };
        let mut supp_rel_q = 0.0;
        let mut subst_rel_q = 0.0;
        if let (Some(ration), true) = (&self.ration, supp_dm > VERY_SMALL) {
            supp_rel_q = gc[14].min(1.0 - gc[3] * (gc[1] - ration.dmd));
            let milk_factor = if self.lact.lactating {
                gc[15] * (-(self.lact.days as f64 / gc[8]).powi(2)).exp()
            } else {
                0.0
            };
            let omd = (1.05 * ration.dmd - 0.01).min(1.0);
            let protein_factor = if omd > 0.0 {
                gc[16] * ramp(ration.cp / omd, gc[9], gc[10])
            } else {
                0.0
            };
            subst_rel_q = supp_rel_q - milk_factor - protein_factor;
        }

        let mut sel = Selection {
            cohort: self,
            fu: self.start_fu,
            rel_intake: [0.0; FEED_SLOTS],
            supp_ri: 0.0,
            supp_rel_q,
            rel_q,
            avail,
            height,
            total_feed,
            supp_dm,
            dt,
        };
        let mut supp_left = supp_dm > VERY_SMALL;
        let mut start_fu = self.start_fu;

        let supp_first = supp_left && (feed_first || total_feed <= VERY_SMALL);
        if supp_first {
            sel.eat_supplement(true);
            start_fu = sel.fu;
            supp_left = false;
        }
        if total_feed > VERY_SMALL {
            let mut slot = 0;
            while slot < FEED_SLOTS && sel.fu >= VERY_SMALL {
                let entry = (0.5 + (subst_rel_q - sel.rel_q[slot]) / (0.1 * gc[3])).min(1.0);
                let biomass = sel.avail[slot];
                if supp_left && entry > 0.0 {
                    sel.eat_pasture(slot, (1.0 - entry) * biomass);
                    sel.eat_supplement(false);
                    sel.eat_pasture(slot, entry * biomass);
                    supp_left = false;
                } else {
                    sel.eat_pasture(slot, biomass);
                }
                slot += 1;
            }
        }
        if supp_left {
            sel.eat_supplement(false);
        }

        let legume_adjust = gc[2] * (1.0 - sel.fu).powi(2) * inputs.legume_propn;
        let waterlog_scalar = if waterlog { self.waterlog_scalar } else { 1.0 };

        let mut out = RelIntake {
            supplement: sel.supp_ri,
            start_fu,
            supp_first,
            ..RelIntake::default()
        };
        for slot in 0..DIG_CLASSES {
            let relative = sel.rel_intake[slot] * waterlog_scalar * (1.0 + legume_adjust);
            out.herbage[slot] = relative * xdiv(inputs.herbage[slot].biomass, sel.avail[slot]);
        }
        for (ripe, seed) in inputs.seed.iter().enumerate() {
            let slot = inputs.seed_class[ripe];
            if slot < DIG_CLASSES && seed.biomass > 0.0 {
                let relative = sel.rel_intake[slot] * waterlog_scalar * (1.0 + legume_adjust);
                out.seed[ripe] = relative * xdiv(seed.biomass, sel.avail[slot]);
            }
        }
        if out.herbage.iter().sum::<f64>() < 1.0e-6 {
            out.herbage = [0.0; DIG_CLASSES];
        }
        out
    }

    /// Eats for `dt` of a day from the current sub-step's offer and returns what the
    /// cohort and its young removed.
    pub fn graze(&mut self, dt: f64, feed_first: bool) -> GrazingRates {
        let ri = self.relative_intake(dt, feed_first, true, true);
        self.start_fu = ri.start_fu;
        let pot = self.pot_intake;
        let number = self.no_animals() as f64;

        let mut removal = GrazingRates::default();
        for (slot, class) in self.step_inputs.herbage.clone().iter().enumerate() {
            let eaten = dt * pot * ri.herbage[slot];
            self.state.herbage_by_class[slot] += eaten;
            self.tally_herbage(class, eaten);
            removal.herbage[slot] = number * eaten;
        }
        for (ripe, seed) in self.step_inputs.seed.clone().iter().enumerate() {
            let eaten = dt * pot * ri.seed[ripe];
            self.state.seed[ripe] += eaten;
            self.tally_herbage(seed, eaten);
            removal.seed[ripe] = number * eaten;
        }

        let supp_eaten = pot * ri.supplement * if ri.supp_first { 1.0 } else { dt };
        if supp_eaten > 0.0 {
            if let Some(ration) = self.ration.clone() {
                self.state.supplement.add(
                    supp_eaten,
                    ration.dmd,
                    ration.me_dm,
                    ration.cp,
                    ration.dg,
                    ration.p,
                    ration.s,
                    ration.ash_alk,
                );
                self.state.supplement.fat += supp_eaten * ration.ether_extract;
                removal.supplement = number * supp_eaten / ration.dm_propn.max(VERY_SMALL);
            }
        }

        if let Some(young) = self.young.as_mut() {
            removal += young.graze(dt, false);
        }
        removal
    }

    fn tally_herbage(&mut self, class: &HerbageClass, eaten: f64) {
        if eaten <= 0.0 {
            return;
        }
        self.state.herbage.add(
            eaten,
            class.dmd,
            crate::forage::herbage_me_dm(class.dmd),
            class.cp,
            class.dg,
            class.p,
            class.s,
            class.ash_alk,
        );
    }

    /// Supplement offered to each head (and each young) for the next sub-step, given the
    /// fresh weight left in the paddock and the paddock's summed potential intake.
    pub fn set_supplement_share(
        &mut self,
        ration: Option<&crate::forage::Supplement>,
        remaining: f64,
        summed_pot_intake: f64,
    ) {
        let share = xdiv(self.pot_intake, summed_pot_intake) * remaining;
        self.set_step_supplement(ration, share);
        if let Some(young) = self.young.as_mut() {
            young.set_supplement_share(ration, remaining, summed_pot_intake);
        }
    }

    /// Potential intake of the cohort and its young, summed over heads.
    pub fn total_pot_intake(&self) -> f64 {
        let own = self.no_animals() as f64 * self.pot_intake;
        own + self.young.as_ref().map_or(0.0, |y| y.total_pot_intake())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::ewes;
    use super::super::GrazingSite;
    use crate::forage::{ForageProvider, Supplement};
    use crate::weather::DailyWeather;

    fn grazing_ewes(green: f64) -> super::AnimalCohort {
        let mut cohort = ewes(10);
        let pasture = ForageProvider::pasture("p", green, 0.0, 0.0);
        cohort.set_forage_inputs(&pasture.availability, GrazingSite::default());
        cohort.calculate_intake_limit(&DailyWeather::default());
        cohort.start_grazing();
        cohort
    }

    #[test]
    fn mature_ewe_potential_intake_is_plausible() {
        let cohort = grazing_ewes(2000.0);
        let pot = cohort.potential_intake();
        assert!(pot > 1.0 && pot < 2.0, "{pot}");
    }

    #[test]
    fn lush_pasture_meets_most_of_potential() {
        let mut cohort = grazing_ewes(3000.0);
        let removal = cohort.graze(1.0, false);
        let per_head: f64 = removal.herbage.iter().sum::<f64>() / 10.0;
        assert!(per_head > 0.7 * cohort.potential_intake(), "{per_head}");
        assert!(per_head <= 1.2 * cohort.potential_intake());
    }

    #[test]
    fn sparse_pasture_limits_intake() {
        let mut lush = grazing_ewes(3000.0);
        let mut sparse = grazing_ewes(150.0);
        let lush_eaten: f64 = lush.graze(1.0, false).herbage.iter().sum();
        let sparse_eaten: f64 = sparse.graze(1.0, false).herbage.iter().sum();
        assert!(sparse_eaten < 0.5 * lush_eaten);
    }

    #[test]
    fn supplement_fed_first_is_eaten_before_pasture() {
        let mut cohort = grazing_ewes(150.0);
        let grain = Supplement::grain();
        cohort.set_supplement_share(Some(&grain), 5.0, cohort.total_pot_intake());
        let removal = cohort.graze(1.0, true);
        assert!(removal.supplement > 0.0);
        assert!(removal.supplement <= 5.0 + 1e-9);
        assert!(cohort.output().supplement.dm > 0.0);
    }

    #[test]
    fn lambs_do_not_follow_their_mothers_to_the_trough() {
        let grain = Supplement::grain();
        let mut young_supp = Vec::new();
        let mut mother_supp = Vec::new();
        for feed_first in [true, false] {
            let mut cohort = ewes(10);
            cohort.set_lactation(60, 1, None, 0.0).unwrap();
            let pasture = ForageProvider::pasture("p", 1500.0, 0.0, 0.0);
            cohort.set_forage_inputs(&pasture.availability, GrazingSite::default());
            cohort.calculate_intake_limit(&DailyWeather::default());
            cohort.start_grazing();
            cohort.set_supplement_share(Some(&grain), 10.0, cohort.total_pot_intake());
            cohort.graze(0.5, feed_first);
            mother_supp.push(cohort.output().supplement.dm);
            young_supp.push(cohort.young().unwrap().output().supplement.dm);
        }
        assert!(mother_supp[0] > mother_supp[1], "{mother_supp:?}");
        assert!((young_supp[0] - young_supp[1]).abs() < 1e-12, "{young_supp:?}");
    }

    #[test]
    fn no_forage_no_intake() {
        let mut cohort = grazing_ewes(0.0);
        let removal = cohort.graze(1.0, false);
        assert_eq!(removal.herbage, [0.0; crate::forage::DIG_CLASSES]);
        assert_eq!(removal.supplement, 0.0);
    }
}
