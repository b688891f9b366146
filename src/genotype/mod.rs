//! Breed parameter bundles.
//!
//! Coefficient arrays keep the published 1-based numbering of the GrazPlan ruminant
//! model, so slot 0 of every `*_c` array is unused.

mod breeds;
mod condition;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StockError, StockResult};
use crate::numerics::{checked_pow, round_to, sig, xdiv};

pub use breeds::{GenotypeOverrides, GenotypeRegistry};
pub use condition::{cond_score_to_condition, condition_to_cond_score, CondScoreSystem};

pub const DAYS_PER_YEAR: f64 = 365.25;
/// Number of oestrus cycles a mating period is assumed to span.
const MATING_CYCLES: f64 = 2.5;
const MAX_CONCEPTION_RATE: f64 = 0.9975;
const CONCEPTION_SEARCH_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalKind {
    Sheep,
    Cattle,
}

impl fmt::Display for AnimalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimalKind::Sheep => write!(f, "sheep"),
            AnimalKind::Cattle => write!(f, "cattle"),
        }
    }
}

/// Sex and reproductive status. Lactation is tracked separately on the cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReproType {
    Castrated,
    Male,
    Empty,
    EarlyPreg,
    LatePreg,
}

impl ReproType {
    pub fn is_male(self) -> bool {
        matches!(self, ReproType::Castrated | ReproType::Male)
    }

    pub fn is_pregnant(self) -> bool {
        matches!(self, ReproType::EarlyPreg | ReproType::LatePreg)
    }
}

impl FromStr for ReproType {
    type Err = StockError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "ewe" | "ewes" | "cow" | "cows" | "heifer" | "heifers" | "female" | "females" => {
                Ok(ReproType::Empty)
            }
            "wether" | "wethers" | "steer" | "steers" | "castrate" | "castrates" => {
                Ok(ReproType::Castrated)
            }
            "ram" | "rams" | "bull" | "bulls" | "male" | "males" => Ok(ReproType::Male),
            _ => Err(StockError::InvalidSex(text.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ancestry {
    pub breed: String,
    pub propn: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    pub name: String,
    pub kind: AnimalKind,
    pub dairy: bool,
    ancestry: Vec<Ancestry>,

    pub breed_srw: f64,
    /// Potential annual greasy fleece as a fraction of SRW.
    pub fleece_ratio: f64,
    pub max_fleece_diam: f64,
    pub potential_fleece_wt: f64,
    pub peak_milk: f64,
    pub max_young: usize,
    /// SRW multipliers for castrates and entire males.
    pub srw_scalars: [f64; 2],

    pub growth_c: [f64; 5],
    pub intake_c: [f64; 22],
    pub intake_lact_c: [f64; 4],
    pub graze_c: [f64; 21],
    pub effic_c: [f64; 17],
    pub maint_c: [f64; 18],
    pub dg_prot_c: [f64; 8],
    pub preg_c: [f64; 14],
    pub preg_scale: [f64; 4],
    pub birth_wt_scale: [f64; 4],
    pub peak_lact_c: [f64; 4],
    pub lact_c: [f64; 25],
    pub wool_c: [f64; 15],
    pub chill_c: [f64; 8],
    pub gain_c: [f64; 19],
    pub phos_c: [f64; 6],
    pub sulf_c: [f64; 4],
    pub ash_alk_c: [f64; 4],
    pub meth_c: [f64; 7],

    /// Daily death rates: `[_, mature, weaner]`.
    pub mort_rate: [f64; 3],
    pub mort_age: [f64; 3],
    pub mort_intensity: f64,
    pub mort_cond_const: f64,
    pub mort_wt_diff: f64,

    /// Conception sigmoid `[50% point, slope]` by litter size; entry 0 is unused.
    pub conceive_sigs: [[f64; 2]; 4],
    pub day_length_const: [f64; 4],
    /// Puberty age in days for females and males.
    pub puberty: [u32; 2],
    pub ovulation_period: u32,
    pub fert_wt_diff: f64,
    pub exposure_consts: [f64; 4],
}

fn mix_array<'a, const N: usize>(parts: impl Iterator<Item = (&'a [f64; N], f64)>) -> [f64; N] {
    let mut out = [0.0; N];
    for (values, propn) in parts {
        for (slot, value) in out.iter_mut().zip(values.iter()) {
            *slot += propn * value;
        }
    }
    out
}

fn mix_scalar(parts: impl Iterator<Item = (f64, f64)>) -> f64 {
    parts.map(|(value, propn)| value * propn).sum()
}

macro_rules! blend_array {
    ($parts:expr, $field:ident) => {
        mix_array($parts.iter().map(|(g, p)| (&g.$field, *p)))
    };
}

macro_rules! blend_scalar {
    ($parts:expr, $field:ident) => {
        mix_scalar($parts.iter().map(|(g, p)| (g.$field, *p)))
    };
}

impl Genotype {
    pub fn ancestry(&self) -> &[Ancestry] {
        &self.ancestry
    }

    /// Adds `propn` of `breed` to the ancestry, combining with an existing entry of the
    /// same name.
    pub fn add_ancestry(&mut self, breed: &str, propn: f64) {
        match self.ancestry.iter_mut().find(|a| a.breed == breed) {
            Some(entry) => entry.propn += propn,
            None => self.ancestry.push(Ancestry {
                breed: breed.to_string(),
                propn,
            }),
        }
    }

    pub(crate) fn set_pure_ancestry(&mut self) {
        self.ancestry = vec![Ancestry {
            breed: self.name.clone(),
            propn: 1.0,
        }];
    }

    /// Dam/sire cross. Every coefficient is the proportion-weighted sum of the parents'.
    pub fn cross(
        name: Option<&str>,
        dam: &Genotype,
        sire: &Genotype,
        dam_propn: f64,
        sire_propn: f64,
    ) -> StockResult<Genotype> {
        Self::blend(name, &[(dam, dam_propn), (sire, sire_propn)])
    }

    /// Linear combination of several genotypes. The first entry is treated as the dam
    /// line for the discrete traits (litter size, puberty, ovulation period).
    pub fn blend(name: Option<&str>, parts: &[(&Genotype, f64)]) -> StockResult<Genotype> {
        let Some((dam, _)) = parts.first() else {
            return Err(StockError::InvalidParameter {
                name: "blend components",
                value: 0.0,
            });
        };
        for (genotype, propn) in parts {
            if *propn < 0.0 {
                return Err(StockError::InvalidParameter {
                    name: "blend proportion",
                    value: *propn,
                });
            }
            if genotype.kind != dam.kind {
                return Err(StockError::SpeciesMismatch {
                    female: dam.kind.to_string(),
                    male: genotype.kind.to_string(),
                });
            }
        }

        let mut conceive_sigs = [[0.0; 2]; 4];
        for (n, sigs) in conceive_sigs.iter_mut().enumerate() {
            *sigs = mix_array(parts.iter().map(|(g, p)| (&g.conceive_sigs[n], *p)));
        }

        let mut blended = Genotype {
            name: String::new(),
            kind: dam.kind,
            dairy: dam.dairy,
            ancestry: Vec::new(),
            breed_srw: blend_scalar!(parts, breed_srw),
            fleece_ratio: blend_scalar!(parts, fleece_ratio),
            max_fleece_diam: blend_scalar!(parts, max_fleece_diam),
            potential_fleece_wt: 0.0,
            peak_milk: blend_scalar!(parts, peak_milk),
            max_young: dam.max_young,
            srw_scalars: blend_array!(parts, srw_scalars),
            growth_c: blend_array!(parts, growth_c),
            intake_c: blend_array!(parts, intake_c),
            intake_lact_c: blend_array!(parts, intake_lact_c),
            graze_c: blend_array!(parts, graze_c),
            effic_c: blend_array!(parts, effic_c),
            maint_c: blend_array!(parts, maint_c),
            dg_prot_c: blend_array!(parts, dg_prot_c),
            preg_c: blend_array!(parts, preg_c),
            preg_scale: blend_array!(parts, preg_scale),
            birth_wt_scale: blend_array!(parts, birth_wt_scale),
            peak_lact_c: blend_array!(parts, peak_lact_c),
            lact_c: blend_array!(parts, lact_c),
            wool_c: blend_array!(parts, wool_c),
            chill_c: blend_array!(parts, chill_c),
            gain_c: blend_array!(parts, gain_c),
            phos_c: blend_array!(parts, phos_c),
            sulf_c: blend_array!(parts, sulf_c),
            ash_alk_c: blend_array!(parts, ash_alk_c),
            meth_c: blend_array!(parts, meth_c),
            mort_rate: blend_array!(parts, mort_rate),
            mort_age: blend_array!(parts, mort_age),
            mort_intensity: blend_scalar!(parts, mort_intensity),
            mort_cond_const: blend_scalar!(parts, mort_cond_const),
            mort_wt_diff: blend_scalar!(parts, mort_wt_diff),
            conceive_sigs,
            day_length_const: blend_array!(parts, day_length_const),
            puberty: dam.puberty,
            ovulation_period: dam.ovulation_period,
            fert_wt_diff: blend_scalar!(parts, fert_wt_diff),
            exposure_consts: blend_array!(parts, exposure_consts),
        };

        for (genotype, propn) in parts {
            for ancestor in &genotype.ancestry {
                blended.add_ancestry(&ancestor.breed, ancestor.propn * propn);
            }
        }
        blended.name = match name {
            Some(explicit) if !explicit.is_empty() => explicit.to_string(),
            _ => blended.ancestry_label(),
        };
        blended.derive_params();
        Ok(blended)
    }

    fn ancestry_label(&self) -> String {
        if self.ancestry.len() == 1 {
            return self.ancestry[0].breed.clone();
        }
        let decimals = if self
            .ancestry
            .iter()
            .any(|a| a.propn > 0.0005 && a.propn <= 0.05)
        {
            1
        } else {
            0
        };
        let mut listed: Vec<&Ancestry> = self.ancestry.iter().filter(|a| a.propn > 0.0005).collect();
        listed.sort_by(|a, b| b.propn.total_cmp(&a.propn));
        listed
            .iter()
            .map(|a| format!("{} {:.*}%", a.breed, decimals, 100.0 * a.propn))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Recomputes the quantities that depend on other parameters. Call after changing
    /// SRW, fleece ratio or any coefficient array.
    pub fn derive_params(&mut self) {
        let mut max_young = 1;
        while max_young < 3 && self.birth_wt_scale[max_young + 1] > 0.0 {
            max_young += 1;
        }
        self.max_young = max_young;
        self.potential_fleece_wt = self.breed_srw * self.fleece_ratio;
        if self.kind == AnimalKind::Cattle {
            self.peak_milk = self.intake_c[11] * self.breed_srw;
        }
        if self.graze_c[20] == 0.0 {
            self.graze_c[20] = 11.5;
        }
    }

    pub fn set_srw(&mut self, srw: f64) {
        self.breed_srw = srw;
        self.derive_params();
    }

    pub fn set_potential_fleece(&mut self, greasy_fleece: f64) {
        self.fleece_ratio = xdiv(greasy_fleece, self.breed_srw);
        self.derive_params();
    }

    /// Cattle peak milk is derived from SRW, so it is stored through the intake
    /// coefficient.
    pub fn set_peak_milk(&mut self, peak_milk: f64) {
        if self.kind == AnimalKind::Cattle {
            self.intake_c[11] = xdiv(peak_milk, self.breed_srw);
        }
        self.peak_milk = peak_milk;
        self.derive_params();
    }

    pub fn gestation(&self) -> u32 {
        self.preg_c[1].round().max(0.0) as u32
    }

    pub fn std_birth_wt(&self, young: usize) -> f64 {
        if young == 0 {
            0.0
        } else {
            self.breed_srw * self.birth_wt_scale[young.min(3)]
        }
    }

    pub fn sex_std_ref_wt(&self, repro: ReproType) -> f64 {
        match repro {
            ReproType::Castrated => self.breed_srw * self.srw_scalars[0],
            ReproType::Male => self.breed_srw * self.srw_scalars[1],
            _ => self.breed_srw,
        }
    }

    pub fn max_normal_wt(&self, srw: f64, birth_wt: f64, age_days: f64) -> f64 {
        let growth_rate = self.growth_c[1] / srw.powf(self.growth_c[2]);
        srw - (srw - birth_wt) * (-growth_rate * age_days).exp()
    }

    /// Normal weight for age and sex on the standard growth curve.
    pub fn growth_curve(&self, age_days: f64, repro: ReproType) -> f64 {
        let srw = self.sex_std_ref_wt(repro);
        self.max_normal_wt(srw, self.std_birth_wt(1), age_days)
    }

    /// Feasible base-weight range for a given age and relative condition.
    pub fn weight_range_for_cond(&self, repro: ReproType, age_days: f64, condition: f64) -> (f64, f64) {
        let high = condition * self.growth_curve(age_days, repro);
        let low = if condition >= 1.0 {
            high
        } else {
            high * self.growth_c[3] / (1.0 - condition * (1.0 - self.growth_c[3]))
        };
        (low, high)
    }

    fn wool_age_factor(&self, age_days: f64) -> f64 {
        self.wool_c[5] + (1.0 - self.wool_c[5]) * (1.0 - (-self.wool_c[12] * age_days).exp())
    }

    /// Greasy fleece expected after `days` of growth on the standard curve.
    pub fn default_fleece(&self, age_days: f64, repro: ReproType, days_since_shearing: f64) -> f64 {
        if self.kind != AnimalKind::Sheep || days_since_shearing <= 0.0 {
            return 0.0;
        }
        let days = days_since_shearing.min(age_days);
        let start_age = age_days - days;
        let mean_age_factor = if days > 0.0 && self.wool_c[12] > 0.0 {
            let decay = ((-self.wool_c[12] * start_age).exp() - (-self.wool_c[12] * age_days).exp())
                / (self.wool_c[12] * days);
            self.wool_c[5] + (1.0 - self.wool_c[5]) * (1.0 - decay)
        } else {
            self.wool_age_factor(age_days)
        };
        self.sex_std_ref_wt(repro) * self.fleece_ratio * mean_age_factor * days / DAYS_PER_YEAR
    }

    pub fn default_micron(&self, age_days: f64, repro: ReproType, days_since_shearing: f64, fleece: f64) -> f64 {
        let potential = self.default_fleece(age_days, repro, days_since_shearing);
        if potential > 0.0 && fleece > 0.0 {
            self.max_fleece_diam * (fleece / potential).powf(self.wool_c[13])
        } else {
            self.max_fleece_diam
        }
    }

    /// Proportion dying per year, from the daily rate.
    pub fn annual_deaths(&self, weaner: bool) -> StockResult<f64> {
        let daily = if weaner { self.mort_rate[2] } else { self.mort_rate[1] };
        let survival = checked_pow(1.0 - daily, DAYS_PER_YEAR, "annual deaths")?;
        Ok(1.0 - survival)
    }

    pub fn set_annual_deaths(&mut self, weaner: bool, annual: f64) -> StockResult<()> {
        let daily = 1.0 - checked_pow(1.0 - annual, 1.0 / DAYS_PER_YEAR, "annual deaths")?;
        if weaner {
            self.mort_rate[2] = daily;
        } else {
            self.mort_rate[1] = daily;
        }
        Ok(())
    }

    /// Proportion of females conceiving at least `young` offspring over a mating period
    /// at unit size and condition. `cr1` carries the single-young rate between calls.
    fn compute_conception(&self, sigs: [f64; 2], young: usize, cr1: &mut f64) -> StockResult<f64> {
        let rate = if sigs[0] < 5.0 { sig(1.0, sigs) } else { 0.0 };
        if young == 1 {
            *cr1 = rate;
        }
        let unconceived = checked_pow(1.0 - *cr1, MATING_CYCLES, "conception rate")?;
        Ok(xdiv(rate, *cr1) * (1.0 - unconceived))
    }

    /// Conception rates `[_, single, twin, triplet]` implied by the conception sigmoids.
    pub fn conceptions(&self) -> StockResult<[f64; 4]> {
        let mut rates = [0.0; 4];
        let mut cr1 = 0.0;
        for n in 1..=self.max_young {
            let at_least = self.compute_conception(self.conceive_sigs[n], n, &mut cr1)?;
            rates[n] = round_to(at_least, 1.0e-5);
        }
        for n in 1..self.max_young {
            rates[n] -= rates[n + 1];
        }
        Ok(rates)
    }

    /// Fits the conception sigmoids to target rates `[_, single, twin, triplet]`.
    pub fn set_conceptions(&mut self, rates: [f64; 4]) -> StockResult<()> {
        const INIT_SCALE: [f64; 2] = [0.08, -0.05];

        for n in 1..=self.max_young {
            let seek: f64 = rates[n..=self.max_young].iter().sum::<f64>().min(MAX_CONCEPTION_RATE);
            if seek <= 0.0 {
                self.conceive_sigs[n][0] = 10.0;
                continue;
            }

            let (mut sigs, idx) = match (self.kind, n) {
                (AnimalKind::Sheep, _) => (self.conceive_sigs[n], 0),
                (AnimalKind::Cattle, 1) => (self.conceive_sigs[n], 1),
                (AnimalKind::Cattle, _) => (self.conceive_sigs[n - 1], 0),
            };

            let mut cr1 = 0.0;
            if n > 1 {
                self.compute_conception(self.conceive_sigs[1], 1, &mut cr1)?;
            }
            let mut rate = self.compute_conception(sigs, n, &mut cr1)?;

            // Direction in which the fitted parameter raises the conception rate.
            let rising = if idx == 0 { sigs[1] < 0.0 } else { sigs[0] < 1.0 };
            let mut step = if (rate > seek) != rising {
                INIT_SCALE[idx].abs()
            } else {
                -INIT_SCALE[idx].abs()
            };

            let mut steps = 0;
            loop {
                let previous = rate;
                sigs[idx] += step;
                rate = self.compute_conception(sigs, n, &mut cr1)?;
                if (previous > seek && rate <= seek) || (previous < seek && rate >= seek) {
                    step *= -0.5;
                }
                if (seek - rate).abs() < 1.0e-6 || step.abs() < 1.0e-5 {
                    break;
                }
                steps += 1;
                if steps >= CONCEPTION_SEARCH_LIMIT {
                    return Err(StockError::SearchDidNotConverge {
                        search: "conception rate",
                        target: seek,
                    });
                }
            }
            self.conceive_sigs[n] = sigs;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> GenotypeRegistry {
        GenotypeRegistry::with_builtin_breeds()
    }

    #[test]
    fn max_young_follows_birth_weight_scale() {
        let reg = registry();
        assert_eq!(reg.get("Merino").unwrap().max_young, 3);
        assert_eq!(reg.get("Friesian").unwrap().max_young, 2);
    }

    #[test]
    fn cattle_peak_milk_is_derived_from_srw() {
        let friesian = registry().get("Friesian").unwrap();
        assert!((friesian.peak_milk - 27.5).abs() < 1e-9);
        assert_eq!(friesian.breed_srw, 550.0);
    }

    #[test]
    fn cross_blends_coefficients_and_ancestry() {
        let reg = registry();
        let merino = reg.get("Merino").unwrap();
        let leicester = reg.get("Border Leicester").unwrap();
        let cross = Genotype::cross(None, &merino, &leicester, 0.5, 0.5).unwrap();

        let total: f64 = cross.ancestry().iter().map(|a| a.propn).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((cross.breed_srw - 0.5 * (merino.breed_srw + leicester.breed_srw)).abs() < 1e-9);
        assert!(
            (cross.intake_c[1] - 0.5 * (merino.intake_c[1] + leicester.intake_c[1])).abs() < 1e-12
        );
        assert_eq!(cross.name, "Merino 50%, Border Leicester 50%");
    }

    #[test]
    fn back_cross_merges_repeated_breeds() {
        let reg = registry();
        let merino = reg.get("Merino").unwrap();
        let leicester = reg.get("Border Leicester").unwrap();
        let first = Genotype::cross(None, &merino, &leicester, 0.5, 0.5).unwrap();
        let back = Genotype::cross(None, &first, &merino, 0.5, 0.5).unwrap();

        assert_eq!(back.ancestry().len(), 2);
        let merino_share = back
            .ancestry()
            .iter()
            .find(|a| a.breed == "Merino")
            .map(|a| a.propn)
            .unwrap();
        assert!((merino_share - 0.75).abs() < 1e-12);
        assert_eq!(back.name, "Merino 75%, Border Leicester 25%");
    }

    #[test]
    fn small_fractions_get_one_decimal_place() {
        let reg = registry();
        let merino = reg.get("Merino").unwrap();
        let leicester = reg.get("Border Leicester").unwrap();
        let cross = Genotype::cross(None, &merino, &leicester, 0.97, 0.03).unwrap();
        assert_eq!(cross.name, "Merino 97.0%, Border Leicester 3.0%");
    }

    #[test]
    fn explicit_name_wins() {
        let reg = registry();
        let merino = reg.get("Merino").unwrap();
        let leicester = reg.get("Border Leicester").unwrap();
        let cross = Genotype::cross(Some("First Cross"), &merino, &leicester, 0.5, 0.5).unwrap();
        assert_eq!(cross.name, "First Cross");
    }

    #[test]
    fn cross_species_blend_is_rejected() {
        let reg = registry();
        let merino = reg.get("Merino").unwrap();
        let angus = reg.get("Angus").unwrap();
        assert!(Genotype::cross(None, &merino, &angus, 0.5, 0.5).is_err());
    }

    #[test]
    fn sheep_conceptions_round_trip() {
        let mut merino = registry().get("Merino").unwrap();
        let target = [0.0, 0.6, 0.25, 0.05];
        merino.set_conceptions(target).unwrap();
        let fitted = merino.conceptions().unwrap();
        for n in 1..=3 {
            assert!(
                (fitted[n] - target[n]).abs() <= 1.0e-5 + 1e-12,
                "litter size {n}: {} vs {}",
                fitted[n],
                target[n]
            );
        }
    }

    #[test]
    fn cattle_single_conceptions_round_trip() {
        let mut angus = registry().get("Angus").unwrap();
        let target = [0.0, 0.9, 0.0, 0.0];
        angus.set_conceptions(target).unwrap();
        let fitted = angus.conceptions().unwrap();
        assert!((fitted[1] - 0.9).abs() <= 1.0e-5 + 1e-12, "{}", fitted[1]);
        assert_eq!(fitted[2], 0.0);
    }

    #[test]
    fn zero_target_never_conceives() {
        let mut merino = registry().get("Merino").unwrap();
        merino.set_conceptions([0.0, 0.5, 0.0, 0.0]).unwrap();
        assert_eq!(merino.conceive_sigs[2][0], 10.0);
        assert_eq!(merino.conceive_sigs[3][0], 10.0);
        assert_eq!(merino.conceptions().unwrap()[2], 0.0);
    }

    #[test]
    fn annual_deaths_round_trip() {
        let mut merino = registry().get("Merino").unwrap();
        merino.set_annual_deaths(false, 0.05).unwrap();
        assert!((merino.annual_deaths(false).unwrap() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn impossible_death_rate_is_a_domain_error() {
        let mut merino = registry().get("Merino").unwrap();
        merino.mort_rate[1] = 1.5;
        assert!(matches!(
            merino.annual_deaths(false),
            Err(StockError::NumericDomain { .. })
        ));
    }

    #[test]
    fn sex_strings_parse() {
        assert_eq!("Wethers".parse::<ReproType>().unwrap(), ReproType::Castrated);
        assert_eq!("bull".parse::<ReproType>().unwrap(), ReproType::Male);
        assert_eq!("heifer".parse::<ReproType>().unwrap(), ReproType::Empty);
        assert!("gelding".parse::<ReproType>().is_err());
    }

    #[test]
    fn weight_range_collapses_above_unit_condition() {
        let merino = registry().get("Merino").unwrap();
        let (low, high) = merino.weight_range_for_cond(ReproType::Empty, 1000.0, 1.1);
        assert_eq!(low, high);
        let (low, high) = merino.weight_range_for_cond(ReproType::Empty, 1000.0, 0.8);
        assert!(low < high);
    }
}
