//! Herbage, seed and supplement descriptions offered to grazing animals.
//!
//! Herbage biomass is held in kg/ha, split into fixed digestibility classes running from
//! the most to the least digestible.

use serde::{Deserialize, Serialize};

use crate::numerics::xdiv;

pub const DIG_CLASSES: usize = 6;
pub const CLASS_DMD: [f64; DIG_CLASSES] = [0.8, 0.7, 0.6, 0.5, 0.4, 0.3];
pub const UNRIPE: usize = 0;
pub const RIPE: usize = 1;
/// ME/DM of herbage is `HERBAGE_E2DM * dmd - 2`.
pub const HERBAGE_E2DM: f64 = 17.0;

pub fn herbage_me_dm(dmd: f64) -> f64 {
    (HERBAGE_E2DM * dmd - 2.0).max(0.0)
}

/// Biomass and quality of one herbage class or seed pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HerbageClass {
    pub biomass: f64,
    pub dmd: f64,
    pub cp: f64,
    /// Protein degradability.
    pub dg: f64,
    pub p: f64,
    pub s: f64,
    /// mol/kg
    pub ash_alk: f64,
    pub height_ratio: f64,
}

impl Default for HerbageClass {
    fn default() -> Self {
        Self {
            biomass: 0.0,
            dmd: 0.0,
            cp: 0.0,
            dg: 0.0,
            p: 0.0,
            s: 0.0,
            ash_alk: 0.0,
            height_ratio: 1.0,
        }
    }
}

impl HerbageClass {
    /// A class with typical composition for its digestibility.
    pub fn typical(biomass: f64, dmd: f64) -> Self {
        let cp = (0.05 + 0.3 * (dmd - 0.3)).max(0.03);
        Self {
            biomass,
            dmd,
            cp,
            dg: (dmd + 0.1).min(0.9),
            p: 0.0015 + 0.003 * (dmd - 0.3),
            s: 0.0015 + 0.002 * (dmd - 0.3),
            ash_alk: 0.6,
            height_ratio: 1.0,
        }
    }

    fn absorb(&mut self, other: &HerbageClass) {
        let total = self.biomass + other.biomass;
        if total <= 0.0 {
            return;
        }
        let w = |a: f64, b: f64| (a * self.biomass + b * other.biomass) / total;
        self.dmd = w(self.dmd, other.dmd);
        self.cp = w(self.cp, other.cp);
        self.dg = w(self.dg, other.dg);
        self.p = w(self.p, other.p);
        self.s = w(self.s, other.s);
        self.ash_alk = w(self.ash_alk, other.ash_alk);
        self.height_ratio = w(self.height_ratio, other.height_ratio);
        self.biomass = total;
    }
}

/// Forage available to the animals in a paddock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForageAvailability {
    pub herbage: [HerbageClass; DIG_CLASSES],
    /// Seed pools by ripeness.
    pub seed: [HerbageClass; 2],
    /// Digestibility class each seed pool is selected with.
    pub seed_class: [usize; 2],
    pub legume_propn: f64,
    pub legume_trop: f64,
    pub select_factor: f64,
    pub total_green: f64,
    pub total_dead: f64,
}

impl Default for ForageAvailability {
    fn default() -> Self {
        let mut herbage = [HerbageClass::default(); DIG_CLASSES];
        for (class, dmd) in herbage.iter_mut().zip(CLASS_DMD) {
            class.dmd = dmd;
        }
        Self {
            herbage,
            seed: [
                HerbageClass {
                    height_ratio: 0.0,
                    ..HerbageClass::default()
                };
                2
            ],
            seed_class: [DIG_CLASSES - 1; 2],
            legume_propn: 0.0,
            legume_trop: 0.0,
            select_factor: 0.0,
            total_green: 0.0,
            total_dead: 0.0,
        }
    }
}

impl ForageAvailability {
    pub fn total_herbage(&self) -> f64 {
        self.herbage.iter().map(|h| h.biomass).sum()
    }

    pub fn total_seed(&self) -> f64 {
        self.seed.iter().map(|s| s.biomass).sum()
    }

    /// Sums several sources into one offer; quality is biomass-weighted.
    pub fn combine<'a>(sources: impl IntoIterator<Item = &'a ForageAvailability>) -> Self {
        let mut out = ForageAvailability::default();
        let mut legume_mass = 0.0;
        let mut trop_mass = 0.0;
        let mut select_mass = 0.0;
        let mut mass = 0.0;
        for source in sources {
            for (total, class) in out.herbage.iter_mut().zip(source.herbage.iter()) {
                total.absorb(class);
            }
            for (total, seed) in out.seed.iter_mut().zip(source.seed.iter()) {
                total.absorb(seed);
            }
            out.seed_class = source.seed_class;
            let herbage = source.total_herbage();
            legume_mass += source.legume_propn * herbage;
            trop_mass += source.legume_trop * source.legume_propn * herbage;
            select_mass += source.select_factor * herbage;
            mass += herbage;
            out.total_green += source.total_green;
            out.total_dead += source.total_dead;
        }
        out.legume_propn = xdiv(legume_mass, mass);
        out.legume_trop = xdiv(trop_mass, legume_mass);
        out.select_factor = xdiv(select_mass, mass);
        out
    }

    /// Copy of `self` with `removal` (kg/ha) taken from each pool.
    pub fn less_removal(&self, herbage: &[f64; DIG_CLASSES], seed: &[f64; 2]) -> Self {
        let mut out = self.clone();
        for (class, taken) in out.herbage.iter_mut().zip(herbage) {
            class.biomass = (class.biomass - taken).max(0.0);
        }
        for (pool, taken) in out.seed.iter_mut().zip(seed) {
            pool.biomass = (pool.biomass - taken).max(0.0);
        }
        out
    }
}

/// A named source of herbage in a paddock (a pasture component or crop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForageProvider {
    pub name: String,
    pub availability: ForageAvailability,
}

impl ForageProvider {
    /// A green pasture with `green` kg/ha spread over the top classes and `dead` kg/ha in
    /// the low classes.
    pub fn pasture(name: &str, green: f64, dead: f64, legume_propn: f64) -> Self {
        let mut availability = ForageAvailability::default();
        let green_split = [0.15, 0.45, 0.3, 0.1, 0.0, 0.0];
        let dead_split = [0.0, 0.0, 0.0, 0.25, 0.45, 0.3];
        for (idx, class) in availability.herbage.iter_mut().enumerate() {
            *class = HerbageClass::typical(
                green * green_split[idx] + dead * dead_split[idx],
                CLASS_DMD[idx],
            );
        }
        availability.legume_propn = legume_propn;
        availability.total_green = green;
        availability.total_dead = dead;
        Self {
            name: name.to_string(),
            availability,
        }
    }

    pub fn remove(&mut self, herbage: &[f64; DIG_CLASSES], seed: &[f64; 2]) {
        self.availability = self.availability.less_removal(herbage, seed);
    }

    /// Adds regrowth (kg/ha) to the green classes in the same proportions as a fresh
    /// pasture.
    pub fn regrow(&mut self, green: f64) {
        let split = [0.15, 0.45, 0.3, 0.1, 0.0, 0.0];
        for (class, share) in self.availability.herbage.iter_mut().zip(split) {
            class.biomass += green * share;
        }
        self.availability.total_green += green;
    }
}

/// A supplementary feed, described per kg of dry matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Supplement {
    pub name: String,
    pub is_roughage: bool,
    pub dm_propn: f64,
    pub dmd: f64,
    /// MJ/kg DM
    pub me_dm: f64,
    pub cp: f64,
    pub dg: f64,
    pub p: f64,
    pub s: f64,
    pub ash_alk: f64,
    pub ether_extract: f64,
}

impl Default for Supplement {
    fn default() -> Self {
        Self::grain()
    }
}

impl Supplement {
    pub fn grain() -> Self {
        Self {
            name: "grain".to_string(),
            is_roughage: false,
            dm_propn: 0.9,
            dmd: 0.8,
            me_dm: 12.0,
            cp: 0.12,
            dg: 0.8,
            p: 0.003,
            s: 0.0015,
            ash_alk: 0.1,
            ether_extract: 0.02,
        }
    }

    pub fn hay() -> Self {
        Self {
            name: "hay".to_string(),
            is_roughage: true,
            dm_propn: 0.85,
            dmd: 0.58,
            me_dm: 8.5,
            cp: 0.09,
            dg: 0.7,
            p: 0.002,
            s: 0.0015,
            ash_alk: 0.5,
            ether_extract: 0.015,
        }
    }

    /// Fresh-weight-weighted mixture of several feeds.
    pub fn mix<'a>(parts: impl IntoIterator<Item = (&'a Supplement, f64)>) -> Option<(Supplement, f64)> {
        let mut total_fw = 0.0;
        let mut total_dm = 0.0;
        let mut mixed = Supplement {
            name: String::new(),
            is_roughage: true,
            dm_propn: 0.0,
            dmd: 0.0,
            me_dm: 0.0,
            cp: 0.0,
            dg: 0.0,
            p: 0.0,
            s: 0.0,
            ash_alk: 0.0,
            ether_extract: 0.0,
        };
        let mut names = Vec::new();
        for (supp, fresh) in parts {
            if fresh <= 0.0 {
                continue;
            }
            let dm = fresh * supp.dm_propn;
            total_fw += fresh;
            total_dm += dm;
            mixed.is_roughage &= supp.is_roughage;
            mixed.dmd += dm * supp.dmd;
            mixed.me_dm += dm * supp.me_dm;
            mixed.cp += dm * supp.cp;
            mixed.dg += dm * supp.cp * supp.dg;
            mixed.p += dm * supp.p;
            mixed.s += dm * supp.s;
            mixed.ash_alk += dm * supp.ash_alk;
            mixed.ether_extract += dm * supp.ether_extract;
            names.push(supp.name.clone());
        }
        if total_fw <= 0.0 {
            return None;
        }
        mixed.dg = xdiv(mixed.dg, mixed.cp);
        for value in [
            &mut mixed.dmd,
            &mut mixed.me_dm,
            &mut mixed.cp,
            &mut mixed.p,
            &mut mixed.s,
            &mut mixed.ash_alk,
            &mut mixed.ether_extract,
        ] {
            *value = xdiv(*value, total_dm);
        }
        mixed.dm_propn = total_dm / total_fw;
        mixed.name = names.join("+");
        Some((mixed, total_fw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_weights_quality_by_biomass() {
        let a = ForageProvider::pasture("a", 1000.0, 0.0, 0.2);
        let b = ForageProvider::pasture("b", 1000.0, 0.0, 0.0);
        let total = ForageAvailability::combine([&a.availability, &b.availability]);
        assert!((total.total_herbage() - 2000.0).abs() < 1e-9);
        assert!((total.legume_propn - 0.1).abs() < 1e-12);
        assert!((total.herbage[1].dmd - 0.7).abs() < 1e-12);
    }

    #[test]
    fn removal_never_goes_negative() {
        let pasture = ForageProvider::pasture("p", 100.0, 0.0, 0.0);
        let after = pasture
            .availability
            .less_removal(&[1000.0; DIG_CLASSES], &[0.0; 2]);
        assert_eq!(after.total_herbage(), 0.0);
    }

    #[test]
    fn supplement_mix_is_dry_matter_weighted() {
        let grain = Supplement::grain();
        let hay = Supplement::hay();
        let (mix, fresh) = Supplement::mix([(&grain, 10.0), (&hay, 10.0)]).unwrap();
        assert_eq!(fresh, 20.0);
        assert!(!mix.is_roughage);
        assert!(mix.me_dm > hay.me_dm && mix.me_dm < grain.me_dm);
        assert!((mix.dm_propn - 0.875).abs() < 1e-12);
    }
}
