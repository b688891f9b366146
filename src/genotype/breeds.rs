use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use super::{AnimalKind, Genotype};
use crate::error::{StockError, StockResult};

/// Parameter overrides and cross definitions read from scenario files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenotypeOverrides {
    pub name: String,
    /// Breed the definition starts from. Defaults to `name` when it is a known breed.
    #[serde(default)]
    pub dam: Option<String>,
    #[serde(default)]
    pub sire: Option<String>,
    #[serde(default = "default_sire_propn")]
    pub sire_propn: f64,
    #[serde(default)]
    pub srw: Option<f64>,
    #[serde(default)]
    pub potential_fleece: Option<f64>,
    #[serde(default)]
    pub fleece_diameter: Option<f64>,
    #[serde(default)]
    pub peak_milk: Option<f64>,
    #[serde(default)]
    pub death_rate: Option<f64>,
    #[serde(default)]
    pub weaner_death_rate: Option<f64>,
    /// Target conception rates for single, twin and triplet litters.
    #[serde(default)]
    pub conceptions: Option<Vec<f64>>,
}

fn default_sire_propn() -> f64 {
    0.5
}

/// Named genotypes available to a population. Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct GenotypeRegistry {
    genotypes: BTreeMap<String, Arc<Genotype>>,
}

impl GenotypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_breeds() -> Self {
        let mut registry = Self::new();
        for genotype in [merino(), border_leicester(), angus(), friesian()] {
            registry.insert(genotype);
        }
        registry
    }

    pub fn insert(&mut self, genotype: Genotype) -> Arc<Genotype> {
        let shared = Arc::new(genotype);
        self.genotypes
            .insert(shared.name.to_lowercase(), Arc::clone(&shared));
        shared
    }

    pub fn contains(&self, name: &str) -> bool {
        self.genotypes.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        self.genotypes.values().map(|g| g.name.clone()).collect()
    }

    pub fn shared(&self, name: &str) -> StockResult<Arc<Genotype>> {
        self.genotypes
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| StockError::UnknownGenotype(name.to_string()))
    }

    /// Returns an editable copy of a registered genotype.
    pub fn get(&self, name: &str) -> StockResult<Genotype> {
        self.shared(name).map(|g| (*g).clone())
    }

    pub fn define_cross(
        &mut self,
        name: Option<&str>,
        dam: &str,
        sire: &str,
        sire_propn: f64,
    ) -> StockResult<Arc<Genotype>> {
        let dam = self.shared(dam)?;
        let sire = self.shared(sire)?;
        let cross = Genotype::cross(name, &dam, &sire, 1.0 - sire_propn, sire_propn)?;
        Ok(self.insert(cross))
    }

    /// Registers a genotype built from a scenario definition.
    pub fn apply(&mut self, overrides: &GenotypeOverrides) -> StockResult<Arc<Genotype>> {
        let base_name = overrides.dam.as_deref().unwrap_or(&overrides.name);
        let mut genotype = match overrides.sire.as_deref() {
            Some(sire) => {
                let dam = self.shared(base_name)?;
                let sire = self.shared(sire)?;
                Genotype::cross(
                    Some(&overrides.name),
                    &dam,
                    &sire,
                    1.0 - overrides.sire_propn,
                    overrides.sire_propn,
                )?
            }
            None => {
                let mut base = self.get(base_name)?;
                base.name = overrides.name.clone();
                base
            }
        };

        if let Some(srw) = overrides.srw {
            genotype.set_srw(srw);
        }
        if let Some(fleece) = overrides.potential_fleece {
            genotype.set_potential_fleece(fleece);
        }
        if let Some(diameter) = overrides.fleece_diameter {
            genotype.max_fleece_diam = diameter;
        }
        if let Some(peak_milk) = overrides.peak_milk {
            genotype.set_peak_milk(peak_milk);
        }
        if let Some(rate) = overrides.death_rate {
            genotype.set_annual_deaths(false, rate)?;
        }
        if let Some(rate) = overrides.weaner_death_rate {
            genotype.set_annual_deaths(true, rate)?;
        }
        if let Some(targets) = &overrides.conceptions {
            let mut rates = [0.0; 4];
            for (slot, value) in rates.iter_mut().skip(1).zip(targets.iter()) {
                *slot = *value;
            }
            genotype.set_conceptions(rates)?;
        }
        Ok(self.insert(genotype))
    }
}

fn sheep_template(name: &str) -> Genotype {
    Genotype {
        name: name.to_string(),
        kind: AnimalKind::Sheep,
        dairy: false,
        ancestry: Vec::new(),
        breed_srw: 50.0,
        fleece_ratio: 0.1,
        max_fleece_diam: 21.0,
        potential_fleece_wt: 0.0,
        peak_milk: 0.0,
        max_young: 1,
        srw_scalars: [1.2, 1.4],
        growth_c: [0.0, 0.0157, 0.27, 0.4, 1.1],
        intake_c: [
            0.0, 0.04, 1.7, 0.5, 25.0, 0.01, 25.0, 22.0, 28.0, 1.4, 0.4, 0.05, 0.15, 0.005,
            0.002, 0.5, 1.0, 0.01, 20.0, 3.0, 1.5, 0.7,
        ],
        intake_lact_c: [0.0, 0.416, 0.6, 0.6],
        graze_c: [
            0.0, 0.8, 0.17, 1.7, 0.00078, 0.6, 0.00074, 0.5, 22.0, 0.15, 0.25, 10.5, 0.15, 0.5,
            1.0, 0.3, 0.1, 0.0, 0.0, 0.0, 0.0,
        ],
        effic_c: [
            0.0, 0.5, 0.02, 0.85, 0.7, 0.4, 0.02, 0.6, 0.133, 0.95, 0.84, 0.8, 0.7, 0.043, 0.33,
            0.042, 0.006,
        ],
        maint_c: [
            0.0, 0.09, 0.26, 0.03, 0.84, 0.23, 0.0025, 0.9, 0.000057, 0.16, 0.0152, 0.00046,
            0.000147, 0.003375, 0.0, 0.15, 0.0026, 5.0,
        ],
        dg_prot_c: [0.0, 0.1, 0.1, 0.1, 0.0071, 0.0015, 0.45, 0.1],
        preg_c: [
            0.0, 150.0, 2.2, 1.77, 0.33, 1.8, 2.42, 1.16, 4.11, 343.5, 0.0164, 0.134, 6.22,
            0.747,
        ],
        preg_scale: [0.0, 0.5, 0.75, 0.85],
        birth_wt_scale: [0.0, 0.09, 0.075, 0.065],
        peak_lact_c: [0.0, 0.486, 0.613, 0.613],
        lact_c: [
            0.0, 2.0, 22.0, 1.0, 0.6, 0.94, 4.7, 1.17, 0.0, 0.0, 0.0, 0.0, 0.42, 0.58, 0.036,
            0.032, 0.7, 0.01, 0.1, 1.6, 4.0, 0.004, 0.006, 3.0, 0.6,
        ],
        wool_c: [
            0.0, 60.0, 0.004, 0.7, 0.1, 0.25, 0.03, 1.35, 0.016, 0.5, 1.3, 0.8, 0.025, 0.35, 0.4,
        ],
        chill_c: [0.0, 481.0, 11.7, 3.1, 40.0, 418.0, 0.04, 80.0],
        gain_c: [
            0.0, 0.0, 0.0, 0.0, 0.4, 6.0, 0.5, 1.0, 6.7, 20.3, 2.0, 4.0, 0.21, 0.06, 0.0, 0.0,
            0.0, 0.0, 1.09,
        ],
        phos_c: [0.0, 0.006, 0.00003, 0.7, 0.0011, 0.0002],
        sulf_c: [0.0, 0.011, 0.035, 0.5],
        ash_alk_c: [0.0, 0.6, 0.15, 0.3],
        meth_c: [0.0, 1.30, 0.112, 2.37, 0.05, 18.4, 55.22],
        mort_rate: [0.0, 8.34e-5, 2.885e-4],
        mort_age: [0.0, 365.0, 730.0],
        mort_intensity: 0.2,
        mort_cond_const: 0.5,
        mort_wt_diff: 0.2,
        conceive_sigs: [[0.0, 0.0], [0.872, 5.0], [1.277, 5.0], [1.92, 5.0]],
        day_length_const: [0.0, 0.2, 0.4, 0.6],
        puberty: [240, 210],
        ovulation_period: 17,
        fert_wt_diff: 0.02,
        exposure_consts: [-2.2, 3.0, 0.003, 0.5],
    }
}

fn cattle_template(name: &str) -> Genotype {
    Genotype {
        name: name.to_string(),
        kind: AnimalKind::Cattle,
        dairy: false,
        ancestry: Vec::new(),
        breed_srw: 500.0,
        fleece_ratio: 0.0,
        max_fleece_diam: 0.0,
        potential_fleece_wt: 0.0,
        peak_milk: 0.0,
        max_young: 1,
        srw_scalars: [1.2, 1.4],
        growth_c: [0.0, 0.0115, 0.27, 0.4, 1.1],
        intake_c: [
            0.0, 0.025, 1.7, 0.22, 60.0, 0.02, 25.0, 22.0, 62.0, 1.7, 0.6, 0.018, 0.15, 0.005,
            0.002, 0.5, 1.0, 0.01, 20.0, 3.0, 1.5, 0.7,
        ],
        intake_lact_c: [0.6, 0.577, 0.9, 0.0],
        graze_c: [
            0.0, 0.8, 0.17, 1.7, 0.00078, 0.6, 0.00074, 0.5, 22.0, 0.15, 0.25, 10.5, 0.15, 0.5,
            1.0, 0.3, 0.1, 0.0, 0.0, 0.0, 0.0,
        ],
        effic_c: [
            0.0, 0.5, 0.02, 0.85, 0.7, 0.4, 0.02, 0.6, 0.133, 0.95, 0.84, 0.8, 0.7, 0.043, 0.33,
            0.042, 0.006,
        ],
        maint_c: [
            0.0, 0.09, 0.31, 0.03, 0.84, 0.23, 0.0025, 0.9, 0.000057, 0.16, 0.0152, 0.00046,
            0.0161, 0.0422, 0.00011, 0.15, 0.0026, 0.5,
        ],
        dg_prot_c: [0.0, 0.1, 0.1, 0.1, 0.0071, 0.0015, 0.45, 0.1],
        preg_c: [
            0.0, 281.0, 2.2, 1.77, 0.33, 1.8, 2.42, 1.16, 4.11, 343.5, 0.0164, 0.134, 6.22,
            0.747,
        ],
        preg_scale: [0.0, 0.5, 0.75, 0.0],
        birth_wt_scale: [0.0, 0.07, 0.06, 0.0],
        peak_lact_c: [0.0, 0.375, 0.42, 0.0],
        lact_c: [
            0.0, 2.0, 30.0, 1.0, 0.6, 0.94, 3.1, 1.17, 0.0, 0.0, 0.0, 0.0, 0.42, 0.58, 0.036,
            0.032, 0.7, 0.01, 0.1, 1.6, 4.0, 0.004, 0.006, 3.0, 0.6,
        ],
        wool_c: [0.0; 15],
        chill_c: [0.0, 481.0, 11.7, 3.1, 40.0, 418.0, 0.04, 80.0],
        gain_c: [
            0.0, 0.0, 0.0, 0.0, 0.4, 6.0, 0.5, 1.0, 6.7, 20.3, 2.0, 4.0, 0.21, 0.06, 0.0, 0.0,
            0.0, 0.0, 1.09,
        ],
        phos_c: [0.0, 0.006, 0.00003, 0.7, 0.0011, 0.0002],
        sulf_c: [0.0, 0.011, 0.0, 0.5],
        ash_alk_c: [0.0, 0.6, 0.15, 0.3],
        meth_c: [0.0, 1.30, 0.112, 2.37, 0.05, 18.4, 55.22],
        mort_rate: [0.0, 5.53e-5, 1.37e-4],
        mort_age: [0.0, 365.0, 730.0],
        mort_intensity: 0.2,
        mort_cond_const: 0.5,
        mort_wt_diff: 0.2,
        conceive_sigs: [[0.0, 0.0], [0.6, 3.0], [1.9, 3.0], [0.0, 0.0]],
        day_length_const: [0.0; 4],
        puberty: [450, 400],
        ovulation_period: 21,
        fert_wt_diff: 0.02,
        exposure_consts: [0.0; 4],
    }
}

fn finish(mut genotype: Genotype) -> Genotype {
    genotype.set_pure_ancestry();
    genotype.derive_params();
    genotype
}

fn merino() -> Genotype {
    finish(sheep_template("Merino"))
}

fn border_leicester() -> Genotype {
    let mut genotype = sheep_template("Border Leicester");
    genotype.breed_srw = 75.0;
    genotype.fleece_ratio = 0.065;
    genotype.max_fleece_diam = 36.0;
    genotype.birth_wt_scale = [0.0, 0.08, 0.066, 0.056];
    genotype.conceive_sigs = [[0.0, 0.0], [0.8, 5.0], [1.05, 5.0], [1.7, 5.0]];
    genotype.day_length_const = [0.0, 0.1, 0.2, 0.3];
    finish(genotype)
}

fn angus() -> Genotype {
    let mut genotype = cattle_template("Angus");
    genotype.conceive_sigs = [[0.0, 0.0], [0.75, 5.89], [1.9, 3.0], [0.0, 0.0]];
    finish(genotype)
}

fn friesian() -> Genotype {
    let mut genotype = cattle_template("Friesian");
    genotype.dairy = true;
    genotype.breed_srw = 550.0;
    genotype.intake_c = [
        0.0, 0.025, 1.7, 0.22, 60.0, 0.02, 25.0, 22.0, 81.0, 1.7, 0.6, 0.05, 0.15, 0.005, 0.002,
        0.5, 1.0, 0.01, 20.0, 3.0, 1.5, 0.7,
    ];
    genotype.intake_lact_c = [0.85, 0.577, 0.9, 0.0];
    genotype.preg_c = [
        0.0, 285.0, 2.2, 1.77, 0.33, 1.8, 2.42, 1.16, 4.11, 343.5, 0.0164, 0.134, 6.22, 0.747,
    ];
    genotype.lact_c[3] = 0.6;
    finish(genotype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = GenotypeRegistry::with_builtin_breeds();
        assert_eq!(registry.get("merino").unwrap().name, "Merino");
        assert_eq!(registry.get("BORDER LEICESTER").unwrap().breed_srw, 75.0);
    }

    #[test]
    fn unknown_breed_is_an_error() {
        let registry = GenotypeRegistry::with_builtin_breeds();
        assert_eq!(
            registry.get("Dorper"),
            Err(StockError::UnknownGenotype("Dorper".to_string()))
        );
    }

    #[test]
    fn overrides_build_a_named_cross() {
        let mut registry = GenotypeRegistry::with_builtin_breeds();
        let overrides = GenotypeOverrides {
            name: "First Cross".to_string(),
            dam: Some("Merino".to_string()),
            sire: Some("Border Leicester".to_string()),
            sire_propn: 0.5,
            srw: Some(65.0),
            death_rate: Some(0.04),
            ..GenotypeOverrides::default()
        };
        let cross = registry.apply(&overrides).unwrap();
        assert_eq!(cross.name, "First Cross");
        assert_eq!(cross.breed_srw, 65.0);
        assert!((cross.annual_deaths(false).unwrap() - 0.04).abs() < 1e-9);
        assert!(registry.contains("first cross"));
    }

    #[test]
    fn default_merino_gestation_is_about_five_months() {
        let merino = GenotypeRegistry::with_builtin_breeds().get("Merino").unwrap();
        assert_eq!(merino.gestation(), 150);
        assert!((merino.std_birth_wt(1) - 4.5).abs() < 1e-9);
    }
}
