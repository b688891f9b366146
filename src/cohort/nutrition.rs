//! Daily energy, protein and mineral partitioning.

use std::sync::Arc;

use serde::Serialize;

use super::AnimalCohort;
use crate::excretion::{DmPool, Excretion};
use crate::forage::DIG_CLASSES;
use crate::genotype::{AnimalKind, ReproType};
use crate::numerics::{delta_gompertz, dim, gompertz, ramp, sig, wood, xdiv, DAY2RAD, VERY_SMALL};
use crate::weather::DailyWeather;

const N2PROTEIN: f64 = 6.25;
const RDP_ITERATIONS: usize = 5;
const RDP_TOLERANCE: f64 = 0.001;
/// Energy (MJ/kg) carried by undegraded protein and by dietary fat, neither of which
/// feeds the rumen microbes.
const PROTEIN_E2DM: f64 = 14.0;
const FAT_E2DM: f64 = 36.0;
/// Digestibility of undegraded dietary and microbial protein, and of milk protein.
const UDP_DIGESTIBILITY: f64 = 0.7;
const MCP_DIGESTIBILITY: f64 = 0.6;
const MILK_PROTEIN_DIGESTIBILITY: f64 = 0.92;
/// Base weight never falls below this fraction of standard reference weight.
const MIN_BASE_WEIGHT: f64 = 0.05;

/// Feed eaten by one animal today, accumulated over the grazing sub-steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DietTally {
    /// kg DM
    pub dm: f64,
    pub dmd_mass: f64,
    /// MJ
    pub me: f64,
    pub cp: f64,
    pub rdp_potential: f64,
    pub p: f64,
    pub s: f64,
    pub ash_alk: f64,
    /// kg ether extract
    pub fat: f64,
}

impl DietTally {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add(&mut self, dm: f64, dmd: f64, me_dm: f64, cp: f64, dg: f64, p: f64, s: f64, ash_alk: f64) {
        self.dm += dm;
        self.dmd_mass += dm * dmd;
        self.me += dm * me_dm;
        self.cp += dm * cp;
        self.rdp_potential += dm * cp * dg;
        self.p += dm * p;
        self.s += dm * s;
        self.ash_alk += dm * ash_alk;
    }

    pub fn dmd(&self) -> f64 {
        xdiv(self.dmd_mass, self.dm)
    }

    pub fn me_dm(&self) -> f64 {
        xdiv(self.me, self.dm)
    }

    pub fn degradability(&self) -> f64 {
        xdiv(self.rdp_potential, self.cp)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeIntake {
    pub herbage: f64,
    pub supplement: f64,
    pub milk: f64,
    pub solid: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Efficiencies {
    pub maint: f64,
    pub gain: f64,
    pub preg: f64,
    pub lact: f64,
}

/// ME (MJ/day) used by each function, except `gain` which is net energy retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergyUse {
    pub metab: f64,
    pub maint: f64,
    pub preg: f64,
    pub lact: f64,
    pub wool: f64,
    pub gain: f64,
}

/// Protein flows (kg/day).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProteinUse {
    pub intake: f64,
    pub rdp_intake: f64,
    pub rdp_reqd: f64,
    pub udp_intake: f64,
    pub dpls: f64,
    pub maint: f64,
    pub preg: f64,
    pub lact: f64,
    pub wool: f64,
    pub gain: f64,
}

/// Changes to persistent state computed by [`AnimalCohort::nutrition`] and applied by
/// [`AnimalCohort::complete_growth`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct DayGrowth {
    pub weight_change: f64,
    pub greasy_growth: f64,
    pub day_fibre_diam: f64,
    pub foetal_weight: f64,
    pub lact_adjust: f64,
    pub lact_ratio: f64,
    pub milk_energy: f64,
    pub milk_protein: f64,
    pub milk_yield: f64,
    pub prop_max_milk: f64,
}

/// Per-head intake and partitioning for the current day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnimalOutput {
    pub herbage: DietTally,
    pub supplement: DietTally,
    /// kg DM by digestibility class
    pub herbage_by_class: [f64; DIG_CLASSES],
    pub seed: [f64; 2],
    pub me_intake: MeIntake,
    pub milk_cp: f64,
    pub effic: Efficiencies,
    pub energy: EnergyUse,
    pub protein: ProteinUse,
    pub feeding_level: f64,
    pub conceptus_growth: f64,
    /// kg CH4
    pub methane: f64,
    pub excretion: Excretion,
    #[serde(skip)]
    pub(crate) growth: DayGrowth,
}

impl AnimalCohort {
    /// Partitions the day's intake for the cohort and then its young. Persistent state
    /// is left alone until [`AnimalCohort::complete_growth`].
    pub fn nutrition(&mut self, weather: &DailyWeather) {
        let young_bw = self
            .young
            .as_ref()
            .filter(|y| y.suckling)
            .map(|y| y.base_weight);
        self.compute_nutrition(weather, young_bw);

        let offspring = self.lact.no_offspring as f64;
        let milk = if offspring > 0.0 {
            (
                self.state.growth.milk_energy / offspring,
                self.state.growth.milk_protein / offspring,
            )
        } else {
            (0.0, 0.0)
        };
        if let Some(young) = self.young.as_mut() {
            young.milk_supply = if young.suckling { milk } else { (0.0, 0.0) };
            young.nutrition(weather);
        }
    }

    /// Degradable protein supply and requirement per head at feeding level `fl`.
    fn rdp_balance(&self, fl: f64, weather: &DailyWeather) -> (f64, f64, f64) {
        let dg = &self.genotype.dg_prot_c;
        let herb = &self.state.herbage;
        let supp = &self.state.supplement;
        let fl_pos = fl.max(0.0);
        let herb_dg = herb.degradability() * (1.0 - (dg[1] - dg[2] * herb.dmd()) * fl_pos);
        let supp_dg = supp.degradability() * (1.0 - dg[3] * fl_pos);
        let rdp_intake = herb.cp * herb_dg + supp.cp * supp_dg;
        let supp_udp = supp.cp * (1.0 - supp_dg);
        let udp_intake = herb.cp * (1.0 - herb_dg) + supp_udp;
        let supp_fme = dim(dim(supp.me, PROTEIN_E2DM * supp_udp), FAT_E2DM * supp.fat);
        let seasonal =
            1.0 + dg[7] * weather.latitude / 40.0 * (DAY2RAD * weather.day_of_year as f64).sin();
        let rdp_reqd = (dg[4] + dg[5] * (1.0 - (-dg[6] * (fl + 1.0)).exp()))
            * (herb.me * seasonal + supp_fme);
        (rdp_intake, rdp_reqd, udp_intake.max(0.0))
    }

    /// Proportion of potential intake the animals would eat were degradable protein the
    /// only limit.
    fn rdp_intake_factor(&self, maint: f64, weather: &DailyWeather) -> f64 {
        let solid_dm = self.state.herbage.dm + self.state.supplement.dm;
        let mei = self.state.me_intake.total;
        let fl = xdiv(mei, maint) - 1.0;
        let (rdpi, rdpr, _) = self.rdp_balance(fl, weather);
        if solid_dm < VERY_SMALL || rdpi >= rdpr {
            return 1.0;
        }
        let ic16 = self.genotype.intake_c[16];
        let soften = |ratio: f64| {
            if ic16 > 0.0 && ic16 < 1.0 {
                1.0 + ic16 * (ratio - 1.0)
            } else {
                ratio
            }
        };
        let mut ratio = soften(rdpi / rdpr).max(VERY_SMALL);
        for _ in 0..RDP_ITERATIONS {
            let old = ratio;
            let temp_fl = xdiv(ratio * mei, maint) - 1.0;
            let (rdpi, rdpr, _) = self.rdp_balance(temp_fl, weather);
            let temp = soften(xdiv(rdpi, rdpr).min(1.0));
            // Intake never stops entirely on a protein-poor diet.
            ratio = (1.0 - 0.5 * (1.0 - old)).min(temp).max(VERY_SMALL);
            if (ratio - old).abs() < RDP_TOLERANCE {
                break;
            }
        }
        ratio
    }

    fn compute_nutrition(&mut self, weather: &DailyWeather, young_bw: Option<f64>) {
        let g = Arc::clone(&self.genotype);
        let herb = self.state.herbage;
        let supp = self.state.supplement;
        let (milk_me, milk_cp) = self.milk_supply;

        let me_solid = herb.me + supp.me;
        let mei = me_solid + milk_me;
        let dm_solid = herb.dm + supp.dm;
        let legume = self.initial_inputs.legume_propn;

        let mut out = AnimalOutput {
            herbage: herb,
            supplement: supp,
            herbage_by_class: self.state.herbage_by_class,
            seed: self.state.seed,
            milk_cp,
            me_intake: MeIntake {
                herbage: herb.me,
                supplement: supp.me,
                milk: milk_me,
                solid: me_solid,
                total: mei,
            },
            ..AnimalOutput::default()
        };

        // Efficiencies
        let e = &g.effic_c;
        let md_solid = xdiv(me_solid, dm_solid);
        let milk_propn = xdiv(milk_me, mei);
        let mut effic = if mei > 0.0 {
            Efficiencies {
                maint: (me_solid / mei) * (e[1] + e[2] * md_solid) + milk_propn * e[3],
                lact: e[5] + e[6] * md_solid,
                preg: e[8],
                gain: (herb.me / mei) * e[13] * (1.0 + e[14] * legume) * herb.me_dm()
                    + (supp.me / mei) * (e[15] * supp.me_dm() + e[16])
                    + milk_propn * e[12],
            }
        } else {
            Efficiencies {
                maint: e[4],
                lact: e[7],
                preg: e[8],
                gain: 0.0,
            }
        };

        // Maintenance
        let m = &g.maint_c;
        let bw = self.base_weight;
        let age_years = self.age_days as f64 / 365.25;
        let scale = if self.suckling {
            1.0 + m[5] * milk_propn
        } else if self.repro == ReproType::Male && self.age_days >= g.puberty[1] {
            1.0 + m[15]
        } else {
            1.0
        };
        let mut energy = EnergyUse {
            metab: scale * m[2] * bw.powf(0.75) * (-m[3] * age_years).exp().max(m[4]),
            ..EnergyUse::default()
        };
        let eating = m[6] * bw * herb.dm * dim(m[7], herb.dmd());
        let (green, dead) = (self.initial_inputs.total_green, self.initial_inputs.total_dead);
        let mut distance = if green > 100.0 {
            1.0 / (m[8] * green + m[9])
        } else if dead > 100.0 {
            1.0 / (m[8] * dead + m[9])
        } else {
            0.0
        };
        if self.site.animals_per_ha > m[17] {
            distance *= m[17] / self.site.animals_per_ha;
        }
        let moving = m[16] * self.live_weight() * self.site.steepness * distance;
        energy.maint = (energy.metab + eating + moving) / effic.maint.max(VERY_SMALL) + m[1] * mei;
        let fl = xdiv(mei, energy.maint) - 1.0;

        let mut protein = ProteinUse {
            intake: herb.cp + supp.cp + milk_cp,
            ..ProteinUse::default()
        };
        let faecal_endo = m[10] * dm_solid + m[11] * milk_me;
        let (urine_endo, dermal) = match g.kind {
            AnimalKind::Cattle => ((m[12] * bw.ln() - m[13]).max(0.0), m[14] * bw.powf(0.75)),
            AnimalKind::Sheep => (m[12] * bw + m[13], 0.0),
        };
        protein.maint = faecal_endo + urine_endo + dermal;

        // Degradable protein
        let (rdpi, rdpr, udp) = self.rdp_balance(fl, weather);
        protein.rdp_intake = rdpi;
        protein.rdp_reqd = rdpr;
        protein.udp_intake = udp;
        protein.dpls = MCP_DIGESTIBILITY * rdpi.min(rdpr)
            + UDP_DIGESTIBILITY * udp
            + MILK_PROTEIN_DIGESTIBILITY * milk_cp;

        let mut growth = DayGrowth {
            foetal_weight: self.foetal_weight,
            lact_adjust: self.lact.adjust,
            lact_ratio: self.lact.ratio,
            prop_max_milk: self.lact.prop_max_milk,
            ..DayGrowth::default()
        };

        // Pregnancy
        if self.is_pregnant() {
            let pc = &g.preg_c;
            let nf = self.no_foetuses;
            let fa = self.foetal_age as f64;
            let birth_wt = self.birth_weight_for_size();
            let birth_conceptus = nf as f64 * pc[5] * birth_wt;
            let norm = birth_wt * gompertz(fa, pc[1], pc[2], pc[3]);
            let foetal_growth = birth_wt * delta_gompertz(fa, pc[1], pc[2], pc[3]);
            let cond_factor = xdiv((self.body_condition - 1.0) * norm, g.std_birth_wt(nf));
            growth.foetal_weight = self.foetal_weight
                + if self.body_condition >= 1.0 {
                    foetal_growth * (1.0 + cond_factor)
                } else {
                    foetal_growth * (1.0 + g.preg_scale[nf.min(3)] * cond_factor)
                };
            let next_norm = birth_wt * gompertz(fa + 1.0, pc[1], pc[2], pc[3]);
            let foetal_cond = xdiv(growth.foetal_weight, next_norm);
            out.conceptus_growth = self.conceptus_wt_at(self.foetal_age + 1, growth.foetal_weight)
                - self.conceptus_wt_at(self.foetal_age, self.foetal_weight);
            energy.preg = pc[8] * birth_conceptus * foetal_cond * delta_gompertz(fa, pc[1], pc[9], pc[10])
                / effic.preg;
            protein.preg =
                pc[11] * birth_conceptus * foetal_cond * delta_gompertz(fa, pc[1], pc[12], pc[13]);
        }

        // Lactation
        if self.lact.lactating {
            let lc = &g.lact_c;
            let ci15 = g.intake_c[15];
            let dl = self.lact.days as f64;
            let n = self.lact.no_offspring;
            let cond = 1.0 - ci15 + ci15 * self.lact.birth_condition;
            let suckled = young_bw.filter(|_| n > 0);
            let pot_milk = match suckled {
                Some(_) => {
                    g.peak_lact_c[n.min(3)]
                        * self.std_ref_wt.powf(0.75)
                        * self.relative_size
                        * cond
                        * self.lact.adjust
                        * wood(dl + lc[1], lc[2], lc[3])
                }
                None => {
                    lc[5] * lc[6] * g.peak_milk * cond * self.lact.adjust * wood(dl + lc[1], lc[2], lc[4])
                }
            };
            let surplus = mei - energy.maint - energy.preg;
            let avail = lc[5] * effic.lact * surplus;
            let avail_ratio = xdiv(avail, pot_milk);
            let avail_days = dl.max(avail_ratio / (2.0 * lc[22]));
            let bc = self.body_condition;
            let exponent = lc[19] - lc[20] * avail_ratio
                - lc[21] * avail_days * (avail_ratio - lc[22] * avail_days)
                + lc[23] * bc * (avail_ratio - lc[24] * bc);
            let max_milk = pot_milk * lc[7] / (1.0 + exponent.min(50.0).exp());
            let (milk, prop_max) = match suckled {
                Some(young_bw) => {
                    let limit = lc[6]
                        * n as f64
                        * young_bw.powf(0.75)
                        * (lc[12] + lc[13] * (-lc[14] * dl).exp());
                    let milk = max_milk.min(limit);
                    (milk, xdiv(milk, limit))
                }
                None => (max_milk, 1.0),
            };
            energy.lact = milk / (lc[5] * effic.lact);
            protein.lact = lc[15] * milk / lc[6];
            growth.milk_energy = milk;
            growth.milk_protein = protein.lact;
            growth.milk_yield = milk / lc[6];
            growth.prop_max_milk = prop_max;

            if dl >= lc[16] * lc[2] {
                let day_ratio = xdiv(milk, pot_milk);
                if day_ratio < self.lact.ratio {
                    growth.lact_adjust = self.lact.adjust - lc[17] * (self.lact.ratio - day_ratio);
                    growth.lact_ratio = lc[18] * day_ratio + (1.0 - lc[18]) * self.lact.ratio;
                }
            } else {
                growth.lact_adjust = 1.0;
                growth.lact_ratio = 1.0;
            }
        }

        // Wool
        let wc = &g.wool_c;
        let wool_age_factor = wc[5] + (1.0 - wc[5]) * (1.0 - (-wc[12] * self.age_days as f64).exp());
        if g.kind == AnimalKind::Sheep {
            let day_len_factor = 1.0 + wc[6] * (weather.day_length() - 12.0);
            let base = g.fleece_ratio * wool_age_factor * day_len_factor;
            let dpls_avail = dim(protein.dpls, wc[9] * (protein.lact + protein.preg));
            let me_avail = dim(mei, energy.lact + energy.preg);
            let day_cfw = (wc[7] * base * dpls_avail).min(wc[8] * base * me_avail).max(0.0);
            protein.wool = (1.0 - wc[4]) * wc[3] * self.greasy_fleece_growth + wc[4] * day_cfw;
            energy.wool = wc[1] * dim(protein.wool, wc[2] * self.relative_size) / wc[3];
        }

        // Efficiency of gain
        if mei < energy.maint + energy.preg + energy.lact {
            effic.gain = if self.lact.lactating {
                effic.lact / e[10]
            } else {
                effic.maint / e[11]
            };
        } else if self.lact.lactating {
            effic.gain = e[9] * effic.lact;
        }

        // Gain
        let gc = &g.gain_c;
        let size = self.relative_size;
        let sf1 = sig(size, [gc[4], gc[5]]);
        let sf2 = ramp(size, gc[6], gc[7]);
        let r = gc[10] * fl;
        let evg = (gc[8] + r + (gc[9] - r) * sf1 + sf2 * gc[11] * (self.body_condition - 1.0)).max(1.0);
        energy.gain = effic.gain * (mei - energy.maint - energy.preg - energy.lact) - energy.wool;
        let empty_gain = energy.gain / evg;
        growth.weight_change = gc[18] * empty_gain;
        protein.gain = (gc[12] - gc[13] * sf1) * empty_gain;

        if g.kind == AnimalKind::Sheep {
            growth.greasy_growth = protein.wool / wc[3];
            let pot_clean = wc[3] * g.fleece_ratio * self.std_ref_wt * wool_age_factor / 365.0;
            let power = if energy.gain >= 0.0 { wc[13] } else { wc[14] };
            growth.day_fibre_diam = g.max_fleece_diam * xdiv(protein.wool, pot_clean).powf(power);
        }

        let excretion = self.excretion_balance(&g, &protein, &growth, out.conceptus_growth, faecal_endo, dermal);

        // Methane
        let mc = &g.meth_c;
        let dmd_pct = 100.0 * xdiv(herb.dmd_mass + supp.dmd_mass, dm_solid);
        let level = (fl + 1.0).max(0.0);
        let ch4_pct = (mc[1] + mc[2] * dmd_pct + level * (mc[3] - mc[4] * dmd_pct)).max(0.0);
        out.methane = ch4_pct / 100.0 * dm_solid * mc[5] / mc[6];

        out.effic = effic;
        out.energy = energy;
        out.protein = protein;
        out.feeding_level = fl;
        out.excretion = excretion;
        out.growth = growth;
        self.state = out;
        self.rdp_factor = self.rdp_intake_factor(energy.maint, weather);
    }

    fn excretion_balance(
        &self,
        g: &crate::genotype::Genotype,
        protein: &ProteinUse,
        growth: &DayGrowth,
        conceptus_growth: f64,
        faecal_endo: f64,
        dermal: f64,
    ) -> Excretion {
        let herb = &self.state.herbage;
        let supp = &self.state.supplement;
        let (milk_me, milk_cp) = self.milk_supply;

        // Nitrogen
        let faecal_n = (faecal_endo + (1.0 - UDP_DIGESTIBILITY) * protein.udp_intake) / N2PROTEIN;
        let retained = protein.preg + protein.lact + protein.wool + protein.gain;
        let urine_n = dim(
            protein.intake / N2PROTEIN,
            retained / N2PROTEIN + faecal_n + dermal / N2PROTEIN,
        );
        let faeces_dm = herb.dm * (1.0 - herb.dmd()) + supp.dm * (1.0 - supp.dmd());

        // Phosphorus
        let ph = &g.phos_c;
        let milk_p = if self.suckling {
            ph[4] * xdiv(milk_me, g.lact_c[6])
        } else {
            0.0
        };
        let p_intake = herb.p + supp.p + milk_p;
        let avail_p = ph[3] * (herb.p + supp.p) + milk_p;
        let maint_p = avail_p.min(ph[2] * self.base_weight);
        let preg_p = ph[1] * conceptus_growth.max(0.0);
        let lact_p = ph[4] * growth.milk_yield;
        let wool_p = ph[5] * growth.greasy_growth;
        let gain_p = (avail_p - maint_p - preg_p - lact_p - wool_p).min(ph[1] * growth.weight_change);
        let excreted_p = dim(p_intake, preg_p + lact_p + wool_p + gain_p);

        // Sulphur
        let su = &g.sulf_c;
        let s_intake = herb.s + supp.s + su[1] * milk_cp;
        let preg_s = su[1] * protein.preg;
        let lact_s = su[1] * protein.lact;
        let wool_s = su[2] * protein.wool;
        let gain_s = (su[1] * protein.gain).min(s_intake - preg_s - lact_s - wool_s);
        let excreted_s = dim(s_intake, preg_s + lact_s + wool_s + gain_s);
        let faecal_s = excreted_s.min(su[1] * faecal_n * N2PROTEIN);

        // Ash alkalinity
        let aa = &g.ash_alk_c;
        let aa_intake = herb.ash_alk + supp.ash_alk;
        let wool_aa = if g.kind == AnimalKind::Sheep {
            aa[2] * growth.greasy_growth
        } else {
            0.0
        };
        let accumulated = aa[1] * (growth.weight_change + conceptus_growth) + wool_aa;
        let faecal_aa = aa[3] * faeces_dm;

        Excretion {
            organic_faeces: DmPool {
                dm: faeces_dm,
                n: faecal_n,
                p: 0.0,
                s: faecal_s,
                ash_alk: faecal_aa,
            },
            inorganic_faeces: DmPool {
                p: excreted_p,
                ..DmPool::default()
            },
            urine: DmPool {
                n: urine_n,
                s: excreted_s - faecal_s,
                ash_alk: aa_intake - accumulated - faecal_aa,
                ..DmPool::default()
            },
        }
    }

    /// Applies the day's growth computed by [`AnimalCohort::nutrition`].
    pub fn complete_growth(&mut self) {
        let growth = self.state.growth;
        self.weight_change = growth.weight_change;
        self.base_weight = (self.base_weight + growth.weight_change).max(MIN_BASE_WEIGHT * self.std_ref_wt);
        if self.genotype.kind == AnimalKind::Sheep {
            let wool = self.wool_wt + growth.greasy_growth;
            if wool > 0.0 && growth.greasy_growth > 0.0 {
                self.fibre_diam =
                    (self.wool_wt * self.fibre_diam + growth.greasy_growth * growth.day_fibre_diam) / wool;
            }
            self.wool_wt = wool.max(0.0);
            self.greasy_fleece_growth = growth.greasy_growth;
        }
        if self.is_pregnant() {
            self.foetal_weight = growth.foetal_weight;
        }
        if self.lact.lactating {
            self.lact.adjust = growth.lact_adjust;
            self.lact.ratio = growth.lact_ratio;
            self.lact.milk_energy = growth.milk_energy;
            self.lact.milk_protein = growth.milk_protein;
            self.lact.milk_yield = growth.milk_yield;
            self.lact.prop_max_milk = growth.prop_max_milk;
        }
        self.calculate_weights();
        if let Some(young) = self.young.as_mut() {
            young.complete_growth();
        }
    }

    /// Lowest degradable-protein intake factor over the cohort and its young.
    pub fn min_rdp_factor(&self) -> f64 {
        let own = self.rdp_factor;
        self.young.as_ref().map_or(own, |y| own.min(y.min_rdp_factor()))
    }
}
