use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

/// Dry matter with its nitrogen, phosphorus, sulphur and ash alkalinity content.
/// Masses are kg; ash alkalinity is mol.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DmPool {
    pub dm: f64,
    pub n: f64,
    pub p: f64,
    pub s: f64,
    pub ash_alk: f64,
}

impl Add for DmPool {
    type Output = DmPool;

    fn add(self, other: DmPool) -> DmPool {
        DmPool {
            dm: self.dm + other.dm,
            n: self.n + other.n,
            p: self.p + other.p,
            s: self.s + other.s,
            ash_alk: self.ash_alk + other.ash_alk,
        }
    }
}

impl AddAssign for DmPool {
    fn add_assign(&mut self, other: DmPool) {
        *self = *self + other;
    }
}

impl Mul<f64> for DmPool {
    type Output = DmPool;

    fn mul(self, scale: f64) -> DmPool {
        DmPool {
            dm: self.dm * scale,
            n: self.n * scale,
            p: self.p * scale,
            s: self.s * scale,
            ash_alk: self.ash_alk * scale,
        }
    }
}

/// Daily excreta of one animal, or of a whole population once scaled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Excretion {
    pub organic_faeces: DmPool,
    pub inorganic_faeces: DmPool,
    pub urine: DmPool,
}

impl Excretion {
    pub fn total_n(&self) -> f64 {
        self.organic_faeces.n + self.inorganic_faeces.n + self.urine.n
    }
}

impl Add for Excretion {
    type Output = Excretion;

    fn add(self, other: Excretion) -> Excretion {
        Excretion {
            organic_faeces: self.organic_faeces + other.organic_faeces,
            inorganic_faeces: self.inorganic_faeces + other.inorganic_faeces,
            urine: self.urine + other.urine,
        }
    }
}

impl AddAssign for Excretion {
    fn add_assign(&mut self, other: Excretion) {
        *self = *self + other;
    }
}

impl Mul<f64> for Excretion {
    type Output = Excretion;

    fn mul(self, scale: f64) -> Excretion {
        Excretion {
            organic_faeces: self.organic_faeces * scale,
            inorganic_faeces: self.inorganic_faeces * scale,
            urine: self.urine * scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_scale_and_add() {
        let head = Excretion {
            urine: DmPool {
                n: 0.01,
                ..DmPool::default()
            },
            ..Excretion::default()
        };
        let mut flock = head * 100.0;
        flock += head;
        assert!((flock.urine.n - 1.01).abs() < 1e-12);
        assert!((flock.total_n() - 1.01).abs() < 1e-12);
    }
}
