//! Paddocks: the forage and supplement shared by every cohort grazing them.

use serde::{Deserialize, Serialize};

use crate::forage::{ForageAvailability, ForageProvider, Supplement, DIG_CLASSES};
use crate::numerics::xdiv;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementStore {
    pub supplement: Supplement,
    /// Fresh weight on offer today (kg).
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paddock {
    pub name: String,
    /// ha
    pub area: f64,
    /// degrees
    pub slope: f64,
    /// Waterlogging index (0-1).
    pub waterlog: f64,
    pub forages: Vec<ForageProvider>,
    pub supplements: Vec<SupplementStore>,
    pub feed_first: bool,

    #[serde(skip)]
    totals: ForageAvailability,
    #[serde(skip)]
    pub summed_pot_intake: f64,
    /// Removal (kg) by forage provider and class since the last reset.
    #[serde(skip)]
    herbage_removal: Vec<[f64; DIG_CLASSES]>,
    #[serde(skip)]
    seed_removal: Vec<[f64; 2]>,
    #[serde(skip)]
    supp_removal: f64,
}

impl Paddock {
    pub fn new(name: &str, area: f64) -> Self {
        Self {
            name: name.to_string(),
            area: if area > 0.0 { area } else { 1.0 },
            ..Self::default()
        }
    }

    pub fn with_forage(mut self, forage: ForageProvider) -> Self {
        self.forages.push(forage);
        self
    }

    pub fn steepness(&self) -> f64 {
        let radians = self.slope.to_radians();
        1.0 + radians.tan().max(0.0).sqrt().min(1.0)
    }

    /// Aggregates the forage providers into today's offer.
    pub fn compute_totals(&mut self) {
        self.totals = ForageAvailability::combine(self.forages.iter().map(|f| &f.availability));
        self.herbage_removal = vec![[0.0; DIG_CLASSES]; self.forages.len()];
        self.seed_removal = vec![[0.0; 2]; self.forages.len()];
        self.supp_removal = 0.0;
    }

    pub fn forage_inputs(&self) -> &ForageAvailability {
        &self.totals
    }

    pub fn total_green(&self) -> f64 {
        self.totals.total_green
    }

    pub fn total_dead(&self) -> f64 {
        self.totals.total_dead
    }

    pub fn feed_supplement(&mut self, amount: f64, supplement: &Supplement, feed_first: bool) {
        if amount <= 0.0 {
            return;
        }
        self.feed_first = feed_first;
        match self
            .supplements
            .iter_mut()
            .find(|s| s.supplement.name == supplement.name)
        {
            Some(store) => store.amount += amount,
            None => self.supplements.push(SupplementStore {
                supplement: supplement.clone(),
                amount,
            }),
        }
    }

    pub fn clear_supplement(&mut self) {
        self.supplements.clear();
    }

    /// Today's ration as a single mixed feed and its total fresh weight.
    pub fn ration(&self) -> Option<(Supplement, f64)> {
        Supplement::mix(self.supplements.iter().map(|s| (&s.supplement, s.amount)))
    }

    pub fn supplement_offered(&self) -> f64 {
        self.supplements.iter().map(|s| s.amount).sum()
    }

    pub fn supplement_remaining(&self) -> f64 {
        (self.supplement_offered() - self.supp_removal).max(0.0)
    }

    pub fn zero_removal(&mut self) {
        for removal in &mut self.herbage_removal {
            *removal = [0.0; DIG_CLASSES];
        }
        for removal in &mut self.seed_removal {
            *removal = [0.0; 2];
        }
        self.supp_removal = 0.0;
    }

    /// Records herbage eaten (kg per class) and attributes it to the forage providers in
    /// proportion to what each one offered.
    pub fn add_removal(&mut self, herbage: &[f64; DIG_CLASSES], seed: &[f64; 2], supplement: f64) {
        if self.herbage_removal.len() != self.forages.len() {
            self.herbage_removal = vec![[0.0; DIG_CLASSES]; self.forages.len()];
            self.seed_removal = vec![[0.0; 2]; self.forages.len()];
        }
        for (idx, forage) in self.forages.iter().enumerate() {
            for class in 0..DIG_CLASSES {
                let propn = xdiv(
                    forage.availability.herbage[class].biomass,
                    self.totals.herbage[class].biomass,
                );
                self.herbage_removal[idx][class] += propn * herbage[class];
            }
            for ripe in 0..2 {
                let propn = xdiv(forage.availability.seed[ripe].biomass, self.totals.seed[ripe].biomass);
                self.seed_removal[idx][ripe] += propn * seed[ripe];
            }
        }
        self.supp_removal += supplement;
    }

    /// Total removal so far by class, in kg.
    pub fn herbage_removed(&self) -> [f64; DIG_CLASSES] {
        let mut total = [0.0; DIG_CLASSES];
        for removal in &self.herbage_removal {
            for (slot, value) in total.iter_mut().zip(removal) {
                *slot += value;
            }
        }
        total
    }

    pub fn seed_removed(&self) -> [f64; 2] {
        let mut total = [0.0; 2];
        for removal in &self.seed_removal {
            total[0] += removal[0];
            total[1] += removal[1];
        }
        total
    }

    pub fn supplement_removed(&self) -> f64 {
        self.supp_removal
    }

    /// Takes the day's removal out of the forage providers and the supplement stores.
    pub fn apply_removal(&mut self) {
        let area = self.area;
        for (idx, forage) in self.forages.iter_mut().enumerate() {
            let (Some(herbage), Some(seed)) = (self.herbage_removal.get(idx), self.seed_removal.get(idx)) else {
                continue;
            };
            let per_ha = herbage.map(|kg| kg / area);
            let seed_per_ha = seed.map(|kg| kg / area);
            let eaten: f64 = per_ha.iter().sum();
            forage.remove(&per_ha, &seed_per_ha);
            let availability = &mut forage.availability;
            let green_share = xdiv(availability.total_green, availability.total_green + availability.total_dead);
            availability.total_green = (availability.total_green - eaten * green_share).max(0.0);
            availability.total_dead = (availability.total_dead - eaten * (1.0 - green_share)).max(0.0);
        }
        let offered = self.supplement_offered();
        if offered > 0.0 {
            let left = xdiv(self.supplement_remaining(), offered);
            for store in &mut self.supplements {
                store.amount *= left;
            }
            self.supplements.retain(|s| s.amount > 1.0e-6);
        }
        self.zero_removal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paddock() -> Paddock {
        let mut paddock = Paddock::new("north", 2.0)
            .with_forage(ForageProvider::pasture("ryegrass", 1500.0, 500.0, 0.0))
            .with_forage(ForageProvider::pasture("clover", 500.0, 0.0, 1.0));
        paddock.compute_totals();
        paddock
    }

    #[test]
    fn zero_area_defaults_to_one_hectare() {
        assert_eq!(Paddock::new("x", 0.0).area, 1.0);
    }

    #[test]
    fn steepness_is_bounded() {
        let mut paddock = Paddock::new("x", 1.0);
        assert_eq!(paddock.steepness(), 1.0);
        paddock.slope = 89.0;
        assert_eq!(paddock.steepness(), 2.0);
    }

    #[test]
    fn removal_is_shared_by_offer() {
        let mut paddock = paddock();
        let mut eaten = [0.0; DIG_CLASSES];
        eaten[1] = 100.0;
        paddock.add_removal(&eaten, &[0.0; 2], 0.0);
        assert!((paddock.herbage_removed()[1] - 100.0).abs() < 1e-9);
        let before = paddock.forages[0].availability.herbage[1].biomass;
        paddock.apply_removal();
        let after = paddock.forages[0].availability.herbage[1].biomass;
        // Ryegrass offered 3/4 of class 2 over 2 ha.
        assert!((before - after - 37.5).abs() < 1e-9);
        assert_eq!(paddock.herbage_removed(), [0.0; DIG_CLASSES]);
    }

    #[test]
    fn supplement_feeding_accumulates_by_name() {
        let mut paddock = paddock();
        paddock.feed_supplement(50.0, &Supplement::grain(), true);
        paddock.feed_supplement(25.0, &Supplement::grain(), true);
        paddock.feed_supplement(10.0, &Supplement::hay(), true);
        assert_eq!(paddock.supplements.len(), 2);
        assert_eq!(paddock.supplement_offered(), 85.0);

        paddock.add_removal(&[0.0; DIG_CLASSES], &[0.0; 2], 42.5);
        assert_eq!(paddock.supplement_remaining(), 42.5);
        paddock.zero_removal();
        assert_eq!(paddock.supplement_remaining(), 85.0);
        paddock.clear_supplement();
        assert!(paddock.ration().is_none());
    }
}
