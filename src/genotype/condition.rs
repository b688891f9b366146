use serde::{Deserialize, Serialize};

/// Visual body-condition scoring scales in use for sheep and cattle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CondScoreSystem {
    #[default]
    #[serde(rename = "1-5")]
    OneToFive,
    #[serde(rename = "1-8")]
    OneToEight,
    #[serde(rename = "1-9")]
    OneToNine,
}

impl CondScoreSystem {
    fn base_score(self) -> f64 {
        match self {
            CondScoreSystem::OneToFive => 3.0,
            CondScoreSystem::OneToEight => 4.0,
            CondScoreSystem::OneToNine => 4.5,
        }
    }

    fn score_unit(self) -> f64 {
        match self {
            CondScoreSystem::OneToFive => 0.15,
            CondScoreSystem::OneToEight => 0.09,
            CondScoreSystem::OneToNine => 0.08,
        }
    }
}

pub fn cond_score_to_condition(score: f64, system: CondScoreSystem) -> f64 {
    1.0 + (score - system.base_score()) * system.score_unit()
}

pub fn condition_to_cond_score(condition: f64, system: CondScoreSystem) -> f64 {
    system.base_score() + (condition - 1.0) / system.score_unit()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEMS: [CondScoreSystem; 3] = [
        CondScoreSystem::OneToFive,
        CondScoreSystem::OneToEight,
        CondScoreSystem::OneToNine,
    ];

    #[test]
    fn base_score_is_unit_condition() {
        assert_eq!(cond_score_to_condition(3.0, CondScoreSystem::OneToFive), 1.0);
        assert_eq!(condition_to_cond_score(1.0, CondScoreSystem::OneToFive), 3.0);
        assert_eq!(cond_score_to_condition(4.0, CondScoreSystem::OneToEight), 1.0);
        assert_eq!(condition_to_cond_score(1.0, CondScoreSystem::OneToEight), 4.0);
        assert_eq!(cond_score_to_condition(4.5, CondScoreSystem::OneToNine), 1.0);
        assert_eq!(condition_to_cond_score(1.0, CondScoreSystem::OneToNine), 4.5);
    }

    #[test]
    fn conversions_round_trip() {
        for system in SYSTEMS {
            let top = match system {
                CondScoreSystem::OneToFive => 5.0,
                CondScoreSystem::OneToEight => 8.0,
                CondScoreSystem::OneToNine => 9.0,
            };
            for score in [1.0, 2.5, system.base_score(), 4.25, top] {
                let back = condition_to_cond_score(cond_score_to_condition(score, system), system);
                assert!((back - score).abs() < 1e-12, "{system:?} {score} -> {back}");
            }
            let base = system.base_score();
            assert_eq!(condition_to_cond_score(cond_score_to_condition(base, system), system), base);
        }
    }
}
