use thiserror::Error;

pub type StockResult<T> = Result<T, StockError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StockError {
    #[error("Genotype \"{0}\" is not known")]
    UnknownGenotype(String),

    #[error("Sex \"{0}\" is not recognised")]
    InvalidSex(String),

    #[error("Unit ({0}) not recognised")]
    UnsupportedUnit(String),

    #[error("Power of negative number attempted in {context}: base {base}")]
    NumericDomain { context: &'static str, base: f64 },

    #[error(
        "Purchased animals with condition score {score:.1} must have a base weight in the range {low:.1}-{high:.1} kg"
    )]
    PurchaseOutOfRange { score: f64, low: f64, high: f64 },

    #[error("Cannot split {requested} animals from a group of {available}")]
    InvalidSplit { requested: i64, available: u32 },

    #[error("Animal group {0} does not exist")]
    InvalidGroup(usize),

    #[error("Paddock \"{0}\" not recognised")]
    UnknownPaddock(String),

    #[error("Cannot mate {female} females to {male} males")]
    SpeciesMismatch { female: String, male: String },

    #[error("{search} search did not converge on target {target}")]
    SearchDidNotConverge { search: &'static str, target: f64 },

    #[error("Invalid value {value} for {name}")]
    InvalidParameter { name: &'static str, value: f64 },
}
