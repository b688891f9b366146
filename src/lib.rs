//! Daily population dynamics of grazing sheep and cattle, after the GrazPlan animal
//! model: cohorts of similar animals grazing shared paddocks, with growth, reproduction,
//! deaths and the management operations a farmer applies to them.

pub mod cohort;
pub mod config;
pub mod engine;
pub mod error;
pub mod excretion;
pub mod forage;
pub mod genotype;
pub mod numerics;
pub mod paddock;
pub mod population;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod weather;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use error::{StockError, StockResult};
pub use population::{GroupSelector, PopulationManager};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;
