//! Command-line front end: run the bundle engine over a JSON scenario.

pub mod scenario;

pub use scenario::{Scenario, ScenarioLine};
