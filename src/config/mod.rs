//! Scenario configuration for forkguard.
//!
//! The configuration can be read from a YAML file. Parsing is forward
//! compatible (unknown fields are ignored), every field has a default, and
//! values are validated after parsing.

mod model;
mod operations;
pub mod types;


pub use model::ScenarioConfig;
