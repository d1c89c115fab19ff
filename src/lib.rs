//! Thorium Energy Simulation Library
//!
//! Numeric core of the thorium dashboard: a reactor digital twin and a
//! national policy/impact projection. Both take a validated parameter set and
//! return an index-aligned result series; neither touches I/O or shared state.

pub mod error;
pub mod params;
pub mod series;
pub mod physics;
pub mod reactor;
pub mod policy;
pub mod compare;
pub mod memo;
pub mod config;
pub mod commands;

pub use commands::{simulate_policy, simulate_reactor, CachedSimulators, Simulators};
pub use compare::{diff, ScenarioComparison};
pub use config::ModelConfig;
pub use error::{AlignmentError, NumericDomainError, SimError, ValidationError};
pub use params::{ParameterKind, ParameterSet, RawValue, RawValues};
pub use policy::PolicySimulator;
pub use reactor::ReactorSimulator;
pub use series::ResultSeries;
