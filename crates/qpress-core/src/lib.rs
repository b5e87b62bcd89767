//! QPress Core -- the simulation engine for mobile dewatering-press campaigns.
//!
//! A press truck drives a fixed route of intake centers, dewatering slurry
//! into cake that piles up in each center's bin, while a distribution truck
//! hauls full bins back to the route start. The engine advances both trucks
//! minute by minute and reports KPIs, a per-tick log and a stock series.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Simulation::step`] advances the run by one tick:
//!
//! 1. **Plant** -- The press truck drives, sets up, or runs into its bin.
//! 2. **Distribution** -- The hauling truck picks, loads, returns, or unloads.
//! 3. **Log** -- One snapshot row is appended.
//! 4. **Termination** -- The run ends when the feed is processed, both
//!    trucks are idle and every bin is empty, or when the step bound is hit.
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = TopologyRegistry::builtin();
//! let config = ScenarioConfig::with_volume("SUR", 30.0);
//! let output = simulate(&registry, &config)?;
//! println!("{}", output.kpis.total_cost);
//! ```
//!
//! # Key Types
//!
//! - [`topology::TopologyRegistry`] -- Immutable zone registry (routes and
//!   centers), built once and shared by every run.
//! - [`config::ScenarioConfig`] -- Plain-value run input.
//! - [`engine::Simulation`] -- Driver owning all per-run state.
//! - [`plant::Plant`] / [`distribution::Distribution`] -- The two truck
//!   state machines.
//! - [`kpi::KpiRecord`] -- Rounded field-report summary.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic sums.

pub mod batch;
pub mod config;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod id;
pub mod kpi;
pub mod plant;
pub mod press;
pub mod sim;
pub mod stock;
pub mod table;
pub mod topology;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{CostRates, Horizon, ScenarioConfig};
pub use engine::{simulate, Simulation, SimulationOutput};
pub use error::{ConfigError, DegenerateInput};
pub use kpi::KpiRecord;
pub use sim::RunOutcome;
pub use topology::{TopologyRegistry, TopologyRegistryBuilder};
