//! Independent scenario runs over a shared registry.
//!
//! With the `parallel` feature the runs are spread across the rayon thread
//! pool; otherwise they run one after another. Results keep input order in
//! both cases.

use crate::config::ScenarioConfig;
use crate::engine::{simulate, SimulationOutput};
use crate::error::ConfigError;
use crate::topology::TopologyRegistry;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run every scenario. Each entry is the result for the scenario at the
/// same index.
#[cfg(feature = "parallel")]
pub fn run_batch(
    registry: &TopologyRegistry,
    configs: &[ScenarioConfig],
) -> Vec<Result<SimulationOutput, ConfigError>> {
    configs
        .par_iter()
        .map(|config| simulate(registry, config))
        .collect()
}

/// Run every scenario. Each entry is the result for the scenario at the
/// same index.
#[cfg(not(feature = "parallel"))]
pub fn run_batch(
    registry: &TopologyRegistry,
    configs: &[ScenarioConfig],
) -> Vec<Result<SimulationOutput, ConfigError>> {
    configs
        .iter()
        .map(|config| simulate(registry, config))
        .collect()
}
