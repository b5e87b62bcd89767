//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::{CostRates, ScenarioConfig};
use crate::engine::{simulate, Simulation, SimulationOutput};
use crate::topology::{Center, RouteSegment, TopologyRegistry, TopologyRegistryBuilder};

/// Key of the small zone built by [`test_registry`].
pub const TEST_ZONE: &str = "TEST";

// ===========================================================================
// Scenarios
// ===========================================================================

/// Zone SUR, 30 m³ at 6 m³/h, 5% feed solids, 25% cake, 97% capture, no costs.
pub fn scenario_a() -> ScenarioConfig {
    ScenarioConfig::with_volume("SUR", 30.0)
}

/// [`scenario_a`] priced at 120 CLP/kWh, 1300 CLP/km and 50 CLP/m³.
pub fn scenario_b() -> ScenarioConfig {
    ScenarioConfig {
        costs: CostRates {
            energy_per_kwh: 120.0,
            transport_per_km: 1300.0,
            transport_per_ton_km: 0.0,
            dehydration_per_m3: 50.0,
        },
        ..scenario_a()
    }
}

/// A scenario on the [`TEST_ZONE`] zone.
pub fn test_scenario(volume_m3: f64) -> ScenarioConfig {
    ScenarioConfig::with_volume(TEST_ZONE, volume_m3)
}

// ===========================================================================
// Topologies
// ===========================================================================

/// Three short stops: declared hours on the first leg, speed-derived after.
pub fn test_centers(capacity_t: f64) -> (Vec<RouteSegment>, Vec<Center>) {
    let route = vec![
        RouteSegment::new("Base", "A", 30.0, Some(0.5)),
        RouteSegment::new("A", "B", 20.0, None),
        RouteSegment::new("B", "C", 10.0, None),
    ];
    let centers = vec![
        Center::new("A", 0.05, 6.0, capacity_t),
        Center::new("B", 0.05, 5.0, capacity_t),
        Center::new("C", 0.05, 6.0, capacity_t),
    ];
    (route, centers)
}

/// Built-in zones plus [`TEST_ZONE`] with every bin sized `capacity_t`.
pub fn test_registry(capacity_t: f64) -> TopologyRegistry {
    let (route, centers) = test_centers(capacity_t);
    let mut builder = TopologyRegistryBuilder::with_builtin_zones();
    builder.register_zone(TEST_ZONE, route, centers);
    builder.build().expect("test zone is valid")
}

/// Built-in zones plus [`TEST_ZONE`] with per-center demand overrides.
pub fn test_registry_with_demands(demands: [f64; 3]) -> TopologyRegistry {
    let (route, mut centers) = test_centers(15.0);
    for (c, d) in centers.iter_mut().zip(demands) {
        c.m3_demand = d;
    }
    let mut builder = TopologyRegistryBuilder::with_builtin_zones();
    builder.register_zone(TEST_ZONE, route, centers);
    builder.build().expect("test zone is valid")
}

// ===========================================================================
// Runs
// ===========================================================================

/// Run a scenario, panicking on configuration errors.
pub fn run(registry: &TopologyRegistry, config: &ScenarioConfig) -> SimulationOutput {
    simulate(registry, config).expect("scenario is valid")
}

/// Step a simulation to its end and return the number of ticks executed.
pub fn step_to_end(sim: &mut Simulation) -> u64 {
    while sim.step().is_none() {}
    sim.tick()
}
