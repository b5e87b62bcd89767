//! Data-driven topology loading from JSON.
//!
//! Feature-gated behind `data-loader`. Deserializes zone definitions into a
//! [`TopologyRegistryBuilder`]; validation happens when the builder is built.

use crate::config::ScenarioConfig;
use crate::error::ConfigError;
use crate::topology::{Center, RouteSegment, TopologyRegistryBuilder};
use serde::{Deserialize, Serialize};

/// Bin size used when a center does not declare one (t).
pub const DEFAULT_BIN_CAPACITY_T: f64 = 15.0;

/// Feed flow a center supplies when it does not declare one (m³/h).
pub const DEFAULT_CENTER_DEMAND_M3H: f64 = 6.0;

/// Feed solids fraction when a center does not declare one.
pub const DEFAULT_CENTER_TS_IN: f64 = 0.05;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Top-level topology document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyData {
    /// Start from the built-in zones before adding these.
    #[serde(default)]
    pub include_builtin: bool,
    #[serde(default)]
    pub zones: Vec<ZoneData>,
}

/// One zone in a data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneData {
    pub key: String,
    pub route: Vec<RouteSegment>,
    /// Per-center overrides in route order. Omitted centers are derived from
    /// the route destinations with default parameters.
    #[serde(default)]
    pub centers: Vec<CenterData>,
}

/// A center in a data file. Only the name is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterData {
    pub name: String,
    #[serde(default = "default_ts_in", alias = "TS_in")]
    pub ts_in: f64,
    #[serde(default = "default_demand")]
    pub m3_demand: f64,
    #[serde(default = "default_capacity")]
    pub batea_capacity_t: f64,
}

fn default_ts_in() -> f64 {
    DEFAULT_CENTER_TS_IN
}

fn default_demand() -> f64 {
    DEFAULT_CENTER_DEMAND_M3H
}

fn default_capacity() -> f64 {
    DEFAULT_BIN_CAPACITY_T
}

impl ZoneData {
    /// Centers in route order, filling in defaults for undeclared ones.
    pub fn resolve_centers(&self) -> Vec<Center> {
        if self.centers.is_empty() {
            return self
                .route
                .iter()
                .map(|seg| {
                    Center::new(
                        &seg.to,
                        DEFAULT_CENTER_TS_IN,
                        DEFAULT_CENTER_DEMAND_M3H,
                        DEFAULT_BIN_CAPACITY_T,
                    )
                })
                .collect();
        }
        self.centers
            .iter()
            .map(|c| Center::new(&c.name, c.ts_in, c.m3_demand, c.batea_capacity_t))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a topology from a JSON string.
pub fn load_topology_json(json: &str) -> Result<TopologyRegistryBuilder, DataLoadError> {
    let data: TopologyData = serde_json::from_str(json)?;
    Ok(build_topology(data))
}

/// Load a topology from JSON bytes.
pub fn load_topology_json_bytes(bytes: &[u8]) -> Result<TopologyRegistryBuilder, DataLoadError> {
    let data: TopologyData = serde_json::from_slice(bytes)?;
    Ok(build_topology(data))
}

/// Register every zone of a parsed document.
pub fn build_topology(data: TopologyData) -> TopologyRegistryBuilder {
    let mut builder = if data.include_builtin {
        TopologyRegistryBuilder::with_builtin_zones()
    } else {
        TopologyRegistryBuilder::new()
    };
    for zone in &data.zones {
        builder.register_zone(&zone.key, zone.route.clone(), zone.resolve_centers());
    }
    builder
}

/// Load and validate a scenario from a JSON string. Missing fields take
/// their defaults.
pub fn load_scenario_json(json: &str) -> Result<ScenarioConfig, DataLoadError> {
    let config: ScenarioConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
