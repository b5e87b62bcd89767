//! Serde data file structs for zones and scenarios.
//!
//! Zones reuse the core [`ZoneData`] shape so JSON topology documents and
//! data directories describe a zone the same way. Scenarios wrap a
//! [`ScenarioConfig`] with a unique name.

use qpress_core::config::ScenarioConfig;
use serde::Deserialize;

pub use qpress_core::data_loader::{CenterData, ZoneData};

// ===========================================================================
// Scenarios
// ===========================================================================

/// A named scenario in a data file. Omitted config fields take their
/// defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioData {
    pub name: String,
    #[serde(default)]
    pub config: ScenarioConfig,
}
