//! Scenario configuration: the plain values a run consumes.

use crate::error::ConfigError;
use crate::fixed::Minutes;
use crate::press::{check_cake_solids, MAX_FIXED_MAGNITUDE};
use crate::topology::{check_finite, check_fraction};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Slurry density in t/m³. Slurry at low solids is close to water.
pub const DEFAULT_DENSITY: f64 = 1.0;

// ---------------------------------------------------------------------------
// Horizon
// ---------------------------------------------------------------------------

/// How long the campaign runs.
///
/// The engine is volume-driven. A days horizon is converted to the volume
/// the press would process running nominally around the clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    /// Process this many m³ of feed.
    Volume { m3: f64 },
    /// Run for this many days at nominal flow.
    Days { days: u32 },
}

impl Horizon {
    /// Target feed volume in m³ for a press running at `nominal_flow_m3h`.
    pub fn target_volume_m3(&self, nominal_flow_m3h: f64) -> f64 {
        match *self {
            Horizon::Volume { m3 } => m3,
            Horizon::Days { days } => days as f64 * nominal_flow_m3h * 24.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Cost rates
// ---------------------------------------------------------------------------

/// Unit costs in CLP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostRates {
    pub energy_per_kwh: f64,
    pub transport_per_km: f64,
    /// Zero in the volume-driven tariff.
    pub transport_per_ton_km: f64,
    pub dehydration_per_m3: f64,
}

impl CostRates {
    /// Tariff used by the historical fixed-days campaigns.
    pub const DAYS_TARIFF: CostRates = CostRates {
        energy_per_kwh: 120.0,
        transport_per_km: 800.0,
        transport_per_ton_km: 65.0,
        dehydration_per_m3: 0.0,
    };

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("energy_per_kwh", self.energy_per_kwh),
            ("transport_per_km", self.transport_per_km),
            ("transport_per_ton_km", self.transport_per_ton_km),
            ("dehydration_per_m3", self.dehydration_per_m3),
        ] {
            check_non_negative(field, value)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// Input for one simulation run. Immutable for the run's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Zone key; must exist in the topology registry.
    pub zone: String,
    pub horizon: Horizon,
    /// Nominal press feed flow (m³/h).
    #[serde(alias = "Q_proc_m3h")]
    pub q_proc_m3h: f64,
    /// Feed solids fraction used for target allocation.
    #[serde(alias = "TS_in")]
    pub ts_in: f64,
    /// Solids fraction of the produced cake.
    #[serde(alias = "TS_cake")]
    pub ts_cake: f64,
    /// Fraction of feed solids captured in the cake.
    pub eta_captura: f64,
    pub costs: CostRates,
    pub truck_speed_kmh: f64,
    /// Minutes per tick.
    pub step_min: Minutes,
    /// Reserved for stochastic demand or travel variation. No code path
    /// draws from it; two runs differing only in seed are identical.
    pub seed: u64,
    /// Slurry density (t/m³).
    pub density: f64,
    /// Wall-clock time of tick 0 in the log table.
    pub start_time: NaiveDateTime,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            zone: "SUR".to_string(),
            horizon: Horizon::Volume { m3: 30.0 },
            q_proc_m3h: 6.0,
            ts_in: 0.05,
            ts_cake: 0.25,
            eta_captura: 0.97,
            costs: CostRates::default(),
            truck_speed_kmh: 60.0,
            step_min: 10,
            seed: 123,
            density: DEFAULT_DENSITY,
            start_time: default_start_time(),
        }
    }
}

/// 2025-10-01 08:00, start of the reference campaign.
pub fn default_start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap_or_default()
}

impl ScenarioConfig {
    /// A volume-driven scenario with default process parameters.
    pub fn with_volume(zone: &str, volume_m3: f64) -> Self {
        Self {
            zone: zone.to_string(),
            horizon: Horizon::Volume { m3: volume_m3 },
            ..Self::default()
        }
    }

    /// A fixed-days scenario priced with [`CostRates::DAYS_TARIFF`].
    pub fn with_days(zone: &str, days: u32) -> Self {
        Self {
            zone: zone.to_string(),
            horizon: Horizon::Days { days },
            costs: CostRates::DAYS_TARIFF,
            ..Self::default()
        }
    }

    /// Feed volume the run must process (m³).
    pub fn target_volume_m3(&self) -> f64 {
        self.horizon.target_volume_m3(self.q_proc_m3h)
    }

    /// Length of one tick in hours.
    pub fn step_hours(&self) -> f64 {
        self.step_min as f64 / 60.0
    }

    /// Check every scalar before any simulation state is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("TS_cake", self.ts_cake)?;
        check_cake_solids(self.ts_cake)?;
        check_fraction("TS_cake", self.ts_cake)?;
        check_fraction("TS_in", self.ts_in)?;
        check_fraction("eta_captura", self.eta_captura)?;
        if self.step_min <= 0 {
            return Err(ConfigError::NonPositiveStep(self.step_min));
        }
        check_non_negative("Q_proc_m3h", self.q_proc_m3h)?;
        check_non_negative("target volume", self.target_volume_m3())?;
        check_finite("truck_speed_kmh", self.truck_speed_kmh)?;
        if self.truck_speed_kmh <= 0.0 {
            return Err(ConfigError::NonPositiveSpeed(self.truck_speed_kmh));
        }
        check_non_negative("density", self.density)?;
        self.costs.validate()?;

        // Worst case for the press: all feed solids captured.
        let volume = self.target_volume_m3();
        for (field, value) in [
            ("Q_proc_m3h", self.q_proc_m3h),
            ("target volume", volume),
            ("cake rate (t/h)", self.q_proc_m3h * self.density / self.ts_cake),
            ("expected cake (t)", volume * self.density / self.ts_cake),
        ] {
            check_in_range(field, value)?;
        }
        Ok(())
    }
}

fn check_in_range(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > MAX_FIXED_MAGNITUDE {
        Err(ConfigError::OutOfRange {
            field,
            value,
            max: MAX_FIXED_MAGNITUDE,
        })
    } else {
        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value < 0.0 {
        Err(ConfigError::Negative { field, value })
    } else {
        Ok(())
    }
}
