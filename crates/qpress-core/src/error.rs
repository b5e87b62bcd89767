//! Error and warning types shared by the topology registry, scenario
//! validation, and the simulation driver.

use serde::{Deserialize, Serialize};

/// Fatal configuration problems. Raised before the first tick; a run that
/// returns one of these never allocated simulation state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The zone key has no registry entry.
    #[error("unknown zone '{0}'")]
    UnknownZone(String),

    /// A zone with this key was registered twice.
    #[error("zone '{0}' is already registered")]
    DuplicateZone(String),

    /// A zone was registered without any route segments.
    #[error("zone '{0}' has an empty route")]
    EmptyRoute(String),

    /// Cake solids fraction must be strictly positive.
    #[error("cake solids fraction must be > 0, got {0}")]
    NonPositiveCakeSolids(f64),

    /// Cake solids fraction below the smallest value the fixed-point press
    /// model can divide by.
    #[error("cake solids fraction must be >= {min}, got {value}")]
    CakeSolidsTooLow { value: f64, min: f64 },

    /// A scenario whose flows or masses would not fit the fixed-point range.
    #[error("{field} is {value}, above the supported maximum {max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        max: f64,
    },

    /// Truck speed must be strictly positive.
    #[error("truck speed must be > 0 km/h, got {0}")]
    NonPositiveSpeed(f64),

    /// A center bin must be able to hold something.
    #[error("center '{center}' has non-positive bin capacity {capacity}")]
    NonPositiveCapacity { center: String, capacity: f64 },

    /// The time step must be at least one minute.
    #[error("time step must be > 0 minutes, got {0}")]
    NonPositiveStep(i64),

    /// A mass fraction (solids, efficiency) outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    FractionOutOfRange { field: &'static str, value: f64 },

    /// A quantity that cannot be negative (volume, flow, cost rate, km).
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// A non-finite number (NaN or infinity) in the input.
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    /// Two centers in the same zone share a name.
    #[error("duplicate center '{center}' in zone '{zone}'")]
    DuplicateCenter { zone: String, center: String },

    /// The center list does not line up with the route destinations.
    #[error("zone '{zone}': center #{position} is '{center}' but segment ends at '{segment_to}'")]
    CenterRouteMismatch {
        zone: String,
        position: usize,
        center: String,
        segment_to: String,
    },

    /// Different number of centers and route segments.
    #[error("zone '{zone}' has {segments} segments but {centers} centers")]
    CenterCountMismatch {
        zone: String,
        segments: usize,
        centers: usize,
    },
}

/// Non-fatal degenerate inputs. The run proceeds under a documented fallback
/// and reports these alongside its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DegenerateInput {
    /// All centers declare zero demand; target shares fall back to an equal split.
    ZeroTotalDemand,
    /// Nominal feed flow is zero; the step bound uses an epsilon-guarded division.
    ZeroNominalFlow,
    /// The press cannot push any flow into this center and skipped it.
    ZeroThroughputCenter { center: String },
}
