//! Tick bookkeeping, run outcome and state hash.

use crate::fixed::{Fixed64, Minutes, Ticks};
use serde::{Deserialize, Serialize};

/// Slack added to the nominal processing time when bounding a run.
pub const SAFETY_BUFFER_MINUTES: Minutes = 72 * 60;

/// Bins below this level count as empty for termination.
pub const STOCK_EPS_T: f64 = 1e-6;

/// Divisor floor for the nominal flow when bounding a run.
const MIN_FLOW_M3H: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Tick counter and the hard bound on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    /// Ticks executed so far. Incremented by 1 for each step.
    pub tick: Ticks,
    /// The run stops once `tick` reaches this, finished or not.
    pub max_steps: Ticks,
}

impl SimState {
    pub fn new(max_steps: Ticks) -> Self {
        Self { tick: 0, max_steps }
    }

    /// Minutes since the run started.
    pub fn elapsed_minutes(&self, step_min: Minutes) -> Minutes {
        (self.tick as Minutes).saturating_mul(step_min)
    }

    pub fn bound_reached(&self) -> bool {
        self.tick >= self.max_steps
    }
}

/// Hard step bound: nominal processing time, plus a 72 hour buffer, plus
/// one full route traversal, in ticks.
pub fn max_steps(
    volume_m3: f64,
    nominal_flow_m3h: f64,
    total_route_minutes: Minutes,
    step_min: Minutes,
) -> Ticks {
    let processing_min = volume_m3 / nominal_flow_m3h.max(MIN_FLOW_M3H) * 60.0;
    let total = processing_min + SAFETY_BUFFER_MINUTES as f64 + total_route_minutes as f64;
    // `as` saturates, so an absurd bound clamps instead of wrapping.
    (total / step_min.max(1) as f64).floor() as Ticks
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Feed processed, both trucks idle, every bin empty.
    Completed,
    /// The press stopped without exhausting the feed because no remaining
    /// center supplies any flow. Bins were still emptied.
    Stalled,
    /// The step bound was hit before the run finished.
    TruncatedAtStepBound,
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "COMPLETED",
            RunOutcome::Stalled => "STALLED",
            RunOutcome::TruncatedAtStepBound => "TRUNCATED_AT_STEP_BOUND",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A deterministic hash of simulation state for comparing runs.
///
/// FNV-1a (64-bit). Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
