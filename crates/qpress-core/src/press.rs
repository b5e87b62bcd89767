//! Dewatering press model: per-step mass balance and the route-proportional
//! production targets that decide when the press moves on.

use crate::error::ConfigError;
use crate::fixed::{f64_to_fixed64, Fixed64, Minutes};
use crate::topology::Center;

/// Press energy use per tonne of dry solids captured.
pub const KWH_PER_T_SOLIDS: f64 = 8.0;

/// A visit ends once the bin reaches this fraction of its capacity.
pub const BIN_FULL_FRACTION: f64 = 0.95;

/// Overshoot allowed on a center's target share before the press moves on.
pub const TARGET_OVERSHOOT: f64 = 1.05;

/// Smallest accepted cake solids fraction. Below this the Q32.32 divisor
/// loses its precision and eventually rounds to zero.
pub const MIN_TS_CAKE: f64 = 1e-6;

/// Largest flow, volume or mass a scenario may imply. Keeps every
/// accumulator well inside the Q32.32 range (about 2.1e9).
pub const MAX_FIXED_MAGNITUDE: f64 = 1e9;

/// Minimum per-visit production before the press moves on. Matches the
/// distribution truck's pickup minimum so every visit leaves a collectable load.
pub const ADVANCE_FLOOR_T: f64 = 1.0;

// ---------------------------------------------------------------------------
// Production step
// ---------------------------------------------------------------------------

/// Reject a cake solids fraction the press model cannot divide by.
pub fn check_cake_solids(ts_cake: f64) -> Result<(), ConfigError> {
    if ts_cake.is_nan() || ts_cake <= 0.0 {
        return Err(ConfigError::NonPositiveCakeSolids(ts_cake));
    }
    if ts_cake < MIN_TS_CAKE {
        return Err(ConfigError::CakeSolidsTooLow {
            value: ts_cake,
            min: MIN_TS_CAKE,
        });
    }
    Ok(())
}

/// Mass produced during one time step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressOutput {
    /// Dry solids captured (t).
    pub solids_t: Fixed64,
    /// Cake discharged (t), solids plus retained water.
    pub cake_t: Fixed64,
}

/// Press parameters fixed for a run, converted once to fixed-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressModel {
    ts_cake: Fixed64,
    eta: Fixed64,
    density: Fixed64,
    step_hours: Fixed64,
}

impl PressModel {
    pub fn new(
        ts_cake: f64,
        eta: f64,
        density: f64,
        step_min: Minutes,
    ) -> Result<Self, ConfigError> {
        check_cake_solids(ts_cake)?;
        if step_min <= 0 {
            return Err(ConfigError::NonPositiveStep(step_min));
        }
        Ok(Self {
            ts_cake: f64_to_fixed64(ts_cake),
            eta: f64_to_fixed64(eta),
            density: f64_to_fixed64(density),
            step_hours: Fixed64::saturating_from_num(step_min) / Fixed64::from_num(60),
        })
    }

    /// Length of one step in hours.
    pub fn step_hours(&self) -> Fixed64 {
        self.step_hours
    }

    /// Mass balance for one step at `flow_m3h` of feed with solids fraction `ts_in`.
    pub fn step(&self, flow_m3h: Fixed64, ts_in: Fixed64) -> PressOutput {
        let solids_in = flow_m3h * self.density * ts_in;
        let solids_rate = self.eta * solids_in;
        let cake_rate = solids_rate / self.ts_cake;
        PressOutput {
            solids_t: solids_rate * self.step_hours,
            cake_t: cake_rate * self.step_hours,
        }
    }
}

/// One-shot form of [`PressModel::step`].
pub fn press_step(
    flow_m3h: f64,
    ts_in: f64,
    ts_cake: f64,
    eta: f64,
    density: f64,
    step_min: Minutes,
) -> Result<PressOutput, ConfigError> {
    let model = PressModel::new(ts_cake, eta, density, step_min)?;
    Ok(model.step(f64_to_fixed64(flow_m3h), f64_to_fixed64(ts_in)))
}

// ---------------------------------------------------------------------------
// Target allocation
// ---------------------------------------------------------------------------

/// Per-center advance thresholds derived from the campaign's expected cake.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAllocation {
    /// Expected cake over the whole campaign (t).
    pub total_cake_t: f64,
    /// Each center's proportional share of `total_cake_t`, in route order.
    pub shares_t: Vec<f64>,
    /// Per-visit production at which the press moves on, in route order.
    pub thresholds: Vec<Fixed64>,
    /// True when every center had zero demand and shares were split equally.
    pub equal_split: bool,
}

/// Split the expected campaign cake across centers in proportion to demand.
pub fn allocate_targets(
    volume_m3: f64,
    density: f64,
    ts_in: f64,
    eta: f64,
    ts_cake: f64,
    centers: &[Center],
) -> Result<TargetAllocation, ConfigError> {
    check_cake_solids(ts_cake)?;
    let total_cake_t = volume_m3 * density * ts_in * eta / ts_cake;
    let total_demand: f64 = centers.iter().map(|c| c.m3_demand).sum();
    let equal_split = total_demand <= 0.0;

    let shares_t: Vec<f64> = centers
        .iter()
        .map(|c| {
            if equal_split {
                total_cake_t / centers.len() as f64
            } else {
                total_cake_t * c.m3_demand / total_demand
            }
        })
        .collect();

    let thresholds = centers
        .iter()
        .zip(&shares_t)
        .map(|(c, share)| {
            let t = (BIN_FULL_FRACTION * c.batea_capacity_t)
                .min(TARGET_OVERSHOOT * share)
                .max(ADVANCE_FLOOR_T);
            f64_to_fixed64(t)
        })
        .collect();

    Ok(TargetAllocation {
        total_cake_t,
        shares_t,
        thresholds,
        equal_split,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::fixed64_to_f64;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn press_step_reference_values() {
        // 6 m³/h, 5% solids, 97% capture, 25% cake, 10 min step.
        let out = press_step(6.0, 0.05, 0.25, 0.97, 1.0, 10).unwrap();
        assert!(approx(fixed64_to_f64(out.solids_t), 0.0485));
        assert!(approx(fixed64_to_f64(out.cake_t), 0.194));
    }

    #[test]
    fn cake_is_solids_over_cake_fraction() {
        let out = press_step(5.0, 0.04, 0.2, 0.9, 1.0, 30).unwrap();
        let solids = fixed64_to_f64(out.solids_t);
        let cake = fixed64_to_f64(out.cake_t);
        assert!(approx(cake, solids / 0.2));
    }

    #[test]
    fn zero_flow_produces_nothing() {
        let out = press_step(0.0, 0.05, 0.25, 0.97, 1.0, 10).unwrap();
        assert_eq!(out, PressOutput::default());
    }

    #[test]
    fn zero_cake_fraction_is_config_error() {
        assert_eq!(
            press_step(6.0, 0.05, 0.0, 0.97, 1.0, 10),
            Err(ConfigError::NonPositiveCakeSolids(0.0))
        );
    }

    #[test]
    fn cake_fraction_below_fixed_resolution_is_config_error() {
        // 1e-10 rounds to zero in Q32.32.
        assert_eq!(f64_to_fixed64(1e-10), Fixed64::ZERO);
        assert!(matches!(
            PressModel::new(1e-10, 0.97, 1.0, 10),
            Err(ConfigError::CakeSolidsTooLow { .. })
        ));
        assert!(PressModel::new(MIN_TS_CAKE, 0.97, 1.0, 10).is_ok());
    }

    #[test]
    fn density_override_scales_output() {
        let water = press_step(6.0, 0.05, 0.25, 0.97, 1.0, 60).unwrap();
        let heavy = press_step(6.0, 0.05, 0.25, 0.97, 1.2, 60).unwrap();
        assert!(approx(
            fixed64_to_f64(heavy.cake_t),
            1.2 * fixed64_to_f64(water.cake_t)
        ));
    }

    #[test]
    fn allocation_proportional_to_demand() {
        let centers = vec![
            Center::new("A", 0.05, 6.0, 15.0),
            Center::new("B", 0.05, 4.0, 15.0),
        ];
        let alloc = allocate_targets(100.0, 1.0, 0.05, 1.0, 0.25, &centers).unwrap();
        assert!(approx(alloc.total_cake_t, 20.0));
        assert!(approx(alloc.shares_t[0], 12.0));
        assert!(approx(alloc.shares_t[1], 8.0));
        // min(0.95 * 15, 1.05 * share)
        assert!(approx(fixed64_to_f64(alloc.thresholds[0]), 12.6));
        assert!(approx(fixed64_to_f64(alloc.thresholds[1]), 8.4));
        assert!(!alloc.equal_split);
    }

    #[test]
    fn allocation_capped_by_bin_capacity() {
        let centers = vec![Center::new("A", 0.05, 1.0, 10.0)];
        let alloc = allocate_targets(1000.0, 1.0, 0.05, 1.0, 0.25, &centers).unwrap();
        assert!(approx(fixed64_to_f64(alloc.thresholds[0]), 9.5));
    }

    #[test]
    fn zero_demand_splits_equally() {
        let centers = vec![
            Center::new("A", 0.05, 0.0, 15.0),
            Center::new("B", 0.05, 0.0, 15.0),
        ];
        let alloc = allocate_targets(100.0, 1.0, 0.05, 1.0, 0.25, &centers).unwrap();
        assert!(alloc.equal_split);
        assert!(approx(alloc.shares_t[0], 10.0));
        assert!(approx(alloc.shares_t[1], 10.0));
    }

    #[test]
    fn small_campaign_threshold_is_floored() {
        let centers = vec![Center::new("A", 0.05, 5.0, 15.0)];
        let alloc = allocate_targets(1.0, 1.0, 0.05, 0.97, 0.25, &centers).unwrap();
        assert_eq!(alloc.thresholds[0], f64_to_fixed64(ADVANCE_FLOOR_T));
    }
}
