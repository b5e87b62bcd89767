//! The press truck: drives the route, sets up at each center, and runs the
//! press into that center's bin until the visit target or the bin fills.
//!
//! Lifecycle: `Drive -> Setup -> Run -> Drive(next) -> ... -> Idle`.
//! `Idle` is terminal.

use crate::fixed::{f64_to_fixed64, Fixed64, Minutes};
use crate::id::{CenterId, SegmentId};
use crate::press::{PressModel, KWH_PER_T_SOLIDS};
use crate::stock::StockLedger;
use crate::topology::{Center, Leg};
use serde::{Deserialize, Serialize};

/// Warm-up time after arriving at a center.
pub const SETUP_MINUTES: Minutes = 10;

/// Produced cake below this is treated as nothing when apportioning energy.
const CAKE_EPS: Fixed64 = Fixed64::from_bits(4);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Why the press truck stopped for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdleReason {
    /// The campaign's feed volume has been processed.
    VolumeDepleted,
    /// No remaining center can supply any feed flow.
    NoThroughput,
}

/// Press truck state. Exactly one is active at any tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlantState {
    Drive { remaining: Minutes },
    Setup { remaining: Minutes },
    Run,
    Idle { reason: IdleReason },
}

impl PlantState {
    pub fn label(&self) -> &'static str {
        match self {
            PlantState::Drive { .. } => "DRIVE",
            PlantState::Setup { .. } => "SETUP",
            PlantState::Run => "RUN",
            PlantState::Idle { .. } => "IDLE",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PlantState::Idle { .. })
    }
}

/// A state change worth reporting to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantEvent {
    Arrived { center: CenterId },
    Running { center: CenterId },
    Departed { from: CenterId, to: CenterId },
    /// The center accepts no flow; the press moved on without running.
    Skipped { center: CenterId },
    Idled { reason: IdleReason },
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Per-center values the press needs, converted once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CenterParams {
    pub ts_in: Fixed64,
    /// Feed flow the center can supply (m³/h).
    pub flow_cap: Fixed64,
    /// Per-visit production that ends the visit.
    pub threshold: Fixed64,
}

/// Run-wide press truck parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantParams {
    pub press: PressModel,
    pub nominal_flow: Fixed64,
    pub step_min: Minutes,
    pub kwh_per_t_solids: Fixed64,
    pub legs: Vec<Leg>,
    pub centers: Vec<CenterParams>,
}

impl PlantParams {
    pub fn new(
        press: PressModel,
        nominal_flow_m3h: f64,
        step_min: Minutes,
        legs: Vec<Leg>,
        centers: &[Center],
        thresholds: &[Fixed64],
    ) -> Self {
        let centers = centers
            .iter()
            .zip(thresholds)
            .map(|(c, &threshold)| CenterParams {
                ts_in: f64_to_fixed64(c.ts_in),
                flow_cap: f64_to_fixed64(c.m3_demand),
                threshold,
            })
            .collect();
        Self {
            press,
            nominal_flow: f64_to_fixed64(nominal_flow_m3h),
            step_min,
            kwh_per_t_solids: f64_to_fixed64(KWH_PER_T_SOLIDS),
            legs,
            centers,
        }
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Running totals for the press truck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantTotals {
    pub hours_run: Fixed64,
    pub energy_kwh: Fixed64,
    /// Dry solids that made it into a bin.
    pub solids_t: Fixed64,
    /// Cake that made it into a bin.
    pub cake_t: Fixed64,
    /// Cake produced but discarded because the bin was full.
    pub discarded_cake_t: Fixed64,
    pub km: Fixed64,
    pub processed_m3: Fixed64,
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// The press truck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    state: PlantState,
    segment: SegmentId,
    /// Cake deposited during the current visit.
    visit_cake_t: Fixed64,
    remaining_m3: Fixed64,
    totals: PlantTotals,
}

impl Plant {
    /// Start driving the first segment with the whole feed volume pending.
    pub fn new(params: &PlantParams, volume_m3: f64) -> Self {
        let first = params.legs.first().copied().unwrap_or(Leg {
            minutes: 0,
            km: Fixed64::ZERO,
        });
        Self {
            state: PlantState::Drive {
                remaining: first.minutes,
            },
            segment: SegmentId(0),
            visit_cake_t: Fixed64::ZERO,
            remaining_m3: f64_to_fixed64(volume_m3),
            totals: PlantTotals {
                km: first.km,
                ..PlantTotals::default()
            },
        }
    }

    pub fn state(&self) -> PlantState {
        self.state
    }

    /// The center the truck is at or driving to.
    pub fn center(&self) -> CenterId {
        CenterId(self.segment.0)
    }

    pub fn remaining_m3(&self) -> Fixed64 {
        self.remaining_m3
    }

    pub fn visit_cake_t(&self) -> Fixed64 {
        self.visit_cake_t
    }

    pub fn totals(&self) -> &PlantTotals {
        &self.totals
    }

    /// Advance one tick.
    pub fn step(&mut self, params: &PlantParams, stock: &mut StockLedger) -> Option<PlantEvent> {
        match self.state {
            PlantState::Drive { remaining } => {
                let remaining = remaining - params.step_min;
                if remaining <= 0 {
                    self.state = PlantState::Setup {
                        remaining: SETUP_MINUTES,
                    };
                    Some(PlantEvent::Arrived {
                        center: self.center(),
                    })
                } else {
                    self.state = PlantState::Drive { remaining };
                    None
                }
            }
            PlantState::Setup { remaining } => {
                let remaining = remaining - params.step_min;
                if remaining <= 0 {
                    self.state = PlantState::Run;
                    Some(PlantEvent::Running {
                        center: self.center(),
                    })
                } else {
                    self.state = PlantState::Setup { remaining };
                    None
                }
            }
            PlantState::Run => self.run(params, stock),
            PlantState::Idle { .. } => None,
        }
    }

    /// One production tick at the current center.
    ///
    /// The press moves on once the visit threshold is met or the bin is
    /// nearly full, but only while feed remains. A tick that both meets the
    /// threshold and empties the feed leaves the press where it is, so it
    /// idles at the last center it worked and no further leg is driven.
    fn run(&mut self, params: &PlantParams, stock: &mut StockLedger) -> Option<PlantEvent> {
        if self.remaining_m3 <= Fixed64::ZERO {
            return Some(self.idle(IdleReason::VolumeDepleted));
        }

        let center = self.center();
        let cp = params.centers[center.index()];
        let flow = params.nominal_flow.min(cp.flow_cap);
        if flow <= Fixed64::ZERO {
            return Some(match self.advance(params) {
                Some(_) => PlantEvent::Skipped { center },
                None => self.idle(IdleReason::NoThroughput),
            });
        }

        let step_hours = params.press.step_hours();
        let volume = (flow * step_hours).min(self.remaining_m3);
        self.remaining_m3 -= volume;
        let effective_flow = volume / step_hours;

        let out = params.press.step(effective_flow, cp.ts_in);
        let added = stock.deposit(center, out.cake_t);
        let fit = if out.cake_t > CAKE_EPS {
            added / out.cake_t
        } else {
            Fixed64::ZERO
        };
        let solids = out.solids_t * fit;

        self.totals.processed_m3 += volume;
        self.totals.cake_t += added;
        self.totals.discarded_cake_t += out.cake_t - added;
        self.totals.solids_t += solids;
        self.totals.energy_kwh += params.kwh_per_t_solids * solids;
        self.totals.hours_run += step_hours;
        self.visit_cake_t += added;

        let visit_done = self.visit_cake_t >= cp.threshold || stock.is_nearly_full(center);
        if visit_done && self.remaining_m3 > Fixed64::ZERO {
            return self
                .advance(params)
                .map(|to| PlantEvent::Departed { from: center, to });
        }
        None
    }

    /// Drive to the next center if there is one.
    fn advance(&mut self, params: &PlantParams) -> Option<CenterId> {
        let next = self.segment.index() + 1;
        let leg = params.legs.get(next)?;
        self.segment = SegmentId(next as u32);
        self.state = PlantState::Drive {
            remaining: leg.minutes,
        };
        self.totals.km += leg.km;
        self.visit_cake_t = Fixed64::ZERO;
        Some(self.center())
    }

    fn idle(&mut self, reason: IdleReason) -> PlantEvent {
        self.state = PlantState::Idle { reason };
        PlantEvent::Idled { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::fixed64_to_f64;

    fn t(v: f64) -> Fixed64 {
        f64_to_fixed64(v)
    }

    fn centers(capacity: f64) -> Vec<Center> {
        vec![
            Center::new("A", 0.05, 6.0, capacity),
            Center::new("B", 0.05, 6.0, capacity),
        ]
    }

    fn params(centers: &[Center], threshold: f64) -> PlantParams {
        let press = PressModel::new(0.25, 0.97, 1.0, 10).unwrap();
        let legs = vec![
            Leg { minutes: 20, km: t(20.0) },
            Leg { minutes: 10, km: t(10.0) },
        ];
        PlantParams::new(press, 6.0, 10, legs, centers, &[t(threshold), t(threshold)])
    }

    /// Step until the plant is running at its current center.
    fn step_until_run(plant: &mut Plant, p: &PlantParams, stock: &mut StockLedger) -> usize {
        let mut ticks = 0;
        while plant.state() != PlantState::Run {
            plant.step(p, stock);
            ticks += 1;
            assert!(ticks < 100, "plant never reached RUN");
        }
        ticks
    }

    #[test]
    fn drive_then_setup_then_run() {
        let cs = centers(15.0);
        let p = params(&cs, 5.0);
        let mut stock = StockLedger::new(&cs);
        let mut plant = Plant::new(&p, 30.0);
        assert_eq!(plant.totals().km, t(20.0));

        assert_eq!(plant.step(&p, &mut stock), None);
        assert_eq!(plant.state(), PlantState::Drive { remaining: 10 });
        assert_eq!(
            plant.step(&p, &mut stock),
            Some(PlantEvent::Arrived { center: CenterId(0) })
        );
        assert_eq!(plant.state(), PlantState::Setup { remaining: SETUP_MINUTES });
        assert_eq!(
            plant.step(&p, &mut stock),
            Some(PlantEvent::Running { center: CenterId(0) })
        );
        assert_eq!(plant.state().label(), "RUN");
    }

    #[test]
    fn run_produces_into_current_bin() {
        let cs = centers(15.0);
        let p = params(&cs, 5.0);
        let mut stock = StockLedger::new(&cs);
        let mut plant = Plant::new(&p, 30.0);
        step_until_run(&mut plant, &p, &mut stock);

        plant.step(&p, &mut stock);
        let cake = fixed64_to_f64(stock.level(CenterId(0)));
        assert!((cake - 0.194).abs() < 1e-6, "got {cake}");
        assert!((fixed64_to_f64(plant.remaining_m3()) - 29.0).abs() < 1e-6);
        assert_eq!(plant.totals().cake_t, stock.level(CenterId(0)));
        let kwh = fixed64_to_f64(plant.totals().energy_kwh);
        assert!((kwh - 8.0 * 0.0485).abs() < 1e-6, "got {kwh}");
    }

    #[test]
    fn advances_when_visit_target_met() {
        let cs = centers(15.0);
        let p = params(&cs, 1.0);
        let mut stock = StockLedger::new(&cs);
        let mut plant = Plant::new(&p, 30.0);
        step_until_run(&mut plant, &p, &mut stock);

        let mut event = None;
        for _ in 0..10 {
            event = plant.step(&p, &mut stock);
            if event.is_some() {
                break;
            }
        }
        assert_eq!(
            event,
            Some(PlantEvent::Departed {
                from: CenterId(0),
                to: CenterId(1)
            })
        );
        // 0.194 t per tick: six ticks reach 1.0 t.
        assert!(stock.level(CenterId(0)) >= t(1.0));
        assert_eq!(plant.center(), CenterId(1));
        assert_eq!(plant.totals().km, t(30.0));
        assert_eq!(plant.visit_cake_t(), Fixed64::ZERO);
    }

    #[test]
    fn full_bin_discards_excess_and_advances() {
        let cs = centers(0.1);
        let p = params(&cs, 5.0);
        let mut stock = StockLedger::new(&cs);
        let mut plant = Plant::new(&p, 30.0);
        step_until_run(&mut plant, &p, &mut stock);

        let event = plant.step(&p, &mut stock);
        assert_eq!(stock.level(CenterId(0)), t(0.1));
        assert_eq!(plant.totals().cake_t, t(0.1));
        assert!(plant.totals().discarded_cake_t > Fixed64::ZERO);
        assert!(matches!(event, Some(PlantEvent::Departed { .. })));
    }

    #[test]
    fn final_center_runs_until_volume_depleted() {
        let cs = centers(15.0);
        let p = params(&cs, 1.0);
        let mut stock = StockLedger::new(&cs);
        let mut plant = Plant::new(&p, 12.0);

        let mut ticks = 0;
        while !plant.state().is_idle() {
            plant.step(&p, &mut stock);
            ticks += 1;
            assert!(ticks < 500);
        }
        assert_eq!(
            plant.state(),
            PlantState::Idle {
                reason: IdleReason::VolumeDepleted
            }
        );
        assert_eq!(plant.remaining_m3(), Fixed64::ZERO);
        assert_eq!(plant.totals().processed_m3, t(12.0));
        assert_eq!(plant.totals().cake_t, stock.total_received());
    }

    #[test]
    fn stays_put_when_feed_runs_out_on_the_visit_threshold() {
        let cs = centers(15.0);
        let p = params(&cs, 1.0);
        let mut stock = StockLedger::new(&cs);
        // Five full ticks (0.97 t) then half a tick (1.067 t) empties the feed.
        let mut plant = Plant::new(&p, 5.5);
        step_until_run(&mut plant, &p, &mut stock);

        for _ in 0..6 {
            assert_eq!(plant.step(&p, &mut stock), None);
        }
        assert_eq!(plant.remaining_m3(), Fixed64::ZERO);
        assert!(plant.visit_cake_t() >= t(1.0));
        assert_eq!(plant.state(), PlantState::Run);

        assert_eq!(
            plant.step(&p, &mut stock),
            Some(PlantEvent::Idled {
                reason: IdleReason::VolumeDepleted
            })
        );
        assert_eq!(plant.center(), CenterId(0));
        assert_eq!(plant.totals().km, t(20.0));
    }

    #[test]
    fn idle_is_terminal() {
        let cs = centers(15.0);
        let p = params(&cs, 1.0);
        let mut stock = StockLedger::new(&cs);
        let mut plant = Plant::new(&p, 0.0);
        step_until_run(&mut plant, &p, &mut stock);
        assert_eq!(
            plant.step(&p, &mut stock),
            Some(PlantEvent::Idled {
                reason: IdleReason::VolumeDepleted
            })
        );
        let before = plant.clone();
        assert_eq!(plant.step(&p, &mut stock), None);
        assert_eq!(plant, before);
    }

    #[test]
    fn zero_flow_centers_are_skipped_then_idle() {
        let cs = vec![
            Center::new("A", 0.05, 0.0, 15.0),
            Center::new("B", 0.05, 0.0, 15.0),
        ];
        let p = params(&cs, 1.0);
        let mut stock = StockLedger::new(&cs);
        let mut plant = Plant::new(&p, 30.0);
        step_until_run(&mut plant, &p, &mut stock);
        assert_eq!(
            plant.step(&p, &mut stock),
            Some(PlantEvent::Skipped { center: CenterId(0) })
        );
        step_until_run(&mut plant, &p, &mut stock);
        assert_eq!(
            plant.step(&p, &mut stock),
            Some(PlantEvent::Idled {
                reason: IdleReason::NoThroughput
            })
        );
        assert_eq!(stock.total(), Fixed64::ZERO);
    }
}
