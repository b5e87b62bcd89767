//! The distribution truck: hauls cake from center bins back to the route
//! start, one bin per round trip.
//!
//! Lifecycle: `Idle -> DrivePick -> Load -> DriveDrop -> Unload -> Idle`.
//! The cycle never ends on its own; the driver decides when the run is over.

use crate::fixed::{f64_to_fixed64, Fixed64, Minutes};
use crate::id::CenterId;
use crate::stock::StockLedger;
use crate::topology::Trip;
use serde::{Deserialize, Serialize};

pub const LOAD_MINUTES: Minutes = 30;
pub const UNLOAD_MINUTES: Minutes = 30;

/// Smallest bin level worth a trip while the press is still producing.
pub const PICKUP_MIN_T: f64 = 1.0;

/// Smallest bin level collected once the press has stopped for good.
pub const SWEEP_MIN_T: f64 = 1e-6;

/// Distribution truck state. Exactly one is active at any tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionState {
    #[default]
    Idle,
    DrivePick { target: CenterId, remaining: Minutes },
    Load { target: CenterId, remaining: Minutes },
    DriveDrop { target: CenterId, remaining: Minutes },
    Unload { target: CenterId, remaining: Minutes },
}

impl DistributionState {
    pub fn label(&self) -> &'static str {
        match self {
            DistributionState::Idle => "IDLE",
            DistributionState::DrivePick { .. } => "DRIVE_PICK",
            DistributionState::Load { .. } => "LOAD",
            DistributionState::DriveDrop { .. } => "DRIVE_DROP",
            DistributionState::Unload { .. } => "UNLOAD",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DistributionState::Idle)
    }

    /// The center of the current round trip, if any.
    pub fn target(&self) -> Option<CenterId> {
        match *self {
            DistributionState::Idle => None,
            DistributionState::DrivePick { target, .. }
            | DistributionState::Load { target, .. }
            | DistributionState::DriveDrop { target, .. }
            | DistributionState::Unload { target, .. } => Some(target),
        }
    }
}

/// A state change worth reporting to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionEvent {
    Dispatched { target: CenterId },
    ArrivedAtCenter { target: CenterId },
    Loaded { target: CenterId, payload: Fixed64 },
    ArrivedAtBase { target: CenterId },
    Unloaded { payload: Fixed64 },
}

/// Running totals for the distribution truck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionTotals {
    pub km: Fixed64,
    pub ton_km: Fixed64,
    pub trips: u32,
    /// Cake unloaded at the route start.
    pub delivered_t: Fixed64,
}

/// The distribution truck.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    state: DistributionState,
    payload: Fixed64,
    totals: DistributionTotals,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DistributionState {
        self.state
    }

    /// Cake currently on the truck.
    pub fn payload(&self) -> Fixed64 {
        self.payload
    }

    pub fn totals(&self) -> &DistributionTotals {
        &self.totals
    }

    /// Advance one tick. While idle, dispatches to the first bin in route
    /// order holding at least `pickup_min` tonnes.
    pub fn step(
        &mut self,
        trips: &[Trip],
        step_min: Minutes,
        stock: &mut StockLedger,
        pickup_min: Fixed64,
    ) -> Option<DistributionEvent> {
        match self.state {
            DistributionState::Idle => {
                let target = stock.first_at_least(pickup_min)?;
                self.state = DistributionState::DrivePick {
                    target,
                    remaining: trips[target.index()].outbound_minutes,
                };
                Some(DistributionEvent::Dispatched { target })
            }
            DistributionState::DrivePick { target, remaining } => {
                let remaining = remaining - step_min;
                if remaining > 0 {
                    self.state = DistributionState::DrivePick { target, remaining };
                    return None;
                }
                self.totals.km += trips[target.index()].one_way_km;
                self.state = DistributionState::Load {
                    target,
                    remaining: LOAD_MINUTES,
                };
                Some(DistributionEvent::ArrivedAtCenter { target })
            }
            DistributionState::Load { target, remaining } => {
                let remaining = remaining - step_min;
                if remaining > 0 {
                    self.state = DistributionState::Load { target, remaining };
                    return None;
                }
                let trip = trips[target.index()];
                let payload = stock.take_all(target);
                self.payload = payload;
                self.totals.trips += 1;
                self.totals.ton_km += payload * trip.one_way_km;
                self.state = DistributionState::DriveDrop {
                    target,
                    remaining: trip.return_minutes,
                };
                Some(DistributionEvent::Loaded { target, payload })
            }
            DistributionState::DriveDrop { target, remaining } => {
                let remaining = remaining - step_min;
                if remaining > 0 {
                    self.state = DistributionState::DriveDrop { target, remaining };
                    return None;
                }
                self.totals.km += trips[target.index()].one_way_km;
                self.state = DistributionState::Unload {
                    target,
                    remaining: UNLOAD_MINUTES,
                };
                Some(DistributionEvent::ArrivedAtBase { target })
            }
            DistributionState::Unload { target, remaining } => {
                let remaining = remaining - step_min;
                if remaining > 0 {
                    self.state = DistributionState::Unload { target, remaining };
                    return None;
                }
                let payload = self.payload;
                self.totals.delivered_t += payload;
                self.payload = Fixed64::ZERO;
                self.state = DistributionState::Idle;
                Some(DistributionEvent::Unloaded { payload })
            }
        }
    }
}

/// Pickup threshold for the current phase of the campaign.
pub fn pickup_threshold(press_idle: bool) -> Fixed64 {
    if press_idle {
        f64_to_fixed64(SWEEP_MIN_T)
    } else {
        f64_to_fixed64(PICKUP_MIN_T)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Center;

    fn t(v: f64) -> Fixed64 {
        f64_to_fixed64(v)
    }

    fn setup() -> (Vec<Trip>, StockLedger) {
        let trips = vec![
            Trip {
                one_way_km: t(60.0),
                outbound_minutes: 60,
                return_minutes: 60,
            },
            Trip {
                one_way_km: t(90.0),
                outbound_minutes: 75,
                return_minutes: 90,
            },
        ];
        let stock = StockLedger::new(&[
            Center::new("A", 0.05, 6.0, 15.0),
            Center::new("B", 0.05, 6.0, 15.0),
        ]);
        (trips, stock)
    }

    /// Step until an event fires, returning it and the ticks it took.
    fn next_event(
        d: &mut Distribution,
        trips: &[Trip],
        stock: &mut StockLedger,
    ) -> (DistributionEvent, usize) {
        for tick in 1..=100 {
            if let Some(e) = d.step(trips, 10, stock, t(PICKUP_MIN_T)) {
                return (e, tick);
            }
        }
        panic!("no event within 100 ticks");
    }

    #[test]
    fn stays_idle_below_pickup_minimum() {
        let (trips, mut stock) = setup();
        let _ = stock.deposit(CenterId(0), t(0.9));
        let mut d = Distribution::new();
        assert_eq!(d.step(&trips, 10, &mut stock, t(PICKUP_MIN_T)), None);
        assert!(d.state().is_idle());
    }

    #[test]
    fn picks_first_center_in_route_order() {
        let (trips, mut stock) = setup();
        let _ = stock.deposit(CenterId(0), t(1.0));
        let _ = stock.deposit(CenterId(1), t(9.0));
        let mut d = Distribution::new();
        assert_eq!(
            d.step(&trips, 10, &mut stock, t(PICKUP_MIN_T)),
            Some(DistributionEvent::Dispatched { target: CenterId(0) })
        );
        assert_eq!(d.state().target(), Some(CenterId(0)));
    }

    #[test]
    fn full_round_trip() {
        let (trips, mut stock) = setup();
        let _ = stock.deposit(CenterId(1), t(4.0));
        let mut d = Distribution::new();

        let (e, _) = next_event(&mut d, &trips, &mut stock);
        assert_eq!(e, DistributionEvent::Dispatched { target: CenterId(1) });
        assert_eq!(d.state().label(), "DRIVE_PICK");
        assert_eq!(d.totals().km, Fixed64::ZERO);

        // 75 minutes at 10 per tick: arrives on the 8th tick.
        let (e, ticks) = next_event(&mut d, &trips, &mut stock);
        assert_eq!(e, DistributionEvent::ArrivedAtCenter { target: CenterId(1) });
        assert_eq!(ticks, 8);
        assert_eq!(d.totals().km, t(90.0));

        // Cake added while loading is collected too.
        let _ = stock.deposit(CenterId(1), t(1.0));
        let (e, ticks) = next_event(&mut d, &trips, &mut stock);
        assert_eq!(ticks, 3);
        assert_eq!(
            e,
            DistributionEvent::Loaded {
                target: CenterId(1),
                payload: t(5.0)
            }
        );
        assert_eq!(stock.level(CenterId(1)), Fixed64::ZERO);
        assert_eq!(d.payload(), t(5.0));
        assert_eq!(d.totals().trips, 1);
        assert_eq!(d.totals().ton_km, t(450.0));

        let (e, ticks) = next_event(&mut d, &trips, &mut stock);
        assert_eq!(e, DistributionEvent::ArrivedAtBase { target: CenterId(1) });
        assert_eq!(ticks, 9);
        assert_eq!(d.totals().km, t(180.0));

        let (e, _) = next_event(&mut d, &trips, &mut stock);
        assert_eq!(e, DistributionEvent::Unloaded { payload: t(5.0) });
        assert!(d.state().is_idle());
        assert_eq!(d.payload(), Fixed64::ZERO);
        assert_eq!(d.totals().delivered_t, t(5.0));
    }

    #[test]
    fn sweep_threshold_collects_residue() {
        let (trips, mut stock) = setup();
        let _ = stock.deposit(CenterId(0), t(0.3));
        let mut d = Distribution::new();
        assert_eq!(d.step(&trips, 10, &mut stock, pickup_threshold(false)), None);
        assert_eq!(
            d.step(&trips, 10, &mut stock, pickup_threshold(true)),
            Some(DistributionEvent::Dispatched { target: CenterId(0) })
        );
    }
}
