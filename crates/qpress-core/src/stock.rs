//! Per-center cake bins shared by the press truck and the distribution truck.

use crate::fixed::{f64_to_fixed64, non_negative, Fixed64};
use crate::id::CenterId;
use crate::press::BIN_FULL_FRACTION;
use crate::topology::Center;
use serde::{Deserialize, Serialize};

/// One center's bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    /// Current fill level (t). Always within `[0, capacity]`.
    pub level: Fixed64,
    pub capacity: Fixed64,
    /// Cumulative cake ever accepted into this bin.
    pub received: Fixed64,
    /// Cumulative cake ever taken out by the distribution truck.
    pub collected: Fixed64,
}

/// Fill levels of every bin in a zone, indexed by [`CenterId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedger {
    bins: Vec<Bin>,
    full_fraction: Fixed64,
}

impl StockLedger {
    /// Empty bins sized from the zone's centers.
    pub fn new(centers: &[Center]) -> Self {
        Self {
            bins: centers
                .iter()
                .map(|c| Bin {
                    level: Fixed64::ZERO,
                    capacity: f64_to_fixed64(c.batea_capacity_t),
                    received: Fixed64::ZERO,
                    collected: Fixed64::ZERO,
                })
                .collect(),
            full_fraction: f64_to_fixed64(BIN_FULL_FRACTION),
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bin(&self, id: CenterId) -> &Bin {
        &self.bins[id.index()]
    }

    pub fn level(&self, id: CenterId) -> Fixed64 {
        self.bins[id.index()].level
    }

    pub fn free(&self, id: CenterId) -> Fixed64 {
        let bin = &self.bins[id.index()];
        non_negative(bin.capacity - bin.level)
    }

    /// Add cake up to the free capacity. Returns the amount accepted; the
    /// remainder is discarded by the caller.
    #[must_use = "the accepted amount may be less than offered"]
    pub fn deposit(&mut self, id: CenterId, amount: Fixed64) -> Fixed64 {
        let accepted = non_negative(amount).min(self.free(id));
        let bin = &mut self.bins[id.index()];
        bin.level += accepted;
        bin.received += accepted;
        accepted
    }

    /// Empty a bin. Returns what it held.
    pub fn take_all(&mut self, id: CenterId) -> Fixed64 {
        let bin = &mut self.bins[id.index()];
        let taken = bin.level;
        bin.level = Fixed64::ZERO;
        bin.collected += taken;
        taken
    }

    /// Whether the bin has reached the fraction that ends a press visit.
    pub fn is_nearly_full(&self, id: CenterId) -> bool {
        let bin = &self.bins[id.index()];
        bin.level >= bin.capacity * self.full_fraction
    }

    /// First bin in route order holding at least `min` tonnes.
    pub fn first_at_least(&self, min: Fixed64) -> Option<CenterId> {
        self.bins
            .iter()
            .position(|b| b.level >= min)
            .map(|i| CenterId(i as u32))
    }

    pub fn total(&self) -> Fixed64 {
        self.bins.iter().map(|b| b.level).sum()
    }

    pub fn total_received(&self) -> Fixed64 {
        self.bins.iter().map(|b| b.received).sum()
    }

    pub fn all_below(&self, threshold: Fixed64) -> bool {
        self.bins.iter().all(|b| b.level < threshold)
    }

    /// Fill levels in route order.
    pub fn levels(&self) -> impl Iterator<Item = Fixed64> + '_ {
        self.bins.iter().map(|b| b.level)
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }
}
