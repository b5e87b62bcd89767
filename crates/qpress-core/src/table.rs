//! Per-tick output tables handed to the reporting layer.

use crate::fixed::Ticks;
use crate::id::CenterId;
use chrono::NaiveDateTime;
use serde::Serialize;

/// One snapshot of the run, taken after both trucks have moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub timestamp: NaiveDateTime,
    pub tick: Ticks,
    pub plant_state: &'static str,
    /// Center the press truck is at or driving to.
    pub plant_center: CenterId,
    pub plant_km: f64,
    pub dist_state: &'static str,
    pub dist_target: Option<CenterId>,
    pub dist_km: f64,
    pub dist_trips: u32,
    pub energy_kwh: f64,
    pub remaining_m3: f64,
    /// Cake on the distribution truck.
    pub payload_t: f64,
    pub total_stock_t: f64,
    /// Bin levels in route order.
    pub stock_t: Vec<f64>,
}

/// Time-ordered log of a run. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogTable {
    centers: Vec<String>,
    rows: Vec<LogRow>,
}

impl LogTable {
    pub fn new(centers: Vec<String>) -> Self {
        Self {
            centers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: LogRow) {
        debug_assert!(self.rows.last().is_none_or(|last| last.tick < row.tick));
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&LogRow> {
        self.rows.last()
    }

    /// Center names, in the same order as [`LogRow::stock_t`].
    pub fn centers(&self) -> &[String] {
        &self.centers
    }

    pub fn center_name(&self, id: CenterId) -> Option<&str> {
        self.centers.get(id.index()).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Stock table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRow {
    pub timestamp: NaiveDateTime,
    pub stock_t: Vec<f64>,
}

/// Per-center bin levels over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockTable {
    centers: Vec<String>,
    rows: Vec<StockRow>,
}

impl StockTable {
    /// Project the timestamp and stock columns out of a log.
    pub fn from_log(log: &LogTable) -> Self {
        Self {
            centers: log.centers.clone(),
            rows: log
                .rows
                .iter()
                .map(|r| StockRow {
                    timestamp: r.timestamp,
                    stock_t: r.stock_t.clone(),
                })
                .collect(),
        }
    }

    pub fn centers(&self) -> &[String] {
        &self.centers
    }

    pub fn rows(&self) -> &[StockRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One center's level at every tick.
    pub fn series(&self, id: CenterId) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.stock_t.get(id.index()).copied())
            .collect()
    }
}
