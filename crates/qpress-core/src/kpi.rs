//! Cost and KPI aggregation, computed once after the loop exits.

use crate::config::CostRates;
use crate::fixed::Ticks;
use crate::sim::RunOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unrounded totals accumulated by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub zone: String,
    /// Feed volume the run was asked to process (m³).
    pub target_volume_m3: f64,
    /// Feed volume actually run through the press (m³).
    pub processed_m3: f64,
    pub hours_run: f64,
    pub cake_t: f64,
    pub solids_t: f64,
    /// Cake dropped because a bin was full.
    pub discarded_cake_t: f64,
    pub energy_kwh: f64,
    pub trips: u32,
    pub dist_km: f64,
    pub plant_km: f64,
    pub ton_km: f64,
    /// Cake unloaded at the route start.
    pub delivered_t: f64,
    pub final_stock_t: f64,
    pub ticks: Ticks,
    pub outcome: RunOutcome,
}

/// Cost per category in CLP, unrounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub energy: f64,
    pub transport: f64,
    pub dehydration: f64,
    pub total: f64,
}

impl CostBreakdown {
    pub fn compute(totals: &RunTotals, rates: &CostRates) -> Self {
        let energy = totals.energy_kwh * rates.energy_per_kwh;
        let transport =
            totals.dist_km * rates.transport_per_km + totals.ton_km * rates.transport_per_ton_km;
        let dehydration = totals.target_volume_m3 * rates.dehydration_per_m3;
        Self {
            energy,
            transport,
            dehydration,
            total: energy + transport + dehydration,
        }
    }
}

// ---------------------------------------------------------------------------
// KPI record
// ---------------------------------------------------------------------------

/// The field report's summary sheet, rounded the way the report shows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    #[serde(rename = "Ruta")]
    pub zone: String,
    #[serde(rename = "Volumen procesado (m3)")]
    pub processed_m3: f64,
    #[serde(rename = "Horas RUN planta")]
    pub hours_run: f64,
    #[serde(rename = "Torta producida (t)")]
    pub cake_t: f64,
    #[serde(rename = "tDR (t)")]
    pub solids_t: f64,
    #[serde(rename = "Energía (kWh)")]
    pub energy_kwh: f64,
    #[serde(rename = "Viajes distribución")]
    pub trips: u32,
    #[serde(rename = "Km distribución")]
    pub dist_km: f64,
    #[serde(rename = "Km planta")]
    pub plant_km: f64,
    #[serde(rename = "t·km")]
    pub ton_km: f64,
    #[serde(rename = "Costo energía (CLP)")]
    pub energy_cost: i64,
    #[serde(rename = "Costo transporte (CLP)")]
    pub transport_cost: i64,
    #[serde(rename = "Costo deshidratación (CLP)")]
    pub dehydration_cost: i64,
    #[serde(rename = "Costo total (CLP)")]
    pub total_cost: i64,
    #[serde(rename = "Stock final (t)")]
    pub final_stock_t: f64,
    #[serde(rename = "Resultado")]
    pub outcome: RunOutcome,
}

/// A single KPI value for tabular output.
#[derive(Debug, Clone, PartialEq)]
pub enum KpiValue {
    Text(String),
    Count(i64),
    Number(f64),
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiValue::Text(s) => f.write_str(s),
            KpiValue::Count(n) => write!(f, "{n}"),
            KpiValue::Number(x) => write!(f, "{x}"),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn clp(value: f64) -> i64 {
    value.round() as i64
}

impl KpiRecord {
    /// Price the totals and round them for the report.
    pub fn aggregate(totals: &RunTotals, rates: &CostRates) -> Self {
        let costs = CostBreakdown::compute(totals, rates);
        Self {
            zone: totals.zone.clone(),
            processed_m3: round_to(totals.processed_m3, 2),
            hours_run: round_to(totals.hours_run, 2),
            cake_t: round_to(totals.cake_t, 2),
            solids_t: round_to(totals.solids_t, 2),
            energy_kwh: round_to(totals.energy_kwh, 1),
            trips: totals.trips,
            dist_km: round_to(totals.dist_km, 1),
            plant_km: round_to(totals.plant_km, 1),
            ton_km: round_to(totals.ton_km, 1),
            energy_cost: clp(costs.energy),
            transport_cost: clp(costs.transport),
            dehydration_cost: clp(costs.dehydration),
            total_cost: clp(costs.total),
            final_stock_t: round_to(totals.final_stock_t, 2),
            outcome: totals.outcome,
        }
    }

    /// Named metrics in report order.
    pub fn metrics(&self) -> Vec<(&'static str, KpiValue)> {
        use KpiValue::{Count, Number, Text};
        vec![
            ("Ruta", Text(self.zone.clone())),
            ("Volumen procesado (m3)", Number(self.processed_m3)),
            ("Horas RUN planta", Number(self.hours_run)),
            ("Torta producida (t)", Number(self.cake_t)),
            ("tDR (t)", Number(self.solids_t)),
            ("Energía (kWh)", Number(self.energy_kwh)),
            ("Viajes distribución", Count(self.trips as i64)),
            ("Km distribución", Number(self.dist_km)),
            ("Km planta", Number(self.plant_km)),
            ("t·km", Number(self.ton_km)),
            ("Costo energía (CLP)", Count(self.energy_cost)),
            ("Costo transporte (CLP)", Count(self.transport_cost)),
            ("Costo deshidratación (CLP)", Count(self.dehydration_cost)),
            ("Costo total (CLP)", Count(self.total_cost)),
            ("Stock final (t)", Number(self.final_stock_t)),
            ("Resultado", Text(self.outcome.label().to_string())),
        ]
    }

    /// Look up a metric by its report name.
    pub fn get(&self, name: &str) -> Option<KpiValue> {
        self.metrics()
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}
