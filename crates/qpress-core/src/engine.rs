//! The simulation driver: owns every piece of per-run state and advances the
//! two trucks one tick at a time.
//!
//! # Tick
//!
//! Each [`Simulation::step`] runs:
//! 1. **Bound** -- stop with [`RunOutcome::TruncatedAtStepBound`] if the step
//!    bound has been reached
//! 2. **Plant** -- the press truck drives, sets up, or runs into its bin
//! 3. **Distribution** -- the hauling truck picks, loads, returns, unloads
//! 4. **Log** -- one [`LogRow`] snapshot is appended
//! 5. **Termination** -- the run ends once the press is idle, the hauling
//!    truck is idle and every bin is empty
//!
//! The plant always moves before the distribution truck, so within a tick
//! only one machine touches the stock ledger at a time.

use crate::config::ScenarioConfig;
use crate::distribution::{pickup_threshold, Distribution, DistributionState};
use crate::error::{ConfigError, DegenerateInput};
use crate::fixed::{f64_to_fixed64, fixed64_to_f64, Fixed64, Ticks};
use crate::kpi::{KpiRecord, RunTotals};
use crate::plant::{IdleReason, Plant, PlantParams, PlantState};
use crate::press::{allocate_targets, PressModel, TargetAllocation};
use crate::sim::{max_steps, RunOutcome, SimState, StateHash, STOCK_EPS_T};
use crate::stock::StockLedger;
use crate::table::{LogRow, LogTable, StockTable};
use crate::topology::{RoutePlan, TopologyRegistry};
use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Everything a finished run hands to the reporting layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    pub kpis: KpiRecord,
    /// Unrounded totals behind `kpis`.
    pub totals: RunTotals,
    pub log: LogTable,
    pub stock: StockTable,
    pub warnings: Vec<DegenerateInput>,
    pub outcome: RunOutcome,
    /// Hash of the final state, for comparing runs.
    pub state_hash: u64,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// One run of the press campaign.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: ScenarioConfig,
    target_volume_m3: f64,
    plan: RoutePlan,
    params: PlantParams,
    allocation: TargetAllocation,
    sim: SimState,
    plant: Plant,
    distribution: Distribution,
    stock: StockLedger,
    log: LogTable,
    warnings: Vec<DegenerateInput>,
    stock_eps: Fixed64,
    outcome: Option<RunOutcome>,
}

impl Simulation {
    /// Validate the scenario against the registry and set up tick 0.
    ///
    /// Fails before allocating any state if the zone is unknown or the
    /// scenario is invalid.
    pub fn new(registry: &TopologyRegistry, config: &ScenarioConfig) -> Result<Self, ConfigError> {
        let zone = registry.zone(&config.zone)?;
        config.validate()?;

        let volume = config.target_volume_m3();
        let allocation = allocate_targets(
            volume,
            config.density,
            config.ts_in,
            config.eta_captura,
            config.ts_cake,
            &zone.centers,
        )?;
        let press = PressModel::new(
            config.ts_cake,
            config.eta_captura,
            config.density,
            config.step_min,
        )?;

        let mut warnings = Vec::new();
        if allocation.equal_split {
            warnings.push(DegenerateInput::ZeroTotalDemand);
        }
        if config.q_proc_m3h <= 0.0 {
            warnings.push(DegenerateInput::ZeroNominalFlow);
        } else {
            warnings.extend(
                zone.centers
                    .iter()
                    .filter(|c| c.m3_demand <= 0.0)
                    .map(|c| DegenerateInput::ZeroThroughputCenter {
                        center: c.name.clone(),
                    }),
            );
        }
        for w in &warnings {
            warn!(zone = %zone.key, warning = ?w, "degenerate input");
        }

        let plan = zone.plan(config.truck_speed_kmh);
        let params = PlantParams::new(
            press,
            config.q_proc_m3h,
            config.step_min,
            plan.legs.clone(),
            &zone.centers,
            &allocation.thresholds,
        );
        let bound = max_steps(volume, config.q_proc_m3h, plan.total_minutes, config.step_min);

        info!(
            zone = %zone.key,
            volume_m3 = volume,
            max_steps = bound,
            expected_cake_t = allocation.total_cake_t,
            "simulation start"
        );

        Ok(Self {
            config: config.clone(),
            target_volume_m3: volume,
            plant: Plant::new(&params, volume),
            plan,
            params,
            allocation,
            sim: SimState::new(bound),
            distribution: Distribution::new(),
            stock: StockLedger::new(&zone.centers),
            log: LogTable::new(zone.centers.iter().map(|c| c.name.clone()).collect()),
            warnings,
            stock_eps: f64_to_fixed64(STOCK_EPS_T),
            outcome: None,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn tick(&self) -> Ticks {
        self.sim.tick
    }

    pub fn max_steps(&self) -> Ticks {
        self.sim.max_steps
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn stock(&self) -> &StockLedger {
        &self.stock
    }

    pub fn log(&self) -> &LogTable {
        &self.log
    }

    pub fn plan(&self) -> &RoutePlan {
        &self.plan
    }

    pub fn allocation(&self) -> &TargetAllocation {
        &self.allocation
    }

    pub fn warnings(&self) -> &[DegenerateInput] {
        &self.warnings
    }

    /// `Some` once the run has ended.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Run one tick. Returns the outcome once the run has ended; further
    /// calls do nothing and return the same outcome.
    pub fn step(&mut self) -> Option<RunOutcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }
        if self.sim.bound_reached() {
            warn!(
                zone = %self.config.zone,
                max_steps = self.sim.max_steps,
                remaining_m3 = fixed64_to_f64(self.plant.remaining_m3()),
                stock_t = fixed64_to_f64(self.stock.total()),
                "step bound reached before the run finished"
            );
            return Some(self.finish(RunOutcome::TruncatedAtStepBound));
        }

        let tick = self.sim.tick;
        if let Some(event) = self.plant.step(&self.params, &mut self.stock) {
            debug!(tick, ?event, "plant");
        }
        let pickup = pickup_threshold(self.plant.state().is_idle());
        if let Some(event) = self.distribution.step(
            &self.plan.trips,
            self.config.step_min,
            &mut self.stock,
            pickup,
        ) {
            debug!(tick, ?event, "distribution");
        }

        self.log.push(self.snapshot(tick));
        self.sim.tick += 1;

        self.termination().map(|outcome| self.finish(outcome))
    }

    /// Step until the run ends.
    pub fn run(mut self) -> SimulationOutput {
        let outcome = loop {
            if let Some(outcome) = self.step() {
                break outcome;
            }
        };
        let totals = self.totals(outcome);
        let kpis = KpiRecord::aggregate(&totals, &self.config.costs);
        let state_hash = self.state_hash();
        SimulationOutput {
            kpis,
            totals,
            stock: StockTable::from_log(&self.log),
            log: self.log,
            warnings: self.warnings,
            outcome,
            state_hash,
        }
    }

    fn termination(&self) -> Option<RunOutcome> {
        let PlantState::Idle { reason } = self.plant.state() else {
            return None;
        };
        if !self.distribution.state().is_idle() || !self.stock.all_below(self.stock_eps) {
            return None;
        }
        Some(match reason {
            IdleReason::VolumeDepleted => RunOutcome::Completed,
            IdleReason::NoThroughput => RunOutcome::Stalled,
        })
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.outcome = Some(outcome);
        info!(
            zone = %self.config.zone,
            outcome = outcome.label(),
            ticks = self.sim.tick,
            trips = self.distribution.totals().trips,
            "simulation end"
        );
        outcome
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Wall-clock time of the current tick.
    fn timestamp(&self) -> NaiveDateTime {
        let minutes = self.sim.elapsed_minutes(self.config.step_min);
        TimeDelta::try_minutes(minutes)
            .and_then(|d| self.config.start_time.checked_add_signed(d))
            .unwrap_or(NaiveDateTime::MAX)
    }

    fn snapshot(&self, tick: Ticks) -> LogRow {
        let plant = self.plant.totals();
        let dist = self.distribution.totals();
        LogRow {
            timestamp: self.timestamp(),
            tick,
            plant_state: self.plant.state().label(),
            plant_center: self.plant.center(),
            plant_km: fixed64_to_f64(plant.km),
            dist_state: self.distribution.state().label(),
            dist_target: self.distribution.state().target(),
            dist_km: fixed64_to_f64(dist.km),
            dist_trips: dist.trips,
            energy_kwh: fixed64_to_f64(plant.energy_kwh),
            remaining_m3: fixed64_to_f64(self.plant.remaining_m3()),
            payload_t: fixed64_to_f64(self.distribution.payload()),
            total_stock_t: fixed64_to_f64(self.stock.total()),
            stock_t: self.stock.levels().map(fixed64_to_f64).collect(),
        }
    }

    fn totals(&self, outcome: RunOutcome) -> RunTotals {
        let plant = self.plant.totals();
        let dist = self.distribution.totals();
        RunTotals {
            zone: self.config.zone.clone(),
            target_volume_m3: self.target_volume_m3,
            processed_m3: fixed64_to_f64(plant.processed_m3),
            hours_run: fixed64_to_f64(plant.hours_run),
            cake_t: fixed64_to_f64(plant.cake_t),
            solids_t: fixed64_to_f64(plant.solids_t),
            discarded_cake_t: fixed64_to_f64(plant.discarded_cake_t),
            energy_kwh: fixed64_to_f64(plant.energy_kwh),
            trips: dist.trips,
            dist_km: fixed64_to_f64(dist.km),
            plant_km: fixed64_to_f64(plant.km),
            ton_km: fixed64_to_f64(dist.ton_km),
            delivered_t: fixed64_to_f64(dist.delivered_t),
            final_stock_t: fixed64_to_f64(self.stock.total()),
            ticks: self.sim.tick,
            outcome,
        }
    }

    /// Hash of the tick counter, both machines and every bin.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim.tick);

        match self.plant.state() {
            PlantState::Drive { remaining } => {
                h.write_u32(0);
                h.write_i64(remaining);
            }
            PlantState::Setup { remaining } => {
                h.write_u32(1);
                h.write_i64(remaining);
            }
            PlantState::Run => h.write_u32(2),
            PlantState::Idle { reason } => {
                h.write_u32(3);
                h.write_u32(reason as u32);
            }
        }
        h.write_u32(self.plant.center().0);
        h.write_fixed64(self.plant.remaining_m3());
        h.write_fixed64(self.plant.visit_cake_t());
        let plant = self.plant.totals();
        for v in [
            plant.hours_run,
            plant.energy_kwh,
            plant.solids_t,
            plant.cake_t,
            plant.discarded_cake_t,
            plant.km,
            plant.processed_m3,
        ] {
            h.write_fixed64(v);
        }

        let (tag, target, remaining) = match self.distribution.state() {
            DistributionState::Idle => (0, None, 0),
            DistributionState::DrivePick { target, remaining } => (1, Some(target), remaining),
            DistributionState::Load { target, remaining } => (2, Some(target), remaining),
            DistributionState::DriveDrop { target, remaining } => (3, Some(target), remaining),
            DistributionState::Unload { target, remaining } => (4, Some(target), remaining),
        };
        h.write_u32(tag);
        h.write_u32(target.map_or(u32::MAX, |c| c.0));
        h.write_i64(remaining);
        h.write_fixed64(self.distribution.payload());
        let dist = self.distribution.totals();
        h.write_fixed64(dist.km);
        h.write_fixed64(dist.ton_km);
        h.write_u32(dist.trips);
        h.write_fixed64(dist.delivered_t);

        for bin in self.stock.bins() {
            h.write_fixed64(bin.level);
            h.write_fixed64(bin.received);
            h.write_fixed64(bin.collected);
        }
        h.finish()
    }
}

/// Run one scenario to completion.
pub fn simulate(
    registry: &TopologyRegistry,
    config: &ScenarioConfig,
) -> Result<SimulationOutput, ConfigError> {
    Ok(Simulation::new(registry, config)?.run())
}
