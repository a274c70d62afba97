//! The simulation context: owns the grid and every piece of per-run state,
//! and drives the tick pipeline.
//!
//! # Architecture
//!
//! [`GridSimulation`] owns:
//! - The [`GridModel`] (nodes, lines, derived flow state)
//! - A [`PowerOrchestrator`] (supply, solve, blackouts, stats)
//! - An [`EventInjector`] (stochastic shocks)
//! - A [`CommandQueue`] of pending host edits
//! - The [`SimRng`] and [`SimClock`]
//!
//! Nothing lives in globals, so several simulations can run side by side and
//! two built from the same config and grid step identically.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::command_queue::{Applied, CommandQueue, GridCommand};
use crate::config::SimConfig;
use crate::error::GridError;
use crate::event::{EventInjector, ShockOutcome};
use crate::grid::GridModel;
use crate::orchestrator::{BlackoutEvent, PowerOrchestrator, RecomputeMode};
use crate::query::GridSnapshot;
use crate::rng::SimRng;
use crate::serialize::{DeserializeError, GridSave, SerializeError};
use crate::sim::{SimClock, StateHash, Ticks};
use crate::weather::Weather;

// ---------------------------------------------------------------------------
// Step report
// ---------------------------------------------------------------------------

/// What happened during one [`GridSimulation::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub tick: Ticks,
    pub time: NaiveDateTime,
    /// Whether the per-tick flow update ran (always true in instant mode).
    pub recomputed: bool,
    /// The shock that landed this tick, if any.
    pub shock: Option<ShockOutcome>,
    /// One result per drained command, in submission order.
    pub command_results: Vec<Result<Applied, GridError>>,
    /// Blackout transitions from every recompute run during the step.
    pub blackout_events: Vec<BlackoutEvent>,
}

// ---------------------------------------------------------------------------
// GridSimulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GridSimulation {
    grid: GridModel,
    orchestrator: PowerOrchestrator,
    injector: EventInjector,
    commands: CommandQueue,
    rng: SimRng,
    clock: SimClock,
    config: SimConfig,
}

impl GridSimulation {
    /// Start a run over `grid` and settle its initial flows.
    pub fn new(config: SimConfig, grid: GridModel) -> Self {
        let clock = SimClock::new(config.start_time);
        let rng = SimRng::new(config.seed);
        let mut sim = Self::assemble(config, grid, clock, rng);
        sim.orchestrator.recompute(&mut sim.grid, 0);
        sim
    }

    /// Resume a run from bytes written by [`GridSimulation::save`]. Flow
    /// state, solve stats, event cooldown and history are taken as saved;
    /// thresholds and event settings come from `config`.
    pub fn load(config: SimConfig, data: &[u8]) -> Result<Self, DeserializeError> {
        let save = GridSave::decode(data)?;
        let mut sim = Self::assemble(config, save.grid, save.clock, save.rng);
        sim.orchestrator = save.orchestrator;
        sim.orchestrator.blackout_threshold = sim.config.blackout_threshold;
        sim.orchestrator.throttle_probability = sim.config.throttle_probability;
        sim.injector = save.injector;
        sim.injector.config = sim.config.events.clone();
        Ok(sim)
    }

    fn assemble(config: SimConfig, grid: GridModel, clock: SimClock, rng: SimRng) -> Self {
        Self {
            grid,
            orchestrator: PowerOrchestrator::new(
                config.blackout_threshold,
                config.throttle_probability,
            ),
            injector: EventInjector::new(config.events.clone()),
            commands: CommandQueue::new(),
            rng,
            clock,
            config,
        }
    }

    pub fn save(&self) -> Result<Vec<u8>, SerializeError> {
        GridSave::new(self.grid.clone(), self.clock.clone(), self.rng.clone())
            .with_orchestrator(self.orchestrator.clone())
            .with_injector(self.injector.clone())
            .encode()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn orchestrator(&self) -> &PowerOrchestrator {
        &self.orchestrator
    }

    pub fn injector(&self) -> &EventInjector {
        &self.injector
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Queue an edit for the start of the next step.
    pub fn submit(&mut self, command: GridCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandQueue {
        &mut self.commands
    }

    /// Owned view of the current state for external consumers.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::capture(&self.grid, &self.clock, self.orchestrator.stats())
    }

    /// Hash of grid state, tick and RNG position.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.grid.state_hash());
        h.write_u64(self.clock.tick);
        h.write_u64(self.rng.state());
        h.finish()
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Advance one tick under `weather`.
    pub fn step(&mut self, weather: &Weather) -> StepReport {
        let mut blackout_events = Vec::new();

        // Commands.
        let command_results = self.apply_commands();
        if command_results.iter().any(Result::is_ok) {
            blackout_events.extend(self.orchestrator.recompute(&mut self.grid, self.clock.tick));
        }

        // Clock.
        self.clock.advance(self.config.minutes_per_tick);
        let tick = self.clock.tick;

        // Supply.
        self.orchestrator
            .recompute_supply(&mut self.grid, &self.clock, weather, &self.config.demand);

        // Flow.
        let update =
            self.orchestrator
                .update_flow(&mut self.grid, self.config.recompute, &mut self.rng, tick);
        let recomputed = update.is_some();
        blackout_events.extend(update.unwrap_or_default());

        // Events.
        let shock = self.injector.update(
            &mut self.grid,
            &mut self.orchestrator,
            &mut self.rng,
            &self.clock,
            weather,
        );
        if let Some(outcome) = &shock {
            blackout_events.extend(outcome.blackouts.iter().cloned());
        }

        debug!(
            tick,
            recomputed,
            commands = command_results.len(),
            shock = shock.is_some(),
            "step"
        );

        StepReport {
            tick,
            time: self.clock.time,
            recomputed,
            shock,
            command_results,
            blackout_events,
        }
    }

    /// Fire one shock immediately, ignoring cooldown and probability.
    pub fn force_event(&mut self, weather: &Weather) -> Option<ShockOutcome> {
        self.injector.force_event(
            &mut self.grid,
            &mut self.orchestrator,
            &mut self.rng,
            &self.clock,
            weather,
        )
    }

    /// Run a full recompute now, outside the step cycle.
    pub fn recompute_now(&mut self) -> Vec<BlackoutEvent> {
        self.orchestrator.recompute(&mut self.grid, self.clock.tick)
    }

    /// Switch between instant and throttled per-tick flow updates.
    pub fn set_recompute_mode(&mut self, mode: RecomputeMode) {
        self.config.recompute = mode;
    }

    fn apply_commands(&mut self) -> Vec<Result<Applied, GridError>> {
        self.commands
            .drain(self.clock.tick)
            .iter()
            .map(|cmd| cmd.apply(&mut self.grid))
            .collect()
    }
}
