//! Stochastic external shocks.
//!
//! Each tick the injector may fire one shock, chosen uniformly from seven
//! kinds, subject to a cooldown in simulated minutes and a per-tick trigger
//! probability. A shock that finds no eligible target does nothing. A shock
//! that lands is counted, recorded in a bounded history, and followed by an
//! instant flow recompute so the grid is consistent before the next read.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::grid::GridModel;
use crate::id::{EdgeId, NodeId};
use crate::orchestrator::{BlackoutEvent, PowerOrchestrator};
use crate::rng::SimRng;
use crate::sim::{SimClock, Ticks};
use crate::weather::{Weather, WeatherCondition};

/// Lines at or below this capacity are not halved further.
const MIN_HALVABLE_CAPACITY: f64 = 1.0;

/// Share of solar nameplate added by a solar boost.
const SOLAR_BOOST_SHARE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub enabled: bool,
    /// Chance per tick that a shock is attempted once the cooldown passed.
    pub probability: f64,
    /// Simulated minutes that must pass after a shock before the next.
    pub min_interval_minutes: u32,
    /// Number of records kept in the history.
    pub history_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probability: 1e-4,
            min_interval_minutes: 30,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Shocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShockKind {
    LineTrip,
    LineHalving,
    BuildingRemoval,
    GeneratorDerate,
    DemandSpike,
    SolarBoost,
    BatteryFault,
}

impl ShockKind {
    pub const ALL: [ShockKind; 7] = [
        ShockKind::LineTrip,
        ShockKind::LineHalving,
        ShockKind::BuildingRemoval,
        ShockKind::GeneratorDerate,
        ShockKind::DemandSpike,
        ShockKind::SolarBoost,
        ShockKind::BatteryFault,
    ];
}

/// A shock that landed, with what it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GridShock {
    LineTrip { edge: EdgeId },
    LineHalved { edge: EdgeId, capacity: f64 },
    BuildingRemoved { node: NodeId },
    /// Output cut by `reduction` (a fraction).
    GeneratorDerated { node: NodeId, reduction: f64 },
    /// Demand raised by `increase` (a fraction).
    DemandSpike { node: NodeId, increase: f64 },
    SolarBoost { nodes: Vec<NodeId> },
    BatteryFault { node: NodeId, lost: f64 },
}

impl GridShock {
    pub fn kind(&self) -> ShockKind {
        match self {
            GridShock::LineTrip { .. } => ShockKind::LineTrip,
            GridShock::LineHalved { .. } => ShockKind::LineHalving,
            GridShock::BuildingRemoved { .. } => ShockKind::BuildingRemoval,
            GridShock::GeneratorDerated { .. } => ShockKind::GeneratorDerate,
            GridShock::DemandSpike { .. } => ShockKind::DemandSpike,
            GridShock::SolarBoost { .. } => ShockKind::SolarBoost,
            GridShock::BatteryFault { .. } => ShockKind::BatteryFault,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub time: NaiveDateTime,
    pub tick: Ticks,
    pub shock: GridShock,
    /// Shocks landed so far, this one included.
    pub total_count: u64,
}

/// A landed shock and the blackout transitions its recompute produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ShockOutcome {
    pub shock: GridShock,
    pub blackouts: Vec<BlackoutEvent>,
}

fn pick<T: Copy>(rng: &mut SimRng, candidates: &[T]) -> Option<T> {
    rng.pick(candidates.len()).map(|i| candidates[i])
}

/// Apply one shock of `kind` to the grid. Returns `None` when nothing is
/// eligible.
pub fn apply_shock(
    kind: ShockKind,
    grid: &mut GridModel,
    rng: &mut SimRng,
    weather: &Weather,
) -> Option<GridShock> {
    match kind {
        ShockKind::LineTrip => {
            let lines: Vec<EdgeId> = grid.live_edges().map(|e| e.id).collect();
            let edge = pick(rng, &lines)?;
            grid.remove_edge(edge).ok()?;
            Some(GridShock::LineTrip { edge })
        }
        ShockKind::LineHalving => {
            let lines: Vec<EdgeId> = grid
                .live_edges()
                .filter(|e| e.capacity > MIN_HALVABLE_CAPACITY)
                .map(|e| e.id)
                .collect();
            let edge = pick(rng, &lines)?;
            let capacity = grid.edge(edge)?.capacity / 2.0;
            grid.set_edge_capacity(edge, capacity).ok()?;
            Some(GridShock::LineHalved { edge, capacity })
        }
        ShockKind::BuildingRemoval => {
            let nodes: Vec<NodeId> = grid.live_nodes().map(|n| n.id).collect();
            let node = pick(rng, &nodes)?;
            grid.remove_node(node).ok()?;
            Some(GridShock::BuildingRemoved { node })
        }
        ShockKind::GeneratorDerate => {
            let nodes: Vec<NodeId> = grid
                .live_nodes()
                .filter(|n| n.role.is_generator())
                .map(|n| n.id)
                .collect();
            let node = pick(rng, &nodes)?;
            let reduction = rng.uniform(0.2, 0.5);
            let target = grid.node_mut(node)?;
            target.current_supply *= 1.0 - reduction;
            Some(GridShock::GeneratorDerated { node, reduction })
        }
        ShockKind::DemandSpike => {
            let nodes: Vec<NodeId> = grid
                .live_nodes()
                .filter(|n| n.role.is_consumer())
                .map(|n| n.id)
                .collect();
            let node = pick(rng, &nodes)?;
            let increase = rng.uniform(0.3, 0.8);
            let target = grid.node_mut(node)?;
            target.current_supply *= 1.0 + increase;
            Some(GridShock::DemandSpike { node, increase })
        }
        ShockKind::SolarBoost => {
            if weather.condition != WeatherCondition::Clear {
                return None;
            }
            let nodes: Vec<NodeId> = grid
                .live_nodes()
                .filter(|n| n.renewables.solar_capacity() > 0.0)
                .map(|n| n.id)
                .collect();
            if nodes.is_empty() {
                return None;
            }
            for &id in &nodes {
                if let Some(node) = grid.node_mut(id) {
                    node.current_supply += node.renewables.solar_capacity() * SOLAR_BOOST_SHARE;
                }
            }
            Some(GridShock::SolarBoost { nodes })
        }
        ShockKind::BatteryFault => {
            let nodes: Vec<NodeId> = grid
                .live_nodes()
                .filter(|n| n.battery.is_some_and(|b| b.charge > 0.0))
                .map(|n| n.id)
                .collect();
            let node = pick(rng, &nodes)?;
            let ratio = rng.uniform(0.5, 1.0);
            let battery = grid.node_mut(node)?.battery.as_mut()?;
            let lost = battery.charge * ratio;
            battery.charge = (battery.charge - lost).max(0.0);
            Some(GridShock::BatteryFault { node, lost })
        }
    }
}

// ---------------------------------------------------------------------------
// Injector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventInjector {
    pub config: EventConfig,
    count: u64,
    last_event: Option<NaiveDateTime>,
    history: VecDeque<EventRecord>,
}

impl EventInjector {
    pub fn new(config: EventConfig) -> Self {
        Self {
            config,
            count: 0,
            last_event: None,
            history: VecDeque::new(),
        }
    }

    /// Shocks landed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last_event(&self) -> Option<NaiveDateTime> {
        self.last_event
    }

    /// Landed shocks, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &EventRecord> {
        self.history.iter()
    }

    /// Whether the cooldown since the last landed shock has passed.
    pub fn cooled_down(&self, clock: &SimClock) -> bool {
        match self.last_event {
            Some(last) => clock.minutes_since(last) >= i64::from(self.config.min_interval_minutes),
            None => true,
        }
    }

    /// Per-tick roll: cooldown, then trigger probability, then one shock.
    pub fn update(
        &mut self,
        grid: &mut GridModel,
        orchestrator: &mut PowerOrchestrator,
        rng: &mut SimRng,
        clock: &SimClock,
        weather: &Weather,
    ) -> Option<ShockOutcome> {
        if !self.config.enabled || !self.cooled_down(clock) {
            return None;
        }
        if !rng.chance(self.config.probability) {
            return None;
        }
        self.force_event(grid, orchestrator, rng, clock, weather)
    }

    /// Fire one uniformly chosen shock now, ignoring cooldown and
    /// probability.
    pub fn force_event(
        &mut self,
        grid: &mut GridModel,
        orchestrator: &mut PowerOrchestrator,
        rng: &mut SimRng,
        clock: &SimClock,
        weather: &Weather,
    ) -> Option<ShockOutcome> {
        let kind = ShockKind::ALL[rng.pick(ShockKind::ALL.len())?];
        let Some(shock) = apply_shock(kind, grid, rng, weather) else {
            debug!(?kind, "shock found no eligible target");
            return None;
        };

        self.count += 1;
        self.last_event = Some(clock.time);
        info!(?shock, total = self.count, tick = clock.tick, "grid shock");

        let blackouts = orchestrator.recompute(grid, clock.tick);
        self.record(EventRecord {
            time: clock.time,
            tick: clock.tick,
            shock: shock.clone(),
            total_count: self.count,
        });
        Some(ShockOutcome { shock, blackouts })
    }

    fn record(&mut self, record: EventRecord) {
        if self.config.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}
