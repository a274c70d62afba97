//! Per-tick power sequencing.
//!
//! A tick runs supply recomputation, then (every tick or on a throttled
//! chance) rebuilds the flow network, solves it, writes flows back onto
//! lines, and derives shortage and blackout per consumer. Blackout events
//! fire only on transitions, not every tick.
//!
//! Nothing here fails: unknown or removed references simply do not
//! contribute.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::demand::{DemandPattern, SMART_GRID_PEAK_FACTOR, is_peak_hour};
use crate::flow::{EdmondsKarp, EPSILON, FlowSolution};
use crate::grid::{GridModel, NodeRole};
use crate::id::NodeId;
use crate::network::{AugmentedNetwork, BuildOutcome, NetworkBuilder};
use crate::rng::SimRng;
use crate::sim::{SimClock, Ticks};
use crate::storage::{self, StorageAction};
use crate::weather::{self, Weather};

/// Consumers receiving less than this share of their demand are blacked out.
pub const DEFAULT_BLACKOUT_THRESHOLD: f64 = 0.8;

/// Chance per tick that a throttled update actually solves.
pub const DEFAULT_THROTTLE_PROBABILITY: f64 = 0.2;

/// Whether an update always solves or only on a random fraction of ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecomputeMode {
    /// Solve now. Used after any discrete mutation.
    Instant,
    /// Solve with the configured per-tick probability.
    #[default]
    Throttled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorPhase {
    #[default]
    Idle,
    Computing,
    Settled,
}

/// Aggregates from the most recent solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    /// Total flow delivered from the virtual source to the virtual sink.
    pub max_flow: f64,
    /// Sum of positive supply over present nodes.
    pub total_supplied: f64,
    /// Sum of demand over present nodes.
    pub total_demanded: f64,
    /// Sum of `|flow|` over present lines.
    pub total_flow: f64,
    pub blackout_count: usize,
    pub blackout_nodes: Vec<NodeId>,
    /// Energy moved into batteries and tanks by the last supply pass.
    pub storage_charged: f64,
    /// Energy drawn from batteries and tanks by the last supply pass.
    pub storage_discharged: f64,
}

impl GridStats {
    /// Deliverable supply over demand; infinite when nothing is demanded.
    pub fn reserve_margin(&self) -> f64 {
        if self.total_demanded > EPSILON {
            self.total_supplied / self.total_demanded
        } else {
            f64::INFINITY
        }
    }
}

/// Emitted when a consumer enters or leaves blackout.
#[derive(Debug, Clone, PartialEq)]
pub enum BlackoutEvent {
    Started {
        node: NodeId,
        shortage: f64,
        tick: Ticks,
    },
    Cleared {
        node: NodeId,
        tick: Ticks,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerOrchestrator {
    pub blackout_threshold: f64,
    pub throttle_probability: f64,
    phase: OrchestratorPhase,
    stats: GridStats,
    solves: u64,
    #[serde(skip)]
    solver: EdmondsKarp,
}

impl Default for PowerOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKOUT_THRESHOLD, DEFAULT_THROTTLE_PROBABILITY)
    }
}

impl PowerOrchestrator {
    pub fn new(blackout_threshold: f64, throttle_probability: f64) -> Self {
        Self {
            blackout_threshold,
            throttle_probability,
            phase: OrchestratorPhase::Idle,
            stats: GridStats::default(),
            solves: 0,
            solver: EdmondsKarp,
        }
    }

    pub fn phase(&self) -> OrchestratorPhase {
        self.phase
    }

    pub fn stats(&self) -> &GridStats {
        &self.stats
    }

    /// Number of completed solves (degenerate ones included).
    pub fn solves(&self) -> u64 {
        self.solves
    }

    // -- Step 1: supply -----------------------------------------------------

    /// Recompute every present node's `current_supply` from its base value,
    /// demand pattern, renewables and storage.
    pub fn recompute_supply(
        &mut self,
        grid: &mut GridModel,
        clock: &SimClock,
        weather: &Weather,
        pattern: &DemandPattern,
    ) {
        let hour = clock.hour();
        let month = clock.month();
        let mut charged = 0.0;
        let mut discharged = 0.0;
        let mut tally = |action: StorageAction| match action {
            StorageAction::Charged(e) => charged += e,
            StorageAction::Discharged(e) => discharged += e,
            StorageAction::Idle => {}
        };

        for i in 0..grid.node_count() {
            let id = NodeId(i as u32);
            let Some(node) = grid.node_mut(id) else {
                continue;
            };
            if node.removed {
                continue;
            }

            node.current_supply = match node.role {
                NodeRole::Consumer { building } => {
                    let mut demand =
                        node.base_supply.abs() * pattern.demand_factor(building, clock, weather);
                    if node.smart_grid && is_peak_hour(hour) {
                        demand *= SMART_GRID_PEAK_FACTOR;
                    }
                    -demand
                }
                _ => node.base_supply,
            };

            let renewables = node.renewables;
            if let Some(wind) = renewables.wind {
                node.current_supply += weather::wind_output(wind.capacity, weather.wind_speed);
            }
            if let Some(hydro) = renewables.hydro {
                node.current_supply = weather::hydro_output(hydro.capacity, month);
            }
            if let Some(solar) = renewables.solar {
                node.current_supply +=
                    weather::solar_output(solar.capacity, hour, month, weather);
                tally(storage::charge_prosumer(node));
            }

            if node.hydrogen.is_some() {
                tally(storage::dispatch_hydrogen(grid, id));
            }
        }

        for node in grid.nodes_mut().iter_mut().filter(|n| !n.removed) {
            if node.battery.is_some() {
                tally(storage::dispatch_smart_battery(node, hour));
            }
        }

        self.stats.storage_charged = charged;
        self.stats.storage_discharged = discharged;
    }

    // -- Steps 2-6: flow ----------------------------------------------------

    /// Recompute flows according to `mode`. Returns `None` when a throttled
    /// update skipped this tick.
    pub fn update_flow(
        &mut self,
        grid: &mut GridModel,
        mode: RecomputeMode,
        rng: &mut SimRng,
        tick: Ticks,
    ) -> Option<Vec<BlackoutEvent>> {
        match mode {
            RecomputeMode::Instant => Some(self.recompute(grid, tick)),
            RecomputeMode::Throttled => {
                if rng.chance(self.throttle_probability) {
                    Some(self.recompute(grid, tick))
                } else {
                    None
                }
            }
        }
    }

    /// Build, solve, write back, detect blackouts and aggregate.
    pub fn recompute(&mut self, grid: &mut GridModel, tick: Ticks) -> Vec<BlackoutEvent> {
        self.phase = OrchestratorPhase::Computing;
        let previous: Vec<bool> = grid.nodes().iter().map(|n| n.blackout).collect();

        let max_flow = match NetworkBuilder::build(grid) {
            BuildOutcome::Ready(network) => {
                let solution = network.solve(&self.solver);
                write_back(grid, Some((&network, &solution)));
                solution.value()
            }
            BuildOutcome::Degenerate(reason) => {
                debug!(?reason, "degenerate network, all lines idle");
                write_back(grid, None);
                0.0
            }
        };

        self.detect_blackouts(grid);
        self.aggregate(grid, max_flow);
        self.solves += 1;
        self.phase = OrchestratorPhase::Settled;

        let events = blackout_transitions(grid, &previous, tick);
        for event in &events {
            match event {
                BlackoutEvent::Started { node, shortage, .. } => {
                    info!(%node, shortage, tick, "blackout started");
                }
                BlackoutEvent::Cleared { node, .. } => {
                    info!(%node, tick, "blackout cleared");
                }
            }
        }
        events
    }

    /// Reset every node's shortage and blackout, then derive them for each
    /// present node with negative supply from the power its lines carry in.
    pub fn detect_blackouts(&mut self, grid: &mut GridModel) {
        for node in grid.nodes_mut() {
            node.shortage = 0.0;
            node.blackout = false;
        }

        let inbound = inbound_power(grid);
        let threshold = self.blackout_threshold;
        for (node, received) in grid.nodes_mut().iter_mut().zip(inbound) {
            if node.removed || node.current_supply >= 0.0 {
                continue;
            }
            let demand = -node.current_supply;
            let shortage = demand - received;
            node.shortage = if shortage < EPSILON { 0.0 } else { shortage };
            node.blackout = received < threshold * demand;
        }
    }

    fn aggregate(&mut self, grid: &GridModel, max_flow: f64) {
        let blackout_nodes: Vec<NodeId> = grid
            .live_nodes()
            .filter(|n| n.blackout)
            .map(|n| n.id)
            .collect();
        self.stats.max_flow = max_flow;
        self.stats.total_supplied = grid.total_generation();
        self.stats.total_demanded = grid.total_demand();
        self.stats.total_flow = grid
            .edges()
            .iter()
            .filter(|e| !e.removed)
            .map(|e| e.flow.abs())
            .sum();
        self.stats.blackout_count = blackout_nodes.len();
        self.stats.blackout_nodes = blackout_nodes;
    }
}

/// Set every line's flow from the solution (zero for lines outside the
/// build), then accumulate `transmitted_power` on the providing and
/// receiving endpoints of each loaded line.
fn write_back(grid: &mut GridModel, solved: Option<(&AugmentedNetwork, &FlowSolution)>) {
    for edge in grid.edges_mut() {
        edge.flow = 0.0;
    }
    if let Some((network, solution)) = solved {
        for (id, flow) in network.line_flows(solution) {
            if let Some(edge) = grid.edge_mut(id) {
                edge.flow = flow;
            }
        }
    }

    let mut transmitted = vec![0.0; grid.node_count()];
    for edge in grid.live_edges() {
        let (from, to) = if edge.flow > 0.0 {
            (edge.u, edge.v)
        } else if edge.flow < 0.0 {
            (edge.v, edge.u)
        } else {
            continue;
        };
        let amount = edge.flow.abs();
        if grid.node(from).is_some_and(|n| n.current_supply > 0.0) {
            transmitted[from.index()] += amount;
        }
        if grid.node(to).is_some_and(|n| n.current_supply < 0.0) {
            transmitted[to.index()] += amount;
        }
    }
    for (node, power) in grid.nodes_mut().iter_mut().zip(transmitted) {
        node.transmitted_power = power;
    }
}

/// Power flowing into each node over present lines. Outbound flow does not
/// reduce the total.
fn inbound_power(grid: &GridModel) -> Vec<f64> {
    let mut inbound = vec![0.0; grid.node_count()];
    for edge in grid.edges().iter().filter(|e| !e.removed) {
        if edge.flow > EPSILON {
            if let Some(slot) = inbound.get_mut(edge.v.index()) {
                *slot += edge.flow;
            }
        } else if edge.flow < -EPSILON {
            if let Some(slot) = inbound.get_mut(edge.u.index()) {
                *slot -= edge.flow;
            }
        }
    }
    inbound
}

fn blackout_transitions(grid: &GridModel, previous: &[bool], tick: Ticks) -> Vec<BlackoutEvent> {
    grid.live_nodes()
        .filter_map(|node| {
            let was = previous.get(node.id.index()).copied().unwrap_or(false);
            match (was, node.blackout) {
                (false, true) => Some(BlackoutEvent::Started {
                    node: node.id,
                    shortage: node.shortage,
                    tick,
                }),
                (true, false) => Some(BlackoutEvent::Cleared { node: node.id, tick }),
                _ => None,
            }
        })
        .collect()
}
