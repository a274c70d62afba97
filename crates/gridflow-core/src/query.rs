//! Read-only views of grid state for presentation, economics and analytics.
//!
//! All types are owned copies with no references into the model, and all
//! serialize with serde.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::grid::{GridModel, NodeRole};
use crate::id::{EdgeId, NodeId};
use crate::orchestrator::GridStats;
use crate::sim::{SimClock, Ticks};

// ---------------------------------------------------------------------------
// Node snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub role: NodeRole,
    pub x: f64,
    pub y: f64,
    pub base_supply: f64,
    pub current_supply: f64,
    pub transmitted_power: f64,
    pub shortage: f64,
    pub blackout: bool,
    pub removed: bool,
    pub has_solar: bool,
    pub has_wind: bool,
    pub has_hydro: bool,
    /// `(charge, capacity)` when the node has a battery.
    pub battery: Option<(f64, f64)>,
    /// `(level, capacity)` when the node has a hydrogen tank.
    pub hydrogen: Option<(f64, f64)>,
    pub smart_grid: bool,
    pub prosumer: bool,
}

// ---------------------------------------------------------------------------
// Edge snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub u: NodeId,
    pub v: NodeId,
    pub capacity: f64,
    pub cost: f64,
    pub flow: f64,
    /// `|flow| / capacity` as a 0..1 fraction.
    pub usage_rate: f64,
    pub removed: bool,
}

// ---------------------------------------------------------------------------
// Grid snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub tick: Ticks,
    pub time: NaiveDateTime,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub stats: GridStats,
}

impl GridSnapshot {
    pub fn capture(grid: &GridModel, clock: &SimClock, stats: &GridStats) -> Self {
        let nodes = grid
            .nodes()
            .iter()
            .map(|n| NodeSnapshot {
                id: n.id,
                role: n.role,
                x: n.x,
                y: n.y,
                base_supply: n.base_supply,
                current_supply: n.current_supply,
                transmitted_power: n.transmitted_power,
                shortage: n.shortage,
                blackout: n.blackout,
                removed: n.removed,
                has_solar: n.renewables.solar.is_some(),
                has_wind: n.renewables.wind.is_some(),
                has_hydro: n.renewables.hydro.is_some(),
                battery: n.battery.map(|b| (b.charge, b.capacity)),
                hydrogen: n.hydrogen.map(|t| (t.level, t.capacity)),
                smart_grid: n.smart_grid,
                prosumer: n.prosumer,
            })
            .collect();

        let edges = grid
            .edges()
            .iter()
            .map(|e| EdgeSnapshot {
                id: e.id,
                u: e.u,
                v: e.v,
                capacity: e.capacity,
                cost: e.cost,
                flow: e.flow,
                usage_rate: e.usage_rate(),
                removed: e.removed,
            })
            .collect();

        Self {
            tick: clock.tick,
            time: clock.time,
            nodes,
            edges,
            stats: stats.clone(),
        }
    }

    /// Ids of nodes currently in blackout.
    pub fn blackouts(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|n| n.blackout).map(|n| n.id)
    }

    /// Present lines at or above `threshold` usage.
    pub fn congested_edges(&self, threshold: f64) -> impl Iterator<Item = &EdgeSnapshot> {
        self.edges
            .iter()
            .filter(move |e| !e.removed && e.usage_rate >= threshold)
    }
}
