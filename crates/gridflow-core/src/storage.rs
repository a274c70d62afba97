//! Battery and hydrogen dispatch.
//!
//! Each routine adjusts a node's `current_supply` for power drawn to charge
//! or injected by discharging. Stored energy never leaves
//! `[0, capacity]`.

use crate::demand::is_peak_hour;
use crate::grid::{GridModel, Node};
use crate::id::NodeId;
use crate::EPSILON;

/// Round-trip efficiency of battery charging and discharging.
pub const BATTERY_EFFICIENCY: f64 = 0.95;

/// Largest share of battery capacity that may be charged in one tick.
pub const MAX_CHARGE_FRACTION: f64 = 0.1;

/// Share of electrolyser input converted to stored hydrogen per tick.
const ELECTROLYSIS_RATE: f64 = 0.1;

/// What a storage routine did this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StorageAction {
    Idle,
    /// Energy added to storage.
    Charged(f64),
    /// Energy taken out of storage.
    Discharged(f64),
}

fn charge_battery(node: &mut Node) -> StorageAction {
    let Some(battery) = node.battery.as_mut() else {
        return StorageAction::Idle;
    };
    let amount = battery
        .headroom()
        .min(battery.capacity * MAX_CHARGE_FRACTION);
    if amount <= EPSILON {
        return StorageAction::Idle;
    }
    battery.charge = (battery.charge + amount).min(battery.capacity);
    node.current_supply -= amount / BATTERY_EFFICIENCY;
    StorageAction::Charged(amount)
}

/// A prosumer with surplus after its own generation stores part of it
/// instead of exporting.
pub fn charge_prosumer(node: &mut Node) -> StorageAction {
    if !node.prosumer || node.current_supply <= 0.0 {
        return StorageAction::Idle;
    }
    charge_battery(node)
}

/// Smart-grid battery schedule: charge off-peak (01:00 to 05:59), discharge
/// against demand during peak hours. Prosumers manage their own battery.
pub fn dispatch_smart_battery(node: &mut Node, hour: u32) -> StorageAction {
    if node.prosumer || !node.smart_grid {
        return StorageAction::Idle;
    }
    if (1..=5).contains(&hour) {
        return charge_battery(node);
    }
    if !is_peak_hour(hour) || node.current_supply >= 0.0 {
        return StorageAction::Idle;
    }
    let demand = -node.current_supply;
    let Some(battery) = node.battery.as_mut() else {
        return StorageAction::Idle;
    };
    let amount = demand.min(battery.charge);
    if amount <= EPSILON {
        return StorageAction::Idle;
    }
    battery.charge = (battery.charge - amount).max(0.0);
    node.current_supply += amount * BATTERY_EFFICIENCY;
    StorageAction::Discharged(amount)
}

/// Run the electrolyser or fuel cell of the hydrogen tank at `id`.
///
/// The tank only operates while a live line links it to a live generator.
/// With more than 10% system surplus it electrolyses part of the surplus
/// (at most 80% of the linked generation) and the node turns into a
/// consumer of that power. With more than 5% deficit the fuel cell covers
/// up to half of the deficit.
pub fn dispatch_hydrogen(grid: &mut GridModel, id: NodeId) -> StorageAction {
    let Some(node) = grid.node(id) else {
        return StorageAction::Idle;
    };
    let Some(tank) = node.hydrogen else {
        return StorageAction::Idle;
    };
    if node.removed {
        return StorageAction::Idle;
    }

    let linked: Vec<f64> = grid
        .incident_live_edges(id)
        .filter_map(|e| e.other(id))
        .filter_map(|other| grid.node(other))
        .filter(|other| other.role.is_generator())
        .map(|other| other.current_supply)
        .collect();
    if linked.is_empty() {
        return StorageAction::Idle;
    }
    let linked_generation: f64 = linked.iter().sum();
    let generation = grid.total_generation();
    let demand = grid.total_demand();
    let efficiency = tank.efficiency.max(EPSILON);

    let Some(node) = grid.node_mut(id) else {
        return StorageAction::Idle;
    };
    let Some(tank) = node.hydrogen.as_mut() else {
        return StorageAction::Idle;
    };

    if generation > demand * 1.1 && linked_generation > 0.0 {
        let surplus = (generation - demand).min(linked_generation * 0.8);
        let produced = surplus * efficiency * ELECTROLYSIS_RATE;
        let stored = produced.min(tank.headroom());
        if stored <= EPSILON {
            return StorageAction::Idle;
        }
        tank.level = (tank.level + stored).min(tank.capacity);
        node.current_supply = -(stored / efficiency / ELECTROLYSIS_RATE);
        StorageAction::Charged(stored)
    } else if demand > generation * 1.05 && tank.level > 0.0 {
        let output = (0.5 * (demand - generation)).min(tank.level * efficiency);
        if output <= EPSILON {
            return StorageAction::Idle;
        }
        let consumed = output / efficiency;
        tank.level = (tank.level - consumed).max(0.0);
        node.current_supply = output;
        StorageAction::Discharged(consumed)
    } else {
        StorageAction::Idle
    }
}
