//! The grid model: buildings (nodes) and power lines (edges).
//!
//! Nodes and edges live in dense vectors indexed by their id. Removal is a
//! soft delete (`removed = true`) so ids stay stable for everything that
//! references them; `restore_all` clears every removal flag.
//!
//! A node's [`NodeRole`] is assigned once at construction. Optional
//! capabilities (renewables, battery, hydrogen tank) are attached as
//! `Option` profiles and inspected by pattern matching.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GridError, LineEnd};
use crate::id::{EdgeId, NodeId};
use crate::sim::StateHash;
use crate::EPSILON;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// What kind of plant a generator node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Thermal,
    Nuclear,
    Hydro,
    Wind,
    Solar,
    Other,
}

/// Building category of a consumer; selects its day/night usage profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    #[default]
    Apartment,
    Office,
    School,
    Hospital,
    ShoppingMall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Battery,
    Hydrogen,
}

/// The fixed role of a node in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Generator { kind: GeneratorKind },
    Consumer { building: BuildingKind },
    Neutral,
    Storage { kind: StorageKind },
}

impl NodeRole {
    /// Role for a plain building described only by its base output:
    /// positive output is a generator, negative a consumer, zero neutral.
    pub fn from_base_supply(base_supply: f64) -> Self {
        if base_supply > EPSILON {
            NodeRole::Generator {
                kind: GeneratorKind::Other,
            }
        } else if base_supply < -EPSILON {
            NodeRole::Consumer {
                building: BuildingKind::default(),
            }
        } else {
            NodeRole::Neutral
        }
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, NodeRole::Generator { .. })
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self, NodeRole::Consumer { .. })
    }
}

// ---------------------------------------------------------------------------
// Capability profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarArray {
    /// Peak output under full irradiance.
    pub capacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindTurbine {
    /// Output at or above rated wind speed.
    pub capacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HydroPlant {
    /// Output at nominal reservoir level.
    pub capacity: f64,
}

/// Weather-driven generation attached to a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenewableProfile {
    pub solar: Option<SolarArray>,
    pub wind: Option<WindTurbine>,
    pub hydro: Option<HydroPlant>,
}

impl RenewableProfile {
    pub fn solar_capacity(&self) -> f64 {
        self.solar.map_or(0.0, |s| s.capacity)
    }
}

/// Electrochemical storage. `charge` stays within `[0, capacity]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub capacity: f64,
    pub charge: f64,
}

impl Battery {
    pub fn headroom(&self) -> f64 {
        (self.capacity - self.charge).max(0.0)
    }
}

/// Green-hydrogen tank with electrolyser and fuel cell. `level` stays within
/// `[0, capacity]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HydrogenTank {
    pub capacity: f64,
    pub level: f64,
    /// Conversion efficiency used for both electrolysis and the fuel cell.
    pub efficiency: f64,
}

impl HydrogenTank {
    pub const DEFAULT_EFFICIENCY: f64 = 0.6;

    /// A tank at 30% fill, the level new hydrogen sites are commissioned with.
    pub fn new(capacity: f64) -> Self {
        let capacity = capacity.max(0.0);
        Self {
            capacity,
            level: capacity * 0.3,
            efficiency: Self::DEFAULT_EFFICIENCY,
        }
    }

    pub fn headroom(&self) -> f64 {
        (self.capacity - self.level).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A building in the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub role: NodeRole,
    /// Nameplate output (positive) or base demand (negative).
    pub base_supply: f64,
    pub x: f64,
    pub y: f64,
    pub renewables: RenewableProfile,
    pub battery: Option<Battery>,
    pub hydrogen: Option<HydrogenTank>,
    /// Takes part in peak shaving and off-peak battery charging.
    pub smart_grid: bool,
    /// Stores its own solar surplus before exporting.
    pub prosumer: bool,

    /// Signed supply this tick: positive is generation available, negative
    /// is demand.
    pub current_supply: f64,
    /// Power actually carried out of (generator) or into (consumer) this node
    /// by the last solve.
    pub transmitted_power: f64,
    /// Unmet demand after the last solve, never negative.
    pub shortage: f64,
    pub blackout: bool,
    pub removed: bool,
}

impl Node {
    /// Demand magnitude this tick, zero for non-consuming nodes.
    pub fn demand(&self) -> f64 {
        if self.current_supply < 0.0 {
            -self.current_supply
        } else {
            0.0
        }
    }
}

/// Construction parameters for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub role: NodeRole,
    pub base_supply: f64,
    pub x: f64,
    pub y: f64,
    pub renewables: RenewableProfile,
    pub battery: Option<Battery>,
    pub hydrogen: Option<HydrogenTank>,
    pub smart_grid: bool,
    pub prosumer: bool,
}

impl NodeSpec {
    /// A plain building whose role follows the sign of `base_supply`.
    pub fn new(base_supply: f64) -> Self {
        Self {
            role: NodeRole::from_base_supply(base_supply),
            base_supply,
            x: 0.0,
            y: 0.0,
            renewables: RenewableProfile::default(),
            battery: None,
            hydrogen: None,
            smart_grid: false,
            prosumer: false,
        }
    }

    pub fn generator(kind: GeneratorKind, output: f64) -> Self {
        Self {
            role: NodeRole::Generator { kind },
            ..Self::new(output.abs())
        }
    }

    pub fn consumer(building: BuildingKind, demand: f64) -> Self {
        Self {
            role: NodeRole::Consumer { building },
            ..Self::new(-demand.abs())
        }
    }

    pub fn neutral() -> Self {
        Self::new(0.0)
    }

    /// Wind farm: intermittent, 30% of nameplate as base output.
    pub fn wind_plant(capacity: f64) -> Self {
        Self::generator(GeneratorKind::Wind, capacity * 0.3).with_wind(capacity)
    }

    /// Solar farm: irradiance dependent, 25% of nameplate as base output.
    pub fn solar_plant(capacity: f64) -> Self {
        Self::generator(GeneratorKind::Solar, capacity * 0.25).with_solar(capacity)
    }

    /// Hydro plant: output follows the seasonal reservoir level.
    pub fn hydro_plant(capacity: f64) -> Self {
        Self::generator(GeneratorKind::Hydro, capacity * 0.9).with_hydro(capacity)
    }

    pub fn nuclear_plant(capacity: f64) -> Self {
        Self::generator(GeneratorKind::Nuclear, capacity * 0.95)
    }

    pub fn thermal_plant(capacity: f64) -> Self {
        Self::generator(GeneratorKind::Thermal, capacity * 0.85)
    }

    pub fn hydrogen_storage(capacity: f64) -> Self {
        Self {
            role: NodeRole::Storage {
                kind: StorageKind::Hydrogen,
            },
            hydrogen: Some(HydrogenTank::new(capacity)),
            ..Self::new(0.0)
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_solar(mut self, capacity: f64) -> Self {
        self.renewables.solar = Some(SolarArray {
            capacity: capacity.max(0.0),
        });
        self
    }

    pub fn with_wind(mut self, capacity: f64) -> Self {
        self.renewables.wind = Some(WindTurbine {
            capacity: capacity.max(0.0),
        });
        self
    }

    pub fn with_hydro(mut self, capacity: f64) -> Self {
        self.renewables.hydro = Some(HydroPlant {
            capacity: capacity.max(0.0),
        });
        self
    }

    pub fn with_battery(mut self, capacity: f64, charge: f64) -> Self {
        let capacity = capacity.max(0.0);
        self.battery = Some(Battery {
            capacity,
            charge: charge.clamp(0.0, capacity),
        });
        self
    }

    pub fn smart_grid(mut self) -> Self {
        self.smart_grid = true;
        self
    }

    pub fn prosumer(mut self) -> Self {
        self.prosumer = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// A transmission line between two buildings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub u: NodeId,
    pub v: NodeId,
    /// Never negative.
    pub capacity: f64,
    /// Economic input, opaque to the flow engine.
    pub cost: f64,
    /// Net flow from the last solve; positive means `u -> v`.
    pub flow: f64,
    pub removed: bool,
}

impl Edge {
    /// `|flow| / capacity`, zero for lines without capacity.
    pub fn usage_rate(&self) -> f64 {
        if self.capacity > EPSILON {
            self.flow.abs() / self.capacity
        } else {
            0.0
        }
    }

    /// The endpoint opposite `node`, if `node` is one of the endpoints.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.u == node {
            Some(self.v)
        } else if self.v == node {
            Some(self.u)
        } else {
            None
        }
    }
}

/// Line capacities are finite and non-negative. A non-finite rating is
/// treated like a dead line.
fn clamp_capacity(capacity: f64) -> f64 {
    if capacity.is_finite() {
        capacity.max(0.0)
    } else {
        warn!(capacity, "non-finite line capacity treated as zero");
        0.0
    }
}

// ---------------------------------------------------------------------------
// Grid model
// ---------------------------------------------------------------------------

/// Owns every node and edge and validates structural mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridModel {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GridModel {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Mutation -----------------------------------------------------------

    /// Add a node and return its id. The supply sign is not validated.
    pub fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            role: spec.role,
            base_supply: spec.base_supply,
            x: spec.x,
            y: spec.y,
            renewables: spec.renewables,
            battery: spec.battery,
            hydrogen: spec.hydrogen,
            smart_grid: spec.smart_grid,
            prosumer: spec.prosumer,
            current_supply: spec.base_supply,
            transmitted_power: 0.0,
            shortage: 0.0,
            blackout: false,
            removed: false,
        });
        id
    }

    /// Add a line between `u` and `v`. Rejected if either endpoint is out of
    /// range or removed. Negative and non-finite capacities become zero.
    pub fn add_edge(
        &mut self,
        u: NodeId,
        v: NodeId,
        capacity: f64,
        cost: f64,
    ) -> Result<EdgeId, GridError> {
        for (end, node) in [(LineEnd::U, u), (LineEnd::V, v)] {
            match self.nodes.get(node.index()) {
                None => {
                    let err = GridError::EndpointOutOfRange {
                        end,
                        node,
                        node_count: self.nodes.len(),
                    };
                    warn!(%u, %v, error = %err, "rejected line");
                    return Err(err);
                }
                Some(n) if n.removed => {
                    let err = GridError::EndpointRemoved { node };
                    warn!(%u, %v, error = %err, "rejected line");
                    return Err(err);
                }
                Some(_) => {}
            }
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            u,
            v,
            capacity: clamp_capacity(capacity),
            cost,
            flow: 0.0,
            removed: false,
        });
        Ok(id)
    }

    /// Soft-delete a node. Incident edges are kept but skipped by every pass
    /// that checks endpoint removal.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GridError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(GridError::UnknownNode(id))?;
        node.removed = true;
        Ok(())
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<(), GridError> {
        let edge = self
            .edges
            .get_mut(id.index())
            .ok_or(GridError::UnknownEdge(id))?;
        edge.removed = true;
        Ok(())
    }

    /// Clear every removal flag.
    pub fn restore_all(&mut self) {
        for node in &mut self.nodes {
            node.removed = false;
        }
        for edge in &mut self.edges {
            edge.removed = false;
        }
    }

    /// Set a line's capacity. Negative and non-finite values become zero.
    pub fn set_edge_capacity(&mut self, id: EdgeId, capacity: f64) -> Result<(), GridError> {
        let edge = self
            .edges
            .get_mut(id.index())
            .ok_or(GridError::UnknownEdge(id))?;
        edge.capacity = clamp_capacity(capacity);
        Ok(())
    }

    /// Set a node's base output (positive) or base demand (negative). The
    /// node's role is not changed.
    pub fn set_base_supply(&mut self, id: NodeId, base_supply: f64) -> Result<(), GridError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(GridError::UnknownNode(id))?;
        node.base_supply = base_supply;
        node.current_supply = base_supply;
        Ok(())
    }

    /// Override this tick's supply for a node. Overwritten by the next
    /// supply recomputation.
    pub fn set_current_supply(&mut self, id: NodeId, supply: f64) -> Result<(), GridError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(GridError::UnknownNode(id))?;
        node.current_supply = supply;
        Ok(())
    }

    // -- Access -------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.index())
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    /// Every node, removed ones included, in id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every edge, removed ones included, in id order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes that are present (not removed).
    pub fn live_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.removed)
    }

    pub fn is_live_node(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| !n.removed)
    }

    /// An edge takes part in flow only when it and both its endpoints are
    /// present.
    pub fn is_live_edge(&self, edge: &Edge) -> bool {
        !edge.removed && self.is_live_node(edge.u) && self.is_live_node(edge.v)
    }

    pub fn live_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| self.is_live_edge(e))
    }

    /// Live edges touching `node`, in edge id order.
    pub fn incident_live_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.live_edges()
            .filter(move |e| e.u == node || e.v == node)
    }

    // -- Aggregates ---------------------------------------------------------

    /// Sum of demand magnitudes over present nodes with negative supply.
    pub fn total_demand(&self) -> f64 {
        self.live_nodes()
            .filter(|n| n.current_supply < 0.0)
            .map(|n| -n.current_supply)
            .sum()
    }

    /// Sum of positive supply over present nodes.
    pub fn total_generation(&self) -> f64 {
        self.live_nodes()
            .filter(|n| n.current_supply > 0.0)
            .map(|n| n.current_supply)
            .sum()
    }

    /// Deterministic hash over node and edge state. Roles and renewable
    /// profiles are fixed at construction and left out.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.nodes.len() as u64);
        for n in &self.nodes {
            h.write_u32(n.id.0);
            h.write_f64(n.x);
            h.write_f64(n.y);
            h.write_f64(n.base_supply);
            h.write_f64(n.current_supply);
            h.write_f64(n.transmitted_power);
            h.write_f64(n.shortage);
            h.write_bool(n.blackout);
            h.write_bool(n.removed);
            h.write_bool(n.smart_grid);
            h.write_bool(n.prosumer);
            if let Some(b) = n.battery {
                h.write_f64(b.charge);
            }
            if let Some(t) = n.hydrogen {
                h.write_f64(t.level);
            }
        }
        h.write_u64(self.edges.len() as u64);
        for e in &self.edges {
            h.write_u32(e.u.0);
            h.write_u32(e.v.0);
            h.write_f64(e.capacity);
            h.write_f64(e.cost);
            h.write_f64(e.flow);
            h.write_bool(e.removed);
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes() -> (GridModel, NodeId, NodeId) {
        let mut grid = GridModel::new();
        let g = grid.add_node(NodeSpec::new(10.0));
        let c = grid.add_node(NodeSpec::new(-8.0));
        (grid, g, c)
    }

    #[test]
    fn node_ids_are_sequential() {
        let mut grid = GridModel::new();
        let a = grid.add_node(NodeSpec::neutral());
        let b = grid.add_node(NodeSpec::neutral());
        grid.remove_node(a).unwrap();
        let c = grid.add_node(NodeSpec::neutral());
        assert_eq!((a, b, c), (NodeId(0), NodeId(1), NodeId(2)));
    }

    #[test]
    fn role_is_inferred_once_from_sign() {
        let (mut grid, g, c) = two_nodes();
        assert!(grid.node(g).unwrap().role.is_generator());
        assert!(grid.node(c).unwrap().role.is_consumer());

        // Changing supply later does not re-infer the role.
        grid.set_base_supply(g, -5.0).unwrap();
        assert!(grid.node(g).unwrap().role.is_generator());
    }

    #[test]
    fn non_finite_capacities_become_dead_lines() {
        let (mut grid, g, c) = two_nodes();
        let inf = grid.add_edge(g, c, f64::INFINITY, 1.0).unwrap();
        let nan = grid.add_edge(g, c, f64::NAN, 1.0).unwrap();
        let huge = grid.add_edge(g, c, 1e300, 1.0).unwrap();
        assert_eq!(grid.edge(inf).unwrap().capacity, 0.0);
        assert_eq!(grid.edge(nan).unwrap().capacity, 0.0);
        assert_eq!(grid.edge(huge).unwrap().capacity, 1e300);

        grid.set_edge_capacity(huge, f64::NEG_INFINITY).unwrap();
        assert_eq!(grid.edge(huge).unwrap().capacity, 0.0);
        grid.set_edge_capacity(huge, f64::INFINITY).unwrap();
        assert_eq!(grid.edge(huge).unwrap().capacity, 0.0);
        assert_eq!(grid.edge(huge).unwrap().usage_rate(), 0.0);
    }

    #[test]
    fn add_edge_rejects_out_of_range() {
        let (mut grid, g, _) = two_nodes();
        let err = grid.add_edge(g, NodeId(9), 5.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            GridError::EndpointOutOfRange {
                end: LineEnd::V,
                node: NodeId(9),
                node_count: 2
            }
        );
        assert_eq!(grid.edge_count(), 0);
    }

    #[test]
    fn add_edge_rejects_removed_endpoint() {
        let (mut grid, g, c) = two_nodes();
        grid.remove_node(c).unwrap();
        assert_eq!(
            grid.add_edge(g, c, 5.0, 1.0),
            Err(GridError::EndpointRemoved { node: c })
        );
    }

    #[test]
    fn negative_capacity_is_clamped() {
        let (mut grid, g, c) = two_nodes();
        let e = grid.add_edge(g, c, -3.0, 1.0).unwrap();
        assert_eq!(grid.edge(e).unwrap().capacity, 0.0);

        grid.set_edge_capacity(e, -1.0).unwrap();
        assert_eq!(grid.edge(e).unwrap().capacity, 0.0);
        grid.set_edge_capacity(e, f64::NAN).unwrap();
        assert_eq!(grid.edge(e).unwrap().capacity, 0.0);
    }

    #[test]
    fn remove_node_does_not_cascade() {
        let (mut grid, g, c) = two_nodes();
        let e = grid.add_edge(g, c, 5.0, 1.0).unwrap();
        grid.remove_node(c).unwrap();

        let edge = grid.edge(e).unwrap();
        assert!(!edge.removed);
        assert!(!grid.is_live_edge(edge));
        assert_eq!(grid.live_edges().count(), 0);
    }

    #[test]
    fn restore_all_clears_flags() {
        let (mut grid, g, c) = two_nodes();
        let e = grid.add_edge(g, c, 5.0, 1.0).unwrap();
        grid.remove_node(g).unwrap();
        grid.remove_edge(e).unwrap();

        grid.restore_all();
        assert!(grid.is_live_node(g));
        assert_eq!(grid.live_edges().count(), 1);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut grid = GridModel::new();
        assert_eq!(grid.remove_node(NodeId(0)), Err(GridError::UnknownNode(NodeId(0))));
        assert_eq!(grid.remove_edge(EdgeId(2)), Err(GridError::UnknownEdge(EdgeId(2))));
        assert!(grid.set_edge_capacity(EdgeId(0), 1.0).is_err());
    }

    #[test]
    fn total_demand_skips_removed_and_generators() {
        let mut grid = GridModel::new();
        grid.add_node(NodeSpec::new(10.0));
        grid.add_node(NodeSpec::new(-4.0));
        let gone = grid.add_node(NodeSpec::new(-6.0));
        grid.add_node(NodeSpec::new(-1.5));
        grid.remove_node(gone).unwrap();

        assert!((grid.total_demand() - 5.5).abs() < 1e-12);
        assert!((grid.total_generation() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn plant_presets_attach_capabilities() {
        let wind = NodeSpec::wind_plant(100.0);
        assert_eq!(wind.base_supply, 30.0);
        assert_eq!(wind.renewables.wind, Some(WindTurbine { capacity: 100.0 }));

        let h2 = NodeSpec::hydrogen_storage(1000.0);
        assert_eq!(
            h2.role,
            NodeRole::Storage {
                kind: StorageKind::Hydrogen
            }
        );
        assert_eq!(h2.hydrogen.unwrap().level, 300.0);
    }

    #[test]
    fn battery_charge_is_clamped_on_construction() {
        let spec = NodeSpec::consumer(BuildingKind::Office, 5.0).with_battery(10.0, 25.0);
        assert_eq!(spec.battery.unwrap().charge, 10.0);
    }

    #[test]
    fn usage_rate_and_other_endpoint() {
        let (mut grid, g, c) = two_nodes();
        let e = grid.add_edge(g, c, 4.0, 1.0).unwrap();
        grid.edge_mut(e).unwrap().flow = -3.0;
        let edge = grid.edge(e).unwrap();
        assert!((edge.usage_rate() - 0.75).abs() < 1e-12);
        assert_eq!(edge.other(g), Some(c));
        assert_eq!(edge.other(NodeId(5)), None);
    }

    #[test]
    fn state_hash_tracks_changes() {
        let (mut grid, g, c) = two_nodes();
        let before = grid.state_hash();
        assert_eq!(before, grid.clone().state_hash());
        grid.add_edge(g, c, 1.0, 1.0).unwrap();
        assert_ne!(before, grid.state_hash());
    }
}
