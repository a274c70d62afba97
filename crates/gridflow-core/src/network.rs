//! Translation of the grid into a single-source single-sink flow network.
//!
//! Real nodes keep their index; two virtual nodes are appended after every
//! stored node (removed ones included): `SOURCE = node_count` and
//! `SINK = node_count + 1`. Arcs are inserted in a fixed order (source arcs
//! by node id, then sink arcs by node id, then lines by edge id) so the
//! solver's tie-breaking is reproducible.
//!
//! Parallel lines between the same pair of nodes pool their capacity into
//! one arc pair; the pair's net flow is split back across them in
//! proportion to each line's capacity.

use tracing::debug;

use crate::flow::{CapacityGraph, EPSILON, FlowSolution, FlowSolver};
use crate::grid::GridModel;
use crate::id::{EdgeId, NodeId};

/// Why a build produced no network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degenerate {
    /// No present node has positive supply.
    NoGenerators,
    /// No present node has negative supply.
    NoConsumers,
}

/// Outcome of [`NetworkBuilder::build`].
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Ready(AugmentedNetwork),
    /// Nothing to solve; every line carries zero flow.
    Degenerate(Degenerate),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LineArc {
    edge: EdgeId,
    u: usize,
    v: usize,
    capacity: f64,
}

/// The capacity graph for one solve plus the bookkeeping needed to map the
/// solution back onto grid lines.
#[derive(Debug, Clone)]
pub struct AugmentedNetwork {
    graph: CapacityGraph,
    source: usize,
    sink: usize,
    generators: Vec<NodeId>,
    consumers: Vec<NodeId>,
    lines: Vec<LineArc>,
}

impl AugmentedNetwork {
    pub fn graph(&self) -> &CapacityGraph {
        &self.graph
    }

    pub fn source(&self) -> usize {
        self.source
    }

    pub fn sink(&self) -> usize {
        self.sink
    }

    /// Generators wired to the source, in id order.
    pub fn generators(&self) -> &[NodeId] {
        &self.generators
    }

    /// Consumers wired to the sink, in id order.
    pub fn consumers(&self) -> &[NodeId] {
        &self.consumers
    }

    pub fn solve(&self, solver: &impl FlowSolver) -> FlowSolution {
        solver.solve(&self.graph, self.source, self.sink)
    }

    /// Net flow for every line that took part in the build, oriented
    /// `u -> v` and clamped to the line's own capacity.
    pub fn line_flows(&self, solution: &FlowSolution) -> Vec<(EdgeId, f64)> {
        self.lines
            .iter()
            .map(|line| {
                let pooled = self.graph.capacity(line.u, line.v);
                let flow = if pooled > EPSILON {
                    solution.net_flow(line.u, line.v) * (line.capacity / pooled)
                } else {
                    0.0
                };
                (line.edge, flow.clamp(-line.capacity, line.capacity))
            })
            .collect()
    }
}

/// Builds an [`AugmentedNetwork`] from the grid's current state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkBuilder;

impl NetworkBuilder {
    /// Index of the virtual source for a grid with `node_count` stored nodes.
    pub fn source_index(node_count: usize) -> usize {
        node_count
    }

    pub fn sink_index(node_count: usize) -> usize {
        node_count + 1
    }

    /// Sum of capacities of the live lines touching `node`: the most a
    /// generator can push out this tick.
    pub fn transmission_headroom(grid: &GridModel, node: NodeId) -> f64 {
        grid.incident_live_edges(node)
            .filter(|e| e.u != e.v)
            .map(|e| e.capacity)
            .sum()
    }

    pub fn build(grid: &GridModel) -> BuildOutcome {
        let generators: Vec<NodeId> = grid
            .live_nodes()
            .filter(|n| n.current_supply > 0.0)
            .map(|n| n.id)
            .collect();
        if generators.is_empty() {
            debug!("no generating nodes, skipping solve");
            return BuildOutcome::Degenerate(Degenerate::NoGenerators);
        }

        let consumers: Vec<NodeId> = grid
            .live_nodes()
            .filter(|n| n.current_supply < 0.0)
            .map(|n| n.id)
            .collect();
        if consumers.is_empty() {
            debug!("no consuming nodes, skipping solve");
            return BuildOutcome::Degenerate(Degenerate::NoConsumers);
        }

        let n = grid.node_count();
        let source = Self::source_index(n);
        let sink = Self::sink_index(n);
        let mut graph = CapacityGraph::new(n + 2);

        for &g in &generators {
            let supply = grid.node(g).map_or(0.0, |node| node.current_supply);
            let usable = supply.min(Self::transmission_headroom(grid, g));
            graph.set_capacity(source, g.index(), usable);
        }

        for &c in &consumers {
            let demand = grid.node(c).map_or(0.0, |node| node.demand());
            graph.set_capacity(c.index(), sink, demand);
        }

        let mut lines = Vec::new();
        for edge in grid.live_edges() {
            if edge.u == edge.v || edge.capacity <= EPSILON {
                continue;
            }
            let (u, v) = (edge.u.index(), edge.v.index());
            graph.add_capacity(u, v, edge.capacity);
            graph.add_capacity(v, u, edge.capacity);
            lines.push(LineArc {
                edge: edge.id,
                u,
                v,
                capacity: edge.capacity,
            });
        }

        BuildOutcome::Ready(AugmentedNetwork {
            graph,
            source,
            sink,
            generators,
            consumers,
            lines,
        })
    }
}
