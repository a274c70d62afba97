//! Maximum flow over a directed capacity graph.
//!
//! [`CapacityGraph`] stores, per node, its outgoing arcs in insertion order.
//! Arcs always come in pairs: setting `u -> v` also creates `v -> u` with
//! zero capacity when it does not exist yet, and each arc knows the index of
//! its partner. A solve works on a copy of the graph whose residuals it
//! consumes; the original capacities stay untouched so that
//! `flow(u, v) = capacity(u, v) - residual(u, v)`.
//!
//! Pushing `b` along `u -> v` lowers `residual(u, v)` and raises
//! `residual(v, u)` by the same amount, so the extracted flow is
//! skew-symmetric: `flow(u, v) == -flow(v, u)`.

use std::collections::VecDeque;

use tracing::debug;

/// Tolerance for every comparison against zero. Residuals at or below this
/// are treated as exhausted.
pub const EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Capacity graph
// ---------------------------------------------------------------------------

/// Negative and NaN capacities carry nothing; anything larger than
/// `f64::MAX` (including a sum that overflowed) is held at `f64::MAX`.
fn saturate(capacity: f64) -> f64 {
    if capacity.is_nan() {
        0.0
    } else {
        capacity.clamp(0.0, f64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Arc {
    to: usize,
    capacity: f64,
    residual: f64,
    flow: f64,
    /// Index of the partner arc in `adj[to]`.
    rev: usize,
}

/// Directed graph of arc capacities over nodes `0..node_count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityGraph {
    adj: Vec<Vec<Arc>>,
}

impl CapacityGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            adj: vec![Vec::new(); node_count],
        }
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Number of stored arcs with positive capacity.
    pub fn arc_count(&self) -> usize {
        self.adj
            .iter()
            .flatten()
            .filter(|a| a.capacity > EPSILON)
            .count()
    }

    fn find(&self, u: usize, v: usize) -> Option<usize> {
        self.adj.get(u)?.iter().position(|a| a.to == v)
    }

    /// Make sure the arc pair `u -> v` / `v -> u` exists and return the index
    /// of `u -> v` in `adj[u]`. New arcs start with zero capacity.
    fn ensure_pair(&mut self, u: usize, v: usize) -> usize {
        if let Some(i) = self.find(u, v) {
            return i;
        }
        let i = self.adj[u].len();
        let j = self.adj[v].len();
        self.adj[u].push(Arc {
            to: v,
            capacity: 0.0,
            residual: 0.0,
            flow: 0.0,
            rev: j,
        });
        self.adj[v].push(Arc {
            to: u,
            capacity: 0.0,
            residual: 0.0,
            flow: 0.0,
            rev: i,
        });
        i
    }

    /// Set the capacity of `u -> v`, replacing any previous value. Out of
    /// range endpoints and self loops are ignored; negative or NaN capacities
    /// become zero and `+inf` saturates at `f64::MAX`.
    pub fn set_capacity(&mut self, u: usize, v: usize, capacity: f64) {
        if u == v || u >= self.adj.len() || v >= self.adj.len() {
            return;
        }
        let capacity = saturate(capacity);
        let i = self.ensure_pair(u, v);
        let arc = &mut self.adj[u][i];
        arc.capacity = capacity;
        arc.residual = capacity;
    }

    /// Add `capacity` on top of whatever `u -> v` already carries.
    pub fn add_capacity(&mut self, u: usize, v: usize, capacity: f64) {
        let current = self.capacity(u, v);
        self.set_capacity(u, v, current + saturate(capacity));
    }

    /// Capacity of `u -> v`, zero if the arc does not exist.
    pub fn capacity(&self, u: usize, v: usize) -> f64 {
        self.find(u, v).map_or(0.0, |i| self.adj[u][i].capacity)
    }

    /// Remaining capacity of `u -> v`. On an unsolved graph this equals the
    /// capacity.
    pub fn residual(&self, u: usize, v: usize) -> f64 {
        self.find(u, v).map_or(0.0, |i| self.adj[u][i].residual)
    }

    /// Neighbors of `u` in insertion order, with their arc capacity.
    pub fn arcs_from(&self, u: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.adj
            .get(u)
            .into_iter()
            .flatten()
            .map(|a| (a.to, a.capacity))
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Computes a maximum flow from `source` to `sink`.
///
/// Implementations must be deterministic for a fixed graph construction
/// order and must not fail: an unreachable sink is a zero flow.
pub trait FlowSolver {
    fn solve(&self, graph: &CapacityGraph, source: usize, sink: usize) -> FlowSolution;
}

/// Breadth-first augmenting paths (Edmonds–Karp).
///
/// Each round finds a shortest path by arc count; ties go to whichever
/// neighbor appears first in insertion order. The search stops as soon as
/// the sink is labelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdmondsKarp;

impl FlowSolver for EdmondsKarp {
    fn solve(&self, graph: &CapacityGraph, source: usize, sink: usize) -> FlowSolution {
        let mut residual = graph.clone();
        let n = residual.node_count();
        let mut value = 0.0;
        let mut augmentations = 0usize;

        if source >= n || sink >= n || source == sink {
            return FlowSolution {
                value,
                augmentations,
                graph: residual,
            };
        }

        let mut parent: Vec<Option<(usize, usize)>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::with_capacity(n);

        loop {
            parent.fill(None);
            visited.fill(false);
            queue.clear();
            visited[source] = true;
            queue.push_back(source);

            'bfs: while let Some(u) = queue.pop_front() {
                for (i, arc) in residual.adj[u].iter().enumerate() {
                    if visited[arc.to] || arc.residual <= EPSILON {
                        continue;
                    }
                    visited[arc.to] = true;
                    parent[arc.to] = Some((u, i));
                    if arc.to == sink {
                        break 'bfs;
                    }
                    queue.push_back(arc.to);
                }
            }

            if !visited[sink] {
                break;
            }

            let mut bottleneck = f64::INFINITY;
            let mut v = sink;
            while let Some((u, i)) = parent[v] {
                bottleneck = bottleneck.min(residual.adj[u][i].residual);
                v = u;
            }

            let mut v = sink;
            while let Some((u, i)) = parent[v] {
                let rev = residual.adj[u][i].rev;
                residual.adj[u][i].residual -= bottleneck;
                residual.adj[u][i].flow += bottleneck;
                residual.adj[v][rev].residual += bottleneck;
                residual.adj[v][rev].flow -= bottleneck;
                v = u;
            }

            value += bottleneck;
            augmentations += 1;
        }

        debug!(
            nodes = n,
            arcs = graph.arc_count(),
            augmentations,
            max_flow = value,
            "max flow solved"
        );

        FlowSolution {
            value,
            augmentations,
            graph: residual,
        }
    }
}

// ---------------------------------------------------------------------------
// Solution
// ---------------------------------------------------------------------------

/// Result of a solve: the flow value plus the residual graph it left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSolution {
    value: f64,
    augmentations: usize,
    graph: CapacityGraph,
}

impl FlowSolution {
    /// Total flow pushed from source to sink.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Number of augmenting paths used.
    pub fn augmentations(&self) -> usize {
        self.augmentations
    }

    pub fn capacity(&self, u: usize, v: usize) -> f64 {
        self.graph.capacity(u, v)
    }

    pub fn residual(&self, u: usize, v: usize) -> f64 {
        self.graph.residual(u, v)
    }

    /// Amount pushed along `u -> v`. Negative when the net movement
    /// between the pair is `v -> u`.
    pub fn flow(&self, u: usize, v: usize) -> f64 {
        self.graph
            .find(u, v)
            .map_or(0.0, |i| self.graph.adj[u][i].flow)
    }

    /// Net flow between `u` and `v` after cancelling opposite directions:
    /// `max(0, flow(u, v)) - max(0, flow(v, u))`.
    pub fn net_flow(&self, u: usize, v: usize) -> f64 {
        self.flow(u, v).max(0.0) - self.flow(v, u).max(0.0)
    }

    /// Flow leaving `node` minus flow entering it.
    pub fn net_outflow(&self, node: usize) -> f64 {
        self.graph
            .adj
            .get(node)
            .into_iter()
            .flatten()
            .map(|a| a.flow)
            .sum()
    }
}
