//! Property tests over random grids: conservation, capacity bounds,
//! source/sink balance, recompute idempotence and the effect of removals.

use gridflow_core::EPSILON;
use gridflow_core::flow::EdmondsKarp;
use gridflow_core::grid::{GridModel, NodeSpec};
use gridflow_core::id::{EdgeId, NodeId};
use gridflow_core::network::{BuildOutcome, NetworkBuilder};
use gridflow_core::orchestrator::PowerOrchestrator;
use gridflow_core::test_utils::TOLERANCE;
use proptest::prelude::*;

// ===========================================================================
// Strategies
// ===========================================================================

fn arb_grid() -> impl Strategy<Value = GridModel> {
    (2usize..10)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(-20.0f64..20.0, n),
                prop::collection::vec((0..n, 0..n, 0.0f64..30.0), 0..3 * n),
            )
        })
        .prop_map(|(supplies, lines)| {
            let mut grid = GridModel::new();
            for supply in supplies {
                grid.add_node(NodeSpec::new(supply));
            }
            for (u, v, capacity) in lines {
                grid.add_edge(NodeId(u as u32), NodeId(v as u32), capacity, 1.0)
                    .unwrap();
            }
            grid
        })
}

fn max_flow(grid: &mut GridModel) -> f64 {
    let mut orch = PowerOrchestrator::default();
    orch.recompute(grid, 0);
    orch.stats().max_flow
}

/// Power arriving at each node over present lines.
fn inbound(grid: &GridModel) -> Vec<f64> {
    let mut totals = vec![0.0; grid.node_count()];
    for edge in grid.edges().iter().filter(|e| !e.removed) {
        if edge.flow > EPSILON {
            totals[edge.v.index()] += edge.flow;
        } else if edge.flow < -EPSILON {
            totals[edge.u.index()] -= edge.flow;
        }
    }
    totals
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn flow_is_conserved_at_every_building(grid in arb_grid()) {
        if let BuildOutcome::Ready(network) = NetworkBuilder::build(&grid) {
            let solution = network.solve(&EdmondsKarp);
            for i in 0..grid.node_count() {
                prop_assert!(solution.net_outflow(i).abs() < TOLERANCE);
            }
            prop_assert!((solution.net_outflow(network.source()) - solution.value()).abs() < TOLERANCE);
            prop_assert!((solution.net_outflow(network.sink()) + solution.value()).abs() < TOLERANCE);
        }
    }

    #[test]
    fn arcs_and_lines_respect_capacity(mut grid in arb_grid()) {
        if let BuildOutcome::Ready(network) = NetworkBuilder::build(&grid) {
            let solution = network.solve(&EdmondsKarp);
            let n = network.graph().node_count();
            for u in 0..n {
                for v in 0..n {
                    prop_assert!(solution.flow(u, v) <= solution.capacity(u, v) + TOLERANCE);
                }
            }
        }

        max_flow(&mut grid);
        for edge in grid.edges() {
            prop_assert!(edge.flow.abs() <= edge.capacity + TOLERANCE);
        }
    }

    #[test]
    fn delivery_bounded_by_supply_and_demand(mut grid in arb_grid()) {
        let supply: f64 = grid.live_nodes().map(|n| n.current_supply.max(0.0)).sum();
        let demand = grid.total_demand();
        let flow = max_flow(&mut grid);
        prop_assert!(flow >= 0.0);
        prop_assert!(flow <= supply + TOLERANCE);
        prop_assert!(flow <= demand + TOLERANCE);
    }

    #[test]
    fn blackout_matches_received_power(mut grid in arb_grid()) {
        max_flow(&mut grid);
        let received = inbound(&grid);
        for node in grid.nodes() {
            if node.current_supply >= 0.0 {
                prop_assert!(!node.blackout);
                prop_assert_eq!(node.shortage, 0.0);
                continue;
            }
            let demand = -node.current_supply;
            let got = received[node.id.index()];
            prop_assert_eq!(node.blackout, got < 0.8 * demand);
            prop_assert!(node.shortage >= 0.0);
            prop_assert!((node.shortage - (demand - got).max(0.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn recompute_is_idempotent(mut grid in arb_grid()) {
        let mut orch = PowerOrchestrator::default();
        orch.recompute(&mut grid, 0);
        let first = grid.state_hash();
        let stats = orch.stats().clone();

        let events = orch.recompute(&mut grid, 1);
        prop_assert_eq!(grid.state_hash(), first);
        prop_assert_eq!(orch.stats(), &stats);
        prop_assert!(events.is_empty());
    }

    #[test]
    fn removing_a_line_never_raises_flow(mut grid in arb_grid(), pick in any::<prop::sample::Index>()) {
        prop_assume!(grid.edge_count() > 0);
        let before = max_flow(&mut grid);
        let edge = EdgeId(pick.index(grid.edge_count()) as u32);
        grid.remove_edge(edge).unwrap();
        let after = max_flow(&mut grid);
        prop_assert!(after <= before + TOLERANCE);
        prop_assert_eq!(grid.edge(edge).unwrap().flow, 0.0);
    }

    #[test]
    fn removing_a_building_idles_its_lines(mut grid in arb_grid(), pick in any::<prop::sample::Index>()) {
        let node = NodeId(pick.index(grid.node_count()) as u32);
        grid.remove_node(node).unwrap();
        max_flow(&mut grid);
        for edge in grid.edges().iter().filter(|e| e.u == node || e.v == node) {
            prop_assert_eq!(edge.flow, 0.0);
        }
        let removed = grid.node(node).unwrap();
        prop_assert!(!removed.blackout);
        prop_assert_eq!(removed.shortage, 0.0);
    }
}
