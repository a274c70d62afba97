//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::grid::{BuildingKind, GeneratorKind, GridModel, NodeSpec};
use crate::id::{EdgeId, NodeId};
use crate::rng::SimRng;
use crate::weather::{Season, Weather, WeatherCondition};

// ===========================================================================
// Float comparison
// ===========================================================================

pub const TOLERANCE: f64 = 1e-6;

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

// ===========================================================================
// Weather
// ===========================================================================

/// Clear, 20 °C, clean air, with humidity at the comfort level for
/// `month`'s season. Temperature, humidity and particulate factors are all
/// exactly 1 under this weather.
pub fn neutral_weather(month: u32) -> Weather {
    let mut weather = Weather::new(WeatherCondition::Clear);
    weather.humidity = match Season::from_month(month) {
        Season::Summer => 60.0,
        Season::Winter => 40.0,
        Season::Spring | Season::Autumn => 50.0,
    };
    weather
}

// ===========================================================================
// Node and line constructors
// ===========================================================================

pub fn generator(grid: &mut GridModel, output: f64) -> NodeId {
    grid.add_node(NodeSpec::generator(GeneratorKind::Thermal, output))
}

pub fn consumer(grid: &mut GridModel, demand: f64) -> NodeId {
    grid.add_node(NodeSpec::consumer(BuildingKind::Apartment, demand))
}

/// Add a unit-cost line. Panics if the endpoints are rejected.
pub fn line(grid: &mut GridModel, u: NodeId, v: NodeId, capacity: f64) -> EdgeId {
    grid.add_edge(u, v, capacity, 1.0).unwrap()
}

// ===========================================================================
// Reference scenarios
// ===========================================================================

/// A small grid with its nodes and lines grouped by role.
#[derive(Debug, Clone)]
pub struct TestGrid {
    pub grid: GridModel,
    pub generators: Vec<NodeId>,
    pub consumers: Vec<NodeId>,
    pub lines: Vec<EdgeId>,
}

fn single_line(gen_output: f64, capacity: f64, demand: f64) -> TestGrid {
    let mut grid = GridModel::new();
    let g = generator(&mut grid, gen_output);
    let c = consumer(&mut grid, demand);
    let e = line(&mut grid, g, c, capacity);
    TestGrid {
        grid,
        generators: vec![g],
        consumers: vec![c],
        lines: vec![e],
    }
}

/// Generator 10, line 5, demand 8: line-limited, consumer in blackout.
pub fn scenario_a() -> TestGrid {
    single_line(10.0, 5.0, 8.0)
}

/// Generator 20, line 30, demand 15: fully served.
pub fn scenario_b() -> TestGrid {
    single_line(20.0, 30.0, 15.0)
}

/// Two generators of 10 on separate lines of 10 into a demand of 15.
pub fn scenario_c() -> TestGrid {
    let mut grid = GridModel::new();
    let g1 = generator(&mut grid, 10.0);
    let g2 = generator(&mut grid, 10.0);
    let c = consumer(&mut grid, 15.0);
    let e1 = line(&mut grid, g1, c, 10.0);
    let e2 = line(&mut grid, g2, c, 10.0);
    TestGrid {
        grid,
        generators: vec![g1, g2],
        consumers: vec![c],
        lines: vec![e1, e2],
    }
}

/// Generator 10, line 3, demand 10: line-limited, shortage 7.
pub fn scenario_d() -> TestGrid {
    single_line(10.0, 3.0, 10.0)
}

// ===========================================================================
// Synthetic city
// ===========================================================================

/// A `rows` x `cols` lattice of buildings joined to their right and lower
/// neighbours. Every `plant_every`-th node is a generator; the rest are
/// consumers. Outputs, demands and line capacities are drawn from `seed`.
pub fn city_grid(rows: usize, cols: usize, plant_every: usize, seed: u64) -> GridModel {
    let mut rng = SimRng::new(seed);
    let mut grid = GridModel::new();
    let plant_every = plant_every.max(1);

    for i in 0..rows * cols {
        let (r, c) = (i / cols, i % cols);
        let spec = if i % plant_every == 0 {
            NodeSpec::generator(GeneratorKind::Thermal, rng.uniform(40.0, 120.0))
        } else {
            NodeSpec::consumer(BuildingKind::Apartment, rng.uniform(5.0, 20.0))
        };
        grid.add_node(spec.at(c as f64 * 50.0, r as f64 * 50.0));
    }

    for r in 0..rows {
        for c in 0..cols {
            let here = NodeId((r * cols + c) as u32);
            if c + 1 < cols {
                let right = NodeId((r * cols + c + 1) as u32);
                line(&mut grid, here, right, rng.uniform(10.0, 60.0));
            }
            if r + 1 < rows {
                let below = NodeId(((r + 1) * cols + c) as u32);
                line(&mut grid, here, below, rng.uniform(10.0, 60.0));
            }
        }
    }

    grid
}
