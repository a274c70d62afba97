//! Queue of grid edits submitted by hosts (UI, scripting, tooling).
//!
//! Commands are buffered and applied at the start of the next step so edits
//! never interleave with a solve.

use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::grid::{GridModel, NodeSpec};
use crate::id::{EdgeId, NodeId};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GridCommand {
    AddNode(NodeSpec),
    RemoveNode { node: NodeId },
    AddEdge {
        u: NodeId,
        v: NodeId,
        capacity: f64,
        cost: f64,
    },
    RemoveEdge { edge: EdgeId },
    SetEdgeCapacity { edge: EdgeId, capacity: f64 },
    SetBaseSupply { node: NodeId, supply: f64 },
    RestoreAll,
}

/// What a successfully applied command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Node(NodeId),
    Edge(EdgeId),
    Done,
}

impl GridCommand {
    /// Apply the command to `grid`. Rejections leave the grid unchanged.
    pub fn apply(&self, grid: &mut GridModel) -> Result<Applied, GridError> {
        match self {
            GridCommand::AddNode(spec) => Ok(Applied::Node(grid.add_node(spec.clone()))),
            GridCommand::RemoveNode { node } => grid.remove_node(*node).map(|_| Applied::Done),
            GridCommand::AddEdge {
                u,
                v,
                capacity,
                cost,
            } => grid.add_edge(*u, *v, *capacity, *cost).map(Applied::Edge),
            GridCommand::RemoveEdge { edge } => grid.remove_edge(*edge).map(|_| Applied::Done),
            GridCommand::SetEdgeCapacity { edge, capacity } => grid
                .set_edge_capacity(*edge, *capacity)
                .map(|_| Applied::Done),
            GridCommand::SetBaseSupply { node, supply } => grid
                .set_base_supply(*node, *supply)
                .map(|_| Applied::Done),
            GridCommand::RestoreAll => {
                grid.restore_all();
                Ok(Applied::Done)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Pending commands plus an optional bounded history of drained ones.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: Vec<GridCommand>,
    /// Drained commands as (tick, command).
    history: Vec<(u64, GridCommand)>,
    /// 0 keeps no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that retains up to `max_history` drained commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: GridCommand) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = GridCommand>) {
        self.pending.extend(commands);
    }

    /// Take every pending command in submission order, recording them in
    /// history under `tick`.
    pub fn drain(&mut self, tick: u64) -> Vec<GridCommand> {
        let commands: Vec<GridCommand> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            self.history
                .extend(commands.iter().cloned().map(|cmd| (tick, cmd)));
            let excess = self.history.len().saturating_sub(self.max_history);
            self.history.drain(..excess);
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(u64, GridCommand)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
