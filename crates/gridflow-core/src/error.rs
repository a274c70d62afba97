//! Structural errors raised at the grid mutation boundary.

use crate::id::{EdgeId, NodeId};

/// Which end of a line an endpoint error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    U,
    V,
}

impl std::fmt::Display for LineEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineEnd::U => f.write_str("u"),
            LineEnd::V => f.write_str("v"),
        }
    }
}

/// A rejected grid mutation. Callers must check these; nothing is applied
/// when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("line endpoint {end} = {node} is out of range (grid has {node_count} nodes)")]
    EndpointOutOfRange {
        end: LineEnd,
        node: NodeId,
        node_count: usize,
    },
    #[error("line endpoint {node} has been removed")]
    EndpointRemoved { node: NodeId },
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),
}
