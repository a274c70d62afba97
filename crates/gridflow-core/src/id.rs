use serde::{Deserialize, Serialize};

/// Identifies a node (building) in the grid. Assigned sequentially and never
/// reused, so removed nodes keep their index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identifies an edge (power line) in the grid. Assigned sequentially and
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl NodeId {
    /// Position of this node in the model's storage and in the augmented
    /// flow network.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_equality() {
        assert_eq!(NodeId(0), NodeId(0));
        assert_ne!(NodeId(0), NodeId(1));
    }

    #[test]
    fn ids_index_into_storage() {
        assert_eq!(NodeId(7).index(), 7);
        assert_eq!(EdgeId(3).index(), 3);
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(EdgeId(0), "feeder");
        map.insert(EdgeId(1), "tie");
        assert_eq!(map[&EdgeId(1)], "tie");
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(NodeId(4).to_string(), "n4");
        assert_eq!(EdgeId(12).to_string(), "e12");
    }
}
