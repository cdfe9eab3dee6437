use repurpose_core::model::{EdgeKind, NodeId};
use std::collections::{BTreeMap, HashSet};

/// Neighbor entry: (node, relation)
pub type Neighbor = (NodeId, EdgeKind);

/// Undirected adjacency list over typed nodes. Insertion order is preserved
/// per node so traversals are reproducible.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdjacencyIndex {
    adjacency: BTreeMap<NodeId, Vec<Neighbor>>,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: NodeId) {
        self.adjacency.entry(id).or_default();
    }

    pub fn add_edge(&mut self, a: &NodeId, b: &NodeId, kind: EdgeKind) {
        self.adjacency
            .entry(a.clone())
            .or_default()
            .push((b.clone(), kind));
        self.adjacency
            .entry(b.clone())
            .or_default()
            .push((a.clone(), kind));
    }

    /// 1-hop neighbors
    pub fn neighbors(&self, id: &NodeId) -> &[Neighbor] {
        self.adjacency
            .get(id)
            .map(|edges| edges.as_slice())
            .unwrap_or_default()
    }

    /// BFS hop count between two nodes, `None` when farther than `max_hops`.
    pub fn shortest_path_len(&self, from: &NodeId, to: &NodeId, max_hops: usize) -> Option<usize> {
        if from == to {
            return self.adjacency.contains_key(from).then_some(0);
        }
        let mut seen: HashSet<&NodeId> = HashSet::from([from]);
        let mut frontier: Vec<&NodeId> = vec![from];

        for hop in 1..=max_hops {
            let mut next_frontier = Vec::new();
            for node in frontier {
                for (next, _) in self.neighbors(node) {
                    if next == to {
                        return Some(hop);
                    }
                    if seen.insert(next) {
                        next_frontier.push(next);
                    }
                }
            }
            if next_frontier.is_empty() {
                return None;
            }
            frontier = next_frontier;
        }
        None
    }

    /// Undirected edge count.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|v| v.len()).sum::<usize>() / 2
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}
