//! # Social Graph
//!
//! Directed graph whose nodes carry the two state variables of the loneliness
//! model: connectivity `k` and energy `e`.
//!
//! ## Layout
//!
//! - Node identities (`NodeId`) are stable for the lifetime of a graph and map
//!   to dense slots through an `FxHashMap`.
//! - Node states live in a contiguous `Vec<NodeState>` indexed by slot, so the
//!   dynamics engine can double-buffer the whole state vector.
//! - In/out adjacency is kept per slot in `SmallVec`s; an arc set gives O(1)
//!   duplicate detection for the rewiring search.
//!
//! Arcs never form self-loops and are never duplicated; `add_edge` and
//! `swap_targets` enforce both.
//!
//! ## Example
//!
//! ```rust
//! use lonenet_core::engine::graph::{NodeId, NodeState, SocialGraph};
//!
//! let mut graph = SocialGraph::default();
//! graph.add_node(NodeId(0), NodeState::uniform(0.2)).unwrap();
//! graph.add_node(NodeId(1), NodeState::uniform(0.8)).unwrap();
//! assert!(graph.add_edge(NodeId(0), NodeId(1)).unwrap());
//! assert_eq!(graph.out_degree(NodeId(0)), 1);
//! ```

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::engine::errors::ModelError;

/// Inline adjacency capacity before spilling to the heap.
const INLINE_DEGREE: usize = 8;

/// A unique identifier for a node in the social graph.
///
/// NodeId implements Ord/PartialOrd for stable, deterministic iteration.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-node state of the co-evolution model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeState {
    /// Connectivity (tie-strength proxy)
    pub k: f64,
    /// Energy (probability-like loneliness complement)
    pub e: f64,
}

impl NodeState {
    /// State of a freshly generated node: `k` starts equal to `e`.
    pub fn uniform(value: f64) -> Self {
        Self { k: value, e: value }
    }
}

/// A directed arc expressed in node identities.
pub type Link = (NodeId, NodeId);

/// Directed social graph with dense node storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialGraph {
    /// Node identity per slot
    ids: Vec<NodeId>,
    /// Node state per slot
    states: Vec<NodeState>,
    /// Index mapping NodeId to slot
    node_index: FxHashMap<NodeId, usize>,
    /// Outgoing neighbor slots, in insertion order
    out_adj: Vec<SmallVec<[usize; INLINE_DEGREE]>>,
    /// Incoming neighbor slots, in insertion order
    in_adj: Vec<SmallVec<[usize; INLINE_DEGREE]>>,
    /// Arc set over slots for duplicate detection
    arcs: FxHashSet<(usize, usize)>,
    /// Optional arc weights (unused by the dynamics)
    weights: FxHashMap<(usize, usize), f64>,
}

impl SocialGraph {
    /// Creates an empty graph with room for `nodes` nodes.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            ids: Vec::with_capacity(nodes),
            states: Vec::with_capacity(nodes),
            node_index: FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
            out_adj: Vec::with_capacity(nodes),
            in_adj: Vec::with_capacity(nodes),
            arcs: FxHashSet::default(),
            weights: FxHashMap::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Adds a node and returns its slot.
    pub fn add_node(&mut self, id: NodeId, state: NodeState) -> Result<usize, ModelError> {
        if self.node_index.contains_key(&id) {
            return Err(ModelError::InvariantViolation(format!(
                "node {} already exists",
                id
            )));
        }
        let slot = self.ids.len();
        self.ids.push(id);
        self.states.push(state);
        self.out_adj.push(SmallVec::new());
        self.in_adj.push(SmallVec::new());
        self.node_index.insert(id, slot);
        Ok(slot)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    /// Slot of a node, if present.
    pub fn slot(&self, id: NodeId) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    /// Node identity stored at `slot`.
    pub fn id_at(&self, slot: usize) -> NodeId {
        self.ids[slot]
    }

    /// Node identities in slot order.
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    /// Node states in slot order.
    pub fn states(&self) -> &[NodeState] {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut [NodeState] {
        &mut self.states
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.slot(id).map(|slot| self.states[slot])
    }

    pub fn set_state(&mut self, id: NodeId, state: NodeState) -> Result<(), ModelError> {
        let slot = self.require_slot(id)?;
        self.states[slot] = state;
        Ok(())
    }

    /// Exchanges the state vector with `buffer` (double-buffered updates).
    ///
    /// Both vectors must hold one state per node.
    pub(crate) fn exchange_states(&mut self, buffer: &mut Vec<NodeState>) {
        debug_assert_eq!(buffer.len(), self.states.len());
        std::mem::swap(&mut self.states, buffer);
    }

    /// Adds an unweighted arc. Returns `false` if the arc already existed.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> Result<bool, ModelError> {
        let (s, d) = self.arc_slots(src, dst)?;
        Ok(self.insert_arc(s, d, None))
    }

    /// Adds a weighted arc. Returns `false` if the arc already existed.
    pub fn add_weighted_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        weight: f64,
    ) -> Result<bool, ModelError> {
        let (s, d) = self.arc_slots(src, dst)?;
        Ok(self.insert_arc(s, d, Some(weight)))
    }

    /// Removes an arc. Returns `false` if it was not present.
    pub fn remove_edge(&mut self, src: NodeId, dst: NodeId) -> bool {
        match (self.slot(src), self.slot(dst)) {
            (Some(s), Some(d)) => self.remove_arc(s, d).is_some(),
            _ => false,
        }
    }

    pub fn has_edge(&self, src: NodeId, dst: NodeId) -> bool {
        match (self.slot(src), self.slot(dst)) {
            (Some(s), Some(d)) => self.arcs.contains(&(s, d)),
            _ => false,
        }
    }

    pub fn weight(&self, src: NodeId, dst: NodeId) -> Option<f64> {
        let s = self.slot(src)?;
        let d = self.slot(dst)?;
        self.weights.get(&(s, d)).copied()
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.slot(id).map_or(0, |slot| self.out_adj[slot].len())
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.slot(id).map_or(0, |slot| self.in_adj[slot].len())
    }

    /// Total (in + out) degree of a node.
    pub fn degree(&self, id: NodeId) -> usize {
        self.in_degree(id) + self.out_degree(id)
    }

    /// Incoming neighbor slots of `slot`.
    pub fn in_slots(&self, slot: usize) -> &[usize] {
        &self.in_adj[slot]
    }

    /// Outgoing neighbor slots of `slot`.
    pub fn out_slots(&self, slot: usize) -> &[usize] {
        &self.out_adj[slot]
    }

    /// Out-neighbors of a node in insertion order.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.slot(id).map_or_else(Vec::new, |slot| {
            self.out_adj[slot].iter().map(|&d| self.ids[d]).collect()
        })
    }

    /// All arcs as slot pairs, ordered by source slot then insertion order.
    pub fn edge_slots(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.out_adj
            .iter()
            .enumerate()
            .flat_map(|(s, targets)| targets.iter().map(move |&d| (s, d)))
    }

    /// All arcs, ordered by source slot then insertion order.
    pub fn edges(&self) -> impl Iterator<Item = Link> + '_ {
        self.edge_slots().map(|(s, d)| (self.ids[s], self.ids[d]))
    }

    /// `(id, in_degree, out_degree)` for every node in slot order.
    pub fn degree_sequence(&self) -> Vec<(NodeId, usize, usize)> {
        self.ids
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, self.in_adj[slot].len(), self.out_adj[slot].len()))
            .collect()
    }

    /// Degree-preserving swap of the far endpoints of two arcs.
    ///
    /// `(u1 -> v1), (u2 -> v2)` become `(u1 -> v2), (u2 -> v1)`. The swap is
    /// rejected without mutating the graph (returns `Ok(false)`) when it would
    /// create a self-loop or an arc that already exists. Both input arcs must
    /// be present.
    pub fn swap_targets(&mut self, first: Link, second: Link) -> Result<bool, ModelError> {
        let (u1, v1) = self.arc_slots(first.0, first.1)?;
        let (u2, v2) = self.arc_slots(second.0, second.1)?;
        if !self.arcs.contains(&(u1, v1)) || !self.arcs.contains(&(u2, v2)) {
            return Err(ModelError::InvariantViolation(format!(
                "swap candidates {:?} / {:?} are not both present",
                first, second
            )));
        }
        if (u1, v1) == (u2, v2) || u1 == v2 || u2 == v1 {
            return Ok(false);
        }
        if self.arcs.contains(&(u1, v2)) || self.arcs.contains(&(u2, v1)) {
            return Ok(false);
        }

        let w1 = self.remove_arc(u1, v1).flatten();
        let w2 = self.remove_arc(u2, v2).flatten();
        self.insert_arc(u1, v2, w1);
        self.insert_arc(u2, v1, w2);
        Ok(true)
    }

    /// Disjoint union: copies every node and arc of `other` into `self`.
    pub fn compose(&mut self, other: &SocialGraph) -> Result<(), ModelError> {
        if let Some(clash) = other.ids.iter().find(|id| self.contains_node(**id)) {
            return Err(ModelError::InvariantViolation(format!(
                "cannot compose graphs sharing node {}",
                clash
            )));
        }
        for (slot, &id) in other.ids.iter().enumerate() {
            self.add_node(id, other.states[slot])?;
        }
        for (s, d) in other.edge_slots() {
            let src = self.require_slot(other.ids[s])?;
            let dst = self.require_slot(other.ids[d])?;
            let weight = other.weights.get(&(s, d)).copied();
            self.insert_arc(src, dst, weight);
        }
        Ok(())
    }

    /// True if the undirected skeleton forms a single component.
    ///
    /// The empty graph counts as connected.
    pub fn is_weakly_connected(&self) -> bool {
        let n = self.ids.len();
        if n == 0 {
            return true;
        }
        let mut seen = vec![false; n];
        let mut stack = vec![0usize];
        seen[0] = true;
        let mut reached = 1;
        while let Some(slot) = stack.pop() {
            for &next in self.out_adj[slot].iter().chain(self.in_adj[slot].iter()) {
                if !seen[next] {
                    seen[next] = true;
                    reached += 1;
                    stack.push(next);
                }
            }
        }
        reached == n
    }

    fn require_slot(&self, id: NodeId) -> Result<usize, ModelError> {
        self.slot(id)
            .ok_or_else(|| ModelError::InvariantViolation(format!("unknown node {}", id)))
    }

    fn arc_slots(&self, src: NodeId, dst: NodeId) -> Result<(usize, usize), ModelError> {
        if src == dst {
            return Err(ModelError::InvariantViolation(format!(
                "self-loop on node {} is not allowed",
                src
            )));
        }
        Ok((self.require_slot(src)?, self.require_slot(dst)?))
    }

    fn insert_arc(&mut self, s: usize, d: usize, weight: Option<f64>) -> bool {
        if !self.arcs.insert((s, d)) {
            return false;
        }
        self.out_adj[s].push(d);
        self.in_adj[d].push(s);
        if let Some(w) = weight {
            self.weights.insert((s, d), w);
        }
        true
    }

    /// Removes an arc, returning `Some(weight)` if it was present.
    fn remove_arc(&mut self, s: usize, d: usize) -> Option<Option<f64>> {
        if !self.arcs.remove(&(s, d)) {
            return None;
        }
        self.out_adj[s].retain(|t| *t != d);
        self.in_adj[d].retain(|t| *t != s);
        Some(self.weights.remove(&(s, d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(n: u32, value: f64) -> SocialGraph {
        let mut g = SocialGraph::default();
        for i in 0..n {
            g.add_node(NodeId(i), NodeState::uniform(value)).unwrap();
        }
        for i in 1..n {
            g.add_edge(NodeId(i - 1), NodeId(i)).unwrap();
        }
        g
    }

    #[test]
    fn add_edge_rejects_self_loops_and_unknown_nodes() {
        let mut g = path_graph(2, 0.5);
        assert!(g.add_edge(NodeId(0), NodeId(0)).is_err());
        assert!(g.add_edge(NodeId(0), NodeId(9)).is_err());
    }

    #[test]
    fn duplicate_edges_are_not_inserted() {
        let mut g = path_graph(2, 0.5);
        assert!(!g.add_edge(NodeId(0), NodeId(1)).unwrap());
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.out_degree(NodeId(0)), 1);
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let mut g = path_graph(1, 0.5);
        assert!(g.add_node(NodeId(0), NodeState::uniform(0.1)).is_err());
    }

    #[test]
    fn swap_targets_preserves_degrees() {
        let mut g = SocialGraph::default();
        for i in 0..4 {
            g.add_node(NodeId(i), NodeState::uniform(0.5)).unwrap();
        }
        g.add_edge(NodeId(0), NodeId(1)).unwrap();
        g.add_edge(NodeId(2), NodeId(3)).unwrap();
        let before = g.degree_sequence();

        assert!(g
            .swap_targets((NodeId(0), NodeId(1)), (NodeId(2), NodeId(3)))
            .unwrap());

        assert!(g.has_edge(NodeId(0), NodeId(3)));
        assert!(g.has_edge(NodeId(2), NodeId(1)));
        assert!(!g.has_edge(NodeId(0), NodeId(1)));
        assert_eq!(g.degree_sequence(), before);
    }

    #[test]
    fn swap_creating_duplicate_is_rejected_without_mutation() {
        let mut g = SocialGraph::default();
        for i in 0..4 {
            g.add_node(NodeId(i), NodeState::uniform(0.5)).unwrap();
        }
        g.add_edge(NodeId(0), NodeId(1)).unwrap();
        g.add_edge(NodeId(2), NodeId(3)).unwrap();
        g.add_edge(NodeId(0), NodeId(3)).unwrap();
        let snapshot = g.clone();

        let accepted = g
            .swap_targets((NodeId(0), NodeId(1)), (NodeId(2), NodeId(3)))
            .unwrap();

        assert!(!accepted);
        assert_eq!(g, snapshot);
    }

    #[test]
    fn swap_creating_self_loop_is_rejected() {
        let mut g = SocialGraph::default();
        for i in 0..3 {
            g.add_node(NodeId(i), NodeState::uniform(0.5)).unwrap();
        }
        g.add_edge(NodeId(0), NodeId(1)).unwrap();
        g.add_edge(NodeId(1), NodeId(0)).unwrap();
        let accepted = g
            .swap_targets((NodeId(0), NodeId(1)), (NodeId(1), NodeId(0)))
            .unwrap();
        assert!(!accepted);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn swap_keeps_weights_with_their_source() {
        let mut g = SocialGraph::default();
        for i in 0..4 {
            g.add_node(NodeId(i), NodeState::uniform(0.5)).unwrap();
        }
        g.add_weighted_edge(NodeId(0), NodeId(1), 2.5).unwrap();
        g.add_edge(NodeId(2), NodeId(3)).unwrap();
        g.swap_targets((NodeId(0), NodeId(1)), (NodeId(2), NodeId(3)))
            .unwrap();
        assert_eq!(g.weight(NodeId(0), NodeId(3)), Some(2.5));
        assert_eq!(g.weight(NodeId(2), NodeId(1)), None);
    }

    #[test]
    fn compose_rejects_overlapping_ids() {
        let mut a = path_graph(3, 0.2);
        let b = path_graph(2, 0.8);
        assert!(a.compose(&b).is_err());
    }

    #[test]
    fn compose_unions_disjoint_graphs() {
        let mut a = path_graph(3, 0.2);
        let mut b = SocialGraph::default();
        b.add_node(NodeId(10), NodeState::uniform(0.8)).unwrap();
        b.add_node(NodeId(11), NodeState::uniform(0.8)).unwrap();
        b.add_edge(NodeId(10), NodeId(11)).unwrap();

        a.compose(&b).unwrap();

        assert_eq!(a.node_count(), 5);
        assert_eq!(a.edge_count(), 3);
        assert_eq!(a.state(NodeId(11)), Some(NodeState::uniform(0.8)));
        assert!(!a.is_weakly_connected());
    }

    #[test]
    fn weak_connectivity_ignores_direction() {
        let mut g = path_graph(3, 0.5);
        assert!(g.is_weakly_connected());
        g.remove_edge(NodeId(1), NodeId(2));
        g.add_edge(NodeId(2), NodeId(1)).unwrap();
        assert!(g.is_weakly_connected());
        g.remove_edge(NodeId(2), NodeId(1));
        assert!(!g.is_weakly_connected());
    }

    #[test]
    fn exchange_states_swaps_whole_buffer() {
        let mut g = path_graph(2, 0.5);
        let mut buffer = vec![NodeState { k: 1.0, e: 0.1 }, NodeState { k: 2.0, e: 0.2 }];
        g.exchange_states(&mut buffer);
        assert_eq!(g.state(NodeId(1)), Some(NodeState { k: 2.0, e: 0.2 }));
        assert_eq!(buffer[0], NodeState::uniform(0.5));
    }
}
