//! Level-structured multiplexer graphs.
//!
//! Inputs sit at node level 0 and the output at the last level. Every edge
//! is gated by one configuration memory bit, possibly inverted. Memory bits
//! are numbered level by level so the bits of one level are contiguous; the
//! memory level of an edge is the level of its sink node minus one.

use crate::ids::{MuxEdgeId, MuxMemId, MuxNodeId};
use serde::{Deserialize, Serialize};

/// How the memory bits of a node select one of its inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemEncoding {
    /// A fan-in-2 node uses one bit and its complement; wider nodes are one-hot.
    Complementary,
    /// Every input has a bit of its own.
    OneHot,
}

/// Position of a node in the datapath.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuxNodeKind {
    /// A graph input, with its input index.
    Input(usize),
    /// An intermediate stage.
    Internal,
    /// A graph output, with its output index.
    Output(usize),
}

/// A node of a [`MuxGraph`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MuxNode {
    /// Datapath role.
    pub kind: MuxNodeKind,
    /// Node level; inputs are level 0.
    pub level: usize,
    /// Index among the nodes of the same level.
    pub index: usize,
    /// Incoming edges, in input order.
    pub in_edges: Vec<MuxEdgeId>,
    /// Outgoing edges.
    pub out_edges: Vec<MuxEdgeId>,
}

/// An edge of a [`MuxGraph`], gated by one memory bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxEdge {
    /// Driving node.
    pub from: MuxNodeId,
    /// Driven node.
    pub to: MuxNodeId,
    /// Gating memory bit.
    pub mem: MuxMemId,
    /// The edge conducts when the bit is 0 rather than 1.
    pub inverted: bool,
}

/// A multiplexer decomposed into levels of fan-in-limited nodes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MuxGraph {
    nodes: Vec<MuxNode>,
    edges: Vec<MuxEdge>,
    mem_levels: Vec<usize>,
    levels: Vec<Vec<MuxNodeId>>,
    inputs: Vec<MuxNodeId>,
    outputs: Vec<MuxNodeId>,
}

impl MuxGraph {
    /// A single node selecting among all `size` inputs.
    ///
    /// # Panics
    ///
    /// Panics if `size < 2`.
    pub fn one_level(size: usize, encoding: MemEncoding) -> Self {
        Self::staged(size, size, encoding)
    }

    /// A binary tree of 2:1 nodes.
    ///
    /// # Panics
    ///
    /// Panics if `size < 2`.
    pub fn tree(size: usize, encoding: MemEncoding) -> Self {
        Self::staged(size, 2, encoding)
    }

    /// At most `num_levels` stages of equal branch width, the smallest width
    /// whose `num_levels`-th power covers `size`.
    ///
    /// # Panics
    ///
    /// Panics if `size < 2` or `num_levels == 0`.
    pub fn multi_level(size: usize, num_levels: usize, encoding: MemEncoding) -> Self {
        assert!(num_levels > 0, "a multiplexer needs at least one level");
        let mut branch = 2;
        while !covers(branch, num_levels, size) {
            branch += 1;
        }
        Self::staged(size, branch, encoding)
    }

    /// Builds the graph bottom-up: inputs are grouped into chunks of
    /// `branch`, each chunk feeding one node of the next level. A chunk of
    /// one is carried up unchanged.
    fn staged(size: usize, branch: usize, encoding: MemEncoding) -> Self {
        assert!(size >= 2, "a multiplexer needs at least two inputs, got {size}");
        let mut graph = Self::default();
        let mut current: Vec<MuxNodeId> = (0..size)
            .map(|i| graph.add_node(MuxNodeKind::Input(i), 0))
            .collect();
        graph.inputs = current.clone();

        let mut level = 0;
        while current.len() > 1 {
            level += 1;
            let mem_base = graph.mem_levels.len();
            let mut level_mems = 0;
            let mut next = Vec::with_capacity(current.len().div_ceil(branch));

            for chunk in current.chunks(branch) {
                if let [carried] = chunk {
                    next.push(*carried);
                    continue;
                }
                let node = graph.add_node(MuxNodeKind::Internal, level);
                let shared = chunk.len() == 2 && encoding == MemEncoding::Complementary;
                for (i, from) in chunk.iter().enumerate() {
                    let (mem, inverted) = if shared {
                        (mem_base, i == 1)
                    } else {
                        (mem_base + i, false)
                    };
                    graph.add_edge(*from, node, MuxMemId::from_index(mem), inverted);
                }
                level_mems = level_mems.max(if shared { 1 } else { chunk.len() });
                next.push(node);
            }

            graph.mem_levels.extend(std::iter::repeat(level - 1).take(level_mems));
            current = next;
        }

        let output = current[0];
        graph.nodes[output.index()].kind = MuxNodeKind::Output(0);
        graph.outputs.push(output);
        graph
    }

    fn add_node(&mut self, kind: MuxNodeKind, level: usize) -> MuxNodeId {
        let id = MuxNodeId::from_index(self.nodes.len());
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, Vec::new);
        }
        let index = self.levels[level].len();
        self.levels[level].push(id);
        self.nodes.push(MuxNode {
            kind,
            level,
            index,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        });
        id
    }

    fn add_edge(&mut self, from: MuxNodeId, to: MuxNodeId, mem: MuxMemId, inverted: bool) {
        let id = MuxEdgeId::from_index(self.edges.len());
        self.edges.push(MuxEdge {
            from,
            to,
            mem,
            inverted,
        });
        self.nodes[from.index()].out_edges.push(id);
        self.nodes[to.index()].in_edges.push(id);
    }

    /// Returns the node.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not from this graph.
    pub fn node(&self, id: MuxNodeId) -> &MuxNode {
        match self.nodes.get(id.index()) {
            Some(node) => node,
            None => panic!("mux node {id} is not in the graph"),
        }
    }

    /// Returns the edge.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not from this graph.
    pub fn edge(&self, id: MuxEdgeId) -> &MuxEdge {
        match self.edges.get(id.index()) {
            Some(edge) => edge,
            None => panic!("mux edge {id} is not in the graph"),
        }
    }

    /// The node at a level and index, if any.
    pub fn node_at(&self, level: usize, index: usize) -> Option<MuxNodeId> {
        self.levels.get(level).and_then(|l| l.get(index)).copied()
    }

    /// Number of graph inputs.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of graph outputs.
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Graph inputs, by input index.
    pub fn inputs(&self) -> &[MuxNodeId] {
        &self.inputs
    }

    /// Graph outputs, by output index.
    pub fn outputs(&self) -> &[MuxNodeId] {
        &self.outputs
    }

    /// Number of node levels, inputs included.
    pub fn num_node_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of memory levels, one less than the node levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Index of the last node level.
    pub fn last_level(&self) -> usize {
        self.num_levels()
    }

    /// Number of nodes at a level.
    pub fn num_nodes_at_level(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, Vec::len)
    }

    /// Total number of edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Total number of memory bits.
    pub fn num_memory_bits(&self) -> usize {
        self.mem_levels.len()
    }

    /// Number of memory bits controlling the nodes of `level + 1`.
    pub fn num_memory_bits_at_level(&self, level: usize) -> usize {
        self.mem_levels.iter().filter(|l| **l == level).count()
    }

    /// Memory level of a bit.
    pub fn mem_level(&self, mem: MuxMemId) -> usize {
        self.mem_levels[mem.index()]
    }

    /// Every node above level 0, in level order.
    pub fn non_input_nodes(&self) -> impl Iterator<Item = MuxNodeId> + '_ {
        self.levels.iter().skip(1).flatten().copied()
    }

    /// Number of incoming edges of a node.
    pub fn fan_in(&self, id: MuxNodeId) -> usize {
        self.node(id).in_edges.len()
    }

    /// Nodes driving `id`, in edge order.
    pub fn driver_nodes(&self, id: MuxNodeId) -> Vec<MuxNodeId> {
        self.node(id)
            .in_edges
            .iter()
            .map(|e| self.edge(*e).from)
            .collect()
    }

    /// Memory bits gating the incoming edges of `id`, first-seen order
    /// without repeats.
    pub fn node_mems(&self, id: MuxNodeId) -> Vec<MuxMemId> {
        let mut mems = Vec::new();
        for e in &self.node(id).in_edges {
            let mem = self.edge(*e).mem;
            if !mems.contains(&mem) {
                mems.push(mem);
            }
        }
        mems
    }

    /// One single-level graph per distinct node fan-in, in first-seen order.
    /// Each node of this graph can be realized by the branch of its fan-in.
    pub fn branch_graphs(&self, encoding: MemEncoding) -> Vec<MuxGraph> {
        let mut fan_ins: Vec<usize> = Vec::new();
        for node in self.non_input_nodes() {
            let fan_in = self.fan_in(node);
            if !fan_ins.contains(&fan_in) {
                fan_ins.push(fan_in);
            }
        }
        fan_ins
            .into_iter()
            .map(|k| Self::one_level(k, encoding))
            .collect()
    }
}

fn covers(branch: usize, levels: usize, size: usize) -> bool {
    let mut reach: usize = 1;
    for _ in 0..levels {
        reach = reach.saturating_mul(branch);
        if reach >= size {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_level_has_a_bit_per_input() {
        let g = MuxGraph::one_level(8, MemEncoding::Complementary);
        assert_eq!(g.num_inputs(), 8);
        assert_eq!(g.num_node_levels(), 2);
        assert_eq!(g.num_edges(), 8);
        assert_eq!(g.num_memory_bits(), 8);
        let out = g.outputs()[0];
        assert_eq!(g.node(out).level, 1);
        assert_eq!(g.node(out).kind, MuxNodeKind::Output(0));
        assert_eq!(g.node_mems(out).len(), 8);
    }

    #[test]
    fn two_inputs_share_one_inverted_bit() {
        let g = MuxGraph::one_level(2, MemEncoding::Complementary);
        assert_eq!(g.num_memory_bits(), 1);
        let out = g.outputs()[0];
        let edges: Vec<_> = g.node(out).in_edges.iter().map(|e| *g.edge(*e)).collect();
        assert_eq!(edges[0].mem, edges[1].mem);
        assert!(!edges[0].inverted);
        assert!(edges[1].inverted);
    }

    #[test]
    fn one_hot_never_inverts() {
        let g = MuxGraph::one_level(2, MemEncoding::OneHot);
        assert_eq!(g.num_memory_bits(), 2);
        assert!(g.node(g.outputs()[0])
            .in_edges
            .iter()
            .all(|e| !g.edge(*e).inverted));
    }

    #[test]
    fn tree_of_eight() {
        let g = MuxGraph::tree(8, MemEncoding::Complementary);
        assert_eq!(g.num_node_levels(), 4);
        assert_eq!(g.num_levels(), 3);
        assert_eq!(g.num_nodes_at_level(1), 4);
        assert_eq!(g.num_nodes_at_level(2), 2);
        assert_eq!(g.num_nodes_at_level(3), 1);
        assert_eq!(g.num_memory_bits(), 3);
        for level in 0..3 {
            assert_eq!(g.num_memory_bits_at_level(level), 1);
        }
        assert_eq!(g.non_input_nodes().count(), 7);
    }

    #[test]
    fn odd_input_is_carried_up() {
        let g = MuxGraph::tree(5, MemEncoding::Complementary);
        // 5 -> 2 nodes + carried input -> 1 node + carried node -> 1 node.
        assert_eq!(g.num_nodes_at_level(1), 2);
        assert_eq!(g.num_nodes_at_level(2), 1);
        assert_eq!(g.num_nodes_at_level(3), 1);
        let out = g.outputs()[0];
        let drivers = g.driver_nodes(out);
        assert_eq!(g.node(drivers[1]).level, 0);
        assert_eq!(g.node(drivers[1]).kind, MuxNodeKind::Input(4));
    }

    #[test]
    fn multi_level_picks_smallest_branch() {
        let g = MuxGraph::multi_level(9, 2, MemEncoding::Complementary);
        assert_eq!(g.num_levels(), 2);
        assert_eq!(g.num_nodes_at_level(1), 3);
        assert!(g.non_input_nodes().all(|n| g.fan_in(n) == 3));
        assert_eq!(g.num_memory_bits(), 6);
        assert_eq!(g.mem_level(MuxMemId::from_raw(0)), 0);
        assert_eq!(g.mem_level(MuxMemId::from_raw(5)), 1);
    }

    #[test]
    fn multi_level_with_one_level_is_flat() {
        let g = MuxGraph::multi_level(6, 1, MemEncoding::Complementary);
        assert_eq!(g.num_levels(), 1);
        assert_eq!(g.fan_in(g.outputs()[0]), 6);
    }

    #[test]
    fn branch_graphs_are_unique_by_fan_in() {
        let g = MuxGraph::tree(8, MemEncoding::Complementary);
        let branches = g.branch_graphs(MemEncoding::Complementary);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].num_inputs(), 2);

        let g = MuxGraph::multi_level(10, 2, MemEncoding::OneHot);
        // 10 inputs, branch 4: chunks 4,4,2 then 3.
        let fan_ins: Vec<_> = g
            .branch_graphs(MemEncoding::OneHot)
            .iter()
            .map(MuxGraph::num_inputs)
            .collect();
        assert_eq!(fan_ins, vec![4, 2, 3]);
    }

    #[test]
    fn node_lookup_by_position() {
        let g = MuxGraph::tree(4, MemEncoding::Complementary);
        assert_eq!(g.node_at(2, 0), Some(g.outputs()[0]));
        assert_eq!(g.node_at(2, 1), None);
        assert_eq!(g.node_at(7, 0), None);
    }

    #[test]
    #[should_panic(expected = "at least two inputs")]
    fn single_input_is_refused() {
        MuxGraph::tree(1, MemEncoding::Complementary);
    }
}
