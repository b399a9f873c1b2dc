//! The slice of the routing-resource graph that switch blocks look at.
//!
//! The full graph is built elsewhere; the fabric generator only needs node
//! kinds, track numbers, wire directions, the grid span of each node, and
//! the driver list of each node. Nodes are addressed by [`RrNodeId`] and
//! never move once added.

use crate::error::FabricError;
use crate::ids::{RrNodeId, RrSwitchId};
use aion_common::DeviceCoordinate;
use serde::{Deserialize, Serialize};

/// The kind of a routing-resource node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RrNodeKind {
    /// Logical signal source inside a block.
    Source,
    /// Logical signal sink inside a block.
    Sink,
    /// Output pin of a logic block.
    Opin,
    /// Input pin of a logic block.
    Ipin,
    /// Horizontal channel wire.
    ChanX,
    /// Vertical channel wire.
    ChanY,
}

impl RrNodeKind {
    /// Returns `true` for channel wires.
    pub fn is_channel(self) -> bool {
        matches!(self, RrNodeKind::ChanX | RrNodeKind::ChanY)
    }
}

/// Signal direction along a channel wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RrDirection {
    /// Driven from the low-coordinate end.
    Increasing,
    /// Driven from the high-coordinate end.
    Decreasing,
    /// Drivable from both ends.
    Bidir,
}

/// A driving edge: the upstream node and the switch that connects it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RrDriver {
    /// Upstream node.
    pub node: RrNodeId,
    /// Switch on the edge.
    pub switch: RrSwitchId,
}

/// A routing-resource node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RrNode {
    /// Node kind.
    pub kind: RrNodeKind,
    /// Track number for wires, pin number for pins.
    pub ptc: usize,
    /// Wire direction; `None` for pins, sources and sinks.
    pub direction: Option<RrDirection>,
    /// Lowest tile covered.
    pub low: DeviceCoordinate,
    /// Highest tile covered.
    pub high: DeviceCoordinate,
    /// Driving edges, in insertion order.
    pub drivers: Vec<RrDriver>,
}

impl RrNode {
    /// Creates a node covering the single tile at the origin.
    pub fn new(kind: RrNodeKind, ptc: usize) -> Self {
        Self {
            kind,
            ptc,
            direction: None,
            low: DeviceCoordinate::default(),
            high: DeviceCoordinate::default(),
            drivers: Vec::new(),
        }
    }

    /// Sets the wire direction.
    pub fn with_direction(mut self, direction: RrDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Sets the covered tile span.
    pub fn spanning(mut self, low: DeviceCoordinate, high: DeviceCoordinate) -> Self {
        self.low = low;
        self.high = high;
        self
    }
}

/// Arena of routing-resource nodes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RrGraph {
    nodes: Vec<RrNode>,
}

impl RrGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its handle.
    pub fn add_node(&mut self, node: RrNode) -> RrNodeId {
        let id = RrNodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Records that `from` drives `to` through `switch`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is not in this graph.
    pub fn add_edge(&mut self, from: RrNodeId, to: RrNodeId, switch: RrSwitchId) {
        assert!(
            (from.as_raw() as usize) < self.nodes.len(),
            "driver node {from} is not in the routing graph"
        );
        self.node_mut(to).drivers.push(RrDriver { node: from, switch });
    }

    /// Returns the node behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is not in this graph.
    pub fn node(&self, id: RrNodeId) -> &RrNode {
        match self.nodes.get(id.as_raw() as usize) {
            Some(node) => node,
            None => panic!("routing node {id} is not in the routing graph"),
        }
    }

    fn node_mut(&mut self, id: RrNodeId) -> &mut RrNode {
        match self.nodes.get_mut(id.as_raw() as usize) {
            Some(node) => node,
            None => panic!("routing node {id} is not in the routing graph"),
        }
    }

    /// Driving edges of a node.
    pub fn drivers(&self, id: RrNodeId) -> &[RrDriver] {
        &self.node(id).drivers
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over `(handle, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (RrNodeId, &RrNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (RrNodeId::from_raw(i as u32), node))
    }

    /// Rejects graphs containing bi-directional channel wires.
    pub fn check_unidirectional(&self) -> Result<(), FabricError> {
        match self
            .iter()
            .find(|(_, node)| node.kind.is_channel() && node.direction == Some(RrDirection::Bidir))
        {
            Some((node, _)) => Err(FabricError::BidirectionalRouting { node }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_records_driver_in_order() {
        let mut graph = RrGraph::new();
        let a = graph.add_node(RrNode::new(RrNodeKind::Opin, 0));
        let b = graph.add_node(RrNode::new(RrNodeKind::ChanX, 1).with_direction(RrDirection::Increasing));
        let c = graph.add_node(RrNode::new(RrNodeKind::ChanX, 0).with_direction(RrDirection::Increasing));
        graph.add_edge(b, c, RrSwitchId::from_raw(1));
        graph.add_edge(a, c, RrSwitchId::from_raw(0));

        let drivers = graph.drivers(c);
        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].node, b);
        assert_eq!(drivers[1].switch, RrSwitchId::from_raw(0));
        assert!(graph.drivers(a).is_empty());
    }

    #[test]
    fn unidirectional_graph_passes() {
        let mut graph = RrGraph::new();
        graph.add_node(RrNode::new(RrNodeKind::ChanY, 0).with_direction(RrDirection::Decreasing));
        graph.add_node(RrNode::new(RrNodeKind::Ipin, 0));
        assert!(graph.check_unidirectional().is_ok());
    }

    #[test]
    fn bidirectional_wire_is_rejected() {
        let mut graph = RrGraph::new();
        graph.add_node(RrNode::new(RrNodeKind::ChanX, 0).with_direction(RrDirection::Increasing));
        let bidir = graph.add_node(RrNode::new(RrNodeKind::ChanY, 1).with_direction(RrDirection::Bidir));
        let err = graph.check_unidirectional().unwrap_err();
        assert!(matches!(err, FabricError::BidirectionalRouting { node } if node == bidir));
    }

    #[test]
    fn spanning_sets_coordinates() {
        let node = RrNode::new(RrNodeKind::Opin, 2)
            .spanning(DeviceCoordinate::new(1, 1), DeviceCoordinate::new(1, 2));
        assert_eq!(node.low, DeviceCoordinate::new(1, 1));
        assert_eq!(node.high, DeviceCoordinate::new(1, 2));
    }

    #[test]
    #[should_panic(expected = "not in the routing graph")]
    fn unknown_handle_panics() {
        let graph = RrGraph::new();
        graph.node(RrNodeId::from_raw(0));
    }
}
