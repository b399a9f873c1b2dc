//! Rotation of switch-block track and pin orderings.
//!
//! Rotations only permute the per-side lists; handles and their drivers are
//! untouched. They exist for the rotatable-mirror search in
//! [`DeviceSwitchBlocks`](crate::DeviceSwitchBlocks).

use crate::chan::group_runs;
use crate::rr_graph::RrGraph;
use crate::switch_block::SwitchBlock;
use aion_common::Side;

impl SwitchBlock {
    /// Cyclically shifts the tracks of one side left by `offset`, modulo the
    /// channel width. Track directions move with their tracks.
    pub fn rotate_side_chan_nodes(&mut self, side: Side, offset: usize) {
        let data = self.side_mut(side);
        let width = data.chan.width();
        if width == 0 {
            return;
        }
        data.chan.rotate(offset);
        data.directions.rotate_left(offset % width);
    }

    /// [`rotate_side_chan_nodes`](Self::rotate_side_chan_nodes) on every side.
    pub fn rotate_chan_nodes(&mut self, offset: usize) {
        for side in Side::all(self.num_sides()) {
            self.rotate_side_chan_nodes(side, offset);
        }
    }

    /// Shifts each run of same-segment tracks on one side independently.
    pub fn rotate_side_chan_nodes_in_group(&mut self, side: Side, offset: usize) {
        let data = self.side_mut(side);
        for (begin, end) in data.chan.segment_groups() {
            data.chan.rotate_range(begin, end, offset);
            data.directions[begin..end].rotate_left(offset % (end - begin));
        }
    }

    /// [`rotate_side_chan_nodes_in_group`](Self::rotate_side_chan_nodes_in_group)
    /// on every side.
    pub fn rotate_chan_nodes_in_group(&mut self, offset: usize) {
        for side in Side::all(self.num_sides()) {
            self.rotate_side_chan_nodes_in_group(side, offset);
        }
    }

    /// Shifts each run of output pins on one side that share a grid span and
    /// a grid side, independently.
    pub fn rotate_side_opins_in_group(&mut self, graph: &RrGraph, side: Side, offset: usize) {
        let data = self.side_mut(side);
        let keys: Vec<_> = data
            .opins
            .iter()
            .zip(&data.opin_grid_sides)
            .map(|(pin, grid_side)| {
                let node = graph.node(*pin);
                (node.low, node.high, *grid_side)
            })
            .collect();
        for (begin, end) in group_runs(&keys) {
            let shift = offset % (end - begin);
            data.opins[begin..end].rotate_left(shift);
            data.opin_grid_sides[begin..end].rotate_left(shift);
        }
    }

    /// [`rotate_side_opins_in_group`](Self::rotate_side_opins_in_group) on
    /// every side.
    pub fn rotate_opins_in_group(&mut self, graph: &RrGraph, offset: usize) {
        for side in Side::all(self.num_sides()) {
            self.rotate_side_opins_in_group(graph, side, offset);
        }
    }

    /// Rotates the tracks and the output-pin groups of one side.
    pub fn rotate_side(&mut self, graph: &RrGraph, side: Side, offset: usize) {
        self.rotate_side_chan_nodes(side, offset);
        self.rotate_side_opins_in_group(graph, side, offset);
    }

    /// Rotates the tracks and the output-pin groups of every side.
    pub fn rotate(&mut self, graph: &RrGraph, offset: usize) {
        self.rotate_chan_nodes(offset);
        self.rotate_opins_in_group(graph, offset);
    }
}

#[cfg(test)]
mod tests {
    use crate::chan::RrChan;
    use crate::ids::{RrNodeId, SegmentId};
    use crate::rr_graph::{RrDirection, RrGraph, RrNode, RrNodeKind};
    use crate::switch_block::{PortDirection, SwitchBlock};
    use aion_common::{DeviceCoordinate, Side};

    fn left_side_block(graph: &mut RrGraph, segments: &[u32]) -> (SwitchBlock, Vec<RrNodeId>) {
        let mut chan = RrChan::new();
        let mut ids = Vec::new();
        for (ptc, seg) in segments.iter().enumerate() {
            let id = graph.add_node(
                RrNode::new(RrNodeKind::ChanX, ptc).with_direction(RrDirection::Increasing),
            );
            chan.add_node(graph, id, SegmentId::from_raw(*seg)).unwrap();
            ids.push(id);
        }
        let directions = (0..segments.len())
            .map(|i| if i % 2 == 0 { PortDirection::In } else { PortDirection::Out })
            .collect();
        let mut sb = SwitchBlock::new(DeviceCoordinate::new(0, 0), 4);
        sb.set_chan(Side::LEFT, chan, directions).unwrap();
        (sb, ids)
    }

    #[test]
    fn side_rotation_moves_directions_with_tracks() {
        let mut graph = RrGraph::new();
        let (mut sb, ids) = left_side_block(&mut graph, &[0, 0, 0, 0]);
        sb.rotate_side_chan_nodes(Side::LEFT, 5);
        assert_eq!(sb.chan_node(Side::LEFT, 0), ids[1]);
        assert_eq!(sb.chan_direction(Side::LEFT, 0), PortDirection::Out);
        assert_eq!(sb.chan_node(Side::LEFT, 3), ids[0]);
        assert_eq!(sb.chan_direction(Side::LEFT, 3), PortDirection::In);
    }

    #[test]
    fn empty_sides_are_left_alone() {
        let mut graph = RrGraph::new();
        let (mut sb, _) = left_side_block(&mut graph, &[0, 0]);
        sb.rotate_chan_nodes(3);
        assert_eq!(sb.chan_width(Side::TOP), 0);
        assert_eq!(sb.chan_width(Side::LEFT), 2);
    }

    #[test]
    fn grouped_rotation_stays_within_segments() {
        let mut graph = RrGraph::new();
        let (mut sb, ids) = left_side_block(&mut graph, &[0, 0, 1, 1, 1]);
        sb.rotate_side_chan_nodes_in_group(Side::LEFT, 1);
        let order: Vec<_> = (0..5).map(|t| sb.chan_node(Side::LEFT, t)).collect();
        assert_eq!(order, vec![ids[1], ids[0], ids[3], ids[4], ids[2]]);
        assert_eq!(sb.chan_segment(Side::LEFT, 4), SegmentId::from_raw(1));
    }

    #[test]
    fn opin_groups_follow_grid_span_and_side() {
        let mut graph = RrGraph::new();
        let here = DeviceCoordinate::new(0, 0);
        let above = DeviceCoordinate::new(0, 1);
        let pins: Vec<_> = [here, here, above, above]
            .iter()
            .enumerate()
            .map(|(i, c)| graph.add_node(RrNode::new(RrNodeKind::Opin, i).spanning(*c, *c)))
            .collect();

        let mut sb = SwitchBlock::new(DeviceCoordinate::new(0, 0), 4);
        for pin in &pins {
            sb.add_opin(Side::TOP, *pin, Side::RIGHT);
        }
        sb.rotate(&graph, 1);
        let order: Vec<_> = (0..4).map(|i| sb.opin(Side::TOP, i)).collect();
        assert_eq!(order, vec![pins[1], pins[0], pins[3], pins[2]]);
    }

    #[test]
    fn rotate_side_touches_one_side_only() {
        let mut graph = RrGraph::new();
        let (mut sb, ids) = left_side_block(&mut graph, &[0, 0, 0]);
        let copy = sb.chan(Side::LEFT).clone();
        sb.set_chan(
            Side::RIGHT,
            copy,
            vec![PortDirection::In, PortDirection::Out, PortDirection::In],
        )
        .unwrap();
        sb.rotate_side(&graph, Side::RIGHT, 1);
        assert_eq!(sb.chan_node(Side::LEFT, 0), ids[0]);
        assert_eq!(sb.chan_node(Side::RIGHT, 0), ids[1]);
    }
}
