//! Per-tile switch-block descriptors and the mirror-equivalence test.
//!
//! A [`SwitchBlock`] records, for each of its sides, the channel tracks that
//! touch it (each marked as entering or leaving the block), the logic-block
//! output pins that can drive into it and the input pins it can drive. Two
//! blocks are *mirrors* when they would be realized by the same circuit;
//! [`SwitchBlock::is_mirror`] decides that from the track layout and the
//! driver structure of every leaving track.

use crate::chan::RrChan;
use crate::error::FabricError;
use crate::ids::{RrNodeId, SegmentId};
use crate::rr_graph::{RrGraph, RrNodeKind};
use aion_common::{DeviceCoordinate, Side};
use serde::{Deserialize, Serialize};

/// Direction of a channel track relative to the switch block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortDirection {
    /// The track enters the block and may drive its multiplexers.
    In,
    /// The track leaves the block and is driven by it.
    Out,
}

/// Everything attached to one side of a switch block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SideData {
    pub(crate) chan: RrChan,
    pub(crate) directions: Vec<PortDirection>,
    pub(crate) ipins: Vec<RrNodeId>,
    pub(crate) ipin_grid_sides: Vec<Side>,
    pub(crate) opins: Vec<RrNodeId>,
    pub(crate) opin_grid_sides: Vec<Side>,
}

/// The routing resources meeting at one switch block.
///
/// Nodes are stored as [`RrNodeId`] handles; every query that needs node
/// attributes takes the [`RrGraph`] explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchBlock {
    coordinate: DeviceCoordinate,
    sides: Vec<SideData>,
    conf_bits_lsb: usize,
    conf_bits_msb: usize,
    reserved_conf_bits_lsb: usize,
    reserved_conf_bits_msb: usize,
}

impl Default for SwitchBlock {
    fn default() -> Self {
        Self::new(DeviceCoordinate::default(), 0)
    }
}

impl SwitchBlock {
    /// Creates an empty block with `num_sides` sides.
    ///
    /// Both configuration-bit ranges start out unset (`lsb > msb`).
    pub fn new(coordinate: DeviceCoordinate, num_sides: usize) -> Self {
        Self {
            coordinate,
            sides: vec![SideData::default(); num_sides],
            conf_bits_lsb: 1,
            conf_bits_msb: 0,
            reserved_conf_bits_lsb: 1,
            reserved_conf_bits_msb: 0,
        }
    }

    /// Tile coordinate of the block.
    pub fn coordinate(&self) -> DeviceCoordinate {
        self.coordinate
    }

    /// Moves the block to another tile.
    pub fn set_coordinate(&mut self, coordinate: DeviceCoordinate) {
        self.coordinate = coordinate;
    }

    /// Number of sides.
    pub fn num_sides(&self) -> usize {
        self.sides.len()
    }

    fn side(&self, side: Side) -> &SideData {
        match self.sides.get(side.index()) {
            Some(data) => data,
            None => panic!(
                "{side} side does not exist on a switch block with {} sides",
                self.sides.len()
            ),
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut SideData {
        let num_sides = self.sides.len();
        match self.sides.get_mut(side.index()) {
            Some(data) => data,
            None => panic!("{side} side does not exist on a switch block with {num_sides} sides"),
        }
    }

    // ---- channel tracks ----

    /// The channel on a side.
    ///
    /// # Panics
    ///
    /// Panics if `side` is not on this block. The same holds for every
    /// per-side accessor below.
    pub fn chan(&self, side: Side) -> &RrChan {
        &self.side(side).chan
    }

    /// Number of tracks on a side.
    pub fn chan_width(&self, side: Side) -> usize {
        self.side(side).chan.width()
    }

    /// Widest channel over all sides.
    pub fn max_chan_width(&self) -> usize {
        self.sides.iter().map(|s| s.chan.width()).max().unwrap_or(0)
    }

    /// Node on a track.
    pub fn chan_node(&self, side: Side, track: usize) -> RrNodeId {
        self.side(side).chan.node(track)
    }

    /// Routing segment of a track.
    pub fn chan_segment(&self, side: Side, track: usize) -> SegmentId {
        self.side(side).chan.segment(track)
    }

    /// Direction of a track relative to this block.
    ///
    /// # Panics
    ///
    /// Panics if `track` is out of range.
    pub fn chan_direction(&self, side: Side, track: usize) -> PortDirection {
        match self.side(side).directions.get(track) {
            Some(dir) => *dir,
            None => panic!("track {track} out of range on {side} side"),
        }
    }

    /// Installs the channel of a side along with one direction per track.
    pub fn set_chan(
        &mut self,
        side: Side,
        chan: RrChan,
        directions: Vec<PortDirection>,
    ) -> Result<(), FabricError> {
        chan.check_dense()?;
        if chan.width() != directions.len() {
            return Err(FabricError::TrackCountMismatch {
                side,
                tracks: chan.width(),
                directions: directions.len(),
            });
        }
        let data = self.side_mut(side);
        data.chan = chan;
        data.directions = directions;
        Ok(())
    }

    // ---- pins ----

    /// Number of logic-block input pins driven from a side.
    pub fn num_ipins(&self, side: Side) -> usize {
        self.side(side).ipins.len()
    }

    /// An input pin.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn ipin(&self, side: Side, index: usize) -> RrNodeId {
        match self.side(side).ipins.get(index) {
            Some(pin) => *pin,
            None => panic!("input pin {index} out of range on {side} side"),
        }
    }

    /// Side of the logic block on which an input pin sits.
    pub fn ipin_grid_side(&self, side: Side, index: usize) -> Side {
        match self.side(side).ipin_grid_sides.get(index) {
            Some(grid_side) => *grid_side,
            None => panic!("input pin {index} out of range on {side} side"),
        }
    }

    /// Appends an input pin to a side.
    pub fn add_ipin(&mut self, side: Side, node: RrNodeId, grid_side: Side) {
        let data = self.side_mut(side);
        data.ipins.push(node);
        data.ipin_grid_sides.push(grid_side);
    }

    /// Number of logic-block output pins feeding in from a side.
    pub fn num_opins(&self, side: Side) -> usize {
        self.side(side).opins.len()
    }

    /// An output pin.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn opin(&self, side: Side, index: usize) -> RrNodeId {
        match self.side(side).opins.get(index) {
            Some(pin) => *pin,
            None => panic!("output pin {index} out of range on {side} side"),
        }
    }

    /// Side of the logic block on which an output pin sits.
    pub fn opin_grid_side(&self, side: Side, index: usize) -> Side {
        match self.side(side).opin_grid_sides.get(index) {
            Some(grid_side) => *grid_side,
            None => panic!("output pin {index} out of range on {side} side"),
        }
    }

    /// Appends an output pin to a side.
    pub fn add_opin(&mut self, side: Side, node: RrNodeId, grid_side: Side) {
        let data = self.side_mut(side);
        data.opins.push(node);
        data.opin_grid_sides.push(grid_side);
    }

    // ---- lookup ----

    /// Index of `node` on `side`.
    ///
    /// Channel wires match only tracks with the given direction. Pins match
    /// by handle in the pin list of their kind and ignore `direction`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is a source or sink; those never touch a switch
    /// block.
    pub fn node_index(
        &self,
        graph: &RrGraph,
        node: RrNodeId,
        side: Side,
        direction: PortDirection,
    ) -> Option<usize> {
        let data = self.side(side);
        match graph.node(node).kind {
            RrNodeKind::ChanX | RrNodeKind::ChanY => data
                .chan
                .iter()
                .find(|&(track, n)| n == node && data.directions[track] == direction)
                .map(|(track, _)| track),
            RrNodeKind::Ipin => data.ipins.iter().position(|p| *p == node),
            RrNodeKind::Opin => data.opins.iter().position(|p| *p == node),
            kind => panic!("routing node {node} of kind {kind:?} cannot appear in a switch block"),
        }
    }

    /// First side, in side order, holding `node`, and its index there.
    pub fn node_side_and_index(
        &self,
        graph: &RrGraph,
        node: RrNodeId,
        direction: PortDirection,
    ) -> Option<(Side, usize)> {
        Side::all(self.num_sides()).find_map(|side| {
            self.node_index(graph, node, side, direction)
                .map(|index| (side, index))
        })
    }

    fn enters_on(&self, graph: &RrGraph, node: RrNodeId, side: Option<Side>) -> bool {
        match side {
            Some(side) => self
                .node_index(graph, node, side, PortDirection::In)
                .is_some(),
            None => false,
        }
    }

    /// Whether the wire leaving on `side` is fed from the opposite side:
    /// either the same wire enters there, or one of its drivers does.
    pub fn is_fed_from_opposite_side(&self, graph: &RrGraph, node: RrNodeId, side: Side) -> bool {
        let opposite = side.opposite(self.num_sides());
        if self.enters_on(graph, node, opposite) {
            return true;
        }
        graph.drivers(node).iter().any(|d| {
            graph.node(d.node).kind.is_channel() && self.enters_on(graph, d.node, opposite)
        })
    }

    /// Whether a track leaving on `side` is a short connection rather than a
    /// multiplexer output.
    ///
    /// A track is a short connection when one of its wire drivers is not an
    /// entering track of this block (the wire runs through the block), or
    /// when its only driver is a wire entering on the opposite side.
    pub fn is_short_connection(&self, graph: &RrGraph, node: RrNodeId, side: Side) -> bool {
        let drivers = graph.drivers(node);
        let passes_through = drivers.iter().any(|d| {
            graph.node(d.node).kind.is_channel()
                && self
                    .node_side_and_index(graph, d.node, PortDirection::In)
                    .is_none()
        });
        if passes_through {
            return true;
        }
        match drivers {
            [only] => {
                graph.node(only.node).kind.is_channel()
                    && self.enters_on(graph, only.node, side.opposite(self.num_sides()))
            }
            _ => false,
        }
    }

    /// First leaving track on `side` that is a short connection.
    pub fn first_short_connection(&self, graph: &RrGraph, side: Side) -> Option<usize> {
        let data = self.side(side);
        data.chan.iter().find_map(|(track, node)| {
            (data.directions[track] == PortDirection::Out
                && self.is_short_connection(graph, node, side))
            .then_some(track)
        })
    }

    /// Fan-in of every multiplexer this block needs, one entry per leaving
    /// track that is not a short connection, in side and track order.
    pub fn mux_fan_ins(&self, graph: &RrGraph) -> Vec<usize> {
        let mut fan_ins = Vec::new();
        for side in Side::all(self.num_sides()) {
            let data = self.side(side);
            for (track, node) in data.chan.iter() {
                if data.directions[track] == PortDirection::Out
                    && !self.is_short_connection(graph, node, side)
                {
                    fan_ins.push(graph.drivers(node).len());
                }
            }
        }
        fan_ins
    }

    // ---- equivalence ----

    /// Cheap pre-check for the rotation search: same side count, and per
    /// side the same width, the same presence of a short connection and
    /// the same number of output pins.
    pub fn is_mirrorable(&self, other: &SwitchBlock, graph: &RrGraph) -> bool {
        if self.num_sides() != other.num_sides() {
            return false;
        }
        Side::all(self.num_sides()).all(|side| {
            self.chan_width(side) == other.chan_width(side)
                && self.first_short_connection(graph, side).is_some()
                    == other.first_short_connection(graph, side).is_some()
                && self.num_opins(side) == other.num_opins(side)
        })
    }

    /// Starting offset for the rotation search: the smallest distance, over
    /// all sides, between the first short connections of the two blocks.
    /// Zero when a side of either block has no short connection.
    pub fn hint_rotate_offset(&self, other: &SwitchBlock, graph: &RrGraph) -> usize {
        let mut best: Option<usize> = None;
        for side in Side::all(self.num_sides().min(other.num_sides())) {
            let (Some(a), Some(b)) = (
                self.first_short_connection(graph, side),
                other.first_short_connection(graph, side),
            ) else {
                return 0;
            };
            let distance = a.abs_diff(b);
            best = Some(best.map_or(distance, |d| d.min(distance)));
        }
        best.unwrap_or(0)
    }

    /// Whether `other` would be realized by the same circuit as `self`.
    ///
    /// Compares side count, per-side widths, per-track direction and track
    /// number, the driver structure of every leaving track, and per-side
    /// output-pin counts. Configuration bits are not compared.
    pub fn is_mirror(&self, other: &SwitchBlock, graph: &RrGraph) -> bool {
        if self.num_sides() != other.num_sides() {
            return false;
        }
        if Side::all(self.num_sides()).any(|side| self.chan_width(side) != other.chan_width(side)) {
            return false;
        }
        for side in Side::all(self.num_sides()) {
            for track in 0..self.chan_width(side) {
                let direction = self.chan_direction(side, track);
                if direction != other.chan_direction(side, track) {
                    return false;
                }
                let ptc = graph.node(self.chan_node(side, track)).ptc;
                if ptc != graph.node(other.chan_node(side, track)).ptc {
                    return false;
                }
                if direction == PortDirection::Out && !self.is_node_mirror(other, graph, side, track) {
                    return false;
                }
            }
        }
        Side::all(self.num_sides()).all(|side| self.num_opins(side) == other.num_opins(side))
    }

    /// Compares the drivers of the leaving track at `(side, track)` in both
    /// blocks.
    ///
    /// Short connections only need to agree on whether they are fed from
    /// the opposite side. Multiplexer outputs need the same number of
    /// drivers and, driver by driver, the same node kind, the same switch
    /// and the same position within their own block.
    pub fn is_node_mirror(&self, other: &SwitchBlock, graph: &RrGraph, side: Side, track: usize) -> bool {
        let node = self.chan_node(side, track);
        let other_node = other.chan_node(side, track);

        let short = self.is_short_connection(graph, node, side);
        if short != other.is_short_connection(graph, other_node, side) {
            return false;
        }
        if short {
            return self.is_fed_from_opposite_side(graph, node, side)
                == other.is_fed_from_opposite_side(graph, other_node, side);
        }

        let drivers = graph.drivers(node);
        let other_drivers = graph.drivers(other_node);
        if drivers.len() != other_drivers.len() {
            return false;
        }
        drivers.iter().zip(other_drivers).all(|(a, b)| {
            graph.node(a.node).kind == graph.node(b.node).kind
                && a.switch == b.switch
                && self.node_side_and_index(graph, a.node, PortDirection::In)
                    == other.node_side_and_index(graph, b.node, PortDirection::In)
        })
    }

    // ---- configuration bits ----

    /// Lowest configuration bit assigned to this block.
    pub fn conf_bits_lsb(&self) -> usize {
        self.conf_bits_lsb
    }

    /// Highest configuration bit assigned to this block.
    pub fn conf_bits_msb(&self) -> usize {
        self.conf_bits_msb
    }

    /// Number of configuration bits, or `None` while the range is unset.
    pub fn num_conf_bits(&self) -> Option<usize> {
        (self.conf_bits_lsb <= self.conf_bits_msb)
            .then(|| self.conf_bits_msb - self.conf_bits_lsb + 1)
    }

    /// Sets the lowest configuration bit.
    pub fn set_conf_bits_lsb(&mut self, lsb: usize) {
        self.conf_bits_lsb = lsb;
    }

    /// Sets the highest configuration bit.
    pub fn set_conf_bits_msb(&mut self, msb: usize) {
        self.conf_bits_msb = msb;
    }

    /// Lowest reserved configuration bit.
    pub fn reserved_conf_bits_lsb(&self) -> usize {
        self.reserved_conf_bits_lsb
    }

    /// Highest reserved configuration bit.
    pub fn reserved_conf_bits_msb(&self) -> usize {
        self.reserved_conf_bits_msb
    }

    /// Number of reserved configuration bits; zero while unset.
    pub fn num_reserved_conf_bits(&self) -> usize {
        if self.reserved_conf_bits_lsb > self.reserved_conf_bits_msb {
            0
        } else {
            self.reserved_conf_bits_msb - self.reserved_conf_bits_lsb + 1
        }
    }

    /// Reserves bits `0..num` for this block. Zero unsets the range.
    pub fn set_num_reserved_conf_bits(&mut self, num: usize) {
        if num == 0 {
            self.reserved_conf_bits_lsb = 1;
            self.reserved_conf_bits_msb = 0;
        } else {
            self.reserved_conf_bits_lsb = 0;
            self.reserved_conf_bits_msb = num - 1;
        }
    }

    // ---- naming and neighbours ----

    /// Coordinate of the channel tile attached to `side`.
    ///
    /// The channel above and the channel to the right belong to the next
    /// tile; the channels below and to the left share this block's tile.
    ///
    /// # Panics
    ///
    /// Panics if `side` is not one of the four rectangular sides.
    pub fn side_block_coordinate(&self, side: Side) -> DeviceCoordinate {
        let DeviceCoordinate { x, y } = self.coordinate;
        match side {
            Side::TOP => DeviceCoordinate::new(x, y + 1),
            Side::RIGHT => DeviceCoordinate::new(x + 1, y),
            Side::BOTTOM | Side::LEFT => self.coordinate,
            other => panic!("{other} side has no neighbouring channel tile"),
        }
    }

    /// Module name of the circuit realizing this block.
    pub fn module_name(&self) -> String {
        format!("sb_{}__{}_", self.coordinate.x, self.coordinate.y)
    }

    /// Instance name of this block in the device top level.
    pub fn instance_name(&self) -> String {
        format!("{}_0_", self.module_name())
    }

    // ---- clearing ----

    /// Removes all tracks of a side.
    pub fn clear_chan_nodes(&mut self, side: Side) {
        let data = self.side_mut(side);
        data.chan.clear();
        data.directions.clear();
    }

    /// Removes all input pins of a side.
    pub fn clear_ipins(&mut self, side: Side) {
        let data = self.side_mut(side);
        data.ipins.clear();
        data.ipin_grid_sides.clear();
    }

    /// Removes all output pins of a side.
    pub fn clear_opins(&mut self, side: Side) {
        let data = self.side_mut(side);
        data.opins.clear();
        data.opin_grid_sides.clear();
    }

    /// Empties one side.
    pub fn clear_side(&mut self, side: Side) {
        *self.side_mut(side) = SideData::default();
    }

    /// Empties every side and unsets both bit ranges. The side count is kept.
    pub fn clear(&mut self) {
        *self = SwitchBlock::new(self.coordinate, self.num_sides());
    }
}
