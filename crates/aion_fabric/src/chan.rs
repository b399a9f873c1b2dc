//! Routing channels: the ordered tracks of one side of a switch block, or of
//! one channel tile of the device.

use crate::error::FabricError;
use crate::ids::{RrNodeId, SegmentId};
use crate::rr_graph::{RrGraph, RrNodeKind};
use serde::{Deserialize, Serialize};

/// Geometric type of a channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ChanType {
    /// Horizontal.
    X,
    /// Vertical.
    Y,
}

impl ChanType {
    /// The channel type of a routing node kind, if it is a wire.
    pub fn of(kind: RrNodeKind) -> Option<ChanType> {
        match kind {
            RrNodeKind::ChanX => Some(ChanType::X),
            RrNodeKind::ChanY => Some(ChanType::Y),
            _ => None,
        }
    }
}

/// An ordered list of channel tracks, each with its routing segment.
///
/// Tracks are placed at the index given by their track number, so a channel
/// can be filled in any order. All tracks share one [`ChanType`], fixed by
/// the first insertion. A channel must be dense ([`RrChan::check_dense`])
/// before a switch block or channel table accepts it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrChan {
    chan_type: Option<ChanType>,
    nodes: Vec<Option<RrNodeId>>,
    segments: Vec<Option<SegmentId>>,
}

impl RrChan {
    /// Creates an empty, untyped channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel type, once a track has been added.
    pub fn chan_type(&self) -> Option<ChanType> {
        self.chan_type
    }

    /// Number of track slots.
    pub fn width(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node on a track.
    ///
    /// # Panics
    ///
    /// Panics if `track` is out of range or was never filled.
    pub fn node(&self, track: usize) -> RrNodeId {
        match self.nodes.get(track) {
            Some(Some(node)) => *node,
            Some(None) => panic!("track {track} of the channel was never filled"),
            None => panic!("track {track} out of range for channel width {}", self.width()),
        }
    }

    /// Returns the routing segment of a track.
    ///
    /// # Panics
    ///
    /// Panics if `track` is out of range or was never filled.
    pub fn segment(&self, track: usize) -> SegmentId {
        match self.segments.get(track) {
            Some(Some(segment)) => *segment,
            Some(None) => panic!("track {track} of the channel was never filled"),
            None => panic!("track {track} out of range for channel width {}", self.width()),
        }
    }

    /// Track index holding `node`, if any.
    pub fn track_of(&self, node: RrNodeId) -> Option<usize> {
        self.nodes.iter().position(|n| *n == Some(node))
    }

    /// Iterates over the filled tracks as `(track, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, RrNodeId)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(track, node)| node.map(|n| (track, n)))
    }

    /// Checks that every track up to the width has been filled.
    pub fn check_dense(&self) -> Result<(), FabricError> {
        match self.nodes.iter().position(Option::is_none) {
            Some(track) => Err(FabricError::MissingTrack {
                track,
                width: self.width(),
            }),
            None => Ok(()),
        }
    }

    /// Places `node` at its track number, growing the channel as needed.
    pub fn add_node(
        &mut self,
        graph: &RrGraph,
        node: RrNodeId,
        segment: SegmentId,
    ) -> Result<(), FabricError> {
        let rr_node = graph.node(node);
        let Some(found) = ChanType::of(rr_node.kind) else {
            return Err(FabricError::NotAChannelNode {
                node,
                kind: rr_node.kind,
            });
        };
        match self.chan_type {
            Some(expected) if expected != found => {
                return Err(FabricError::ChanTypeMismatch {
                    node,
                    expected,
                    found,
                });
            }
            _ => self.chan_type = Some(found),
        }

        let track = rr_node.ptc;
        if track >= self.nodes.len() {
            self.nodes.resize(track + 1, None);
            self.segments.resize(track + 1, None);
        }
        if let Some(existing) = self.nodes[track] {
            if existing != node {
                return Err(FabricError::TrackOccupied { track, existing });
            }
        }
        self.nodes[track] = Some(node);
        self.segments[track] = Some(segment);
        Ok(())
    }

    /// Cyclically shifts all tracks left by `offset` (modulo the width).
    pub fn rotate(&mut self, offset: usize) {
        let width = self.width();
        self.rotate_range(0, width, offset);
    }

    /// Cyclically shifts tracks `begin..end` left by `offset` (modulo the
    /// range length).
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn rotate_range(&mut self, begin: usize, end: usize, offset: usize) {
        assert!(
            begin <= end && end <= self.width(),
            "rotation range {begin}..{end} out of bounds for channel width {}",
            self.width()
        );
        let len = end - begin;
        if len == 0 {
            return;
        }
        self.nodes[begin..end].rotate_left(offset % len);
        self.segments[begin..end].rotate_left(offset % len);
    }

    /// Maximal runs of consecutive tracks sharing a routing segment, as
    /// `begin..end` pairs.
    pub fn segment_groups(&self) -> Vec<(usize, usize)> {
        group_runs(&self.segments)
    }

    /// Structural equivalence: same type, same width, and per track the same
    /// node kind, wire direction and routing segment.
    pub fn is_mirror(&self, other: &RrChan, graph: &RrGraph) -> bool {
        if self.chan_type != other.chan_type || self.width() != other.width() {
            return false;
        }
        if self.segments != other.segments {
            return false;
        }
        self.nodes.iter().zip(&other.nodes).all(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => {
                let (a, b) = (graph.node(*a), graph.node(*b));
                a.kind == b.kind && a.direction == b.direction
            }
            (None, None) => true,
            _ => false,
        })
    }

    /// Removes all tracks and forgets the channel type.
    pub fn clear(&mut self) {
        self.chan_type = None;
        self.nodes.clear();
        self.segments.clear();
    }
}

/// Splits a slice into maximal runs of equal neighbours.
pub(crate) fn group_runs<T: PartialEq>(items: &[T]) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut begin = 0;
    for end in 1..=items.len() {
        if end == items.len() || items[end] != items[begin] {
            groups.push((begin, end));
            begin = end;
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr_graph::{RrDirection, RrNode};

    fn wire(graph: &mut RrGraph, kind: RrNodeKind, ptc: usize, dir: RrDirection) -> RrNodeId {
        graph.add_node(RrNode::new(kind, ptc).with_direction(dir))
    }

    #[test]
    fn tracks_land_at_their_track_number() {
        let mut graph = RrGraph::new();
        let t2 = wire(&mut graph, RrNodeKind::ChanX, 2, RrDirection::Increasing);
        let t0 = wire(&mut graph, RrNodeKind::ChanX, 0, RrDirection::Decreasing);

        let mut chan = RrChan::new();
        chan.add_node(&graph, t2, SegmentId::from_raw(1)).unwrap();
        chan.add_node(&graph, t0, SegmentId::from_raw(0)).unwrap();

        assert_eq!(chan.width(), 3);
        assert_eq!(chan.chan_type(), Some(ChanType::X));
        assert_eq!(chan.node(2), t2);
        assert_eq!(chan.segment(0), SegmentId::from_raw(0));
        assert_eq!(chan.track_of(t0), Some(0));
        assert_eq!(chan.iter().count(), 2);
    }

    #[test]
    fn gap_in_track_numbers_is_reported() {
        let mut graph = RrGraph::new();
        let t0 = wire(&mut graph, RrNodeKind::ChanY, 0, RrDirection::Increasing);
        let t2 = wire(&mut graph, RrNodeKind::ChanY, 2, RrDirection::Increasing);

        let mut chan = RrChan::new();
        chan.add_node(&graph, t2, SegmentId::from_raw(0)).unwrap();
        chan.add_node(&graph, t0, SegmentId::from_raw(0)).unwrap();
        let err = chan.check_dense().unwrap_err();
        assert!(matches!(err, FabricError::MissingTrack { track: 1, width: 3 }));

        let t1 = wire(&mut graph, RrNodeKind::ChanY, 1, RrDirection::Decreasing);
        chan.add_node(&graph, t1, SegmentId::from_raw(0)).unwrap();
        assert!(chan.check_dense().is_ok());
    }

    #[test]
    fn mixed_types_are_rejected() {
        let mut graph = RrGraph::new();
        let x = wire(&mut graph, RrNodeKind::ChanX, 0, RrDirection::Increasing);
        let y = wire(&mut graph, RrNodeKind::ChanY, 1, RrDirection::Increasing);

        let mut chan = RrChan::new();
        chan.add_node(&graph, x, SegmentId::from_raw(0)).unwrap();
        let err = chan.add_node(&graph, y, SegmentId::from_raw(0)).unwrap_err();
        assert!(matches!(
            err,
            FabricError::ChanTypeMismatch {
                expected: ChanType::X,
                found: ChanType::Y,
                ..
            }
        ));
    }

    #[test]
    fn pins_are_rejected() {
        let mut graph = RrGraph::new();
        let pin = graph.add_node(RrNode::new(RrNodeKind::Ipin, 0));
        let mut chan = RrChan::new();
        let err = chan.add_node(&graph, pin, SegmentId::from_raw(0)).unwrap_err();
        assert!(matches!(err, FabricError::NotAChannelNode { .. }));
    }

    #[test]
    fn occupied_track_is_rejected() {
        let mut graph = RrGraph::new();
        let a = wire(&mut graph, RrNodeKind::ChanY, 0, RrDirection::Increasing);
        let b = wire(&mut graph, RrNodeKind::ChanY, 0, RrDirection::Decreasing);
        let mut chan = RrChan::new();
        chan.add_node(&graph, a, SegmentId::from_raw(0)).unwrap();
        chan.add_node(&graph, a, SegmentId::from_raw(0)).unwrap();
        let err = chan.add_node(&graph, b, SegmentId::from_raw(0)).unwrap_err();
        assert!(matches!(err, FabricError::TrackOccupied { track: 0, .. }));
    }

    #[test]
    fn rotate_shifts_left() {
        let mut graph = RrGraph::new();
        let ids: Vec<_> = (0..4)
            .map(|i| wire(&mut graph, RrNodeKind::ChanX, i, RrDirection::Increasing))
            .collect();
        let mut chan = RrChan::new();
        for (i, id) in ids.iter().enumerate() {
            chan.add_node(&graph, *id, SegmentId::from_raw(i as u32)).unwrap();
        }

        chan.rotate(5);
        assert_eq!(chan.node(0), ids[1]);
        assert_eq!(chan.segment(3), SegmentId::from_raw(0));

        chan.rotate_range(0, 2, 1);
        assert_eq!(chan.node(0), ids[2]);
        assert_eq!(chan.node(1), ids[1]);
        assert_eq!(chan.node(2), ids[3]);
    }

    #[test]
    fn mirror_compares_kind_direction_and_segment() {
        let mut graph = RrGraph::new();
        let mut build = |dirs: &[RrDirection], seg: u32| {
            let mut chan = RrChan::new();
            for (i, dir) in dirs.iter().enumerate() {
                let id = wire(&mut graph, RrNodeKind::ChanY, i, *dir);
                chan.add_node(&graph, id, SegmentId::from_raw(seg)).unwrap();
            }
            chan
        };
        let a = build(&[RrDirection::Increasing, RrDirection::Decreasing], 0);
        let b = build(&[RrDirection::Increasing, RrDirection::Decreasing], 0);
        let c = build(&[RrDirection::Decreasing, RrDirection::Increasing], 0);
        let d = build(&[RrDirection::Increasing, RrDirection::Decreasing], 1);
        let e = build(&[RrDirection::Increasing], 0);

        assert!(a.is_mirror(&b, &graph));
        assert!(!a.is_mirror(&c, &graph));
        assert!(!a.is_mirror(&d, &graph));
        assert!(!a.is_mirror(&e, &graph));
    }

    #[test]
    fn groups_are_maximal_runs() {
        assert_eq!(group_runs(&[0, 0, 1, 1, 1, 0]), vec![(0, 2), (2, 5), (5, 6)]);
        assert!(group_runs::<u8>(&[]).is_empty());
    }

    #[test]
    fn clear_resets_type() {
        let mut graph = RrGraph::new();
        let x = wire(&mut graph, RrNodeKind::ChanX, 0, RrDirection::Increasing);
        let mut chan = RrChan::new();
        chan.add_node(&graph, x, SegmentId::from_raw(0)).unwrap();
        chan.clear();
        assert_eq!(chan.width(), 0);
        assert_eq!(chan.chan_type(), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn node_out_of_range_panics() {
        RrChan::new().node(0);
    }
}
