//! Error types for routing-resource checks and switch-block construction.

use crate::chan::ChanType;
use crate::ids::RrNodeId;
use crate::rr_graph::RrNodeKind;
use aion_common::Side;

/// Errors raised while checking the routing graph or assembling channels
/// and switch blocks.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// A channel node can be driven from both ends. Only uni-directional
    /// routing architectures are supported.
    #[error("routing node {node} is bi-directional; only uni-directional routing is supported")]
    BidirectionalRouting {
        /// The offending node.
        node: RrNodeId,
    },

    /// A non-channel node was added to a channel.
    #[error("routing node {node} is a {kind:?} node, not a channel track")]
    NotAChannelNode {
        /// The offending node.
        node: RrNodeId,
        /// Its kind.
        kind: RrNodeKind,
    },

    /// A track of the wrong geometric type was added to a channel.
    #[error("channel holds {expected:?} tracks but node {node} is {found:?}")]
    ChanTypeMismatch {
        /// The offending node.
        node: RrNodeId,
        /// The channel's established type.
        expected: ChanType,
        /// The node's type.
        found: ChanType,
    },

    /// Two tracks claim the same track index in one channel.
    #[error("track {track} of the channel is already occupied by node {existing}")]
    TrackOccupied {
        /// The contested track index.
        track: usize,
        /// The node already placed there.
        existing: RrNodeId,
    },

    /// A channel skips a track number, so its tracks are not contiguous.
    #[error("track {track} of a channel {width} tracks wide was never filled")]
    MissingTrack {
        /// The first empty track.
        track: usize,
        /// Channel width.
        width: usize,
    },

    /// A channel has no type, so it cannot be catalogued.
    #[error("channel is empty and has no type")]
    UntypedChannel,

    /// The per-track direction list does not match the channel width.
    #[error("{side} side has {tracks} tracks but {directions} directions")]
    TrackCountMismatch {
        /// The side being populated.
        side: Side,
        /// Channel width.
        tracks: usize,
        /// Number of directions supplied.
        directions: usize,
    },
}
