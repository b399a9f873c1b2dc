//! Switch blocks and channels of a tiled FPGA fabric, and their
//! deduplication into a minimal set of circuit types.
//!
//! Each tile's switch block is described by a [`SwitchBlock`] holding
//! [`RrNodeId`] handles into a caller-supplied [`RrGraph`]. A
//! [`DeviceSwitchBlocks`] table is filled tile by tile; every new block is
//! matched against the canonical block of each known mirror class, so the
//! device ends up with one circuit per class rather than one per tile.
//! Channels are deduplicated the same way by [`DeviceChanTable`].
//!
//! A second, rotation-tolerant catalogue is available behind
//! [`MirrorStrategy::Rotatable`]; it is off by default.

#![warn(missing_docs)]

pub mod catalogue;
pub mod chan;
pub mod device;
pub mod device_chan;
pub mod error;
pub mod ids;
mod rotation;
pub mod rr_graph;
pub mod switch_block;

pub use catalogue::{build_chan_catalogue, build_switch_block_catalogue};
pub use chan::{ChanType, RrChan};
pub use device::{DeviceSwitchBlocks, MirrorStrategy};
pub use device_chan::DeviceChanTable;
pub use error::FabricError;
pub use ids::{RrNodeId, RrSwitchId, SegmentId};
pub use rr_graph::{RrDirection, RrDriver, RrGraph, RrNode, RrNodeKind};
pub use switch_block::{PortDirection, SwitchBlock};
