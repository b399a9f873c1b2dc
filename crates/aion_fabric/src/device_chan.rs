//! Device-wide channel table with mirror deduplication, one catalogue per
//! channel type.

use crate::chan::{ChanType, RrChan};
use crate::error::FabricError;
use crate::rr_graph::RrGraph;
use aion_common::DeviceCoordinate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ChanClasses {
    canonical: Vec<RrChan>,
    class_of: Vec<Vec<Option<usize>>>,
}

impl ChanClasses {
    fn add(&mut self, graph: &RrGraph, coord: DeviceCoordinate, chan: RrChan) -> usize {
        if self.class_of.len() <= coord.x {
            self.class_of.resize_with(coord.x + 1, Vec::new);
        }
        if self.class_of[coord.x].len() <= coord.y {
            self.class_of[coord.x].resize(coord.y + 1, None);
        }

        let class = match self
            .canonical
            .iter()
            .position(|c| c.is_mirror(&chan, graph))
        {
            Some(class) => class,
            None => {
                self.canonical.push(chan);
                self.canonical.len() - 1
            }
        };
        self.class_of[coord.x][coord.y] = Some(class);
        class
    }

    fn class_index_of(&self, coord: DeviceCoordinate) -> Option<usize> {
        self.class_of
            .get(coord.x)
            .and_then(|column| column.get(coord.y))
            .copied()
            .flatten()
    }
}

/// Unique X and Y channels of the device.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeviceChanTable {
    x: ChanClasses,
    y: ChanClasses,
}

impl DeviceChanTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn classes(&self, chan_type: ChanType) -> &ChanClasses {
        match chan_type {
            ChanType::X => &self.x,
            ChanType::Y => &self.y,
        }
    }

    /// Records the channel at a tile and returns its class index within
    /// its channel type. Empty channels have no type and are rejected, as
    /// are channels with a gap in their track numbers.
    pub fn add(
        &mut self,
        graph: &RrGraph,
        coord: DeviceCoordinate,
        chan: RrChan,
    ) -> Result<usize, FabricError> {
        chan.check_dense()?;
        let classes = match chan.chan_type() {
            Some(ChanType::X) => &mut self.x,
            Some(ChanType::Y) => &mut self.y,
            None => return Err(FabricError::UntypedChannel),
        };
        Ok(classes.add(graph, coord, chan))
    }

    /// Number of distinct channels of a type.
    pub fn num_classes(&self, chan_type: ChanType) -> usize {
        self.classes(chan_type).canonical.len()
    }

    /// Representative channel of a class.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a discovered class.
    pub fn class(&self, chan_type: ChanType, index: usize) -> &RrChan {
        let classes = self.classes(chan_type);
        match classes.canonical.get(index) {
            Some(chan) => chan,
            None => panic!(
                "{chan_type:?} channel class {index} out of range; {} classes discovered",
                classes.canonical.len()
            ),
        }
    }

    /// Class of the channel recorded at a tile, if any.
    pub fn class_index_of(&self, chan_type: ChanType, coord: DeviceCoordinate) -> Option<usize> {
        self.classes(chan_type).class_index_of(coord)
    }

    /// Drops every channel.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
