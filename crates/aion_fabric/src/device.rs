//! Device-wide switch-block table with incremental mirror deduplication.

use crate::rr_graph::RrGraph;
use crate::switch_block::SwitchBlock;
use aion_common::{DeviceCoordinate, Side};
use aion_config::SwitchBlockConfig;
use serde::{Deserialize, Serialize};

/// Which equivalence classes the table maintains.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum MirrorStrategy {
    /// Exact mirrors only.
    #[default]
    Exact,
    /// Exact mirrors, plus a second catalogue of blocks that are mirrors
    /// after rotation.
    Rotatable,
}

impl From<&SwitchBlockConfig> for MirrorStrategy {
    fn from(config: &SwitchBlockConfig) -> Self {
        if config.rotatable_mirrors {
            MirrorStrategy::Rotatable
        } else {
            MirrorStrategy::Exact
        }
    }
}

/// Every switch block of the device, grouped into mirror classes.
///
/// Blocks are added one tile at a time. Each new block is compared against
/// the canonical block of every known class, in discovery order; the first
/// mirror wins, otherwise the block founds a new class. The result depends
/// on insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeviceSwitchBlocks {
    strategy: MirrorStrategy,
    blocks: Vec<Vec<SwitchBlock>>,
    canonical_of: Vec<Vec<Option<usize>>>,
    canonical: Vec<DeviceCoordinate>,
    rotatable_of: Vec<Vec<Option<usize>>>,
    rotatable: Vec<DeviceCoordinate>,
}

impl DeviceSwitchBlocks {
    /// Creates an empty table.
    pub fn new(strategy: MirrorStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// The strategy this table was created with.
    pub fn strategy(&self) -> MirrorStrategy {
        self.strategy
    }

    /// Grid extent covered so far: one past the largest column, one past the
    /// tallest column's largest row.
    pub fn range(&self) -> DeviceCoordinate {
        DeviceCoordinate::new(
            self.blocks.len(),
            self.blocks.iter().map(Vec::len).max().unwrap_or(0),
        )
    }

    fn grow_to(&mut self, coord: DeviceCoordinate) {
        if self.blocks.len() <= coord.x {
            self.blocks.resize_with(coord.x + 1, Vec::new);
            self.canonical_of.resize_with(coord.x + 1, Vec::new);
            self.rotatable_of.resize_with(coord.x + 1, Vec::new);
        }
        if self.blocks[coord.x].len() <= coord.y {
            self.blocks[coord.x].resize_with(coord.y + 1, SwitchBlock::default);
            self.canonical_of[coord.x].resize(coord.y + 1, None);
            self.rotatable_of[coord.x].resize(coord.y + 1, None);
        }
    }

    fn slot(&self, coord: DeviceCoordinate) -> Option<&SwitchBlock> {
        self.blocks.get(coord.x).and_then(|column| column.get(coord.y))
    }

    fn at(&self, coord: DeviceCoordinate) -> &SwitchBlock {
        match self.slot(coord) {
            Some(block) => block,
            None => panic!("tile {coord} is outside the switch-block table"),
        }
    }

    /// Stores `block` at its own coordinate and assigns it to a mirror class.
    ///
    /// Returns the index of its exact-mirror class.
    pub fn add(&mut self, graph: &RrGraph, block: SwitchBlock) -> usize {
        let coord = block.coordinate();
        self.grow_to(coord);

        let class = match self
            .canonical
            .iter()
            .position(|c| self.at(*c).is_mirror(&block, graph))
        {
            Some(class) => class,
            None => {
                self.canonical.push(coord);
                self.canonical.len() - 1
            }
        };
        self.canonical_of[coord.x][coord.y] = Some(class);

        if self.strategy == MirrorStrategy::Rotatable {
            let rotated = match self.find_rotatable_class(graph, &block) {
                Some(class) => class,
                None => {
                    self.rotatable.push(coord);
                    self.rotatable.len() - 1
                }
            };
            self.rotatable_of[coord.x][coord.y] = Some(rotated);
        }

        self.blocks[coord.x][coord.y] = block;
        class
    }

    fn find_rotatable_class(&self, graph: &RrGraph, block: &SwitchBlock) -> Option<usize> {
        self.rotatable.iter().position(|coord| {
            let base = self.at(*coord);
            is_rotated_mirror(base, block, graph)
        })
    }

    /// Block stored at a tile.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the table.
    pub fn block(&self, coord: DeviceCoordinate) -> &SwitchBlock {
        self.at(coord)
    }

    /// Number of distinct exact-mirror classes.
    pub fn num_canonical(&self) -> usize {
        self.canonical.len()
    }

    /// Canonical block of a class.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a discovered class.
    pub fn canonical_descriptor(&self, index: usize) -> &SwitchBlock {
        match self.canonical.get(index) {
            Some(coord) => self.at(*coord),
            None => panic!(
                "mirror class {index} out of range; {} classes discovered",
                self.canonical.len()
            ),
        }
    }

    /// Class index of the block at a tile.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the table or no block was added there.
    pub fn canonical_index_of(&self, coord: DeviceCoordinate) -> usize {
        match self
            .canonical_of
            .get(coord.x)
            .and_then(|column| column.get(coord.y))
        {
            Some(Some(class)) => *class,
            Some(None) => panic!("no switch block was added at tile {coord}"),
            None => panic!("tile {coord} is outside the switch-block table"),
        }
    }

    /// Canonical block of the class the block at `coord` belongs to.
    ///
    /// # Panics
    ///
    /// As [`canonical_index_of`](Self::canonical_index_of).
    pub fn canonical_descriptor_of(&self, coord: DeviceCoordinate) -> &SwitchBlock {
        self.canonical_descriptor(self.canonical_index_of(coord))
    }

    /// Number of rotatable-mirror classes; zero unless the table uses
    /// [`MirrorStrategy::Rotatable`].
    pub fn num_rotatable(&self) -> usize {
        self.rotatable.len()
    }

    /// Canonical block of a rotatable-mirror class.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a discovered class.
    pub fn rotatable_descriptor(&self, index: usize) -> &SwitchBlock {
        match self.rotatable.get(index) {
            Some(coord) => self.at(*coord),
            None => panic!(
                "rotatable class {index} out of range; {} classes discovered",
                self.rotatable.len()
            ),
        }
    }

    /// Rotatable-mirror class of the block at a tile, if one was assigned.
    pub fn rotatable_index_of(&self, coord: DeviceCoordinate) -> Option<usize> {
        self.rotatable_of
            .get(coord.x)
            .and_then(|column| column.get(coord.y))
            .copied()
            .flatten()
    }

    /// Reserves configuration bits `0..num` for the block at a tile.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the table.
    pub fn set_num_reserved_conf_bits(&mut self, coord: DeviceCoordinate, num: usize) {
        self.at_mut(coord).set_num_reserved_conf_bits(num);
    }

    /// Sets the lowest configuration bit of the block at a tile.
    pub fn set_conf_bits_lsb(&mut self, coord: DeviceCoordinate, lsb: usize) {
        self.at_mut(coord).set_conf_bits_lsb(lsb);
    }

    /// Sets the highest configuration bit of the block at a tile.
    pub fn set_conf_bits_msb(&mut self, coord: DeviceCoordinate, msb: usize) {
        self.at_mut(coord).set_conf_bits_msb(msb);
    }

    fn at_mut(&mut self, coord: DeviceCoordinate) -> &mut SwitchBlock {
        match self.blocks.get_mut(coord.x).and_then(|c| c.get_mut(coord.y)) {
            Some(block) => block,
            None => panic!("tile {coord} is outside the switch-block table"),
        }
    }

    /// Number of tiles that hold a block.
    pub fn num_blocks(&self) -> usize {
        self.canonical_of
            .iter()
            .flatten()
            .filter(|class| class.is_some())
            .count()
    }

    /// Drops every block and class.
    pub fn clear(&mut self) {
        *self = Self::new(self.strategy);
    }
}

/// Searches rotations of `block` for a mirror of `base`.
///
/// Starts from the hinted offset, then alternates: test the block as is,
/// test it with the left and right sides shifted by one track, test it with
/// the top and bottom sides shifted by two, then rotate the whole block by
/// two tracks and repeat, up to the widest channel.
fn is_rotated_mirror(base: &SwitchBlock, block: &SwitchBlock, graph: &RrGraph) -> bool {
    if !block.is_mirrorable(base, graph) {
        return false;
    }
    let mut probe = block.clone();
    probe.rotate(graph, block.hint_rotate_offset(base, graph));

    let rectangular = probe.num_sides() == Side::NUM_RECT_SIDES;
    for _ in 0..probe.max_chan_width().max(1) {
        if base.is_mirror(&probe, graph) {
            return true;
        }
        if rectangular {
            let mut horizontal = probe.clone();
            horizontal.rotate_side(graph, Side::LEFT, 1);
            horizontal.rotate_side(graph, Side::RIGHT, 1);
            if base.is_mirror(&horizontal, graph) {
                return true;
            }

            let mut vertical = probe.clone();
            vertical.rotate_side(graph, Side::TOP, 2);
            vertical.rotate_side(graph, Side::BOTTOM, 2);
            if base.is_mirror(&vertical, graph) {
                return true;
            }
        }
        probe.rotate(graph, 2);
    }
    false
}
