//! Side indices of a switch block.
//!
//! A switch block has an ordered set of sides. The conventional count is
//! four (top, right, bottom, left, in that order) but nothing in the fabric
//! data model depends on it: a block is created with an explicit side count
//! and every per-side table is sized from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a switch block, identified by its position in side order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Side(u8);

impl Side {
    /// Top side, index 0.
    pub const TOP: Side = Side(0);
    /// Right side, index 1.
    pub const RIGHT: Side = Side(1);
    /// Bottom side, index 2.
    pub const BOTTOM: Side = Side(2);
    /// Left side, index 3.
    pub const LEFT: Side = Side(3);

    /// Number of sides of a conventional rectangular tile.
    pub const NUM_RECT_SIDES: usize = 4;

    /// Creates a side from its index in side order.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in a `u8`.
    pub fn from_index(index: usize) -> Self {
        match u8::try_from(index) {
            Ok(raw) => Side(raw),
            Err(_) => panic!("side index {index} out of range"),
        }
    }

    /// Position of this side in side order.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The side facing this one on a block with `num_sides` sides.
    ///
    /// Only blocks with an even number of sides have opposite pairs;
    /// returns `None` otherwise or if this side is not on the block.
    pub fn opposite(self, num_sides: usize) -> Option<Side> {
        if num_sides == 0 || num_sides % 2 != 0 || self.index() >= num_sides {
            return None;
        }
        Some(Side::from_index((self.index() + num_sides / 2) % num_sides))
    }

    /// Iterates over the sides of a block with `num_sides` sides, in order.
    pub fn all(num_sides: usize) -> impl Iterator<Item = Side> {
        (0..num_sides).map(Side::from_index)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Side::TOP => write!(f, "top"),
            Side::RIGHT => write!(f, "right"),
            Side::BOTTOM => write!(f, "bottom"),
            Side::LEFT => write!(f, "left"),
            Side(other) => write!(f, "side{other}"),
        }
    }
}
