//! Tile coordinates on the device grid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An `(x, y)` position on the device grid.
///
/// Switch blocks, channels and the device tables are all indexed by tile
/// coordinate. The origin is the bottom-left tile.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct DeviceCoordinate {
    /// Column index.
    pub x: usize,
    /// Row index.
    pub y: usize,
}

impl DeviceCoordinate {
    /// Creates a coordinate.
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for DeviceCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(DeviceCoordinate::new(3, 7).to_string(), "(3, 7)");
    }

    #[test]
    fn ordering_is_column_major() {
        assert!(DeviceCoordinate::new(0, 9) < DeviceCoordinate::new(1, 0));
    }
}
