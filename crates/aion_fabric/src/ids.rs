//! Opaque ID newtypes for routing-resource entities.
//!
//! Switch blocks and channels never own routing nodes; they store these
//! handles and compare them by value.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Handle of a node in the routing-resource graph.
    RrNodeId
);

define_id!(
    /// Identifier of the programmable switch on a routing edge.
    RrSwitchId
);

define_id!(
    /// Identifier of a routing segment type (wire length class).
    SegmentId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn node_id_roundtrip() {
        assert_eq!(RrNodeId::from_raw(42).as_raw(), 42);
    }

    #[test]
    fn ids_are_compared_by_value() {
        let mut set = HashSet::new();
        set.insert(RrNodeId::from_raw(1));
        set.insert(RrNodeId::from_raw(1));
        set.insert(RrNodeId::from_raw(2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(SegmentId::from_raw(3).to_string(), "3");
    }

    #[test]
    fn serde_roundtrip() {
        let id = RrSwitchId::from_raw(7);
        let json = serde_json::to_string(&id).unwrap();
        let back: RrSwitchId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
